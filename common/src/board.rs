use crate::point::Point;
use rand::Rng;
use std::collections::HashSet;
use std::fmt;

/// The hidden truth of a game: where the mines are.
///
/// This is what the agent plays against. It answers `is_mine` and `nearby_mines`
/// and keeps track of the mines the player has flagged.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Board {
    height: usize,
    width: usize,
    mines: HashSet<Point>,
    mines_found: HashSet<Point>,
}

impl Board {
    /// Places exactly `mines` mines uniformly at random.
    pub fn random<R: Rng + ?Sized>(
        height: usize,
        width: usize,
        mines: usize,
        rng: &mut R,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(height > 0 && width > 0, "board must have at least one cell");
        anyhow::ensure!(
            mines < height * width,
            "total mines must be less than the number of cells on the board"
        );

        let mut placed = HashSet::with_capacity(mines);
        while placed.len() != mines {
            placed.insert(Point::new(
                rng.random_range(0..height),
                rng.random_range(0..width),
            ));
        }

        Ok(Board {
            height,
            width,
            mines: placed,
            mines_found: HashSet::new(),
        })
    }

    /// A board with mines at exactly the given cells.
    pub fn with_mines(
        height: usize,
        width: usize,
        mines: impl IntoIterator<Item = Point>,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(height > 0 && width > 0, "board must have at least one cell");

        let mines: HashSet<Point> = mines.into_iter().collect();
        if let Some(outside) = mines.iter().find(|p| !p.in_bounds(height, width)) {
            anyhow::bail!("mine {outside} is outside the {height}x{width} board");
        }

        Ok(Board {
            height,
            width,
            mines,
            mines_found: HashSet::new(),
        })
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn mine_count(&self) -> usize {
        self.mines.len()
    }

    pub fn is_mine(&self, cell: Point) -> bool {
        self.mines.contains(&cell)
    }

    /// Number of mines within one row and column of `cell`, not counting the cell itself.
    pub fn nearby_mines(&self, cell: Point) -> u8 {
        cell.neighbors(self.height, self.width)
            .filter(|n| self.mines.contains(n))
            .count() as u8
    }

    /// Records a mine flagged by the player.
    pub fn flag(&mut self, cell: Point) {
        self.mines_found.insert(cell);
    }

    pub fn mines_found(&self) -> &HashSet<Point> {
        &self.mines_found
    }

    /// True once every mine, and nothing else, has been flagged.
    pub fn won(&self) -> bool {
        self.mines_found == self.mines
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = format!("{}-", "--".repeat(self.width));
        for row in 0..self.height {
            writeln!(f, "{rule}")?;
            for col in 0..self.width {
                let mark = if self.is_mine(Point::new(row, col)) { 'X' } else { ' ' };
                write!(f, "|{mark}")?;
            }
            writeln!(f, "|")?;
        }
        writeln!(f, "{rule}")
    }
}
