use itertools::iproduct;
use std::fmt;

/// A cell coordinate on the board, `row` first.
///
/// Ordering is row-major, so sorted collections of points read like the board.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub struct Point {
    pub row: usize,
    pub col: usize,
}

impl Point {
    pub const fn new(row: usize, col: usize) -> Self {
        Point { row, col }
    }

    pub fn in_bounds(self, height: usize, width: usize) -> bool {
        self.row < height && self.col < width
    }

    /// The up-to-8 cells around this one, clipped to a `height x width` grid.
    /// The point itself is never yielded.
    pub fn neighbors(self, height: usize, width: usize) -> impl Iterator<Item = Point> {
        (-1isize..=1).flat_map(move |dr| {
            (-1isize..=1).filter_map(move |dc| {
                if dr == 0 && dc == 0 {
                    return None;
                }

                let row = self.row as isize + dr;
                let col = self.col as isize + dc;

                if row >= 0 && row < height as isize && col >= 0 && col < width as isize {
                    Some(Point::new(row as usize, col as usize))
                } else {
                    None
                }
            })
        })
    }

    /// Every cell of a `height x width` grid in row-major order.
    pub fn all(height: usize, width: usize) -> impl Iterator<Item = Point> {
        iproduct!(0..height, 0..width).map(|(row, col)| Point::new(row, col))
    }
}

impl From<(usize, usize)> for Point {
    fn from((row, col): (usize, usize)) -> Self {
        Point::new(row, col)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}
