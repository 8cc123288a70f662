use crate::error::{InvariantViolation, Result};
use crate::point::Point;
use itertools::Itertools;
use std::collections::BTreeSet;
use std::fmt;

/// A logical statement about the board: exactly `count` of `cells` are mines.
///
/// The count never exceeds the number of cells. Every operation that could break
/// that rule reports an [`InvariantViolation`] and leaves the sentence untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Sentence {
    cells: BTreeSet<Point>,
    count: usize,
}

impl Sentence {
    pub fn new(cells: impl IntoIterator<Item = Point>, count: usize) -> Result<Self> {
        let cells: BTreeSet<Point> = cells.into_iter().collect();
        if count > cells.len() {
            return Err(InvariantViolation::CountOutOfRange {
                cells: cells.len(),
                count: count as isize,
            });
        }
        Ok(Sentence { cells, count })
    }

    pub fn cells(&self) -> &BTreeSet<Point> {
        &self.cells
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// An empty sentence says nothing: zero mines among zero cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// All cells, if the count forces every one of them to be a mine.
    pub fn known_mines(&self) -> BTreeSet<Point> {
        if self.count > 0 && self.cells.len() == self.count {
            self.cells.clone()
        } else {
            BTreeSet::new()
        }
    }

    /// All cells, if the count is zero.
    pub fn known_safes(&self) -> BTreeSet<Point> {
        if self.count == 0 {
            self.cells.clone()
        } else {
            BTreeSet::new()
        }
    }

    /// Drops a confirmed mine, taking one off the count. Returns whether the
    /// sentence changed.
    pub fn mark_mine(&mut self, cell: Point) -> Result<bool> {
        if !self.cells.contains(&cell) {
            return Ok(false);
        }
        self.check_mine(cell)?;
        self.cells.remove(&cell);
        self.count -= 1;
        Ok(true)
    }

    /// Drops a confirmed safe cell; the count is unchanged. Returns whether the
    /// sentence changed.
    pub fn mark_safe(&mut self, cell: Point) -> Result<bool> {
        if !self.cells.contains(&cell) {
            return Ok(false);
        }
        self.check_safe(cell)?;
        self.cells.remove(&cell);
        Ok(true)
    }

    /// Fails if marking `cell` as a mine would break the count. Cells outside the
    /// sentence always pass.
    pub fn check_mine(&self, cell: Point) -> Result<()> {
        if self.cells.contains(&cell) && self.count == 0 {
            // The sentence already proves `cell` safe.
            return Err(InvariantViolation::CountOutOfRange {
                cells: self.cells.len() - 1,
                count: -1,
            });
        }
        Ok(())
    }

    /// Fails if marking `cell` as safe would break the count.
    pub fn check_safe(&self, cell: Point) -> Result<()> {
        if self.cells.contains(&cell) && self.count == self.cells.len() {
            // The sentence already proves `cell` a mine.
            return Err(InvariantViolation::CountOutOfRange {
                cells: self.cells.len() - 1,
                count: self.count as isize,
            });
        }
        Ok(())
    }

    pub fn is_subset(&self, other: &Sentence) -> bool {
        self.cells.is_subset(&other.cells)
    }

    /// Subset elimination: `self` minus a sentence whose cells it contains.
    /// The leftover cells hold whatever mines `subset` does not account for.
    pub(crate) fn subtract(&self, subset: &Sentence) -> Result<Sentence> {
        debug_assert!(subset.is_subset(self));

        let cells: BTreeSet<Point> = self.cells.difference(&subset.cells).copied().collect();
        let count = self.count as isize - subset.count as isize;
        if count < 0 || count as usize > cells.len() {
            return Err(InvariantViolation::CountOutOfRange {
                cells: cells.len(),
                count,
            });
        }
        Ok(Sentence {
            cells,
            count: count as usize,
        })
    }
}

impl fmt::Display for Sentence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}} = {}", self.cells.iter().join(", "), self.count)
    }
}
