use crate::point::Point;
use thiserror::Error;

/// Fatal inconsistencies detected by the inference engine.
///
/// None of these can happen while the engine is fed counts from a real board.
/// They surface when a caller injects contradictory knowledge.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("sentence over {cells} cells cannot hold {count} mines")]
    CountOutOfRange { cells: usize, count: isize },

    #[error("cell {0} is known to be both a mine and safe")]
    MineAndSafe(Point),

    #[error("cell {cell} is outside the {height}x{width} grid")]
    OutOfBounds {
        cell: Point,
        height: usize,
        width: usize,
    },
}

pub type Result<T> = std::result::Result<T, InvariantViolation>;
