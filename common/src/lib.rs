//! A Minesweeper agent that plays by logical inference.
//!
//! The [`Agent`] keeps a [`KnowledgeBase`] of [`Sentence`]s, each saying how many of a
//! set of cells are mines. Every revealed cell adds one sentence, and the knowledge base
//! then draws conclusions (cells proven safe or mined, and new sentences from subset
//! elimination) until nothing new follows. The [`Game`] ties the agent to a [`Board`].

pub mod agent;
pub mod board;
pub mod error;
pub mod game;
pub mod knowledge;
pub mod point;
pub mod sentence;

pub use agent::{Agent, AgentSnapshot};
pub use board::Board;
pub use error::InvariantViolation;
pub use game::{Game, GameState, MoveKind, Tile, Turn};
pub use knowledge::{KnowledgeBase, KnowledgeSnapshot, ScanOrder, Sequential, Shuffled};
pub use point::Point;
pub use sentence::Sentence;
