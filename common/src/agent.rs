use crate::error::Result;
use crate::knowledge::{KnowledgeBase, KnowledgeSnapshot, ScanOrder, Sequential};
use crate::point::Point;
use itertools::Itertools;
use rand::Rng;
use rand::seq::IndexedRandom;
use std::collections::HashSet;
use tracing::debug;

/// A Minesweeper player that only ever claims what it can prove.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Agent {
    moves_made: HashSet<Point>,
    knowledge: KnowledgeBase,
}

impl Agent {
    pub fn new(height: usize, width: usize) -> Self {
        Agent {
            moves_made: HashSet::new(),
            knowledge: KnowledgeBase::new(height, width),
        }
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    pub fn moves_made(&self) -> &HashSet<Point> {
        &self.moves_made
    }

    pub fn mines(&self) -> &HashSet<Point> {
        self.knowledge.mines()
    }

    pub fn safes(&self) -> &HashSet<Point> {
        self.knowledge.safes()
    }

    /// Injects outside knowledge that `cell` is a mine.
    pub fn mark_mine(&mut self, cell: Point) -> Result<bool> {
        self.knowledge.mark_mine(cell)
    }

    /// Injects outside knowledge that `cell` is safe.
    pub fn mark_safe(&mut self, cell: Point) -> Result<bool> {
        self.knowledge.mark_safe(cell)
    }

    /// Called when the board reports, for a revealed safe `cell`, how many of its
    /// neighbors are mines. A cell that was already revealed is ignored.
    pub fn add_knowledge(&mut self, cell: Point, count: usize) -> Result<()> {
        self.add_knowledge_with(cell, count, &mut Sequential)
    }

    pub fn add_knowledge_with<O: ScanOrder>(
        &mut self,
        cell: Point,
        count: usize,
        order: &mut O,
    ) -> Result<()> {
        if self.moves_made.contains(&cell) {
            debug!(%cell, "already revealed");
            return Ok(());
        }
        self.knowledge.add_knowledge_with(cell, count, order)?;
        self.moves_made.insert(cell);
        Ok(())
    }

    /// A cell known to be safe that has not been revealed yet.
    ///
    /// Picks the first such cell in row-major order.
    pub fn make_safe_move(&self) -> Option<Point> {
        self.knowledge
            .safes()
            .iter()
            .filter(|&cell| !self.moves_made.contains(cell))
            .min()
            .copied()
    }

    /// The first cell in row-major order that is neither revealed nor a known mine.
    ///
    /// No randomness is involved; see [`Agent::make_random_move_with`] for a uniform pick.
    pub fn make_random_move(&self) -> Option<Point> {
        self.candidates().next()
    }

    /// A uniformly random cell that is neither revealed nor a known mine.
    pub fn make_random_move_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Point> {
        self.candidates().collect_vec().choose(rng).copied()
    }

    fn candidates(&self) -> impl Iterator<Item = Point> + '_ {
        Point::all(self.knowledge.height(), self.knowledge.width())
            .filter(|cell| !self.moves_made.contains(cell) && !self.knowledge.is_mine(*cell))
    }

    pub fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            moves_made: self.moves_made.iter().copied().sorted().collect(),
            knowledge: self.knowledge.snapshot(),
        }
    }
}

/// Ordered, comparable view of an [`Agent`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AgentSnapshot {
    pub moves_made: Vec<Point>,
    pub knowledge: KnowledgeSnapshot,
}
