use crate::agent::Agent;
use crate::board::Board;
use crate::point::Point;
use anyhow::Context;
use rand::Rng;
use tracing::{info, warn};

/// What the player can see of a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Tile {
    Hidden,
    Revealed(u8), // Number of adjacent mines.
    Flagged,
}

/// Represents the current state of the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum GameState {
    Playing,
    Won,
    Lost,
}

/// How the agent arrived at a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveKind {
    /// The cell was proven safe.
    Inferred,
    /// Nothing was provably safe, so the agent guessed.
    Guess,
}

/// One move played by the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Turn {
    pub point: Point,
    pub kind: MoveKind,
    pub state: GameState,
}

/// A board, the agent playing it, and what the agent has uncovered so far.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Game {
    pub board: Board,
    pub agent: Agent,
    /// The visible state, indexed `tiles[row][col]`.
    pub tiles: Vec<Vec<Tile>>,
    pub game_state: GameState,
}

impl Game {
    pub fn new<R: Rng + ?Sized>(
        height: usize,
        width: usize,
        mines: usize,
        rng: &mut R,
    ) -> anyhow::Result<Self> {
        Ok(Game::from_board(Board::random(height, width, mines, rng)?))
    }

    pub fn from_board(board: Board) -> Self {
        Game {
            agent: Agent::new(board.height(), board.width()),
            tiles: vec![vec![Tile::Hidden; board.width()]; board.height()],
            game_state: GameState::Playing,
            board,
        }
    }

    pub fn deserialize(bts: &[u8]) -> anyhow::Result<Self> {
        bcs::from_bytes(bts).context("decoding game")
    }

    pub fn serialize(&self) -> anyhow::Result<Vec<u8>> {
        bcs::to_bytes(self).context("encoding game")
    }

    pub fn tile(&self, at: Point) -> Tile {
        self.tiles[at.row][at.col]
    }

    /// Lets the agent pick a move and plays it.
    ///
    /// Returns `None` once the game is over or the agent has no cell left to try.
    pub fn play_turn<R: Rng + ?Sized>(&mut self, rng: &mut R) -> anyhow::Result<Option<Turn>> {
        if self.game_state != GameState::Playing {
            return Ok(None);
        }

        let (point, kind) = match self.agent.make_safe_move() {
            Some(point) => (point, MoveKind::Inferred),
            None => match self.agent.make_random_move_with(rng) {
                Some(point) => (point, MoveKind::Guess),
                None => return Ok(None),
            },
        };

        match kind {
            MoveKind::Inferred => info!(%point, "safe move"),
            MoveKind::Guess => info!(%point, "no known safe cell, guessing"),
        }

        self.reveal_cell(point)?;
        Ok(Some(Turn {
            point,
            kind,
            state: self.game_state,
        }))
    }

    /// Reveals one cell and hands its count to the agent.
    ///
    /// Returns `false` if the cell was a mine. Revealing a cell that is already
    /// revealed does nothing; a flagged cell is a proven mine and is refused.
    pub fn reveal_cell(&mut self, at: Point) -> anyhow::Result<bool> {
        anyhow::ensure!(
            at.in_bounds(self.board.height(), self.board.width()),
            "cell {at} is outside the board"
        );
        match self.tile(at) {
            Tile::Hidden => {}
            Tile::Revealed(_) => return Ok(true),
            Tile::Flagged => anyhow::bail!("cell {at} is flagged as a mine"),
        }
        if self.game_state != GameState::Playing {
            anyhow::bail!("game_ended");
        }

        if self.board.is_mine(at) {
            warn!(%at, "hit a mine");
            self.game_state = GameState::Lost;
            return Ok(false);
        }

        let count = self.board.nearby_mines(at);
        self.tiles[at.row][at.col] = Tile::Revealed(count);
        self.agent
            .add_knowledge(at, count as usize)
            .with_context(|| format!("agent rejected {at} = {count}"))?;

        self.flag_known_mines();

        if self.check_win_condition() {
            info!(moves = self.agent.moves_made().len(), "board cleared");
            self.game_state = GameState::Won;
        }

        Ok(true)
    }

    /// Flags every cell the agent has proven to be a mine.
    fn flag_known_mines(&mut self) {
        for &mine in self.agent.mines() {
            if self.tiles[mine.row][mine.col] == Tile::Hidden {
                self.tiles[mine.row][mine.col] = Tile::Flagged;
                self.board.flag(mine);
            }
        }
    }

    /// The game is won once every cell that is not a mine has been revealed.
    pub fn check_win_condition(&self) -> bool {
        let revealed = self
            .tiles
            .iter()
            .flatten()
            .filter(|t| matches!(t, Tile::Revealed(_)))
            .count();
        revealed + self.board.mine_count() == self.board.height() * self.board.width()
    }
}
