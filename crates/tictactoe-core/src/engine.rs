//! Single-game rules: turn-taking, win/draw detection, move validation.
//!
//! The engine never raises for business outcomes: a rejected move is
//! reported in the returned [`MoveReport`], which always carries the full
//! post-call [`GameSnapshot`] so callers can render the latest truth either
//! way.

use serde::{Deserialize, Serialize};

use crate::board::{Board, BoardError, CELL_COUNT};
use crate::protocol::Marker;

/// The 8 winning lines, scanned in fixed order: rows top-to-bottom, then
/// columns left-to-right, then the diagonal and anti-diagonal.
pub const WIN_LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// Lifecycle of a single game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Playing,
    Won,
    Draw,
}

/// Who is submitting a move.
///
/// `Anonymous` is the trusted internal mode (local play, restore tooling)
/// and skips the turn check; `Seated` attributes the move to a seat and is
/// rejected when that seat's marker is not on turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    Anonymous,
    Seated { player_id: String, marker: Marker },
}

/// Why a move was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveRejection {
    GameOver,
    NotYourTurn,
    CellOccupied,
}

/// Outcome of [`GameEngine::apply_move`]. `state` is the full current
/// snapshot regardless of `success`.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveReport {
    pub success: bool,
    pub message: String,
    pub rejection: Option<MoveRejection>,
    pub state: GameSnapshot,
}

/// Serializable view of a game, in the wire shape the frontend renders
/// (`board`, `currentPlayer`, `state`, `winner`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub board: [Option<Marker>; CELL_COUNT],
    pub current_player: Marker,
    #[serde(rename = "state")]
    pub status: GameStatus,
    pub winner: Option<Marker>,
}

impl GameSnapshot {
    /// An untouched game: empty board, X to move.
    pub fn initial() -> Self {
        Self {
            board: [None; CELL_COUNT],
            current_player: Marker::X,
            status: GameStatus::Playing,
            winner: None,
        }
    }
}

/// One game instance. Mutated only through [`apply_move`](Self::apply_move),
/// [`reset`](Self::reset) and [`restore`](Self::restore).
#[derive(Debug, Clone, PartialEq)]
pub struct GameEngine {
    board: Board,
    current_player: Marker,
    status: GameStatus,
    winner: Option<Marker>,
}

impl Default for GameEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl GameEngine {
    /// A fresh game with X to move.
    pub fn new() -> Self {
        Self {
            board: Board::new(),
            current_player: Marker::X,
            status: GameStatus::Playing,
            winner: None,
        }
    }

    /// Apply a move at `position` for `actor`.
    ///
    /// The rejection ladder is checked in order: game over, turn ownership
    /// (seated actors only), cell occupancy. Out-of-range positions are a
    /// hard error, not a rejection.
    pub fn apply_move(&mut self, position: usize, actor: Actor) -> Result<MoveReport, BoardError> {
        if self.status != GameStatus::Playing {
            return Ok(self.rejected(MoveRejection::GameOver, "Game is already over"));
        }

        if let Actor::Seated { marker, .. } = &actor
            && *marker != self.current_player
        {
            return Ok(self.rejected(MoveRejection::NotYourTurn, "Not your turn"));
        }

        if !self.board.set(position, self.current_player)? {
            return Ok(self.rejected(MoveRejection::CellOccupied, "Cell is already occupied"));
        }

        if let Some(winner) = self.find_winner() {
            self.status = GameStatus::Won;
            self.winner = Some(winner);
            return Ok(self.accepted(format!("Player {winner} wins!")));
        }

        if self.board.is_full() {
            self.status = GameStatus::Draw;
            return Ok(self.accepted("Game is a draw".to_string()));
        }

        self.current_player = self.current_player.opposite();
        Ok(self.accepted(format!("Player {}'s turn", self.current_player)))
    }

    /// Whether the seat holding `marker` may move right now.
    pub fn can_player_move(&self, marker: Marker) -> bool {
        self.status == GameStatus::Playing && self.current_player == marker
    }

    /// Start over: empty board, `starting_marker` to move.
    pub fn reset(&mut self, starting_marker: Marker) {
        self.board.reset();
        self.current_player = starting_marker;
        self.status = GameStatus::Playing;
        self.winner = None;
    }

    /// Rehydrate from a persisted snapshot verbatim, without re-validating
    /// game legality; the snapshot is trusted.
    pub fn restore(&mut self, snapshot: &GameSnapshot) {
        self.board = Board::from_cells(snapshot.board);
        self.current_player = snapshot.current_player;
        self.status = snapshot.status;
        self.winner = snapshot.winner;
    }

    /// Full current state in wire shape.
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            board: *self.board.cells(),
            current_player: self.current_player,
            status: self.status,
            winner: self.winner,
        }
    }

    pub fn current_player(&self) -> Marker {
        self.current_player
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn winner(&self) -> Option<Marker> {
        self.winner
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Scan the win lines in fixed order for three identical markers.
    /// A move sets exactly one cell, so two lines can never disagree on the
    /// winner within one call.
    fn find_winner(&self) -> Option<Marker> {
        let cells = self.board.cells();
        WIN_LINES.iter().find_map(|&[a, b, c]| match (cells[a], cells[b], cells[c]) {
            (Some(first), Some(second), Some(third)) if first == second && second == third => {
                Some(first)
            }
            _ => None,
        })
    }

    fn accepted(&self, message: String) -> MoveReport {
        MoveReport {
            success: true,
            message,
            rejection: None,
            state: self.snapshot(),
        }
    }

    fn rejected(&self, rejection: MoveRejection, message: &str) -> MoveReport {
        MoveReport {
            success: false,
            message: message.to_string(),
            rejection: Some(rejection),
            state: self.snapshot(),
        }
    }
}
