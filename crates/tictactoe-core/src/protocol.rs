//! JSON wire protocol shared by the server and client crates.
//!
//! Field names follow the shapes the browser frontend renders
//! (`currentPlayer`, `isConnected`, `lastActivity`, ...), so every struct
//! here is camelCase on the wire.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engine::GameSnapshot;
use crate::room::RoomInfo;

/// A player's mark. X always takes the first game's opening move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Marker {
    X,
    O,
}

impl Marker {
    /// The other marker.
    pub fn opposite(self) -> Self {
        match self {
            Marker::X => Marker::O,
            Marker::O => Marker::X,
        }
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Marker::X => "X",
            Marker::O => "O",
        })
    }
}

/// Machine-readable error codes carried in the failure envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    RoomNotFound,
    RoomFull,
    NotInRoom,
    NotYourTurn,
    InvalidInput,
    NotFound,
    StorageError,
}

/// Failure envelope: every 4xx/5xx response uses this shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: ErrorCode,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveRequest {
    pub position: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JoinRequest {
    #[serde(default)]
    pub name: Option<String>,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomResponse {
    pub success: bool,
    pub room_id: String,
    pub join_url: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomResponse {
    pub success: bool,
    pub room: RoomInfo,
    pub game_state: GameSnapshot,
}

/// Poll payload: `timestamp` is the server clock in unix milliseconds and is
/// strictly compared by clients to drop out-of-order responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateResponse {
    pub success: bool,
    pub state: GameSnapshot,
    pub room: RoomInfo,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinResponse {
    pub success: bool,
    pub message: String,
    pub marker: Marker,
    pub room: RoomInfo,
    pub game_state: GameSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveResponse {
    pub success: bool,
    pub message: String,
    pub state: GameSnapshot,
    pub room: Option<RoomInfo>,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetResponse {
    pub success: bool,
    pub message: String,
    pub both_voted: bool,
    pub state: GameSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveResponse {
    pub success: bool,
    pub message: String,
}

/// Derived registry counters. `active` counts rooms currently playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    pub total: usize,
    pub active: usize,
    pub waiting: usize,
    pub finished: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub success: bool,
    pub stats: RegistryStats,
}

/// Solo (same-device) game state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameStateResponse {
    pub success: bool,
    pub state: GameSnapshot,
}

/// Solo move/reset outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameMoveResponse {
    pub success: bool,
    pub message: String,
    pub state: GameSnapshot,
}
