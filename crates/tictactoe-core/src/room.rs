//! A room: one game, two seats, rematch voting, and activity tracking.
//!
//! Rooms are the unit of persistence: [`Room::to_snapshot`] /
//! [`Room::from_snapshot`] round-trip every field losslessly so the server
//! can reload the full registry between requests.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::board::BoardError;
use crate::engine::{Actor, GameEngine, GameSnapshot, GameStatus, MoveReport};
use crate::protocol::Marker;

/// How long a seat stays `connected` after its last poll, in milliseconds.
/// Clients poll every 1.5 s, so a couple of missed polls flips the flag.
pub const PRESENCE_WINDOW_MS: i64 = 10_000;

/// Errors from room-level operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RoomError {
    /// Both seats are taken.
    #[error("room is full")]
    RoomFull,
    /// The acting player holds no seat in this room.
    #[error("player is not in this room")]
    NotInRoom,
    #[error(transparent)]
    Board(#[from] BoardError),
}

/// Room lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Waiting,
    Playing,
    Finished,
}

/// One seat in a room. Timestamps are unix milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSlot {
    pub player_id: String,
    pub name: String,
    pub marker: Marker,
    #[serde(rename = "isConnected")]
    pub connected: bool,
    pub joined_at: i64,
    pub last_seen: i64,
}

impl PlayerSlot {
    pub fn new(player_id: &str, name: &str, marker: Marker, now: i64) -> Self {
        Self {
            player_id: player_id.to_string(),
            name: name.to_string(),
            marker,
            connected: true,
            joined_at: now,
            last_seen: now,
        }
    }

    /// Record a connectivity signal from this seat's player.
    pub fn mark_seen(&mut self, now: i64) {
        self.last_seen = now;
        self.connected = true;
    }
}

/// Public view of a room (no board; pair it with a [`GameSnapshot`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfo {
    pub room_id: String,
    pub status: RoomStatus,
    pub player_x: Option<PlayerSlot>,
    pub player_o: Option<PlayerSlot>,
    pub created_at: i64,
    #[serde(rename = "lastActivity")]
    pub last_activity: i64,
}

/// Persisted form of a [`Room`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub room_id: String,
    pub game_state: GameSnapshot,
    pub player_x: Option<PlayerSlot>,
    pub player_o: Option<PlayerSlot>,
    pub status: RoomStatus,
    pub created_at: i64,
    #[serde(rename = "lastActivity")]
    pub last_activity: i64,
    pub next_starter: Marker,
    #[serde(default)]
    pub rematch_votes: Vec<String>,
}

/// Outcome of a rematch vote.
#[derive(Debug, Clone, PartialEq)]
pub struct RematchReport {
    /// `true` when this vote completed the pair and the game was reset.
    pub both_voted: bool,
    pub message: String,
    pub state: GameSnapshot,
}

/// A game room: one [`GameEngine`], at most one seat per marker.
#[derive(Debug, Clone, PartialEq)]
pub struct Room {
    room_id: String,
    game: GameEngine,
    slot_x: Option<PlayerSlot>,
    slot_o: Option<PlayerSlot>,
    status: RoomStatus,
    created_at: i64,
    last_activity_at: i64,
    /// Starter of the *next* rematch; the first game always opens with X.
    next_starter: Marker,
    /// Player ids that voted for a rematch of the current game instance.
    rematch_votes: Vec<String>,
}

impl Room {
    pub fn new(room_id: String, now: i64) -> Self {
        Self {
            room_id,
            game: GameEngine::new(),
            slot_x: None,
            slot_o: None,
            status: RoomStatus::Waiting,
            created_at: now,
            last_activity_at: now,
            next_starter: Marker::O,
            rematch_votes: Vec::new(),
        }
    }

    /// Seat a player: X first, then O.
    ///
    /// Re-joining with an id that already holds a seat is idempotent: the
    /// existing marker is returned and the display name refreshed. When the
    /// second seat fills, a waiting room starts playing.
    pub fn add_player(&mut self, player_id: &str, name: &str, now: i64) -> Result<Marker, RoomError> {
        self.touch(now);

        if let Some(marker) = self.marker_of(player_id) {
            if let Some(slot) = self.slot_mut(marker) {
                slot.name = name.to_string();
                slot.mark_seen(now);
            }
            return Ok(marker);
        }

        if self.slot_x.is_none() {
            self.slot_x = Some(PlayerSlot::new(player_id, name, Marker::X, now));
            return Ok(Marker::X);
        }

        if self.slot_o.is_none() {
            self.slot_o = Some(PlayerSlot::new(player_id, name, Marker::O, now));
            if self.status == RoomStatus::Waiting {
                self.status = RoomStatus::Playing;
            }
            return Ok(Marker::O);
        }

        Err(RoomError::RoomFull)
    }

    pub fn has_player(&self, player_id: &str) -> bool {
        self.marker_of(player_id).is_some()
    }

    /// The marker held by `player_id`, if seated.
    pub fn marker_of(&self, player_id: &str) -> Option<Marker> {
        if self.slot_x.as_ref().is_some_and(|s| s.player_id == player_id) {
            return Some(Marker::X);
        }
        if self.slot_o.as_ref().is_some_and(|s| s.player_id == player_id) {
            return Some(Marker::O);
        }
        None
    }

    /// Cheap pre-check: membership plus turn ownership.
    ///
    /// `position` is accepted for call-site symmetry with
    /// [`apply_move`](Self::apply_move) but occupancy is deliberately left
    /// to the move application itself, which is the authoritative check.
    pub fn can_player_move(&self, player_id: &str, _position: usize) -> bool {
        self.marker_of(player_id)
            .is_some_and(|marker| self.game.can_player_move(marker))
    }

    /// Apply a move on behalf of `player_id`.
    ///
    /// A terminal game outcome finishes the room. Activity is touched on
    /// every attempt, accepted or not.
    pub fn apply_move(
        &mut self,
        player_id: &str,
        position: usize,
        now: i64,
    ) -> Result<MoveReport, RoomError> {
        let marker = self.marker_of(player_id).ok_or(RoomError::NotInRoom)?;
        self.touch(now);

        let report = self.game.apply_move(
            position,
            Actor::Seated {
                player_id: player_id.to_string(),
                marker,
            },
        )?;

        if self.game.status() != GameStatus::Playing {
            self.status = RoomStatus::Finished;
        }

        Ok(report)
    }

    /// Record a one-shot rematch vote for the current game instance.
    ///
    /// When both seated players have voted, the game resets with the
    /// alternating starter and the room goes back to playing.
    pub fn vote_rematch(&mut self, player_id: &str, now: i64) -> Result<RematchReport, RoomError> {
        if !self.has_player(player_id) {
            return Err(RoomError::NotInRoom);
        }
        self.touch(now);

        if !self.rematch_votes.iter().any(|id| id == player_id) {
            self.rematch_votes.push(player_id.to_string());
        }

        let both_voted = match (&self.slot_x, &self.slot_o) {
            (Some(x), Some(o)) => {
                self.rematch_votes.iter().any(|id| *id == x.player_id)
                    && self.rematch_votes.iter().any(|id| *id == o.player_id)
            }
            _ => false,
        };

        if !both_voted {
            return Ok(RematchReport {
                both_voted: false,
                message: "Waiting for other player to vote for rematch".to_string(),
                state: self.game.snapshot(),
            });
        }

        let starter = self.next_starter;
        self.game.reset(starter);
        self.next_starter = starter.opposite();
        self.status = RoomStatus::Playing;
        self.rematch_votes.clear();

        Ok(RematchReport {
            both_voted: true,
            message: "Game reset successfully".to_string(),
            state: self.game.snapshot(),
        })
    }

    /// A player walked away: the room finishes and their seat is flagged
    /// disconnected. Seats are never vacated for reuse.
    pub fn leave(&mut self, player_id: &str, now: i64) {
        self.touch(now);
        if let Some(marker) = self.marker_of(player_id)
            && let Some(slot) = self.slot_mut(marker)
        {
            slot.connected = false;
        }
        self.status = RoomStatus::Finished;
    }

    /// Connectivity signal from a seated player (driven by the poll
    /// endpoint). Does not count as room activity.
    pub fn note_seen(&mut self, player_id: &str, now: i64) {
        if let Some(marker) = self.marker_of(player_id)
            && let Some(slot) = self.slot_mut(marker)
        {
            slot.mark_seen(now);
        }
    }

    /// Decay `connected` flags for seats not seen within the presence
    /// window.
    pub fn refresh_presence(&mut self, now: i64) {
        for slot in [self.slot_x.as_mut(), self.slot_o.as_mut()].into_iter().flatten() {
            slot.connected = now - slot.last_seen <= PRESENCE_WINDOW_MS;
        }
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn status(&self) -> RoomStatus {
        self.status
    }

    pub fn game(&self) -> &GameEngine {
        &self.game
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub fn last_activity_at(&self) -> i64 {
        self.last_activity_at
    }

    pub fn next_starter(&self) -> Marker {
        self.next_starter
    }

    pub fn slot(&self, marker: Marker) -> Option<&PlayerSlot> {
        match marker {
            Marker::X => self.slot_x.as_ref(),
            Marker::O => self.slot_o.as_ref(),
        }
    }

    /// Public view for API responses.
    pub fn info(&self) -> RoomInfo {
        RoomInfo {
            room_id: self.room_id.clone(),
            status: self.status,
            player_x: self.slot_x.clone(),
            player_o: self.slot_o.clone(),
            created_at: self.created_at,
            last_activity: self.last_activity_at,
        }
    }

    pub fn to_snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            room_id: self.room_id.clone(),
            game_state: self.game.snapshot(),
            player_x: self.slot_x.clone(),
            player_o: self.slot_o.clone(),
            status: self.status,
            created_at: self.created_at,
            last_activity: self.last_activity_at,
            next_starter: self.next_starter,
            rematch_votes: self.rematch_votes.clone(),
        }
    }

    pub fn from_snapshot(snapshot: RoomSnapshot) -> Self {
        let mut game = GameEngine::new();
        game.restore(&snapshot.game_state);
        Self {
            room_id: snapshot.room_id,
            game,
            slot_x: snapshot.player_x,
            slot_o: snapshot.player_o,
            status: snapshot.status,
            created_at: snapshot.created_at,
            last_activity_at: snapshot.last_activity,
            next_starter: snapshot.next_starter,
            rematch_votes: snapshot.rematch_votes,
        }
    }

    fn touch(&mut self, now: i64) {
        self.last_activity_at = now;
    }

    fn slot_mut(&mut self, marker: Marker) -> Option<&mut PlayerSlot> {
        match marker {
            Marker::X => self.slot_x.as_mut(),
            Marker::O => self.slot_o.as_mut(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000_000;

    fn full_room() -> Room {
        let mut room = Room::new("room-abc123".to_string(), NOW);
        room.add_player("alice", "Alice", NOW).unwrap();
        room.add_player("bob", "Bob", NOW + 1_000).unwrap();
        room
    }

    #[test]
    fn first_joiner_is_x_second_is_o() {
        let mut room = Room::new("room-abc123".to_string(), NOW);
        assert_eq!(room.status(), RoomStatus::Waiting);

        assert_eq!(room.add_player("alice", "Alice", NOW), Ok(Marker::X));
        assert_eq!(room.status(), RoomStatus::Waiting);

        assert_eq!(room.add_player("bob", "Bob", NOW), Ok(Marker::O));
        assert_eq!(room.status(), RoomStatus::Playing);

        assert_eq!(
            room.add_player("carol", "Carol", NOW),
            Err(RoomError::RoomFull)
        );
    }

    #[test]
    fn rejoin_is_idempotent() {
        let mut room = full_room();
        assert_eq!(room.add_player("alice", "Alice A.", NOW + 5_000), Ok(Marker::X));
        let slot = room.slot(Marker::X).unwrap();
        assert_eq!(slot.name, "Alice A.");
        assert_eq!(slot.last_seen, NOW + 5_000);
        // The O seat is untouched, so the room is still just the two of them.
        assert_eq!(room.slot(Marker::O).unwrap().player_id, "bob");
    }

    #[test]
    fn lookups() {
        let room = full_room();
        assert!(room.has_player("alice"));
        assert!(!room.has_player("carol"));
        assert_eq!(room.marker_of("bob"), Some(Marker::O));
        assert_eq!(room.marker_of("carol"), None);
    }

    #[test]
    fn turn_enforcement_leaves_board_unchanged() {
        let mut room = full_room();
        // X (alice) is on turn; bob's move is rejected by the engine.
        let report = room.apply_move("bob", 0, NOW + 2_000).unwrap();
        assert!(!report.success);
        assert!(report.state.board.iter().all(Option::is_none));
        assert_eq!(room.last_activity_at(), NOW + 2_000);

        let report = room.apply_move("alice", 0, NOW + 3_000).unwrap();
        assert!(report.success);
        assert_eq!(report.state.board[0], Some(Marker::X));
        assert_eq!(report.state.current_player, Marker::O);
    }

    #[test]
    fn stranger_cannot_move() {
        let mut room = full_room();
        assert_eq!(
            room.apply_move("carol", 0, NOW),
            Err(RoomError::NotInRoom)
        );
        assert!(!room.can_player_move("carol", 0));
        assert!(room.can_player_move("alice", 0));
        assert!(!room.can_player_move("bob", 0));
    }

    #[test]
    fn terminal_game_finishes_room() {
        let mut room = full_room();
        // X takes the top row.
        for (player, pos) in [("alice", 0), ("bob", 3), ("alice", 1), ("bob", 4)] {
            assert!(room.apply_move(player, pos, NOW).unwrap().success);
        }
        let report = room.apply_move("alice", 2, NOW).unwrap();
        assert!(report.success);
        assert_eq!(report.state.status, GameStatus::Won);
        assert_eq!(room.status(), RoomStatus::Finished);
    }

    #[test]
    fn rematch_needs_both_votes_and_alternates_starter() {
        let mut room = full_room();
        room.apply_move("alice", 0, NOW).unwrap();

        let report = room.vote_rematch("alice", NOW).unwrap();
        assert!(!report.both_voted);
        // Board untouched by a lone vote.
        assert_eq!(report.state.board[0], Some(Marker::X));

        // A duplicate vote from the same player changes nothing.
        let report = room.vote_rematch("alice", NOW).unwrap();
        assert!(!report.both_voted);

        let report = room.vote_rematch("bob", NOW).unwrap();
        assert!(report.both_voted);
        assert!(report.state.board.iter().all(Option::is_none));
        assert_eq!(report.state.status, GameStatus::Playing);
        // First game opened with X, so the rematch opens with O.
        assert_eq!(report.state.current_player, Marker::O);
        assert_eq!(room.status(), RoomStatus::Playing);
        assert_eq!(room.next_starter(), Marker::X);
    }

    #[test]
    fn rematch_votes_reset_each_game() {
        let mut room = full_room();
        room.vote_rematch("alice", NOW).unwrap();
        let report = room.vote_rematch("bob", NOW).unwrap();
        assert!(report.both_voted);

        // Fresh game instance: a single vote is not enough again.
        let report = room.vote_rematch("bob", NOW).unwrap();
        assert!(!report.both_voted);
        let report = room.vote_rematch("alice", NOW).unwrap();
        assert!(report.both_voted);
        // Starter alternates again, back to X.
        assert_eq!(report.state.current_player, Marker::X);
    }

    #[test]
    fn rematch_vote_from_stranger_is_rejected() {
        let mut room = full_room();
        assert_eq!(room.vote_rematch("carol", NOW), Err(RoomError::NotInRoom));
    }

    #[test]
    fn lone_player_vote_cannot_reset() {
        let mut room = Room::new("room-abc123".to_string(), NOW);
        room.add_player("alice", "Alice", NOW).unwrap();
        let report = room.vote_rematch("alice", NOW).unwrap();
        assert!(!report.both_voted);
    }

    #[test]
    fn leave_finishes_room_and_flags_seat() {
        let mut room = full_room();
        room.leave("bob", NOW + 2_000);
        assert_eq!(room.status(), RoomStatus::Finished);
        assert!(!room.slot(Marker::O).unwrap().connected);
        assert!(room.slot(Marker::X).unwrap().connected);
        // Seats are not vacated.
        assert_eq!(room.marker_of("bob"), Some(Marker::O));
    }

    #[test]
    fn presence_decays_after_window() {
        let mut room = full_room();
        room.note_seen("alice", NOW + 2_000);
        room.refresh_presence(NOW + 2_000 + PRESENCE_WINDOW_MS + 1);
        assert!(!room.slot(Marker::X).unwrap().connected);

        room.note_seen("alice", NOW + 20_000);
        room.refresh_presence(NOW + 21_000);
        assert!(room.slot(Marker::X).unwrap().connected);
    }

    #[test]
    fn poll_presence_does_not_count_as_activity() {
        let mut room = full_room();
        let activity = room.last_activity_at();
        room.note_seen("alice", NOW + 60_000);
        assert_eq!(room.last_activity_at(), activity);
    }

    #[test]
    fn snapshot_round_trip() {
        let mut room = full_room();
        room.apply_move("alice", 4, NOW + 2_000).unwrap();
        room.vote_rematch("alice", NOW + 3_000).unwrap();

        let snapshot = room.to_snapshot();
        let restored = Room::from_snapshot(snapshot.clone());

        assert_eq!(restored, room);
        assert_eq!(restored.to_snapshot(), snapshot);
    }

    #[test]
    fn snapshot_wire_names() {
        let room = full_room();
        let json = serde_json::to_value(room.to_snapshot()).unwrap();
        assert_eq!(json["roomId"], "room-abc123");
        assert_eq!(json["lastActivity"], NOW + 1_000);
        assert_eq!(json["playerX"]["playerId"], "alice");
        assert_eq!(json["playerX"]["isConnected"], true);
        assert_eq!(json["nextStarter"], "O");
    }
}
