//! The room registry: owns every room for one request cycle.
//!
//! Loaded from a [`SnapshotStore`] at the start of a request and flushed
//! after each mutation, making the store the synchronization point across
//! concurrent requests. Loading is fail-soft: a record that does not
//! deserialize is skipped with a warning, never fatal to startup.

use std::collections::HashMap;

use tictactoe_core::protocol::RegistryStats;
use tictactoe_core::room::{Room, RoomSnapshot, RoomStatus};

use crate::store::{SnapshotStore, StoreError};

/// Finished rooms serve no purpose once the rematch window has passed.
const FINISHED_ROOM_TTL_MS: i64 = 5 * 60 * 1_000;

/// Waiting/playing rooms tolerate slow human players.
const ACTIVE_ROOM_TTL_MS: i64 = 60 * 60 * 1_000;

/// All known rooms, keyed by room id.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: HashMap<String, Room>,
}

impl RoomRegistry {
    /// Load the registry from the store.
    ///
    /// An unreadable store yields an empty registry; individually corrupt
    /// records are dropped. Either way the process keeps serving.
    pub fn load(store: &dyn SnapshotStore) -> Self {
        let records = match store.load_all() {
            Ok(records) => records,
            Err(err) => {
                tracing::warn!(error = %err, "room store unreadable, starting empty");
                return Self::default();
            }
        };

        let mut rooms = HashMap::new();
        for (room_id, value) in records {
            match serde_json::from_value::<RoomSnapshot>(value) {
                Ok(snapshot) => {
                    rooms.insert(room_id, Room::from_snapshot(snapshot));
                }
                Err(err) => {
                    tracing::warn!(room = %room_id, error = %err, "skipping corrupt room snapshot");
                }
            }
        }
        Self { rooms }
    }

    /// Create a room under a fresh collision-checked identifier.
    pub fn create(&mut self, now: i64) -> &mut Room {
        let mut room_id = generate_room_id();
        while self.rooms.contains_key(&room_id) {
            room_id = generate_room_id();
        }
        self.rooms
            .entry(room_id)
            .or_insert_with_key(|id| Room::new(id.clone(), now))
    }

    pub fn get(&self, room_id: &str) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    pub fn get_mut(&mut self, room_id: &str) -> Option<&mut Room> {
        self.rooms.get_mut(room_id)
    }

    /// Flush every room to the store (coarse-grained contract: full load,
    /// full save).
    pub fn save(&self, store: &dyn SnapshotStore) -> Result<(), StoreError> {
        let mut records = HashMap::with_capacity(self.rooms.len());
        for (room_id, room) in &self.rooms {
            records.insert(room_id.clone(), serde_json::to_value(room.to_snapshot())?);
        }
        store.save_all(&records)
    }

    /// Remove a room. Idempotent: `false` when it was already gone.
    pub fn delete(&mut self, room_id: &str) -> bool {
        self.rooms.remove(room_id).is_some()
    }

    /// Evict rooms whose inactivity exceeds the status-dependent threshold:
    /// minutes for finished rooms, an hour for waiting/playing ones.
    /// Returns the number of rooms removed.
    pub fn expire_inactive(&mut self, now: i64) -> usize {
        let before = self.rooms.len();
        self.rooms.retain(|room_id, room| {
            let ttl = match room.status() {
                RoomStatus::Finished => FINISHED_ROOM_TTL_MS,
                RoomStatus::Waiting | RoomStatus::Playing => ACTIVE_ROOM_TTL_MS,
            };
            let keep = now - room.last_activity_at() <= ttl;
            if !keep {
                tracing::info!(room = %room_id, status = ?room.status(), "expiring inactive room");
            }
            keep
        });
        before - self.rooms.len()
    }

    /// Derived counters over the in-memory map.
    pub fn stats(&self) -> RegistryStats {
        let count = |status: RoomStatus| {
            self.rooms.values().filter(|room| room.status() == status).count()
        };
        RegistryStats {
            total: self.rooms.len(),
            active: count(RoomStatus::Playing),
            waiting: count(RoomStatus::Waiting),
            finished: count(RoomStatus::Finished),
        }
    }
}

/// `room-` plus six random lowercase hex characters: collision probability
/// is negligible for the expected room count, and [`RoomRegistry::create`]
/// regenerates on a hit anyway.
fn generate_room_id() -> String {
    use rand::RngExt;
    let mut rng = rand::rng();
    let bytes: [u8; 3] = rng.random();
    let suffix: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!("room-{suffix}")
}
