//! Client-side state for the tic-tac-toe app: a typed HTTP API client and
//! the polling controller that reconciles local state with the
//! server-authoritative room.

pub mod api;
pub mod sync;
