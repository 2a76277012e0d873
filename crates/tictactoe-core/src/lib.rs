//! Core tic-tac-toe domain logic shared by the server and client crates:
//! the board, the game engine, room/seat state, and the JSON wire protocol.

pub mod board;
pub mod engine;
pub mod protocol;
pub mod room;
