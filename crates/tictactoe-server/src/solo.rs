//! Solo (same-device) game endpoints.
//!
//! A strict subset of the room flow: one persisted [`GameSnapshot`] per
//! caller id, no seats, no turn attribution. Moves are applied with
//! [`Actor::Anonymous`] so both local players share one browser.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use tictactoe_core::board::CELL_COUNT;
use tictactoe_core::engine::{Actor, GameEngine, GameSnapshot};
use tictactoe_core::protocol::{GameMoveResponse, GameStateResponse, Marker, MoveRequest};

use crate::api::{ApiFailure, AppState, Caller, respond};
use crate::store::{SnapshotStore, StoreError};

pub(crate) async fn game_state(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiFailure> {
    let caller = Caller::ensure(&headers);
    let engine = load_engine(state.solo.as_ref(), &caller.id);
    let body = GameStateResponse {
        success: true,
        state: engine.snapshot(),
    };
    Ok(respond(StatusCode::OK, &caller, Json(body)))
}

pub(crate) async fn game_move(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<MoveRequest>, JsonRejection>,
) -> Result<Response, ApiFailure> {
    let Ok(Json(MoveRequest { position })) = payload else {
        return Err(ApiFailure::invalid_input(
            "Position is required and must be an integer",
        ));
    };
    if !(0..CELL_COUNT as i64).contains(&position) {
        return Err(ApiFailure::invalid_input("Position must be between 0 and 8"));
    }

    let caller = Caller::ensure(&headers);
    let mut engine = load_engine(state.solo.as_ref(), &caller.id);
    let report = engine
        .apply_move(position as usize, Actor::Anonymous)
        .map_err(|_| ApiFailure::invalid_input("Position must be between 0 and 8"))?;
    save_engine(state.solo.as_ref(), &caller.id, &engine)?;

    let body = GameMoveResponse {
        success: report.success,
        message: report.message,
        state: report.state,
    };
    Ok(respond(StatusCode::OK, &caller, Json(body)))
}

pub(crate) async fn game_reset(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiFailure> {
    let caller = Caller::ensure(&headers);
    let mut engine = load_engine(state.solo.as_ref(), &caller.id);
    engine.reset(Marker::X);
    save_engine(state.solo.as_ref(), &caller.id, &engine)?;

    let body = GameMoveResponse {
        success: true,
        message: "Game reset successfully".to_string(),
        state: engine.snapshot(),
    };
    Ok(respond(StatusCode::OK, &caller, Json(body)))
}

/// Load the caller's game, falling back to a fresh one when the record is
/// missing or does not deserialize.
fn load_engine(store: &dyn SnapshotStore, player_id: &str) -> GameEngine {
    let records = match store.load_all() {
        Ok(records) => records,
        Err(err) => {
            tracing::warn!(error = %err, "solo store unreadable, starting fresh");
            return GameEngine::new();
        }
    };
    let mut engine = GameEngine::new();
    if let Some(value) = records.get(player_id)
        && let Ok(snapshot) = serde_json::from_value::<GameSnapshot>(value.clone())
    {
        engine.restore(&snapshot);
    }
    engine
}

fn save_engine(
    store: &dyn SnapshotStore,
    player_id: &str,
    engine: &GameEngine,
) -> Result<(), StoreError> {
    let mut records = store.load_all().unwrap_or_default();
    records.insert(player_id.to_string(), serde_json::to_value(engine.snapshot())?);
    store.save_all(&records)
}
