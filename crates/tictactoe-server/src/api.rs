//! JSON HTTP API.
//!
//! # Routes
//!
//! | Method | Path                    | Description                           |
//! |--------|-------------------------|---------------------------------------|
//! | `GET`  | `/api/health`           | Liveness probe                        |
//! | `POST` | `/api/rooms`            | Create a room, seating the caller as X|
//! | `GET`  | `/api/rooms/stats`      | Registry counters                     |
//! | `GET`  | `/api/rooms/{id}`       | Room info plus game state             |
//! | `GET`  | `/api/rooms/{id}/state` | Poll endpoint (refreshes presence)    |
//! | `POST` | `/api/rooms/{id}/join`  | Take the free seat                    |
//! | `POST` | `/api/rooms/{id}/move`  | Submit a move                         |
//! | `POST` | `/api/rooms/{id}/reset` | Vote for a rematch                    |
//! | `POST` | `/api/rooms/{id}/leave` | Walk away (finishes the room)         |
//! | `GET`  | `/api/game`             | Solo game state                       |
//! | `POST` | `/api/game/move`        | Solo move                             |
//! | `POST` | `/api/game/reset`       | Solo reset                            |
//!
//! Callers are identified by an opaque `X-Player-Id` header with a
//! `player_id` cookie fallback; an unidentified caller on a seat-taking
//! endpoint gets an id minted server-side and returned via `Set-Cookie`.
//! Every error is `{success:false, error:<CODE>, message}` with a 4xx/5xx
//! status; occupied-cell and game-over move rejections are ordinary
//! `success:false` payloads carrying the authoritative state.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get, post};
use axum::{Json, Router};

use tictactoe_core::board::CELL_COUNT;
use tictactoe_core::engine::MoveRejection;
use tictactoe_core::protocol::{
    CreateRoomResponse, ErrorBody, ErrorCode, HealthResponse, JoinRequest, JoinResponse,
    LeaveResponse, MoveRequest, MoveResponse, ResetResponse, RoomResponse, StateResponse,
    StatsResponse,
};
use tictactoe_core::room::RoomError;

use crate::registry::RoomRegistry;
use crate::solo;
use crate::store::{SnapshotStore, StoreError};

/// Shared application state: the two snapshot stores. No room state lives in
/// process memory between requests.
#[derive(Clone)]
pub struct AppState {
    pub rooms: Arc<dyn SnapshotStore>,
    pub solo: Arc<dyn SnapshotStore>,
}

impl AppState {
    pub fn new(rooms: Arc<dyn SnapshotStore>, solo: Arc<dyn SnapshotStore>) -> Self {
        Self { rooms, solo }
    }
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/rooms", post(create_room))
        .route("/api/rooms/stats", get(room_stats))
        .route("/api/rooms/{id}", get(get_room))
        .route("/api/rooms/{id}/state", get(room_state))
        .route("/api/rooms/{id}/join", post(join_room))
        .route("/api/rooms/{id}/move", post(room_move))
        .route("/api/rooms/{id}/reset", post(room_reset))
        .route("/api/rooms/{id}/leave", post(room_leave))
        .route("/api/game", get(solo::game_state))
        .route("/api/game/move", post(solo::game_move))
        .route("/api/game/reset", post(solo::game_reset))
        // Unknown API paths get the JSON envelope; everything else is left
        // for the SPA fallback the binary attaches.
        .route("/api", any(endpoint_not_found))
        .route("/api/{*rest}", any(endpoint_not_found))
        .with_state(state)
}

/// Current unix time in milliseconds, the timestamp clients compare.
pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// ---------------------------------------------------------------------------
// Failure envelope
// ---------------------------------------------------------------------------

/// A failed request: status code plus machine-readable error envelope.
#[derive(Debug)]
pub struct ApiFailure {
    status: StatusCode,
    code: ErrorCode,
    message: String,
}

impl ApiFailure {
    pub fn room_not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: ErrorCode::RoomNotFound,
            message: "Room not found".to_string(),
        }
    }

    pub fn room_full() -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            code: ErrorCode::RoomFull,
            message: "Room is full".to_string(),
        }
    }

    pub fn not_in_room() -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            code: ErrorCode::NotInRoom,
            message: "You are not a player in this room".to_string(),
        }
    }

    pub fn not_your_turn() -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            code: ErrorCode::NotYourTurn,
            message: "Not your turn".to_string(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: ErrorCode::InvalidInput,
            message: message.into(),
        }
    }

    pub fn endpoint_not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: ErrorCode::NotFound,
            message: "Endpoint not found".to_string(),
        }
    }
}

impl From<StoreError> for ApiFailure {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, "failed to persist room state");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: ErrorCode::StorageError,
            message: "Failed to persist game state".to_string(),
        }
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            error: self.code,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Caller identity
// ---------------------------------------------------------------------------

/// The opaque per-browser player identifier, when the caller sent one.
pub(crate) fn player_id_from(headers: &HeaderMap) -> Option<String> {
    if let Some(id) = headers
        .get("x-player-id")
        .and_then(|value| value.to_str().ok())
        .filter(|id| !id.is_empty())
    {
        return Some(id.to_string());
    }

    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == "player_id" && !value.is_empty()).then(|| value.to_string())
    })
}

/// Caller identity for seat-taking endpoints: minted when absent.
pub(crate) struct Caller {
    pub id: String,
    minted: bool,
}

impl Caller {
    pub fn ensure(headers: &HeaderMap) -> Self {
        match player_id_from(headers) {
            Some(id) => Self { id, minted: false },
            None => Self {
                id: mint_player_id(),
                minted: true,
            },
        }
    }
}

/// Random 32-char hex identifier for a new browser session.
fn mint_player_id() -> String {
    use rand::RngExt;
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Wrap a response, attaching the session cookie when the caller id was
/// minted during this request.
pub(crate) fn respond(status: StatusCode, caller: &Caller, body: impl IntoResponse) -> Response {
    let mut response = (status, body).into_response();
    if caller.minted
        && let Ok(value) =
            HeaderValue::from_str(&format!("player_id={}; Path=/; SameSite=Lax", caller.id))
    {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    response
}

// ---------------------------------------------------------------------------
// Request cycle
// ---------------------------------------------------------------------------

/// Load the registry for this request, opportunistically sweeping expired
/// rooms (persisted immediately so the next request sees the pruned set).
fn open_registry(state: &AppState) -> Result<RoomRegistry, ApiFailure> {
    let mut registry = RoomRegistry::load(state.rooms.as_ref());
    if registry.expire_inactive(now_ms()) > 0 {
        registry.save(state.rooms.as_ref())?;
    }
    Ok(registry)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

async fn endpoint_not_found() -> ApiFailure {
    ApiFailure::endpoint_not_found()
}

async fn create_room(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiFailure> {
    let caller = Caller::ensure(&headers);
    let now = now_ms();
    let mut registry = open_registry(&state)?;

    let room = registry.create(now);
    let room_id = room.room_id().to_string();
    room.add_player(&caller.id, "Guest", now)
        .map_err(|_| ApiFailure::room_full())?;
    registry.save(state.rooms.as_ref())?;

    tracing::info!(room = %room_id, player = %caller.id, "room created");
    let body = CreateRoomResponse {
        success: true,
        room_id: room_id.clone(),
        join_url: format!("/room/{room_id}"),
        message: "Room created successfully".to_string(),
    };
    Ok(respond(StatusCode::CREATED, &caller, Json(body)))
}

async fn get_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Response, ApiFailure> {
    let registry = open_registry(&state)?;
    let room = registry.get(&room_id).ok_or_else(ApiFailure::room_not_found)?;
    let body = RoomResponse {
        success: true,
        room: room.info(),
        game_state: room.game().snapshot(),
    };
    Ok(Json(body).into_response())
}

async fn room_state(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiFailure> {
    let now = now_ms();
    let mut registry = open_registry(&state)?;
    let room = registry
        .get_mut(&room_id)
        .ok_or_else(ApiFailure::room_not_found)?;

    if let Some(player_id) = player_id_from(&headers) {
        room.note_seen(&player_id, now);
    }
    room.refresh_presence(now);

    let body = StateResponse {
        success: true,
        state: room.game().snapshot(),
        room: room.info(),
        timestamp: now,
    };
    registry.save(state.rooms.as_ref())?;
    Ok(Json(body).into_response())
}

async fn join_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiFailure> {
    let caller = Caller::ensure(&headers);
    let name = serde_json::from_slice::<JoinRequest>(&body)
        .ok()
        .and_then(|request| request.name)
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "Guest".to_string());

    let now = now_ms();
    let mut registry = open_registry(&state)?;
    let room = registry
        .get_mut(&room_id)
        .ok_or_else(ApiFailure::room_not_found)?;

    let marker = match room.add_player(&caller.id, &name, now) {
        Ok(marker) => marker,
        Err(RoomError::RoomFull) => return Err(ApiFailure::room_full()),
        Err(RoomError::NotInRoom | RoomError::Board(_)) => return Err(ApiFailure::not_in_room()),
    };

    let body = JoinResponse {
        success: true,
        message: "Joined room successfully".to_string(),
        marker,
        room: room.info(),
        game_state: room.game().snapshot(),
    };
    registry.save(state.rooms.as_ref())?;

    tracing::info!(room = %room_id, player = %caller.id, %marker, "player joined");
    Ok(respond(StatusCode::OK, &caller, Json(body)))
}

async fn room_move(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
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
    let player_id = player_id_from(&headers).ok_or_else(ApiFailure::not_in_room)?;

    let now = now_ms();
    let mut registry = open_registry(&state)?;
    let room = registry
        .get_mut(&room_id)
        .ok_or_else(ApiFailure::room_not_found)?;

    let report = match room.apply_move(&player_id, position as usize, now) {
        Ok(report) => report,
        Err(RoomError::NotInRoom) => return Err(ApiFailure::not_in_room()),
        Err(RoomError::Board(_)) => {
            return Err(ApiFailure::invalid_input("Position must be between 0 and 8"));
        }
        Err(RoomError::RoomFull) => return Err(ApiFailure::room_full()),
    };
    let info = room.info();
    registry.save(state.rooms.as_ref())?;

    if report.rejection == Some(MoveRejection::NotYourTurn) {
        return Err(ApiFailure::not_your_turn());
    }

    tracing::info!(
        room = %room_id,
        player = %player_id,
        position,
        success = report.success,
        "move"
    );
    let body = MoveResponse {
        success: report.success,
        message: report.message,
        state: report.state,
        room: Some(info),
        timestamp: now,
    };
    Ok(Json(body).into_response())
}

async fn room_reset(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiFailure> {
    let player_id = player_id_from(&headers).ok_or_else(ApiFailure::not_in_room)?;

    let now = now_ms();
    let mut registry = open_registry(&state)?;
    let room = registry
        .get_mut(&room_id)
        .ok_or_else(ApiFailure::room_not_found)?;

    let report = match room.vote_rematch(&player_id, now) {
        Ok(report) => report,
        Err(_) => return Err(ApiFailure::not_in_room()),
    };
    registry.save(state.rooms.as_ref())?;

    if report.both_voted {
        tracing::info!(room = %room_id, "rematch started");
    }
    let body = ResetResponse {
        success: true,
        message: report.message,
        both_voted: report.both_voted,
        state: report.state,
    };
    Ok(Json(body).into_response())
}

async fn room_leave(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiFailure> {
    let player_id = player_id_from(&headers);

    let now = now_ms();
    let mut registry = open_registry(&state)?;
    let room = registry
        .get_mut(&room_id)
        .ok_or_else(ApiFailure::room_not_found)?;

    room.leave(player_id.as_deref().unwrap_or_default(), now);
    registry.save(state.rooms.as_ref())?;

    tracing::info!(room = %room_id, "player left, room finished");
    let body = LeaveResponse {
        success: true,
        message: "Left room successfully".to_string(),
    };
    Ok(Json(body).into_response())
}

async fn room_stats(State(state): State<AppState>) -> Result<Response, ApiFailure> {
    let registry = open_registry(&state)?;
    let body = StatsResponse {
        success: true,
        stats: registry.stats(),
    };
    Ok(Json(body).into_response())
}
