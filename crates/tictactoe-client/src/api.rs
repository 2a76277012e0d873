//! Typed HTTP client for the server API.
//!
//! Business rejections arrive as [`ApiError::Api`] with the server's
//! machine-readable code; transport failures stay distinct so the sync
//! controller can tell "the server said no" from "the network is gone".

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use tictactoe_core::protocol::{
    CreateRoomResponse, ErrorBody, ErrorCode, JoinRequest, JoinResponse, LeaveResponse,
    MoveRequest, MoveResponse, ResetResponse, RoomResponse, StateResponse, StatsResponse,
};

/// Errors from API calls.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never completed (connection refused, timeout, ...).
    #[error("request failed: {0}")]
    Transport(String),
    /// The server answered with its failure envelope.
    #[error("{code:?}: {message}")]
    Api {
        code: ErrorCode,
        message: String,
        status: u16,
    },
    /// A non-success status without a parseable envelope.
    #[error("unexpected status {0}")]
    Status(u16),
    /// The body did not match the expected shape.
    #[error("invalid response body: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport(err.to_string())
    }
}

impl ApiError {
    /// Whether this is a server-side rejection (as opposed to a network or
    /// decoding failure).
    pub fn is_rejection(&self) -> bool {
        matches!(self, ApiError::Api { .. })
    }
}

/// Handle to the server API for one browser session.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    player_id: String,
}

impl ApiClient {
    /// `base_url` is the server origin (e.g. `http://localhost:8080`);
    /// `player_id` is this session's opaque identifier, sent on every call.
    pub fn new(base_url: impl Into<String>, player_id: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            player_id: player_id.into(),
        }
    }

    pub fn player_id(&self) -> &str {
        &self.player_id
    }

    pub async fn create_room(&self) -> Result<CreateRoomResponse, ApiError> {
        self.post("/api/rooms", None::<&()>).await
    }

    pub async fn get_room(&self, room_id: &str) -> Result<RoomResponse, ApiError> {
        self.get(&format!("/api/rooms/{room_id}")).await
    }

    pub async fn room_state(&self, room_id: &str) -> Result<StateResponse, ApiError> {
        self.get(&format!("/api/rooms/{room_id}/state")).await
    }

    pub async fn join_room(
        &self,
        room_id: &str,
        name: Option<&str>,
    ) -> Result<JoinResponse, ApiError> {
        let body = JoinRequest {
            name: name.map(str::to_string),
        };
        self.post(&format!("/api/rooms/{room_id}/join"), Some(&body)).await
    }

    pub async fn make_move(&self, room_id: &str, position: usize) -> Result<MoveResponse, ApiError> {
        let body = MoveRequest {
            position: position as i64,
        };
        self.post(&format!("/api/rooms/{room_id}/move"), Some(&body)).await
    }

    pub async fn vote_reset(&self, room_id: &str) -> Result<ResetResponse, ApiError> {
        self.post(&format!("/api/rooms/{room_id}/reset"), None::<&()>).await
    }

    pub async fn leave_room(&self, room_id: &str) -> Result<LeaveResponse, ApiError> {
        self.post(&format!("/api/rooms/{room_id}/leave"), None::<&()>).await
    }

    pub async fn stats(&self) -> Result<StatsResponse, ApiError> {
        self.get("/api/rooms/stats").await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self
            .http
            .get(format!("{}{path}", self.base_url))
            .header("x-player-id", &self.player_id)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError> {
        let mut request = self
            .http
            .post(format!("{}{path}", self.base_url))
            .header("x-player-id", &self.player_id);
        if let Some(body) = body {
            request = request.json(body);
        }
        Self::decode(request.send().await?).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|err| ApiError::Decode(err.to_string()));
        }

        let text = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ErrorBody>(&text) {
            Ok(envelope) => Err(ApiError::Api {
                code: envelope.error,
                message: envelope.message,
                status: status.as_u16(),
            }),
            Err(_) => Err(ApiError::Status(status.as_u16())),
        }
    }
}
