//! Tic-tac-toe server binary.
//!
//! Serves the JSON API under `/api/*` and falls back to the static SPA
//! build for everything else.
//!
//! Environment:
//! - `PORT`: listen port (default 8080)
//! - `DATA_DIR`: where the snapshot files live (default `./data`)
//! - `STATIC_DIR`: the SPA build output (default `./dist`)
//! - `RUST_LOG`: tracing filter (default `info`)

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tracing_subscriber::EnvFilter;

use tictactoe_server::api::{self, AppState};
use tictactoe_server::store::JsonFileStore;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let data_dir = PathBuf::from(std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string()));
    let state = AppState::new(
        Arc::new(JsonFileStore::new(data_dir.join("rooms.json"))),
        Arc::new(JsonFileStore::new(data_dir.join("solo.json"))),
    );

    // Serve the SPA: static files first, index.html for client-side routes.
    let static_dir = std::env::var("STATIC_DIR").unwrap_or_else(|_| "./dist".to_string());
    let serve_spa = ServeDir::new(&static_dir)
        .not_found_service(ServeFile::new(format!("{static_dir}/index.html")));

    let app = api::router(state)
        .layer(CorsLayer::permissive())
        .fallback_service(serve_spa);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Tic-tac-toe server listening on {addr}");
    tracing::info!("Serving static files from {static_dir}");

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
