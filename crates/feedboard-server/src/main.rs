//! Feedboard document server
//!
//! Holds one shared document per project and pushes every change to all
//! subscribers. Also stores uploaded media.
//!
//! ## Protocol
//!
//! WebSocket messages are JSON tagged by `type`:
//! ```json
//! { "type": "subscribe", "project": "p1" }
//! { "type": "write", "project": "p1", "patch": { "layers": [] }, "merge": true }
//! { "type": "changed", "project": "p1", "document": { ... } }
//! ```
//!
//! ## Environment
//!
//! - `FEEDBOARD_ADDR`: listen address (default `0.0.0.0:3030`)
//! - `FEEDBOARD_PUBLIC_URL`: base of returned media URLs (default `http://localhost:3030`)
//! - `FEEDBOARD_CONFIG`: optional TOML canvas config (media whitelist)
//! - `RUST_LOG`: log filter

mod media;
mod socket;
mod state;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
    routing::{get, put},
};
use feedboard_core::CanvasConfig;
use state::AppState;
use std::{io, net::SocketAddr, sync::Arc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

const DEFAULT_ADDR: &str = "0.0.0.0:3030";
const DEFAULT_PUBLIC_URL: &str = "http://localhost:3030";

#[tokio::main]
async fn main() -> io::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "feedboard_server=info,tower_http=info".into()),
        )
        .init();

    let config = match std::env::var("FEEDBOARD_CONFIG") {
        Ok(path) => CanvasConfig::load(&path).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?,
        Err(_) => CanvasConfig::default(),
    };
    let public_url = std::env::var("FEEDBOARD_PUBLIC_URL").unwrap_or_else(|_| DEFAULT_PUBLIC_URL.to_string());
    let addr: SocketAddr = std::env::var("FEEDBOARD_ADDR")
        .unwrap_or_else(|_| DEFAULT_ADDR.to_string())
        .parse()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let state = Arc::new(AppState::new(config, public_url));
    let app = router(state);

    info!("Feedboard server listening on {}", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/ws", get(ws_handler))
        .route("/projects/{id}", get(media::get_project))
        .route("/projects/{id}/media/{name}", put(media::upload))
        .route("/media/{*path}", get(media::download).delete(media::delete))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Index page
async fn index() -> &'static str {
    "Feedboard Server - Connect via WebSocket at /ws"
}

/// Health check
async fn health(State(state): State<Arc<AppState>>) -> String {
    format!("ok ({} projects)", state.project_count())
}

/// WebSocket upgrade handler
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| socket::handle_socket(socket, state))
}
