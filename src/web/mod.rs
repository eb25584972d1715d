//! HTTP surface: one HTML page and a small JSON/bytes API.

pub mod error;
pub mod routes;

use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::downloader::FetchService;
use crate::session::SessionStore;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<FetchService>,
    pub sessions: Arc<SessionStore>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/api/metadata", get(routes::metadata))
        .route("/api/download", get(routes::download))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state)).await
}
