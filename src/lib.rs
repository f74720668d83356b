// Public API for integration tests and potential library usage

pub mod api;
pub mod backend;
pub mod config;
pub mod identity;
pub mod protocol;
pub mod session;
pub mod state;
pub mod types;
pub mod ws;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::backend::InMemoryBackend;
use crate::state::AppState;

/// Build the HTTP router. The dev backend, when given, is served under `/api`.
pub fn router(state: Arc<AppState>, dev_backend: Option<Arc<InMemoryBackend>>) -> Router {
    let mut app = Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(state);

    if let Some(backend) = dev_backend {
        app = app.nest("/api", api::dev_router(backend));
    }

    // The widget is embedded in foreign pages
    app.layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
