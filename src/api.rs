//! HTTP endpoints of the in-process answer service.
//!
//! Mirrors the external service contract so the widget can run without one:
//! `GET /check/{identity}` and `POST /submit`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

use crate::backend::{InMemoryBackend, QuizBackend};
use crate::types::{Identity, SubmitRequest};

pub fn dev_router(backend: Arc<InMemoryBackend>) -> Router {
    Router::new()
        .route("/check/{identity}", get(check))
        .route("/submit", post(submit))
        .with_state(backend)
}

/// GET /check/{identity}
async fn check(
    State(backend): State<Arc<InMemoryBackend>>,
    Path(identity): Path<String>,
) -> Response {
    match backend.check(&Identity::new(identity)).await {
        Ok(check) => Json(check).into_response(),
        Err(e) => {
            tracing::error!("Check failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// POST /submit
async fn submit(
    State(backend): State<Arc<InMemoryBackend>>,
    Json(request): Json<SubmitRequest>,
) -> Response {
    match backend.submit(&request).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => {
            tracing::error!("Submit failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
