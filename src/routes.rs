//! Read-only REST endpoints: liveness and per-user progress.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::store::{UserId, UserStore};
use crate::tracker::TrackingCommands;

/// Shared state for the API routes.
#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<dyn UserStore>,
    pub tracking: Arc<TrackingCommands>,
}

/// GET /api/health
async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "users": state.store.len().await,
    }))
}

/// GET /api/users/{id}/progress
///
/// Today's progress for a committed user, or 404.
async fn user_progress(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.tracking.snapshot(&UserId::from(id)).await {
        Some(snapshot) => Json(snapshot).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "No profile for this user"})),
        )
            .into_response(),
    }
}

/// Build the API routes.
pub fn api_routes(state: ApiState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/users/{id}/progress", get(user_progress))
        .with_state(state)
}
