//! `GET /queue/status` — operator-facing queue counters (spec §6).

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::schemas::queue::QueueStatusResponse;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(get_queue_status))]
pub struct QueueApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/queue/status", get(get_queue_status))
}

/// Reports the live queue counters. Guarded by [`crate::middleware::auth::check_admin_auth`]
/// when `ROOMFORGE_ADMIN_TOKEN` is configured.
#[utoipa::path(
    get,
    path = "/queue/status",
    tag = "queue",
    responses(
        (status = 200, description = "Current queue counters", body = QueueStatusResponse),
        (status = 401, description = "Missing or invalid bearer token"),
    )
)]
pub async fn get_queue_status(State(state): State<Arc<AppState>>) -> Json<QueueStatusResponse> {
    Json(state.queue.metrics().into())
}
