//! `/room/*` — job submission, polling and deletion (spec §6).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::schemas::room::{CreateRoomRequest, CreateRoomResponse, DeleteRoomResponse, RoomStatusResponse};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(create_room, get_room_status, delete_room))]
pub struct RoomApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/room/create", post(create_room))
        .route("/room/status/{ruid}", get(get_room_status))
        .route("/room/{ruid}", delete(delete_room))
}

/// Submits a generation request.
///
/// Returns immediately with the admitted `ruid`; the pipeline runs on the
/// worker pool in the background (spec §4.E).
#[utoipa::path(
    post,
    path = "/room/create",
    tag = "room",
    request_body = CreateRoomRequest,
    responses(
        (status = 202, description = "Job admitted", body = CreateRoomResponse),
        (status = 400, description = "Malformed request"),
        (status = 503, description = "Queue is full"),
    )
)]
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateRoomRequest>,
) -> Result<(axum::http::StatusCode, Json<CreateRoomResponse>), ServerError> {
    let ruid = state.queue.submit(body.into()).await?;
    Ok((
        axum::http::StatusCode::ACCEPTED,
        Json(CreateRoomResponse { ruid, status: "QUEUED".to_string() }),
    ))
}

/// Polls a job's current status, returning the full bundle once terminal.
#[utoipa::path(
    get,
    path = "/room/status/{ruid}",
    tag = "room",
    params(("ruid" = String, Path, description = "Tracking id returned by room/create")),
    responses(
        (status = 200, description = "Current job state", body = RoomStatusResponse),
        (status = 404, description = "Unknown ruid"),
    )
)]
pub async fn get_room_status(
    State(state): State<Arc<AppState>>,
    Path(ruid): Path<String>,
) -> Result<Json<RoomStatusResponse>, ServerError> {
    match state.store.get(&ruid).await {
        Some(job_state) => Ok(Json(RoomStatusResponse::from_state(&ruid, job_state))),
        None => Err(ServerError::NotFound(format!("no job with ruid {ruid}"))),
    }
}

/// Deletes a job's stored result. Always succeeds, matching spec §6
/// ("idempotent; absent ruid is not an error").
#[utoipa::path(
    delete,
    path = "/room/{ruid}",
    tag = "room",
    params(("ruid" = String, Path, description = "Tracking id returned by room/create")),
    responses(
        (status = 200, description = "Job removed (or was already absent)", body = DeleteRoomResponse),
    )
)]
pub async fn delete_room(
    State(state): State<Arc<AppState>>,
    Path(ruid): Path<String>,
) -> Json<DeleteRoomResponse> {
    state.store.delete(&ruid).await;
    Json(DeleteRoomResponse { ruid, deleted: true })
}
