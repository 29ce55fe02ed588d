//! DTOs for the `/room/*` and `/queue/status` endpoints (spec §6).

use roomforge_core::{Difficulty, ExistingObject, JobState, JobStatus, RoomRequest};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Wire form of [`ExistingObject`], kept separate so this module doesn't
/// need to push a `utoipa::ToSchema` derive onto the HTTP-agnostic core.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ExistingObjectDto {
    pub name: String,
    pub id: String,
}

impl From<ExistingObjectDto> for ExistingObject {
    fn from(value: ExistingObjectDto) -> Self {
        ExistingObject { name: value.name, id: value.id }
    }
}

/// `POST /room/create` request body.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateRoomRequest {
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(rename = "userId")]
    pub user_id: String,
    pub theme: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub difficulty: String,
    #[serde(default, rename = "existingObjects")]
    pub existing_objects: Vec<ExistingObjectDto>,
    #[serde(default, rename = "isFreeModeling")]
    pub is_free_modeling: bool,
}

impl From<CreateRoomRequest> for RoomRequest {
    fn from(value: CreateRoomRequest) -> Self {
        let difficulty = match value.difficulty.to_lowercase().as_str() {
            "easy" => Difficulty::Easy,
            "hard" => Difficulty::Hard,
            _ => Difficulty::Normal,
        };
        RoomRequest {
            uuid: value.uuid,
            user_id: value.user_id,
            theme: value.theme,
            keywords: value.keywords,
            difficulty,
            existing_objects: value.existing_objects.into_iter().map(Into::into).collect(),
            is_free_modeling: value.is_free_modeling,
        }
    }
}

/// `POST /room/create` response body — returned synchronously on admission
/// per spec §4.E (the pipeline itself runs in the background).
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CreateRoomResponse {
    pub ruid: String,
    pub status: String,
}

/// `GET /room/status/{ruid}` response body.
///
/// While the job is non-terminal only `ruid`/`status` are populated;
/// once terminal, `result` carries the full bundle (or error bundle) that
/// [`roomforge_core::orchestrator::PipelineOrchestrator::create_room`]
/// produced.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoomStatusResponse {
    pub ruid: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
}

impl RoomStatusResponse {
    pub fn from_state(ruid: &str, state: JobState) -> Self {
        let status = match state.status {
            JobStatus::Queued => "QUEUED",
            JobStatus::Processing => "PROCESSING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        };
        Self {
            ruid: ruid.to_string(),
            status: status.to_string(),
            result: if state.status.is_terminal() { state.result } else { None },
        }
    }
}

/// `DELETE /room/{ruid}` response body.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DeleteRoomResponse {
    pub ruid: String,
    pub deleted: bool,
}
