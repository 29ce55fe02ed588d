//! DTO for `GET /queue/status` (spec §6).

use roomforge_core::QueueMetrics;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QueueStatusResponse {
    pub queued: usize,
    pub active: usize,
    pub completed: usize,
    #[serde(rename = "maxConcurrent")]
    pub max_concurrent: usize,
}

impl From<QueueMetrics> for QueueStatusResponse {
    fn from(m: QueueMetrics) -> Self {
        Self {
            queued: m.queued,
            active: m.active,
            completed: m.completed,
            max_concurrent: m.max_concurrent,
        }
    }
}
