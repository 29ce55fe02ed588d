//! Adapter boundary the core consumes but does not implement (spec §1
//! "Out of scope"). Concrete `reqwest`-based implementations live in
//! `roomforge-server`; the core only ever sees these traits, which makes it
//! trivially testable with stub implementations.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

/// Phase of a [`MeshTask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshTaskKind {
    Preview,
    Refine,
}

/// Terminal/non-terminal status of a mesh provider task (spec §3 `MeshTask`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshTaskStatusKind {
    Pending,
    Running,
    Succeeded,
    Failed,
    Canceled,
}

/// Model URLs attached to a succeeded refine task.
#[derive(Debug, Clone, Default)]
pub struct ModelUrls {
    pub fbx: Option<String>,
    pub glb: Option<String>,
    pub obj: Option<String>,
    pub mtl: Option<String>,
    pub usdz: Option<String>,
}

/// Status payload returned by `MeshClient::get_status`.
#[derive(Debug, Clone)]
pub struct MeshTaskStatus {
    pub status: MeshTaskStatusKind,
    pub progress: u8,
    pub error: Option<String>,
    pub model_urls: Option<ModelUrls>,
    pub thumbnail_url: Option<String>,
}

/// The LLM adapter the core consumes (spec §1).
///
/// `generate_scenario` returns `None` on outright failure (network error,
/// malformed body) rather than an error type, matching the source's
/// null-on-failure contract that Stage 2 checks for explicitly.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate_scenario(&self, prompt: &str, input: Value) -> Option<Value>;

    async fn generate_scripts(
        &self,
        prompt: &str,
        input: Value,
    ) -> Option<HashMap<String, String>>;
}

/// The two-phase 3D provider adapter the core consumes (spec §1).
#[async_trait]
pub trait MeshClient: Send + Sync {
    async fn create_preview(&self, prompt: &str, key: &str) -> Result<String, MeshCallError>;

    async fn create_refine(&self, preview_id: &str, key: &str) -> Result<String, MeshCallError>;

    async fn get_status(&self, task_id: &str, key: &str) -> Result<MeshTaskStatus, MeshCallError>;
}

/// Outcome of a single HTTP call to the mesh provider, classified the way
/// [`crate::mesh::MeshTaskDriver`] needs in order to decide between retrying
/// with a rotated key and failing the stage outright (spec §4.B).
#[derive(Debug, Clone)]
pub enum MeshCallError {
    /// Network error, unparseable body, or HTTP 401/403/429: transient,
    /// worth retrying with another key.
    Transient(String),
    /// 5xx other than 429: also transient per spec §4.B.
    ServerError(String),
    /// Any other 4xx: fatal for this call.
    Fatal(String),
}

impl MeshCallError {
    pub fn is_transient(&self) -> bool {
        !matches!(self, MeshCallError::Fatal(_))
    }

    pub fn message(&self) -> &str {
        match self {
            MeshCallError::Transient(m) | MeshCallError::ServerError(m) | MeshCallError::Fatal(m) => m,
        }
    }
}
