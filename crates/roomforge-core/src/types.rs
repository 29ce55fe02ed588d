//! Core data model: requests, tracking ids, job state and the scenario shape
//! emitted by the LLM adapter.
//!
//! Mirrors spec §3 exactly; this module has no knowledge of HTTP or of any
//! concrete provider.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque job identifier returned synchronously from [`crate::queue::QueueManager::submit`].
///
/// Format: `room_` + 16 lowercase hex chars (spec §3).
pub type TrackingId = String;

pub(crate) fn new_tracking_id() -> TrackingId {
    use rand::RngCore;
    let mut bytes = [0u8; 8];
    rand::rng().fill_bytes(&mut bytes);
    format!("room_{}", hex_lower(&bytes))
}

fn hex_lower(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push_str(&format!("{b:02x}"));
    }
    s
}

/// Difficulty tier requested for the generated escape room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Normal => "normal",
            Difficulty::Hard => "hard",
        }
    }
}

/// A pre-existing object already present in the scene before generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExistingObject {
    pub name: String,
    pub id: String,
}

/// A request to generate an escape-room asset bundle (spec §3 `Request`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomRequest {
    /// Client-supplied correlation id, echoed back as the bundle's `uuid`
    /// field (spec §6's submit payload includes `uuid`; §4.D Stage 2
    /// otherwise mints a fresh one). Not to be confused with the `ruid`
    /// issued at admission.
    #[serde(default)]
    pub uuid: Option<String>,
    pub user_id: String,
    pub theme: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default, rename = "existingObjects")]
    pub existing_objects: Vec<ExistingObject>,
    #[serde(default, rename = "isFreeModeling")]
    pub is_free_modeling: bool,
}

/// Lifecycle state of a job. Transitions: Queued -> Processing -> (Completed | Failed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Terminal states accept no further transitions (spec §3).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// The full record the store holds for one job.
#[derive(Debug, Clone)]
pub struct JobState {
    pub status: JobStatus,
    pub result: Option<Value>,
}

impl JobState {
    pub fn queued() -> Self {
        Self {
            status: JobStatus::Queued,
            result: None,
        }
    }
}

/// Type of a single object instruction emitted by the LLM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    GameManager,
    ExistingInteractiveObject,
    InteractiveObject,
}

/// One LLM-emitted specification for a game object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectInstruction {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ObjectType,
    #[serde(default)]
    pub visual_description: Option<String>,
    #[serde(default)]
    pub simple_visual_description: Option<String>,
}

impl ObjectInstruction {
    /// Whether this instruction requires a 3D model generation attempt
    /// (spec §3: not game_manager, not existing_interactive_object, and has
    /// the description field selected by `is_free_modeling`).
    pub fn qualifies_for_model_generation(&self) -> bool {
        !matches!(
            self.kind,
            ObjectType::GameManager | ObjectType::ExistingInteractiveObject
        )
    }

    /// The description to use for model generation, per §9's resolution of
    /// the free-modeling Open Question: `simple_visual_description` is used
    /// when `is_free_modeling` is set, else `visual_description`. A qualifying
    /// object with no matching description is skipped (no failure).
    pub fn description_for(&self, is_free_modeling: bool) -> Option<&str> {
        let field = if is_free_modeling {
            &self.simple_visual_description
        } else {
            &self.visual_description
        };
        field.as_deref().filter(|s| !s.is_empty())
    }
}

/// `scenario_data` sub-object of the LLM's scenario response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioData {
    pub theme: String,
    pub description: String,
    pub escape_condition: String,
    pub puzzle_flow: String,
}

/// Validated LLM scenario output (spec §3 `Scenario`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub scenario_data: ScenarioData,
    pub object_instructions: Vec<ObjectInstruction>,
    #[serde(default)]
    pub model_scales: Option<HashMap<String, f64>>,
}

/// Per-object generation outcome collected across the model fan-out (spec §3
/// `TrackingResult`).
#[derive(Debug, Clone, Default, Serialize)]
pub struct TrackingResult {
    pub tracking: HashMap<String, String>,
    pub failed_models: HashMap<String, String>,
}

impl TrackingResult {
    /// Classify one model-generation outcome into `tracking` or `failed_models`
    /// per spec §4.D Stage 5.
    pub fn record(&mut self, name: String, id: String, now_ts: i64) {
        if id.is_empty() {
            self.failed_models
                .insert(name, format!("no-tracking-{now_ts}"));
        } else if id.starts_with("error-") || id.starts_with("timeout-") {
            self.failed_models.insert(name, id);
        } else {
            self.tracking.insert(name, id);
        }
    }
}

/// Well-formed error bundle produced by any fatal stage (spec §4.D).
pub fn error_bundle(uuid: &str, ruid: &str, error: impl Into<String>) -> Value {
    serde_json::json!({
        "uuid": uuid,
        "ruid": ruid,
        "success": false,
        "error": error.into(),
        "timestamp": chrono::Utc::now().timestamp(),
    })
}
