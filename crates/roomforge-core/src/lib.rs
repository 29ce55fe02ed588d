//! Request-admission, staged-orchestration and result-store subsystem for
//! escape-room asset bundle generation.
//!
//! This crate owns everything "the core" is responsible for: the bounded
//! job queue and worker pool ([`queue`]), the per-job pipeline
//! ([`orchestrator`]), the mesh-provider driver ([`mesh`]) and API key
//! rotation ([`keys`]), the concurrent result store ([`store`]), and the
//! boundary validators ([`validate`]). It knows nothing about HTTP, process
//! configuration, or the concrete LLM/mesh providers — those are consumed
//! through the [`clients`] traits and supplied by a host binary.

pub mod clients;
pub mod config;
pub mod error;
pub mod keys;
pub mod mesh;
pub mod orchestrator;
pub mod queue;
pub mod scripts;
pub mod store;
pub mod types;
pub mod validate;

pub use clients::{LlmClient, MeshCallError, MeshClient, MeshTaskStatus, MeshTaskStatusKind};
pub use config::{CoreConfig, PromptSet};
pub use error::{Result, RuntimeError};
pub use keys::ApiKeyRotator;
pub use mesh::MeshTaskDriver;
pub use orchestrator::PipelineOrchestrator;
pub use queue::{QueueManager, QueueMetrics};
pub use scripts::ScriptBatcher;
pub use store::JobResultStore;
pub use types::{
    Difficulty, ExistingObject, JobState, JobStatus, ObjectInstruction, ObjectType, RoomRequest,
    Scenario, ScenarioData, TrackingId, TrackingResult,
};
pub use validate::{RequestValidator, ScenarioValidator};
