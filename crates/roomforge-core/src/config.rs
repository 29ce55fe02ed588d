//! Tunables for the orchestrator and queue. Values are the ones named in
//! spec.md §4/§5; `CoreConfig` lets a host process override them (e.g. from
//! environment) without the core depending on any particular config source.

use std::time::Duration;

/// Objects at or above this count switch Stage 4 to the batched script
/// strategy (spec §4.D).
pub const PARALLEL_THRESHOLD: usize = 10;

/// Global deadline for Stage 5's model join (spec §5).
pub const MODEL_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Global deadline for the batched-script strategy (spec §4.F, §5).
pub const SCRIPT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// First-batch and per-batch sizes for [`crate::scripts::ScriptBatcher`]
/// (spec §4.F).
pub const FIRST_BATCH_SIZE: usize = 5;
pub const BATCH_SIZE: usize = 5;

/// Grace period `QueueManager::shutdown` waits for in-flight jobs before
/// forceful cancellation (spec §4.E).
pub const GRACE_SECONDS: Duration = Duration::from_secs(60);

/// The three prompt templates the core retrieves by name from the host
/// process's configuration document (spec §6); the core treats the rest of
/// that document opaquely.
#[derive(Debug, Clone, Default)]
pub struct PromptSet {
    pub scenario: String,
    pub unified_scripts: String,
    pub scripts_batch: String,
}

/// Runtime-tunable knobs for [`crate::queue::QueueManager`].
#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub queue_capacity: usize,
    pub n_workers: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            n_workers: 4,
        }
    }
}
