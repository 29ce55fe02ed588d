//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use roomforge_core::{JobResultStore, QueueManager};

use crate::config::Config;

/// State shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Bounded job queue and worker pool (spec §4.E).
    pub queue: Arc<QueueManager>,
    /// Concurrent job-result store (spec §4.C), shared with the queue's
    /// workers so handlers can poll without going through the queue.
    pub store: JobResultStore,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AppState {{ bind_address: {:?} }}", self.config.bind_address)
    }
}
