use thiserror::Error;

/// Error taxonomy for the orchestration core (spec §7).
///
/// `ValidationError` and `UpstreamFailure`/`Timeout` that occur for
/// scenario/script generation are fatal and surface as an error bundle.
/// `InvalidState` and `QueueFull` are programming/admission errors that never
/// reach a client as a bundle — they are logged or returned directly from
/// the admission path.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("upstream provider failure: {0}")]
    Upstream(String),

    #[error("stage timed out: {0}")]
    Timeout(String),

    #[error("invalid state transition for {ruid}: {reason}")]
    InvalidState { ruid: String, reason: String },

    #[error("queue is at capacity")]
    QueueFull,
}

impl RuntimeError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
