//! Error taxonomy for the agent binary.
//!
//! `AgentError` covers the per-connection classes that a listener or
//! bridge needs to match on (and log, then keep going). Fatal startup
//! failures are surfaced to `main` as `anyhow::Error` instead — there's
//! nothing useful to recover from there.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("failed to create pipe '{path}': {source}")]
    PipeCreate {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to copy engine executable to '{path}': {source}")]
    ExecutableCopy {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to spawn engine process '{0}': {1}")]
    SpawnFailed(String, #[source] std::io::Error),

    #[error(transparent)]
    Registry(#[from] jetson_core::CoreError),

    #[error("transport error on {0}: {1}")]
    Transport(&'static str, #[source] std::io::Error),
}
