//! Error types for the core registry model.

use thiserror::Error;

/// Errors raised by the pure registry model.
///
/// These are the "setup" and "configuration" classes: table-capacity
/// exhaustion and duplicate names. Transport and fatal errors live in
/// `jetson-agent`, closer to where they're recovered from.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("engine table is full ({0} engines already registered)")]
    EngineTableFull(usize),

    #[error("engine '{0}' already registered")]
    DuplicateEngine(String),

    #[error("client table for engine '{engine}' is full ({cap} clients already connected)")]
    ClientTableFull { engine: String, cap: usize },

    #[error("no engine registered with index {0}")]
    UnknownEngineIndex(usize),
}
