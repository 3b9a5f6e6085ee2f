//! Error types for the annotation engine

use thiserror::Error;

/// Errors surfaced by the annotation engine and its worker boundary.
///
/// Per-role failures (`InvalidRegex`, `MissingRegexPattern`) never escape a
/// collection pass; they are logged and counted in the pass statistics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnnotateError {
    #[error("invalid regex for role `{role}`: {message}")]
    InvalidRegex { role: String, message: String },

    #[error("regex role `{role}` has no pattern")]
    MissingRegexPattern { role: String },

    #[error("failed to build pattern automaton: {0}")]
    Automaton(String),

    #[error("request {id} timed out")]
    Timeout { id: u64 },

    #[error("annotation worker is not running")]
    WorkerDisconnected,

    #[error("failed to start annotation worker: {0}")]
    WorkerSpawn(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, AnnotateError>;
