//! Error types shared by the algorithm modules.

use thiserror::Error;

/// Malformed, missing or inconsistent curriculum data.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to parse {what}: {source}")]
    Parse {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("duplicate lesson id: {0}")]
    DuplicateLesson(String),
    #[error("unknown lesson id: {0}")]
    UnknownLesson(String),
    #[error("prerequisite cycle detected at lesson {0}")]
    Cycle(String),
}

/// Numeric or structural failure while fitting or scoring.
#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("feature matrix is empty")]
    EmptyGraph,
    #[error("feature matrix shape mismatch: expected {expected} values, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },
    #[error("non-finite value during {stage} at epoch {epoch}")]
    NonFinite { stage: &'static str, epoch: usize },
}

/// Failure of one recommendation call.
#[derive(Debug, Error)]
pub enum RecommendError {
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Model(#[from] ModelError),
}
