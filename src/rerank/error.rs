use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Pair scoring failed. The orchestrator keeps the vector order on any of these.
#[derive(Debug, Error)]
pub enum RerankError {
    #[error("cross-encoder directory not found: {path}")]
    ModelNotFound { path: PathBuf },

    #[error("cannot load cross-encoder: {reason}")]
    ModelLoadFailed { reason: String },

    #[error("{device} unavailable for cross-encoder: {reason}")]
    DeviceUnavailable { device: String, reason: String },

    #[error("pair scoring failed: {reason}")]
    InferenceFailed { reason: String },

    #[error("cannot tokenize query/candidate pair: {reason}")]
    TokenizationFailed { reason: String },

    #[error("bad reranker settings: {reason}")]
    InvalidConfig { reason: String },

    #[error("scorer returned {actual} scores for {expected} candidates")]
    ScoreCountMismatch { expected: usize, actual: usize },

    #[error("pair scoring exceeded {after:?}")]
    Timeout { after: Duration },

    #[error("scoring task aborted: {reason}")]
    TaskFailed { reason: String },
}

impl From<candle_core::Error> for RerankError {
    fn from(err: candle_core::Error) -> Self {
        RerankError::InferenceFailed {
            reason: err.to_string(),
        }
    }
}
