use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("cache operation '{op}' failed: {reason}")]
    OperationFailed { op: &'static str, reason: String },
}
