use thiserror::Error;

use crate::cache::CacheError;
use crate::config::ConfigError;
use crate::embedding::EmbeddingError;
use crate::rerank::RerankError;
use crate::rules::RuleLoadError;
use crate::vectordb::VectorSearchError;

/// A detection stage failed. Every variant is recovered inside
/// `detect_intent`; callers only ever observe a fallback result.
#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("rule detection failed: {reason}")]
    RuleDetection { reason: String },

    #[error(transparent)]
    VectorSearch(#[from] VectorSearchError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Rerank(#[from] RerankError),
}

impl DetectionError {
    /// Short stage label for logs.
    pub fn stage(&self) -> &'static str {
        match self {
            DetectionError::RuleDetection { .. } => "rule",
            DetectionError::VectorSearch(_) => "vector",
            DetectionError::Cache(_) => "cache",
            DetectionError::Rerank(_) => "rerank",
        }
    }
}

/// The service could not be assembled.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Rules(#[from] RuleLoadError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Index(#[from] VectorSearchError),

    #[error(transparent)]
    Rerank(#[from] RerankError),

    #[error("a vector index was configured without an embedder")]
    MissingEmbedder,
}
