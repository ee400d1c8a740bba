use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::embedding::EmbeddingError;

#[derive(Debug, Error)]
/// Errors from embedding a query or searching the example index.
pub enum VectorSearchError {
    /// Could not connect to the Qdrant endpoint.
    #[error("failed to connect to Qdrant at '{url}': {message}")]
    ConnectionFailed { url: String, message: String },

    /// Collection lookup or creation failed.
    #[error("collection '{collection}' unavailable: {message}")]
    CollectionFailed { collection: String, message: String },

    #[error("collection not found: {collection}")]
    CollectionNotFound { collection: String },

    #[error("failed to upsert points to '{collection}': {message}")]
    UpsertFailed { collection: String, message: String },

    #[error("failed to search in '{collection}': {message}")]
    SearchFailed { collection: String, message: String },

    #[error("invalid vector dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    /// A step exceeded its deadline.
    #[error("{stage} timed out after {after:?}")]
    Timeout { stage: &'static str, after: Duration },

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
}

#[derive(Debug, Error)]
/// Errors loading an intent example corpus.
pub enum CorpusError {
    #[error("failed to read corpus '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse corpus '{path}': {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("corpus '{path}' contains no usable examples")]
    Empty { path: PathBuf },
}
