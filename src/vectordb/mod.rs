//! Example-utterance vector index (Qdrant) and corpus ingestion.

pub mod client;
pub mod corpus;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod model;

#[cfg(test)]
mod tests;

pub use client::{IntentIndex, QdrantIndex};
pub use corpus::{Example, IndexReport, IntentCorpus, IntentExamples, index_corpus};
pub use error::{CorpusError, VectorSearchError};
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockIntentIndex, cosine_similarity};
pub use model::{IndexPoint, IndexStats, candidate_from_payload};
