//! Hybrid intent classification for university assistant queries.
//!
//! A query goes through text normalization, weighted rule matching and,
//! when the rules are not decisive, semantic search over labeled examples
//! with optional pairwise reranking. The pieces are merged by a fixed
//! arbitration order into one [`IntentResult`].
//!
//! ## Modules
//! - [`text`]: Vietnamese/English normalization, relevance and language checks
//! - [`rules`]: rule sets, loading and the weighted [`RuleMatcher`]
//! - [`embedding`], [`vectordb`], [`vector`]: query embeddings, the example
//!   index (Qdrant) and the semantic matcher on top of them
//! - [`rerank`]: cross-encoder or lexical re-scoring of vector candidates
//! - [`cache`]: TTL + LRU result cache
//! - [`service`]: the orchestrator, [`HybridIntentService`]
//!
//! ## Test/Mock Support
//! Mock collaborators are available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod cache;
pub mod config;
pub mod embedding;
pub mod hashing;
pub mod intent;
pub mod rerank;
pub mod rules;
pub mod service;
pub mod text;
pub mod vector;
pub mod vectordb;

pub use cache::{CacheStats, MemoryResultStore, ResultStore, TtlLruCache};
#[cfg(any(test, feature = "mock"))]
pub use cache::MockResultStore;
pub use config::{ConfigError, HybridConfig, RuleScoring, ServiceConfig};
#[cfg(any(test, feature = "mock"))]
pub use embedding::MockEmbedder;
pub use embedding::{EmbeddingError, HashEmbedder, OpenAiEmbedder, QueryEmbedder};
pub use hashing::{hash_query, hash_to_u64};
pub use intent::{
    DetectionContext, DetectionMethod, IntentCategory, IntentResult, SearchCandidate,
};
pub use rerank::{CandidateReranker, PairScorer, RerankError, RerankerConfig};
pub use rules::{RuleDefinition, RuleMatch, RuleMatcher, RuleSet};
pub use service::{
    BuildError, HybridIntentService, HybridIntentServiceBuilder, PerformanceStats, ServiceStats,
};
pub use text::{Language, TextNormalizer};
pub use vector::VectorMatcher;
#[cfg(any(test, feature = "mock"))]
pub use vectordb::MockIntentIndex;
pub use vectordb::{IndexStats, IntentCorpus, IntentIndex, QdrantIndex, VectorSearchError};
