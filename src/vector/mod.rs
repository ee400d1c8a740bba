//! Semantic matching: embed the query, search the example index.


use std::sync::Arc;
use std::time::Instant;

use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use crate::config::HybridConfig;
use crate::embedding::QueryEmbedder;
use crate::intent::{SearchCandidate, sort_candidates_desc};
use crate::text::TextNormalizer;
use crate::vectordb::{IndexStats, IntentIndex, VectorSearchError};

/// Embeds queries and returns scored example matches, best first.
#[derive(Clone)]
pub struct VectorMatcher {
    embedder: Arc<dyn QueryEmbedder>,
    index: Arc<dyn IntentIndex>,
    normalizer: Arc<TextNormalizer>,
    config: Arc<HybridConfig>,
}

impl std::fmt::Debug for VectorMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorMatcher")
            .field("embedder", &self.embedder.name())
            .field("index", &self.index.name())
            .field("top_k", &self.config.vector_top_k())
            .finish()
    }
}

impl VectorMatcher {
    pub fn new(
        embedder: Arc<dyn QueryEmbedder>,
        index: Arc<dyn IntentIndex>,
        normalizer: Arc<TextNormalizer>,
        config: Arc<HybridConfig>,
    ) -> Self {
        Self {
            embedder,
            index,
            normalizer,
            config,
        }
    }

    /// Candidates for `query`; any failure or timeout yields an empty list.
    pub async fn search(&self, query: &str) -> Vec<SearchCandidate> {
        match self.try_search(query).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(error = %e, "Vector search failed, continuing without vector result");
                Vec::new()
            }
        }
    }

    /// Like [`search`](Self::search) but reports the failure.
    ///
    /// Retrieval uses the relaxed score threshold; only the top candidate is
    /// boosted.
    #[instrument(skip(self, query), fields(query_len = query.len()))]
    pub async fn try_search(&self, query: &str) -> Result<Vec<SearchCandidate>, VectorSearchError> {
        let normalized = self.normalizer.normalize(query);
        if normalized.is_empty() {
            return Ok(Vec::new());
        }
        let started = Instant::now();

        let embedding_timeout = self.config.embedding_timeout();
        let vector = timeout(embedding_timeout, self.embedder.embed(&normalized))
            .await
            .map_err(|_| VectorSearchError::Timeout {
                stage: "embedding",
                after: embedding_timeout,
            })??;

        let search_timeout = self.config.search_timeout();
        let mut candidates = timeout(
            search_timeout,
            self.index.search(
                vector,
                self.config.vector_top_k(),
                self.config.search_score_threshold(),
            ),
        )
        .await
        .map_err(|_| VectorSearchError::Timeout {
            stage: "vector search",
            after: search_timeout,
        })??;

        sort_candidates_desc(&mut candidates);
        candidates.truncate(self.config.vector_top_k());
        if let Some(top) = candidates.first_mut() {
            top.score = self.config.boost(top.score);
        }

        debug!(
            found = candidates.len(),
            top_score = candidates.first().map(|c| c.score),
            elapsed_us = started.elapsed().as_micros() as u64,
            "Vector search complete"
        );
        Ok(candidates)
    }

    /// Index status, reported unavailable when the backend misses the search deadline.
    pub async fn index_stats(&self) -> IndexStats {
        let after = self.config.search_timeout();
        match timeout(after, self.index.stats()).await {
            Ok(stats) => stats,
            Err(_) => {
                warn!(index = self.index.name(), ?after, "Index stats timed out");
                IndexStats::unavailable(
                    self.index.name(),
                    self.index.collection(),
                    format!("stats timed out after {after:?}"),
                )
            }
        }
    }
}
