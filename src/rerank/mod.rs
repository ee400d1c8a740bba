//! Pairwise re-scoring of vector candidates.
//!
//! [`CandidateReranker`] replaces each candidate's similarity score with a
//! (query, candidate text) relevance score and re-sorts. Scoring is CPU-bound,
//! so it runs on the blocking pool under a deadline.

mod bert;
pub mod config;
mod cross_encoder;
mod device;
pub mod error;
mod lexical;


pub use bert::SequenceClassifier;
pub use config::{MAX_SEQ_LEN, RerankerConfig};
pub use cross_encoder::CrossEncoder;
pub use device::select_device;
pub use error::RerankError;
pub use lexical::LexicalPairScorer;

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::intent::{SearchCandidate, sort_candidates_desc};

/// Scores how well `candidate` answers `query`, in `[0, 1]`.
pub trait PairScorer: Send + Sync {
    fn score(&self, query: &str, candidate: &str) -> Result<f32, RerankError>;

    fn score_all(&self, query: &str, candidates: &[String]) -> Result<Vec<f32>, RerankError> {
        candidates.iter().map(|c| self.score(query, c)).collect()
    }

    fn name(&self) -> &str;
}

/// Loads the cross-encoder when a model path is configured, else the lexical scorer.
pub fn load_scorer(config: &RerankerConfig) -> Result<Arc<dyn PairScorer>, RerankError> {
    config.validate()?;
    match config.model_path {
        Some(_) => Ok(Arc::new(CrossEncoder::load(config)?)),
        None => {
            info!("No reranker model configured, using lexical pair scorer");
            Ok(Arc::new(LexicalPairScorer::new()))
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RerankerStats {
    pub enabled: bool,
    pub scorer: String,
    pub top_k: Option<usize>,
}

#[derive(Clone)]
pub struct CandidateReranker {
    scorer: Arc<dyn PairScorer>,
    enabled: bool,
    timeout: Duration,
    top_k: Option<usize>,
}

impl std::fmt::Debug for CandidateReranker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandidateReranker")
            .field("scorer", &self.scorer.name())
            .field("enabled", &self.enabled)
            .field("timeout", &self.timeout)
            .field("top_k", &self.top_k)
            .finish()
    }
}

impl CandidateReranker {
    pub fn new(scorer: Arc<dyn PairScorer>, enabled: bool, timeout: Duration) -> Self {
        Self {
            scorer,
            enabled,
            timeout,
            top_k: None,
        }
    }

    pub fn with_top_k(mut self, top_k: Option<usize>) -> Self {
        self.top_k = top_k;
        self
    }

    /// A reranker that returns every input unchanged.
    pub fn disabled() -> Self {
        Self::new(Arc::new(LexicalPairScorer::new()), false, Duration::from_secs(1))
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn stats(&self) -> RerankerStats {
        RerankerStats {
            enabled: self.enabled,
            scorer: self.scorer.name().to_string(),
            top_k: self.top_k,
        }
    }

    /// Re-scored candidates, best first. Returns `candidates` untouched when
    /// disabled, empty, or on any scoring failure.
    pub async fn rerank(&self, query: &str, candidates: Vec<SearchCandidate>) -> Vec<SearchCandidate> {
        if !self.enabled || candidates.is_empty() {
            return candidates;
        }
        match self.try_rerank(query, &candidates).await {
            Ok(reranked) => reranked,
            Err(e) => {
                warn!(error = %e, "Reranking failed, keeping vector order");
                candidates
            }
        }
    }

    #[instrument(skip(self, query, candidates), fields(scorer = %self.scorer.name(), n = candidates.len()))]
    pub async fn try_rerank(
        &self,
        query: &str,
        candidates: &[SearchCandidate],
    ) -> Result<Vec<SearchCandidate>, RerankError> {
        let started = Instant::now();
        let scorer = Arc::clone(&self.scorer);
        let query = query.to_string();
        let texts: Vec<String> = candidates.iter().map(|c| c.text.clone()).collect();

        let task = tokio::task::spawn_blocking(move || scorer.score_all(&query, &texts));
        let scores = tokio::time::timeout(self.timeout, task)
            .await
            .map_err(|_| RerankError::Timeout { after: self.timeout })?
            .map_err(|e| RerankError::TaskFailed {
                reason: e.to_string(),
            })??;

        if scores.len() != candidates.len() {
            return Err(RerankError::ScoreCountMismatch {
                expected: candidates.len(),
                actual: scores.len(),
            });
        }

        let mut reranked: Vec<SearchCandidate> = candidates
            .iter()
            .zip(scores)
            .map(|(c, score)| {
                let original = c.score;
                let mut c = c.clone();
                c.score = score;
                c.with_metadata("original_score", original)
                    .with_metadata("reranked", true)
            })
            .collect();

        sort_candidates_desc(&mut reranked);
        if let Some(k) = self.top_k {
            reranked.truncate(k);
        }

        debug!(
            top_score = reranked.first().map(|c| c.score),
            elapsed_us = started.elapsed().as_micros() as u64,
            "Reranking complete"
        );
        Ok(reranked)
    }
}
