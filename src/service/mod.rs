//! Hybrid detection pipeline.
//!
//! Per request: cache lookup, relevance check, rule match, vector search
//! (skipped on a rule early exit), optional rerank, arbitration, cache write.
//! Every stage failure is logged and treated as "no result" for that stage.

pub mod arbitration;
mod builder;
pub mod error;
pub mod stats;

#[cfg(test)]
mod tests;

pub use arbitration::{VectorEvidence, arbitrate};
pub use builder::{HybridIntentServiceBuilder, service_embedder};
pub use error::{BuildError, DetectionError};
pub use stats::{PerformanceStats, ServiceStats};

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tracing::{debug, instrument, warn};

use crate::cache::{CacheKey, ResultStore, result_cache_key};
use crate::config::HybridConfig;
use crate::intent::{DetectionContext, IntentResult};
use crate::rerank::CandidateReranker;
use crate::rules::{RuleMatch, RuleMatcher};
use crate::text::TextNormalizer;
use crate::vector::VectorMatcher;
use stats::DetectionCounters;

/// Classifies queries by combining rule and semantic evidence.
///
/// Cloning is cheap; clones share matchers, cache and counters.
#[derive(Clone)]
pub struct HybridIntentService {
    config: Arc<HybridConfig>,
    normalizer: Arc<TextNormalizer>,
    rules: Arc<RuleMatcher>,
    vector: Option<VectorMatcher>,
    reranker: CandidateReranker,
    cache: Option<Arc<dyn ResultStore>>,
    counters: Arc<DetectionCounters>,
}

impl std::fmt::Debug for HybridIntentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridIntentService")
            .field("rules", &self.rules)
            .field("vector", &self.vector)
            .field("reranker", &self.reranker)
            .field("caching", &self.cache.is_some())
            .finish()
    }
}

impl HybridIntentService {
    pub fn builder() -> HybridIntentServiceBuilder {
        HybridIntentServiceBuilder::default()
    }

    #[inline]
    pub fn config(&self) -> &HybridConfig {
        &self.config
    }

    #[inline]
    pub fn normalizer(&self) -> &TextNormalizer {
        &self.normalizer
    }

    /// Rule matcher, for hot reloads via [`RuleMatcher::replace_rules`].
    #[inline]
    pub fn rules(&self) -> &RuleMatcher {
        &self.rules
    }

    #[inline]
    pub fn has_vector_search(&self) -> bool {
        self.vector.is_some()
    }

    /// Detects the intent of one query. Never fails; degraded stages lower
    /// recall and the worst case is a fallback result.
    #[instrument(skip_all, fields(query_len = context.query.len()))]
    pub async fn detect_intent(&self, context: &DetectionContext) -> IntentResult {
        let started = Instant::now();
        self.counters.total_requests();
        let query = context.query.as_str();

        let key = self
            .caching_enabled()
            .then(|| result_cache_key(&self.normalizer, query));
        if let Some(key) = &key
            && let Some(hit) = self.cache_lookup(key).await
        {
            self.counters.cache_hits();
            debug!(intent_id = %hit.id, "Served from result cache");
            return hit;
        }

        if self.normalizer.is_irrelevant(query) {
            self.counters.irrelevant();
            let result = IntentResult::fallback(self.config.irrelevant_confidence())
                .with_metadata("reason", "irrelevant");
            self.counters.record(result.method, started.elapsed());
            return result;
        }

        let rule = match self.detect_rule(query) {
            Ok(rule) => rule,
            Err(e) => {
                self.recovered(&e);
                None
            }
        };

        let early_exit = rule
            .as_ref()
            .is_some_and(|r| r.score >= self.config.early_exit_threshold());
        let vector = if early_exit {
            self.counters.early_exits();
            None
        } else {
            self.vector_evidence(query).await
        };

        let result = arbitrate(&self.config, rule.as_ref(), vector.as_ref());

        if let Some(key) = key
            && !result.is_fallback()
            && result.confidence >= self.config.cache_min_confidence()
        {
            self.cache_write(key, &result).await;
        }

        let elapsed = started.elapsed();
        self.counters.record(result.method, elapsed);
        debug!(
            intent_id = %result.id,
            method = %result.method,
            confidence = result.confidence,
            early_exit,
            elapsed_us = elapsed.as_micros() as u64,
            "Intent detected"
        );
        result
    }

    /// Detects many queries with at most `max_concurrent` in flight.
    ///
    /// The i-th result belongs to the i-th query. A task that dies yields a
    /// fallback for its slot only.
    pub async fn detect_batch<I, Q>(&self, queries: I, max_concurrent: usize) -> Vec<IntentResult>
    where
        I: IntoIterator<Item = Q>,
        Q: Into<DetectionContext>,
    {
        self.counters.batches();
        let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));

        let handles: Vec<_> = queries
            .into_iter()
            .map(|q| {
                let context: DetectionContext = q.into();
                let service = self.clone();
                let semaphore = Arc::clone(&semaphore);
                tokio::spawn(async move {
                    let _permit = semaphore.acquire_owned().await;
                    service.detect_intent(&context).await
                })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (i, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    warn!(index = i, error = %e, "Batch detection task failed");
                    self.counters.recovered_errors();
                    results.push(
                        IntentResult::fallback(self.config.irrelevant_confidence())
                            .with_metadata("error", e.to_string()),
                    );
                }
            }
        }
        results
    }

    /// Detection, cache, index, rule and reranker statistics.
    pub async fn get_stats(&self) -> ServiceStats {
        let cache = match &self.cache {
            Some(cache) => Some(cache.stats().await),
            None => None,
        };
        let vector_store = match &self.vector {
            Some(vector) => Some(vector.index_stats().await),
            None => None,
        };

        ServiceStats {
            detection: self.counters.snapshot(),
            cache,
            vector_store,
            rules: self.rules.stats(),
            reranker: self.reranker.stats(),
        }
    }

    pub fn reset_stats(&self) {
        self.counters.reset();
    }

    /// Drops every cached result.
    pub async fn clear_cache(&self) {
        if let Some(cache) = &self.cache
            && let Err(e) = cache.clear().await
        {
            self.recovered(&e.into());
        }
    }

    fn caching_enabled(&self) -> bool {
        self.config.enable_caching() && self.cache.is_some()
    }

    async fn cache_lookup(&self, key: &CacheKey) -> Option<IntentResult> {
        let cache = self.cache.as_ref()?;
        match cache.get(key).await {
            Ok(Some(hit)) if hit.confidence >= self.config.cache_min_confidence() => Some(hit),
            Ok(_) => None,
            Err(e) => {
                self.recovered(&e.into());
                None
            }
        }
    }

    async fn cache_write(&self, key: CacheKey, result: &IntentResult) {
        let Some(cache) = &self.cache else {
            return;
        };
        if let Err(e) = cache.set(key, result.clone(), self.config.cache_ttl()).await {
            self.recovered(&e.into());
        }
    }

    fn detect_rule(&self, query: &str) -> Result<Option<RuleMatch>, DetectionError> {
        self.counters.rule_calls();
        catch_unwind(AssertUnwindSafe(|| self.rules.detect(query))).map_err(|payload| {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "rule matcher panicked".to_string());
            DetectionError::RuleDetection { reason }
        })
    }

    async fn vector_evidence(&self, query: &str) -> Option<VectorEvidence> {
        let matcher = self.vector.as_ref()?;
        self.counters.vector_calls();

        let candidates = match matcher.try_search(query).await {
            Ok(c) => c,
            Err(e) => {
                self.recovered(&e.into());
                return None;
            }
        };
        let raw_top = candidates.first()?.clone();

        if self.reranker.is_enabled() {
            self.counters.rerank_calls();
            match self.reranker.try_rerank(query, &candidates).await {
                Ok(reranked) => {
                    if let Some(top) = reranked.into_iter().next() {
                        if top.score >= self.config.rerank_threshold() {
                            return Some(VectorEvidence::reranked(top));
                        }
                        debug!(
                            score = top.score,
                            threshold = self.config.rerank_threshold(),
                            "Rerank score below acceptance threshold"
                        );
                    }
                }
                Err(e) => self.recovered(&e.into()),
            }
        }

        Some(VectorEvidence::vector(raw_top))
    }

    fn recovered(&self, error: &DetectionError) {
        self.counters.recovered_errors();
        warn!(stage = error.stage(), error = %error, "Detection stage failed, continuing");
    }
}
