use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

use crate::cache::CacheStats;
use crate::intent::DetectionMethod;
use crate::rerank::RerankerStats;
use crate::rules::RuleStats;
use crate::vectordb::IndexStats;

const METHODS: [DetectionMethod; 5] = [
    DetectionMethod::Rule,
    DetectionMethod::Vector,
    DetectionMethod::Rerank,
    DetectionMethod::Hybrid,
    DetectionMethod::Fallback,
];

fn method_slot(method: DetectionMethod) -> usize {
    METHODS.iter().position(|m| *m == method).unwrap_or(METHODS.len() - 1)
}

/// Lock-free request counters shared by concurrent detections.
#[derive(Debug, Default)]
pub(crate) struct DetectionCounters {
    total_requests: AtomicU64,
    cache_hits: AtomicU64,
    irrelevant: AtomicU64,
    rule_calls: AtomicU64,
    early_exits: AtomicU64,
    vector_calls: AtomicU64,
    rerank_calls: AtomicU64,
    recovered_errors: AtomicU64,
    batches: AtomicU64,
    total_latency_us: AtomicU64,
    by_method: [AtomicU64; 5],
}

macro_rules! bump {
    ($($name:ident),* $(,)?) => {
        $(
            #[inline]
            pub(crate) fn $name(&self) {
                self.$name.fetch_add(1, Ordering::Relaxed);
            }
        )*
    };
}

impl DetectionCounters {
    bump!(
        total_requests,
        cache_hits,
        irrelevant,
        rule_calls,
        early_exits,
        vector_calls,
        rerank_calls,
        recovered_errors,
        batches,
    );

    /// Records a finished (non-cached) detection.
    pub(crate) fn record(&self, method: DetectionMethod, elapsed: Duration) {
        self.by_method[method_slot(method)].fetch_add(1, Ordering::Relaxed);
        self.total_latency_us
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    pub(crate) fn reset(&self) {
        let all = [
            &self.total_requests,
            &self.cache_hits,
            &self.irrelevant,
            &self.rule_calls,
            &self.early_exits,
            &self.vector_calls,
            &self.rerank_calls,
            &self.recovered_errors,
            &self.batches,
            &self.total_latency_us,
        ];
        for c in all.into_iter().chain(self.by_method.iter()) {
            c.store(0, Ordering::Relaxed);
        }
    }

    pub(crate) fn snapshot(&self) -> PerformanceStats {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        let total = load(&self.total_requests);
        let cache_hits = load(&self.cache_hits);
        let by_method: BTreeMap<&'static str, u64> = METHODS
            .iter()
            .zip(self.by_method.iter())
            .map(|(m, c)| (m.as_str(), load(c)))
            .collect();
        let detected: u64 = by_method.values().sum();

        let ratio = |n: u64, d: u64| if d > 0 { n as f64 / d as f64 } else { 0.0 };

        PerformanceStats {
            total_requests: total,
            cache_hits,
            irrelevant_queries: load(&self.irrelevant),
            rule_calls: load(&self.rule_calls),
            early_exits: load(&self.early_exits),
            vector_calls: load(&self.vector_calls),
            rerank_calls: load(&self.rerank_calls),
            fallbacks: by_method.get("fallback").copied().unwrap_or(0),
            recovered_errors: load(&self.recovered_errors),
            batches: load(&self.batches),
            average_latency_ms: ratio(load(&self.total_latency_us), detected) / 1000.0,
            cache_hit_rate: ratio(cache_hits, total),
            by_method,
        }
    }
}

/// Point-in-time detection metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceStats {
    pub total_requests: u64,
    pub cache_hits: u64,
    pub irrelevant_queries: u64,
    pub rule_calls: u64,
    /// Detections where the rule score skipped vector search.
    pub early_exits: u64,
    pub vector_calls: u64,
    pub rerank_calls: u64,
    pub fallbacks: u64,
    pub recovered_errors: u64,
    pub batches: u64,
    /// Mean over detections that were not served from cache.
    pub average_latency_ms: f64,
    pub cache_hit_rate: f64,
    pub by_method: BTreeMap<&'static str, u64>,
}

/// Everything `get_stats` reports, as one serializable value.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStats {
    pub detection: PerformanceStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_store: Option<IndexStats>,
    pub rules: RuleStats,
    pub reranker: RerankerStats,
}
