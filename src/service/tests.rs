use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::*;
use crate::cache::MockResultStore;
use crate::config::ServiceConfig;
use crate::embedding::{EmbeddingError, MockEmbedder, QueryEmbedder};
use crate::intent::{DetectionMethod, Metadata, SearchCandidate};
use crate::rerank::{PairScorer, RerankError, RerankerConfig};
use crate::rules::{Priority, RuleDefinition, RuleSet};
use crate::vectordb::{IndexPoint, IntentIndex, MockIntentIndex};

const TUITION_QUERY: &str = "Học phí ngành CNTT bao nhiêu?";

fn unit(angle_deg: f32) -> Vec<f32> {
    let r = angle_deg.to_radians();
    vec![r.cos(), r.sin()]
}

fn point(id: u64, intent: &str, vector: Vec<f32>) -> IndexPoint {
    IndexPoint {
        id,
        vector,
        text: format!("example {id}"),
        intent_id: intent.to_string(),
        intent_name: intent.to_string(),
        original_text: format!("example {id}"),
        language: "vi".to_string(),
        extra: Metadata::new(),
    }
}

/// Scores candidates by their text; unknown texts get `default`.
struct TableScorer {
    scores: HashMap<&'static str, f32>,
    default: f32,
}

impl PairScorer for TableScorer {
    fn score(&self, _query: &str, candidate: &str) -> Result<f32, RerankError> {
        Ok(self.scores.get(candidate).copied().unwrap_or(self.default))
    }

    fn name(&self) -> &str {
        "table"
    }
}

struct Fixture {
    service: HybridIntentService,
    embedder: Arc<MockEmbedder>,
    index: Arc<MockIntentIndex>,
}

#[derive(Default)]
struct Setup {
    config: Option<HybridConfig>,
    rules: Option<Vec<RuleDefinition>>,
    /// Query (as typed) and the vector the embedder returns for it.
    vectors: Vec<(&'static str, Vec<f32>)>,
    points: Vec<IndexPoint>,
    scorer: Option<Arc<dyn PairScorer>>,
    cache: Option<Arc<dyn ResultStore>>,
}

impl Setup {
    async fn build(self) -> Fixture {
        let normalizer = Arc::new(TextNormalizer::new());

        let mut embedder = MockEmbedder::new(2);
        for (query, vector) in self.vectors {
            embedder = embedder.with_vector(&normalizer.normalize(query), vector);
        }
        let embedder = Arc::new(embedder);

        let index = Arc::new(MockIntentIndex::new());
        index.ensure_collection(2).await.unwrap();
        index.upsert(self.points).await.unwrap();

        let rules = match self.rules {
            Some(defs) => RuleSet::from_definitions(defs, &normalizer),
            None => RuleSet::builtin(&normalizer),
        };

        let mut builder = HybridIntentService::builder()
            .config(self.config.unwrap_or_default())
            .normalizer(normalizer)
            .rules(rules)
            .embedder(embedder.clone())
            .index(index.clone());
        if let Some(scorer) = self.scorer {
            builder = builder.scorer(scorer);
        }
        if let Some(cache) = self.cache {
            builder = builder.cache(cache);
        }

        Fixture {
            service: builder.build().unwrap(),
            embedder,
            index,
        }
    }
}

/// Scores 0.4: one multi-word keyword at weight 1.0.
fn medium_rule() -> RuleDefinition {
    RuleDefinition::new("dormitory_info", 1.0).with_keywords(["ký túc xá"])
}

/// Scores about 0.75: above the high threshold, below early exit.
fn high_rule() -> RuleDefinition {
    RuleDefinition::new("admission_requirements", 1.875).with_keywords(["điểm chuẩn"])
}

#[tokio::test]
async fn test_builtin_rules_detect_tuition() {
    let service = HybridIntentService::builder().build().unwrap();
    assert!(!service.has_vector_search());

    let result = service.detect_intent(&TUITION_QUERY.into()).await;
    assert_eq!(result.id, "tuition_inquiry");
    assert_eq!(result.method, DetectionMethod::Rule);
    assert!((0.5..=1.0).contains(&result.confidence));
    assert!(result.metadata.contains_key("matched_keywords"));
}

#[tokio::test]
async fn test_irrelevant_query_skips_all_matchers() {
    let f = Setup::default().build().await;

    let result = f
        .service
        .detect_intent(&"Thời tiết hôm nay thế nào?".into())
        .await;
    assert!(result.is_fallback());
    assert_eq!(result.id, "unknown");
    assert!((result.confidence - 0.1).abs() < 1e-6);
    assert_eq!(result.metadata["reason"], "irrelevant");
    assert_eq!(f.embedder.calls(), 0);
    assert_eq!(f.index.search_calls(), 0);

    let stats = f.service.get_stats().await.detection;
    assert_eq!(stats.irrelevant_queries, 1);
    assert_eq!(stats.rule_calls, 0);
}

#[tokio::test]
async fn test_empty_query_is_fallback() {
    let f = Setup::default().build().await;
    let result = f.service.detect_intent(&"".into()).await;
    assert!(result.is_fallback());
    assert_eq!(f.embedder.calls(), 0);
}

#[tokio::test]
async fn test_early_exit_skips_vector_search() {
    let f = Setup {
        points: vec![point(1, "scholarship", unit(0.0))],
        ..Setup::default()
    }
    .build()
    .await;

    let result = f.service.detect_intent(&TUITION_QUERY.into()).await;
    assert_eq!(result.id, "tuition_inquiry");
    assert_eq!(result.method, DetectionMethod::Rule);
    assert_eq!(f.embedder.calls(), 0);
    assert_eq!(f.index.search_calls(), 0);

    let stats = f.service.get_stats().await.detection;
    assert_eq!(stats.early_exits, 1);
    assert_eq!(stats.vector_calls, 0);
}

#[tokio::test]
async fn test_vector_only_match() {
    let f = Setup {
        rules: Some(vec![medium_rule()]),
        vectors: vec![("where is the parking lot", unit(0.0))],
        points: vec![point(1, "parking_info", unit(10.0)), point(2, "other", unit(40.0))],
        ..Setup::default()
    }
    .build()
    .await;

    let result = f
        .service
        .detect_intent(&"where is the parking lot".into())
        .await;
    assert_eq!(result.id, "parking_info");
    assert_eq!(result.method, DetectionMethod::Vector);
    // cos(10deg) ~ 0.985, boosted and capped.
    assert!((result.confidence - 0.95).abs() < 1e-5);
    assert_eq!(result.metadata["matched_text"], "example 1");
    assert_eq!(f.embedder.calls(), 1);
}

#[tokio::test]
async fn test_strong_rule_and_weaker_vector_is_hybrid() {
    let f = Setup {
        rules: Some(vec![high_rule()]),
        vectors: vec![("điểm chuẩn năm nay", unit(0.0))],
        // cos(45deg) ~ 0.707: confident, not boosted, below the rule.
        points: vec![point(1, "scholarship", unit(45.0))],
        ..Setup::default()
    }
    .build()
    .await;

    let result = f.service.detect_intent(&"điểm chuẩn năm nay".into()).await;
    assert_eq!(result.id, "admission_requirements");
    assert_eq!(result.method, DetectionMethod::Hybrid);
    assert_eq!(result.metadata["vector_intent"], "scholarship");
    assert!(result.confidence > 0.7 && result.confidence < 0.8);
}

#[tokio::test]
async fn test_stronger_vector_beats_high_rule() {
    let f = Setup {
        rules: Some(vec![high_rule()]),
        vectors: vec![("điểm chuẩn năm nay", unit(0.0))],
        points: vec![point(1, "scholarship", unit(20.0))],
        ..Setup::default()
    }
    .build()
    .await;

    let result = f.service.detect_intent(&"điểm chuẩn năm nay".into()).await;
    assert_eq!(result.id, "scholarship");
    assert_eq!(result.method, DetectionMethod::Vector);
}

#[tokio::test]
async fn test_weak_vector_does_not_override_medium_rule() {
    let f = Setup {
        rules: Some(vec![medium_rule()]),
        vectors: vec![("ký túc xá còn chỗ không", unit(0.0))],
        // cos(55deg) ~ 0.574: retrieved under the relaxed threshold only.
        points: vec![point(1, "housing_fee", unit(55.0))],
        ..Setup::default()
    }
    .build()
    .await;

    let result = f
        .service
        .detect_intent(&"ký túc xá còn chỗ không".into())
        .await;
    assert_eq!(result.id, "dormitory_info");
    assert_eq!(result.method, DetectionMethod::Rule);
    assert_eq!(f.index.search_calls(), 1);
}

#[tokio::test]
async fn test_weak_vector_without_rule_is_still_used() {
    let f = Setup {
        rules: Some(vec![medium_rule()]),
        vectors: vec![("lịch nghỉ lễ", unit(0.0))],
        points: vec![point(1, "academic_calendar", unit(55.0))],
        ..Setup::default()
    }
    .build()
    .await;

    let result = f.service.detect_intent(&"lịch nghỉ lễ".into()).await;
    assert_eq!(result.id, "academic_calendar");
    assert_eq!(result.method, DetectionMethod::Vector);
    assert!(result.confidence < 0.6);
}

#[tokio::test]
async fn test_no_evidence_yields_no_match_fallback() {
    let f = Setup {
        rules: Some(vec![medium_rule()]),
        vectors: vec![("xyz qwerty", unit(0.0))],
        points: vec![point(1, "far_away", unit(80.0))],
        ..Setup::default()
    }
    .build()
    .await;

    let result = f.service.detect_intent(&"xyz qwerty".into()).await;
    assert!(result.is_fallback());
    assert!((result.confidence - 0.2).abs() < 1e-6);
}

#[tokio::test]
async fn test_rerank_result_is_accepted_above_threshold() {
    let scorer = TableScorer {
        scores: HashMap::from([("example 2", 0.9)]),
        default: 0.1,
    };
    let f = Setup {
        config: Some(HybridConfig::builder().rerank_enabled(true).build().unwrap()),
        rules: Some(vec![medium_rule()]),
        vectors: vec![("lịch thi cuối kỳ", unit(0.0))],
        points: vec![point(1, "tuition_inquiry", unit(10.0)), point(2, "exam_schedule", unit(30.0))],
        scorer: Some(Arc::new(scorer)),
        ..Setup::default()
    }
    .build()
    .await;

    let result = f.service.detect_intent(&"lịch thi cuối kỳ".into()).await;
    assert_eq!(result.id, "exam_schedule");
    assert_eq!(result.method, DetectionMethod::Rerank);
    assert!((result.confidence - 0.9).abs() < 1e-6);
    assert_eq!(result.metadata["candidate"]["reranked"], true);

    let stats = f.service.get_stats().await;
    assert_eq!(stats.detection.rerank_calls, 1);
    assert!(stats.reranker.enabled);
    assert_eq!(stats.reranker.scorer, "table");
}

#[tokio::test]
async fn test_reranker_settings_bound_candidates() {
    let service = HybridIntentService::builder()
        .config(HybridConfig::builder().rerank_enabled(true).build().unwrap())
        .reranker_config(RerankerConfig::lexical().with_top_k(2))
        .build()
        .unwrap();

    let stats = service.get_stats().await.reranker;
    assert!(stats.enabled);
    assert_eq!(stats.scorer, "lexical");
    assert_eq!(stats.top_k, Some(2));
}

#[tokio::test]
async fn test_reranker_top_k_applies_to_injected_scorer() {
    let scorer = TableScorer {
        scores: HashMap::new(),
        default: 0.5,
    };
    let service = HybridIntentService::builder()
        .config(HybridConfig::builder().rerank_enabled(true).build().unwrap())
        .scorer(Arc::new(scorer))
        .reranker_config(RerankerConfig::lexical().with_top_k(1))
        .build()
        .unwrap();

    assert_eq!(service.get_stats().await.reranker.top_k, Some(1));
}

#[test]
fn test_zero_reranker_top_k_is_rejected() {
    let config = RerankerConfig {
        top_k: Some(0),
        ..RerankerConfig::default()
    };
    let result = HybridIntentService::builder().reranker_config(config).build();
    assert!(matches!(result, Err(BuildError::Rerank(_))));
}

#[test]
fn test_service_config_top_k_reaches_reranker() {
    let service_config = ServiceConfig {
        rerank_top_k: Some(3),
        ..ServiceConfig::default()
    };
    let config = HybridConfig::builder().rerank_enabled(true).build().unwrap();
    let service = HybridIntentServiceBuilder::from_service_config(&service_config, config)
        .unwrap()
        .build()
        .unwrap();

    let stats = service.reranker.stats();
    assert_eq!(stats.top_k, Some(3));
    assert_eq!(stats.scorer, "lexical");
}

#[tokio::test]
async fn test_rerank_below_threshold_keeps_vector_top() {
    let scorer = TableScorer {
        scores: HashMap::new(),
        default: 0.3,
    };
    let f = Setup {
        config: Some(HybridConfig::builder().rerank_enabled(true).build().unwrap()),
        rules: Some(vec![medium_rule()]),
        vectors: vec![("lịch thi cuối kỳ", unit(0.0))],
        points: vec![point(1, "exam_schedule", unit(10.0)), point(2, "other", unit(30.0))],
        scorer: Some(Arc::new(scorer)),
        ..Setup::default()
    }
    .build()
    .await;

    let result = f.service.detect_intent(&"lịch thi cuối kỳ".into()).await;
    assert_eq!(result.id, "exam_schedule");
    assert_eq!(result.method, DetectionMethod::Vector);
    assert!((result.confidence - 0.95).abs() < 1e-5);
}

#[tokio::test]
async fn test_equivalent_queries_share_cache_entry() {
    let f = Setup::default().build().await;

    let first = f.service.detect_intent(&TUITION_QUERY.into()).await;
    let second = f
        .service
        .detect_intent(&"học phí   ngành công nghệ thông tin bao nhiêu?".into())
        .await;
    assert_eq!(first, second);

    let stats = f.service.get_stats().await;
    assert_eq!(stats.detection.cache_hits, 1);
    assert_eq!(stats.detection.total_requests, 2);
    assert_eq!(stats.detection.rule_calls, 1);
    assert_eq!(stats.cache.unwrap().sets, 1);
}

#[tokio::test]
async fn test_low_confidence_results_are_not_cached() {
    let f = Setup {
        rules: Some(vec![medium_rule()]),
        ..Setup::default()
    }
    .build()
    .await;

    let query: DetectionContext = "ký túc xá còn chỗ không".into();
    f.service.detect_intent(&query).await;
    f.service.detect_intent(&query).await;

    let stats = f.service.get_stats().await;
    assert_eq!(stats.detection.cache_hits, 0);
    assert_eq!(stats.cache.unwrap().sets, 0);
}

#[tokio::test]
async fn test_fallbacks_are_not_cached() {
    let config = HybridConfig::builder()
        .cache_min_confidence(0.0)
        .build()
        .unwrap();
    let f = Setup {
        config: Some(config),
        ..Setup::default()
    }
    .build()
    .await;

    let first = f.service.detect_intent(&"xyz qwerty".into()).await;
    assert!(first.is_fallback());
    f.service.detect_intent(&"xyz qwerty".into()).await;

    let stats = f.service.get_stats().await;
    assert_eq!(stats.detection.cache_hits, 0);
    assert_eq!(stats.cache.unwrap().sets, 0);
}

#[tokio::test]
async fn test_clear_cache_forces_recompute() {
    let f = Setup::default().build().await;

    f.service.detect_intent(&TUITION_QUERY.into()).await;
    f.service.clear_cache().await;
    f.service.detect_intent(&TUITION_QUERY.into()).await;

    let stats = f.service.get_stats().await.detection;
    assert_eq!(stats.cache_hits, 0);
    assert_eq!(stats.rule_calls, 2);
}

#[tokio::test]
async fn test_caching_disabled_has_no_cache_stats() {
    let f = Setup {
        config: Some(HybridConfig::builder().enable_caching(false).build().unwrap()),
        ..Setup::default()
    }
    .build()
    .await;

    f.service.detect_intent(&TUITION_QUERY.into()).await;
    let stats = f.service.get_stats().await;
    assert!(stats.cache.is_none());
}

#[tokio::test]
async fn test_failing_cache_degrades_to_uncached() {
    let cache = Arc::new(MockResultStore::new(16));
    cache.set_failing(true);
    let f = Setup {
        cache: Some(cache),
        ..Setup::default()
    }
    .build()
    .await;

    let result = f.service.detect_intent(&TUITION_QUERY.into()).await;
    assert_eq!(result.id, "tuition_inquiry");

    let stats = f.service.get_stats().await.detection;
    // Failed lookup and failed write.
    assert_eq!(stats.recovered_errors, 2);
}

#[tokio::test]
async fn test_failing_index_keeps_rule_result() {
    let f = Setup {
        rules: Some(vec![medium_rule()]),
        vectors: vec![("ký túc xá còn chỗ không", unit(0.0))],
        points: vec![point(1, "housing_fee", unit(0.0))],
        ..Setup::default()
    }
    .build()
    .await;
    f.index.set_failing(true);

    let result = f
        .service
        .detect_intent(&"ký túc xá còn chỗ không".into())
        .await;
    assert_eq!(result.id, "dormitory_info");
    assert_eq!(result.method, DetectionMethod::Rule);
    assert_eq!(f.service.get_stats().await.detection.recovered_errors, 1);
}

#[tokio::test]
async fn test_failing_embedder_falls_back() {
    let f = Setup {
        rules: Some(vec![medium_rule()]),
        points: vec![point(1, "anything", unit(0.0))],
        ..Setup::default()
    }
    .build()
    .await;
    f.embedder.set_failing(true);

    let result = f.service.detect_intent(&"lịch nghỉ lễ".into()).await;
    assert!(result.is_fallback());
    assert!((result.confidence - 0.2).abs() < 1e-6);
    assert_eq!(f.index.search_calls(), 0);
    assert_eq!(f.service.get_stats().await.detection.recovered_errors, 1);
}

#[tokio::test(start_paused = true)]
async fn test_stalled_search_times_out() {
    let f = Setup {
        rules: Some(vec![medium_rule()]),
        vectors: vec![("ký túc xá còn chỗ không", unit(0.0))],
        points: vec![point(1, "housing_fee", unit(0.0))],
        ..Setup::default()
    }
    .build()
    .await;
    f.index.set_delay(Some(Duration::from_secs(60)));

    let result = f
        .service
        .detect_intent(&"ký túc xá còn chỗ không".into())
        .await;
    assert_eq!(result.id, "dormitory_info");
    assert_eq!(f.service.get_stats().await.detection.recovered_errors, 1);
}

#[tokio::test]
async fn test_batch_preserves_order() {
    let f = Setup::default().build().await;
    let queries = vec![
        TUITION_QUERY,
        "Thời tiết hôm nay thế nào?",
        "",
        "Campus ở đâu?",
        "Điểm chuẩn 2024 bao nhiêu?",
    ];

    let results = f.service.detect_batch(queries, 2).await;
    let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(
        ids,
        [
            "tuition_inquiry",
            "unknown",
            "unknown",
            "campus_info",
            "admission_requirements"
        ]
    );

    let stats = f.service.get_stats().await.detection;
    assert_eq!(stats.batches, 1);
    assert_eq!(stats.total_requests, 5);
}

const EXAM_QUERY: &str = "lịch thi cuối kỳ";
const HOLIDAY_QUERY: &str = "lịch nghỉ lễ";
const PARKING_QUERY: &str = "where is the parking lot";

/// Embeds known texts to fixed vectors after an optional per-text stall.
/// Panics on `poison`. Records completion order and peak concurrency.
#[derive(Default)]
struct ScriptedEmbedder {
    script: HashMap<String, (Vec<f32>, Duration)>,
    poison: Option<String>,
    finished: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedEmbedder {
    fn new(normalizer: &TextNormalizer, script: &[(&str, Vec<f32>, Duration)]) -> Self {
        Self {
            script: script
                .iter()
                .map(|(q, v, d)| (normalizer.normalize(q), (v.clone(), *d)))
                .collect(),
            ..Self::default()
        }
    }

    fn poisoned(mut self, normalizer: &TextNormalizer, query: &str) -> Self {
        self.poison = Some(normalizer.normalize(query));
        self
    }
}

#[async_trait]
impl QueryEmbedder for ScriptedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let entry = self.script.get(text).cloned();
        if let Some((_, delay)) = &entry {
            tokio::time::sleep(*delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.poison.as_deref() == Some(text) {
            panic!("embedder blew up on {text:?}");
        }
        self.finished.lock().push(text.to_string());

        entry.map(|(v, _)| v).ok_or_else(|| EmbeddingError::Unavailable {
            reason: format!("no script for {text:?}"),
        })
    }

    fn dimension(&self) -> usize {
        2
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

async fn scripted_service(
    normalizer: Arc<TextNormalizer>,
    embedder: Arc<ScriptedEmbedder>,
    config: HybridConfig,
) -> HybridIntentService {
    let index = Arc::new(MockIntentIndex::new());
    index.ensure_collection(2).await.unwrap();
    index
        .upsert(vec![
            point(1, "exam_schedule", unit(0.0)),
            point(2, "holiday_calendar", unit(90.0)),
            point(3, "parking_info", unit(180.0)),
        ])
        .await
        .unwrap();

    let rules = RuleSet::from_definitions(vec![medium_rule()], &normalizer);
    HybridIntentService::builder()
        .config(config)
        .normalizer(normalizer)
        .rules(rules)
        .embedder(embedder)
        .index(index)
        .build()
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_batch_order_holds_when_first_query_finishes_last() {
    let normalizer = Arc::new(TextNormalizer::new());
    let embedder = Arc::new(ScriptedEmbedder::new(
        &normalizer,
        &[
            (EXAM_QUERY, unit(0.0), Duration::from_millis(300)),
            (HOLIDAY_QUERY, unit(90.0), Duration::ZERO),
            (PARKING_QUERY, unit(180.0), Duration::ZERO),
        ],
    ));
    let service =
        scripted_service(Arc::clone(&normalizer), embedder.clone(), HybridConfig::default()).await;

    let results = service
        .detect_batch([EXAM_QUERY, HOLIDAY_QUERY, PARKING_QUERY], 3)
        .await;

    let finished = embedder.finished.lock().clone();
    assert_eq!(finished.len(), 3);
    assert_eq!(finished.last(), Some(&normalizer.normalize(EXAM_QUERY)));

    let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["exam_schedule", "holiday_calendar", "parking_info"]);
    assert!(results.iter().all(|r| r.method == DetectionMethod::Vector));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_batch_never_exceeds_max_concurrent() {
    let normalizer = Arc::new(TextNormalizer::new());
    let embedder = Arc::new(ScriptedEmbedder::new(
        &normalizer,
        &[(EXAM_QUERY, unit(0.0), Duration::from_millis(30))],
    ));
    let config = HybridConfig::builder().enable_caching(false).build().unwrap();
    let service = scripted_service(normalizer, embedder.clone(), config).await;

    let results = service.detect_batch([EXAM_QUERY; 8], 2).await;

    assert_eq!(results.len(), 8);
    assert!(results.iter().all(|r| r.id == "exam_schedule"));
    assert_eq!(embedder.peak.load(Ordering::SeqCst), 2);
    assert_eq!(embedder.finished.lock().len(), 8);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_panicking_query_degrades_only_its_slot() {
    let normalizer = Arc::new(TextNormalizer::new());
    let embedder = Arc::new(
        ScriptedEmbedder::new(
            &normalizer,
            &[
                (EXAM_QUERY, unit(0.0), Duration::ZERO),
                (HOLIDAY_QUERY, unit(90.0), Duration::ZERO),
                (PARKING_QUERY, unit(180.0), Duration::ZERO),
            ],
        )
        .poisoned(&normalizer, HOLIDAY_QUERY),
    );
    let service = scripted_service(normalizer, embedder, HybridConfig::default()).await;

    let results = service
        .detect_batch([EXAM_QUERY, HOLIDAY_QUERY, PARKING_QUERY], 2)
        .await;

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].id, "exam_schedule");
    assert!(!results[0].is_fallback());
    assert!(results[1].is_fallback());
    assert!((results[1].confidence - 0.1).abs() < 1e-6);
    assert!(results[1].metadata.contains_key("error"));
    assert_eq!(results[2].id, "parking_info");
    assert!(!results[2].is_fallback());

    let stats = service.get_stats().await.detection;
    assert_eq!(stats.batches, 1);
    assert_eq!(stats.recovered_errors, 1);
}

#[tokio::test]
async fn test_batch_of_nothing() {
    let f = Setup::default().build().await;
    let results = f.service.detect_batch(Vec::<String>::new(), 4).await;
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_stats_by_method_and_reset() {
    let f = Setup::default().build().await;
    f.service.detect_intent(&TUITION_QUERY.into()).await;
    f.service.detect_intent(&"weather forecast".into()).await;

    let stats = f.service.get_stats().await;
    assert_eq!(stats.detection.by_method["rule"], 1);
    assert_eq!(stats.detection.by_method["fallback"], 1);
    assert_eq!(stats.detection.fallbacks, 1);
    assert_eq!(stats.vector_store.as_ref().unwrap().points_count, Some(0));

    let json = serde_json::to_value(&stats).unwrap();
    assert_eq!(json["detection"]["total_requests"], 2);
    assert!(json["rules"].is_object());
    assert_eq!(json["cache"]["type"], "memory");

    f.service.reset_stats();
    let stats = f.service.get_stats().await.detection;
    assert_eq!(stats.total_requests, 0);
    assert_eq!(stats.by_method["rule"], 0);
    assert_eq!(stats.average_latency_ms, 0.0);
}

#[tokio::test]
async fn test_rule_hot_reload_applies_to_next_detection() {
    let f = Setup {
        rules: Some(vec![medium_rule()]),
        config: Some(HybridConfig::builder().enable_caching(false).build().unwrap()),
        ..Setup::default()
    }
    .build()
    .await;
    let query: DetectionContext = "ký túc xá còn chỗ không".into();
    assert_eq!(f.service.detect_intent(&query).await.id, "dormitory_info");

    let replacement = RuleSet::from_definitions(
        vec![RuleDefinition::new("housing", 1.0)
            .with_keywords(["ký túc xá"])
            .with_priority(Priority::High)],
        f.service.normalizer(),
    );
    f.service.rules().replace_rules(replacement);
    assert_eq!(f.service.detect_intent(&query).await.id, "housing");
}

#[test]
fn test_index_without_embedder_is_rejected() {
    let err = HybridIntentService::builder()
        .index(Arc::new(MockIntentIndex::new()))
        .build()
        .unwrap_err();
    assert!(matches!(err, BuildError::MissingEmbedder));
}

mod arbitration {
    use super::*;
    use crate::service::arbitrate;

    fn rule(id: &str, score: f32) -> RuleMatch {
        RuleMatch {
            intent_id: id.to_string(),
            score,
            matched_keywords: vec!["k".to_string()],
            matched_patterns: Vec::new(),
            weight: 1.0,
            position: 0,
            priority: Priority::Medium,
            description: String::new(),
        }
    }

    fn vector(id: &str, score: f32) -> VectorEvidence {
        VectorEvidence::vector(SearchCandidate::new("text", id, score, "mock"))
    }

    #[test]
    fn test_early_exit_rule_beats_any_vector() {
        let config = HybridConfig::default();
        let r = rule("tuition_inquiry", 0.85);
        let v = vector("scholarship", 0.95);
        let result = arbitrate(&config, Some(&r), Some(&v));
        assert_eq!(result.id, "tuition_inquiry");
        assert_eq!(result.method, DetectionMethod::Rule);
    }

    #[test]
    fn test_tie_between_high_rule_and_vector_goes_to_rule() {
        let config = HybridConfig::default();
        let r = rule("tuition_inquiry", 0.75);
        let v = vector("scholarship", 0.75);
        let result = arbitrate(&config, Some(&r), Some(&v));
        assert_eq!(result.id, "tuition_inquiry");
        assert_eq!(result.method, DetectionMethod::Hybrid);
    }

    #[test]
    fn test_confident_vector_beats_medium_rule() {
        let config = HybridConfig::default();
        let r = rule("tuition_inquiry", 0.5);
        let v = vector("scholarship", 0.65);
        let result = arbitrate(&config, Some(&r), Some(&v));
        assert_eq!(result.id, "scholarship");
        assert_eq!(result.method, DetectionMethod::Vector);
    }

    #[test]
    fn test_rerank_evidence_uses_its_own_threshold() {
        let config = HybridConfig::default();
        let r = rule("tuition_inquiry", 0.5);
        // Clears the vector threshold but not the rerank one.
        let v = VectorEvidence::reranked(SearchCandidate::new("t", "scholarship", 0.65, "mock"));
        let result = arbitrate(&config, Some(&r), Some(&v));
        assert_eq!(result.id, "tuition_inquiry");
        assert_eq!(result.method, DetectionMethod::Rule);
    }

    #[test]
    fn test_rule_below_medium_loses_to_weak_vector() {
        let config = HybridConfig::default();
        let r = rule("tuition_inquiry", 0.2);
        let v = vector("scholarship", 0.5);
        let result = arbitrate(&config, Some(&r), Some(&v));
        assert_eq!(result.id, "scholarship");
    }

    #[test]
    fn test_weak_rule_alone_is_fallback() {
        let config = HybridConfig::default();
        let r = rule("tuition_inquiry", 0.2);
        let result = arbitrate(&config, Some(&r), None);
        assert!(result.is_fallback());
        assert!((result.confidence - config.no_match_confidence()).abs() < 1e-6);
    }

    #[test]
    fn test_rule_metadata_is_carried() {
        let config = HybridConfig::default();
        let r = rule("tuition_inquiry", 0.9);
        let result = arbitrate(&config, Some(&r), None);
        assert_eq!(result.metadata["priority"], "medium");
        assert_eq!(result.metadata["matched_keywords"][0], "k");
        assert!(!result.metadata.contains_key("description"));
    }
}
