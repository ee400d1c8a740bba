use std::io::Write;

use super::*;
use crate::embedding::{HashEmbedder, MockEmbedder, QueryEmbedder};
use crate::intent::Metadata;
use crate::text::TextNormalizer;

fn point(id: u64, intent: &str, text: &str, vector: Vec<f32>) -> IndexPoint {
    IndexPoint {
        id,
        vector,
        text: text.to_string(),
        intent_id: intent.to_string(),
        intent_name: intent.to_string(),
        original_text: text.to_string(),
        language: "vi".to_string(),
        extra: Metadata::new(),
    }
}

const CORPUS: &str = r#"{
  "intents": [
    {"id": "tuition_inquiry", "name": "Tuition", "examples": [
      "Học phí ngành CNTT bao nhiêu?",
      {"text": "Chi phí học một kỳ", "difficulty": "easy"},
      "   "
    ]},
    {"id": "campus_info", "examples": ["Thư viện mở cửa lúc mấy giờ?"]},
    {"id": "", "examples": ["ignored"]}
  ]
}"#;

#[test]
fn test_cosine_similarity() {
    assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
    assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
}

#[tokio::test]
async fn test_mock_search_orders_and_filters() {
    let index = MockIntentIndex::new();
    index.ensure_collection(2).await.unwrap();
    index
        .upsert(vec![
            point(1, "a", "exact", vec![1.0, 0.0]),
            point(2, "b", "close", vec![0.9, 0.1]),
            point(3, "c", "orthogonal", vec![0.0, 1.0]),
        ])
        .await
        .unwrap();

    let found = index.search(vec![1.0, 0.0], 5, 0.5).await.unwrap();
    let ids: Vec<&str> = found.iter().map(|c| c.intent_id.as_str()).collect();
    assert_eq!(ids, ["a", "b"]);
    assert_eq!(found[0].text, "exact");
    assert_eq!(found[0].source, "mock");

    let top1 = index.search(vec![1.0, 0.0], 1, 0.0).await.unwrap();
    assert_eq!(top1.len(), 1);
    assert_eq!(index.search_calls(), 2);
}

#[tokio::test]
async fn test_mock_upsert_requires_collection_and_dimension() {
    let index = MockIntentIndex::new();
    assert!(matches!(
        index.upsert(vec![point(1, "a", "x", vec![1.0])]).await,
        Err(VectorSearchError::CollectionNotFound { .. })
    ));

    index.ensure_collection(2).await.unwrap();
    assert!(matches!(
        index.upsert(vec![point(1, "a", "x", vec![1.0])]).await,
        Err(VectorSearchError::InvalidDimension { expected: 2, actual: 1 })
    ));
}

#[tokio::test]
async fn test_mock_upsert_replaces_same_id() {
    let index = MockIntentIndex::new();
    index.ensure_collection(2).await.unwrap();
    index.upsert(vec![point(7, "a", "x", vec![1.0, 0.0])]).await.unwrap();
    index.upsert(vec![point(7, "b", "y", vec![0.0, 1.0])]).await.unwrap();
    assert_eq!(index.point_count(), 1);

    let found = index.search(vec![0.0, 1.0], 1, 0.9).await.unwrap();
    assert_eq!(found[0].intent_id, "b");
}

#[tokio::test]
async fn test_mock_failure_modes() {
    let index = MockIntentIndex::new();
    index.set_failing(true);
    assert!(index.search(vec![1.0], 1, 0.0).await.is_err());
    let stats = index.stats().await;
    assert!(!stats.available);
    assert!(stats.error.is_some());
}

#[test]
fn test_payload_fixed_fields_override_extra() {
    let mut p = point(1, "tuition_inquiry", "học phí", vec![]);
    p.extra.insert("intent_id".into(), "spoofed".into());
    p.extra.insert("difficulty".into(), "easy".into());

    let payload = p.payload();
    assert_eq!(payload["intent_id"], "tuition_inquiry");
    assert_eq!(payload["difficulty"], "easy");
}

#[test]
fn test_candidate_from_payload_defaults() {
    let c = candidate_from_payload(0.5, Metadata::new(), "qdrant");
    assert_eq!(c.intent_id, "unknown");
    assert_eq!(c.text, "");
}

#[test]
fn test_qdrant_value_conversion_roundtrip_shapes() {
    use super::model::{json_to_qdrant, qdrant_to_json};
    let v = serde_json::json!({"a": [1, 2.5, "x", true, null], "b": {"c": 3}});
    assert_eq!(qdrant_to_json(json_to_qdrant(v.clone())), v);
}

#[test]
fn test_corpus_parsing() {
    let corpus = IntentCorpus::from_json(CORPUS).unwrap();
    assert_eq!(corpus.intents.len(), 3);
    assert_eq!(corpus.example_count(), 3);
    assert!(matches!(corpus.intents[0].examples[1], Example::Detailed { .. }));
    assert_eq!(corpus.intents[0].examples[1].text(), "Chi phí học một kỳ");
}

#[test]
fn test_corpus_load_errors() {
    let dir = tempfile::tempdir().unwrap();

    let missing = dir.path().join("missing.json");
    assert!(matches!(IntentCorpus::load(&missing), Err(CorpusError::Io { .. })));

    let bad = dir.path().join("bad.json");
    std::fs::write(&bad, "{not json").unwrap();
    assert!(matches!(IntentCorpus::load(&bad), Err(CorpusError::Json { .. })));

    let empty = dir.path().join("empty.json");
    let mut f = std::fs::File::create(&empty).unwrap();
    f.write_all(br#"{"intents": [{"id": "x", "examples": []}]}"#).unwrap();
    assert!(matches!(IntentCorpus::load(&empty), Err(CorpusError::Empty { .. })));
}

#[tokio::test]
async fn test_index_corpus_writes_normalized_points() {
    let corpus = IntentCorpus::from_json(CORPUS).unwrap();
    let normalizer = TextNormalizer::new();
    let embedder = HashEmbedder::new(64);
    let index = MockIntentIndex::new();

    let report = index_corpus(&corpus, &embedder, &index, &normalizer).await.unwrap();
    assert_eq!(report.total_examples, 3);
    assert_eq!(report.indexed_examples, 3);
    assert_eq!(report.failed_embeddings, 0);
    assert_eq!(index.point_count(), 3);

    let query = embedder.embed_sync(&normalizer.normalize("Học phí ngành CNTT bao nhiêu?"));
    let found = index.search(query, 1, 0.0).await.unwrap();
    let top = &found[0];
    assert_eq!(top.intent_id, "tuition_inquiry");
    assert_eq!(top.metadata["intent_name"], "Tuition");
    assert_eq!(top.metadata["original_text"], "Học phí ngành CNTT bao nhiêu?");
    assert_eq!(top.metadata["language"], "vi");
    assert!(top.text.contains("công nghệ thông tin"));
}

#[tokio::test]
async fn test_index_corpus_is_idempotent() {
    let corpus = IntentCorpus::from_json(CORPUS).unwrap();
    let normalizer = TextNormalizer::new();
    let embedder = HashEmbedder::new(32);
    let index = MockIntentIndex::new();

    index_corpus(&corpus, &embedder, &index, &normalizer).await.unwrap();
    index_corpus(&corpus, &embedder, &index, &normalizer).await.unwrap();
    assert_eq!(index.point_count(), 3);
}

#[tokio::test]
async fn test_index_corpus_counts_failed_embeddings() {
    let corpus = IntentCorpus::from_json(CORPUS).unwrap();
    let embedder = MockEmbedder::new(16);
    embedder.set_failing(true);
    let index = MockIntentIndex::new();

    let report = index_corpus(&corpus, &embedder, &index, &TextNormalizer::new())
        .await
        .unwrap();
    assert_eq!(report.indexed_examples, 0);
    assert_eq!(report.failed_embeddings, 3);
    assert_eq!(embedder.dimension(), 16);
}
