//! Shared fixtures: the bundled rule file and example corpus, indexed into
//! an in-memory index with the hash embedder.

use std::path::PathBuf;
use std::sync::Arc;

use intent::config::HybridConfig;
use intent::embedding::{HashEmbedder, QueryEmbedder};
use intent::rules::RuleSet;
use intent::service::HybridIntentService;
use intent::text::TextNormalizer;
use intent::vectordb::{IndexReport, IntentCorpus, MockIntentIndex, index_corpus};

pub const EMBEDDING_DIM: usize = 384;

pub fn data_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data").join(name)
}

pub fn rules_path() -> PathBuf {
    data_path("rules.json")
}

pub fn corpus_path() -> PathBuf {
    data_path("intent-examples.json")
}

pub struct IndexedService {
    pub service: HybridIntentService,
    pub index: Arc<MockIntentIndex>,
    pub report: IndexReport,
}

/// Bundled rules + bundled corpus, indexed before the service is built.
pub async fn indexed_service(config: HybridConfig) -> IndexedService {
    let normalizer = Arc::new(TextNormalizer::new());
    let embedder: Arc<dyn QueryEmbedder> = Arc::new(HashEmbedder::new(EMBEDDING_DIM));
    let index = Arc::new(MockIntentIndex::new());

    let corpus = IntentCorpus::load(&corpus_path()).expect("bundled corpus should load");
    let report = index_corpus(&corpus, embedder.as_ref(), index.as_ref(), &normalizer)
        .await
        .expect("indexing into the mock should succeed");

    let rules = RuleSet::load(&rules_path(), &normalizer).expect("bundled rules should load");

    let service = HybridIntentService::builder()
        .config(config)
        .normalizer(normalizer)
        .rules(rules)
        .embedder(embedder)
        .index(index.clone())
        .build()
        .expect("service should build");

    IndexedService {
        service,
        index,
        report,
    }
}
