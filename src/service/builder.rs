use std::sync::Arc;

use tracing::info;

use super::stats::DetectionCounters;
use super::{BuildError, HybridIntentService};
use crate::cache::{MemoryResultStore, ResultStore};
use crate::config::{DEFAULT_CACHE_CAPACITY, HybridConfig, ServiceConfig};
use crate::embedding::{HashEmbedder, OpenAiEmbedder, QueryEmbedder};
use crate::rerank::{CandidateReranker, PairScorer, RerankerConfig, load_scorer};
use crate::rules::{RuleMatcher, RuleSet};
use crate::text::TextNormalizer;
use crate::vector::VectorMatcher;
use crate::vectordb::{IntentIndex, QdrantIndex};

/// Assembles a [`HybridIntentService`].
///
/// Unset collaborators default to: built-in rules, no vector stage, lexical
/// reranker scorer, in-memory result cache. The reranker settings pick the
/// scorer when none is given and always bound how many candidates survive.
#[derive(Default)]
pub struct HybridIntentServiceBuilder {
    config: Option<HybridConfig>,
    normalizer: Option<Arc<TextNormalizer>>,
    rules: Option<RuleSet>,
    embedder: Option<Arc<dyn QueryEmbedder>>,
    index: Option<Arc<dyn IntentIndex>>,
    scorer: Option<Arc<dyn PairScorer>>,
    reranker: RerankerConfig,
    cache: Option<Arc<dyn ResultStore>>,
    cache_capacity: Option<usize>,
}

impl HybridIntentServiceBuilder {
    pub fn config(mut self, config: HybridConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn normalizer(mut self, normalizer: Arc<TextNormalizer>) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    /// Rules must have been compiled with the same normalizer.
    pub fn rules(mut self, rules: RuleSet) -> Self {
        self.rules = Some(rules);
        self
    }

    pub fn embedder(mut self, embedder: Arc<dyn QueryEmbedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn index(mut self, index: Arc<dyn IntentIndex>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn scorer(mut self, scorer: Arc<dyn PairScorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    pub fn reranker_config(mut self, reranker: RerankerConfig) -> Self {
        self.reranker = reranker;
        self
    }

    pub fn cache(mut self, cache: Arc<dyn ResultStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = Some(capacity);
        self
    }

    pub fn build(self) -> Result<HybridIntentService, BuildError> {
        let config = match self.config {
            Some(config) => {
                config.validate()?;
                config
            }
            None => HybridConfig::default(),
        };
        let config = Arc::new(config);
        let normalizer = self
            .normalizer
            .unwrap_or_else(|| Arc::new(TextNormalizer::new()));

        let rule_set = self
            .rules
            .unwrap_or_else(|| RuleSet::builtin(&normalizer));
        let rules = Arc::new(RuleMatcher::new(
            rule_set,
            Arc::clone(&normalizer),
            config.scoring().clone(),
        ));

        let vector = match (self.embedder, self.index) {
            (Some(embedder), Some(index)) => Some(VectorMatcher::new(
                embedder,
                index,
                Arc::clone(&normalizer),
                Arc::clone(&config),
            )),
            (None, Some(_)) => return Err(BuildError::MissingEmbedder),
            (_, None) => None,
        };

        self.reranker.validate()?;
        let reranker = match self.scorer {
            Some(scorer) => Some(scorer),
            None if config.rerank_enabled() => Some(load_scorer(&self.reranker)?),
            None => None,
        }
        .map_or_else(CandidateReranker::disabled, |scorer| {
            CandidateReranker::new(scorer, config.rerank_enabled(), config.rerank_timeout())
                .with_top_k(self.reranker.top_k)
        });

        let cache = if config.enable_caching() {
            Some(self.cache.unwrap_or_else(|| {
                Arc::new(MemoryResultStore::new(
                    self.cache_capacity.unwrap_or(DEFAULT_CACHE_CAPACITY),
                )) as Arc<dyn ResultStore>
            }))
        } else {
            None
        };

        info!(
            rules = rules.stats().enabled_rules,
            vector_search = vector.is_some(),
            rerank = reranker.is_enabled(),
            caching = cache.is_some(),
            "Hybrid intent service initialized"
        );

        Ok(HybridIntentService {
            config,
            normalizer,
            rules,
            vector,
            reranker,
            cache,
            counters: Arc::new(DetectionCounters::default()),
        })
    }

    /// Wires collaborators from environment-style settings.
    ///
    /// No Qdrant URL disables the vector stage. Without an API key the
    /// deterministic hash embedder is used.
    pub fn from_service_config(
        service: &ServiceConfig,
        config: HybridConfig,
    ) -> Result<Self, BuildError> {
        service.validate()?;
        let normalizer = Arc::new(TextNormalizer::new());
        let rules = RuleSet::load_or_builtin(service.rules_path.as_deref(), &normalizer);

        let mut builder = Self::default()
            .normalizer(normalizer)
            .rules(rules)
            .cache_capacity(service.cache_capacity);

        if let Some(url) = &service.qdrant_url {
            builder = builder
                .embedder(service_embedder(service)?)
                .index(Arc::new(QdrantIndex::new(url, service.collection.clone())?));
        }

        let reranker = RerankerConfig {
            model_path: service.reranker_path.clone(),
            top_k: service.rerank_top_k,
            ..RerankerConfig::default()
        };

        Ok(builder.reranker_config(reranker).config(config))
    }
}

/// The embedder described by `service`.
pub fn service_embedder(
    service: &ServiceConfig,
) -> Result<Arc<dyn QueryEmbedder>, BuildError> {
    Ok(match &service.embedding_api_key {
        Some(key) => Arc::new(OpenAiEmbedder::new(
            &service.embedding_url,
            &service.embedding_model,
            key,
            service.embedding_dim as usize,
        )?),
        None => {
            info!(dim = service.embedding_dim, "No embedding API key, using hash embedder");
            Arc::new(HashEmbedder::new(service.embedding_dim as usize))
        }
    })
}
