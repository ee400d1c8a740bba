//! Detection thresholds and environment-backed service settings.
//!
//! [`HybridConfig`] is validated once at construction and then shared read-only.
//! [`ServiceConfig`] describes which collaborators the binary wires up.
//! Both read `INTENT_*` environment variables on top of defaults.

pub mod error;
mod scoring;

#[cfg(test)]
mod tests;

pub use error::ConfigError;
pub use scoring::RuleScoring;

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_RULE_HIGH_THRESHOLD: f32 = 0.7;
pub const DEFAULT_RULE_MEDIUM_THRESHOLD: f32 = 0.3;
pub const DEFAULT_EARLY_EXIT_THRESHOLD: f32 = 0.8;
pub const DEFAULT_VECTOR_TOP_K: usize = 3;
pub const DEFAULT_VECTOR_THRESHOLD: f32 = 0.6;
pub const DEFAULT_CACHE_MIN_CONFIDENCE: f32 = 0.8;
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);
pub const DEFAULT_RERANK_THRESHOLD: f32 = 0.7;
pub const DEFAULT_MAX_CONCURRENT: usize = 10;

/// Knobs of the hybrid detection pipeline.
///
/// Build with [`HybridConfig::builder`]; invalid combinations fail at `build()`.
#[derive(Debug, Clone, PartialEq)]
pub struct HybridConfig {
    rule_high_confidence_threshold: f32,
    rule_medium_confidence_threshold: f32,
    early_exit_threshold: f32,
    vector_top_k: usize,
    vector_confidence_threshold: f32,
    /// Retrieval runs at `vector_confidence_threshold * search_relaxation`.
    search_relaxation: f32,
    boost_floor: f32,
    boost_factor: f32,
    boost_cap: f32,
    rerank_enabled: bool,
    rerank_threshold: f32,
    enable_caching: bool,
    cache_min_confidence: f32,
    cache_ttl: Duration,
    irrelevant_confidence: f32,
    no_match_confidence: f32,
    max_concurrent: usize,
    embedding_timeout: Duration,
    search_timeout: Duration,
    rerank_timeout: Duration,
    scoring: RuleScoring,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            rule_high_confidence_threshold: DEFAULT_RULE_HIGH_THRESHOLD,
            rule_medium_confidence_threshold: DEFAULT_RULE_MEDIUM_THRESHOLD,
            early_exit_threshold: DEFAULT_EARLY_EXIT_THRESHOLD,
            vector_top_k: DEFAULT_VECTOR_TOP_K,
            vector_confidence_threshold: DEFAULT_VECTOR_THRESHOLD,
            search_relaxation: 0.8,
            boost_floor: 0.9,
            boost_factor: 1.1,
            boost_cap: 0.95,
            rerank_enabled: false,
            rerank_threshold: DEFAULT_RERANK_THRESHOLD,
            enable_caching: true,
            cache_min_confidence: DEFAULT_CACHE_MIN_CONFIDENCE,
            cache_ttl: DEFAULT_CACHE_TTL,
            irrelevant_confidence: 0.1,
            no_match_confidence: 0.2,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            embedding_timeout: Duration::from_secs(5),
            search_timeout: Duration::from_secs(3),
            rerank_timeout: Duration::from_secs(5),
            scoring: RuleScoring::default(),
        }
    }
}

impl HybridConfig {
    const ENV_RULE_HIGH: &'static str = "INTENT_RULE_HIGH_THRESHOLD";
    const ENV_RULE_MEDIUM: &'static str = "INTENT_RULE_MEDIUM_THRESHOLD";
    const ENV_EARLY_EXIT: &'static str = "INTENT_EARLY_EXIT_THRESHOLD";
    const ENV_VECTOR_TOP_K: &'static str = "INTENT_VECTOR_TOP_K";
    const ENV_VECTOR_THRESHOLD: &'static str = "INTENT_VECTOR_THRESHOLD";
    const ENV_RERANK_ENABLED: &'static str = "INTENT_RERANK_ENABLED";
    const ENV_RERANK_THRESHOLD: &'static str = "INTENT_RERANK_THRESHOLD";
    const ENV_ENABLE_CACHING: &'static str = "INTENT_ENABLE_CACHING";
    const ENV_CACHE_MIN_CONFIDENCE: &'static str = "INTENT_CACHE_MIN_CONFIDENCE";
    const ENV_CACHE_TTL_SECS: &'static str = "INTENT_CACHE_TTL_SECS";
    const ENV_MAX_CONCURRENT: &'static str = "INTENT_MAX_CONCURRENT";

    pub fn builder() -> HybridConfigBuilder {
        HybridConfigBuilder {
            config: Self::default(),
        }
    }

    /// Defaults overridden by `INTENT_*` variables, then validated.
    pub fn from_env() -> Result<Self, ConfigError> {
        let d = Self::default();
        let mut builder = Self::builder()
            .rule_high_confidence_threshold(parse_env(
                Self::ENV_RULE_HIGH,
                d.rule_high_confidence_threshold,
            )?)
            .rule_medium_confidence_threshold(parse_env(
                Self::ENV_RULE_MEDIUM,
                d.rule_medium_confidence_threshold,
            )?)
            .early_exit_threshold(parse_env(Self::ENV_EARLY_EXIT, d.early_exit_threshold)?)
            .vector_top_k(parse_env(Self::ENV_VECTOR_TOP_K, d.vector_top_k)?)
            .vector_confidence_threshold(parse_env(
                Self::ENV_VECTOR_THRESHOLD,
                d.vector_confidence_threshold,
            )?)
            .rerank_enabled(parse_bool_env(Self::ENV_RERANK_ENABLED, d.rerank_enabled)?)
            .rerank_threshold(parse_env(Self::ENV_RERANK_THRESHOLD, d.rerank_threshold)?)
            .enable_caching(parse_bool_env(Self::ENV_ENABLE_CACHING, d.enable_caching)?)
            .cache_min_confidence(parse_env(
                Self::ENV_CACHE_MIN_CONFIDENCE,
                d.cache_min_confidence,
            )?)
            .max_concurrent(parse_env(Self::ENV_MAX_CONCURRENT, d.max_concurrent)?);

        let ttl_secs: u64 = parse_env(Self::ENV_CACHE_TTL_SECS, d.cache_ttl.as_secs())?;
        builder = builder.cache_ttl(Duration::from_secs(ttl_secs));

        builder.build()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let thresholds = [
            (
                "rule_high_confidence_threshold",
                self.rule_high_confidence_threshold,
            ),
            (
                "rule_medium_confidence_threshold",
                self.rule_medium_confidence_threshold,
            ),
            ("early_exit_threshold", self.early_exit_threshold),
            (
                "vector_confidence_threshold",
                self.vector_confidence_threshold,
            ),
            ("search_relaxation", self.search_relaxation),
            ("boost_floor", self.boost_floor),
            ("boost_cap", self.boost_cap),
            ("rerank_threshold", self.rerank_threshold),
            ("cache_min_confidence", self.cache_min_confidence),
            ("irrelevant_confidence", self.irrelevant_confidence),
            ("no_match_confidence", self.no_match_confidence),
        ];
        for (name, value) in thresholds {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ThresholdOutOfRange { name, value });
            }
        }

        if self.rule_medium_confidence_threshold > self.rule_high_confidence_threshold {
            return Err(ConfigError::InconsistentThresholds {
                reason: format!(
                    "rule_medium_confidence_threshold ({}) exceeds rule_high_confidence_threshold ({})",
                    self.rule_medium_confidence_threshold, self.rule_high_confidence_threshold
                ),
            });
        }

        if self.early_exit_threshold < self.rule_medium_confidence_threshold {
            return Err(ConfigError::InconsistentThresholds {
                reason: format!(
                    "early_exit_threshold ({}) is below rule_medium_confidence_threshold ({})",
                    self.early_exit_threshold, self.rule_medium_confidence_threshold
                ),
            });
        }

        if !self.boost_factor.is_finite() || self.boost_factor < 1.0 {
            return Err(ConfigError::InvalidValue {
                name: "boost_factor",
                reason: format!("must be at least 1.0, got {}", self.boost_factor),
            });
        }

        if self.vector_top_k == 0 {
            return Err(ConfigError::InvalidValue {
                name: "vector_top_k",
                reason: "must be greater than 0".to_string(),
            });
        }

        if self.max_concurrent == 0 {
            return Err(ConfigError::InvalidValue {
                name: "max_concurrent",
                reason: "must be greater than 0".to_string(),
            });
        }

        for (name, value) in [
            ("cache_ttl", self.cache_ttl),
            ("embedding_timeout", self.embedding_timeout),
            ("search_timeout", self.search_timeout),
            ("rerank_timeout", self.rerank_timeout),
        ] {
            if value.is_zero() {
                return Err(ConfigError::InvalidValue {
                    name,
                    reason: "must be non-zero".to_string(),
                });
            }
        }

        self.scoring.validate()
    }

    #[inline]
    pub fn rule_high_confidence_threshold(&self) -> f32 {
        self.rule_high_confidence_threshold
    }

    #[inline]
    pub fn rule_medium_confidence_threshold(&self) -> f32 {
        self.rule_medium_confidence_threshold
    }

    #[inline]
    pub fn early_exit_threshold(&self) -> f32 {
        self.early_exit_threshold
    }

    #[inline]
    pub fn vector_top_k(&self) -> usize {
        self.vector_top_k
    }

    #[inline]
    pub fn vector_confidence_threshold(&self) -> f32 {
        self.vector_confidence_threshold
    }

    /// Score threshold handed to the vector index.
    #[inline]
    pub fn search_score_threshold(&self) -> f32 {
        self.vector_confidence_threshold * self.search_relaxation
    }

    /// Applies the top-candidate boost: scores at or above the floor are
    /// multiplied by the boost factor and capped.
    pub fn boost(&self, score: f32) -> f32 {
        if score >= self.boost_floor {
            (score * self.boost_factor).min(self.boost_cap)
        } else {
            score
        }
    }

    #[inline]
    pub fn rerank_enabled(&self) -> bool {
        self.rerank_enabled
    }

    #[inline]
    pub fn rerank_threshold(&self) -> f32 {
        self.rerank_threshold
    }

    #[inline]
    pub fn enable_caching(&self) -> bool {
        self.enable_caching
    }

    #[inline]
    pub fn cache_min_confidence(&self) -> f32 {
        self.cache_min_confidence
    }

    #[inline]
    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    #[inline]
    pub fn irrelevant_confidence(&self) -> f32 {
        self.irrelevant_confidence
    }

    #[inline]
    pub fn no_match_confidence(&self) -> f32 {
        self.no_match_confidence
    }

    #[inline]
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    #[inline]
    pub fn embedding_timeout(&self) -> Duration {
        self.embedding_timeout
    }

    #[inline]
    pub fn search_timeout(&self) -> Duration {
        self.search_timeout
    }

    #[inline]
    pub fn rerank_timeout(&self) -> Duration {
        self.rerank_timeout
    }

    #[inline]
    pub fn scoring(&self) -> &RuleScoring {
        &self.scoring
    }
}

/// Builder for [`HybridConfig`]; starts from defaults.
#[derive(Debug, Clone)]
pub struct HybridConfigBuilder {
    config: HybridConfig,
}

macro_rules! setter {
    ($name:ident: $ty:ty) => {
        pub fn $name(mut self, value: $ty) -> Self {
            self.config.$name = value;
            self
        }
    };
}

impl HybridConfigBuilder {
    setter!(rule_high_confidence_threshold: f32);
    setter!(rule_medium_confidence_threshold: f32);
    setter!(early_exit_threshold: f32);
    setter!(vector_top_k: usize);
    setter!(vector_confidence_threshold: f32);
    setter!(search_relaxation: f32);
    setter!(boost_floor: f32);
    setter!(boost_factor: f32);
    setter!(boost_cap: f32);
    setter!(rerank_enabled: bool);
    setter!(rerank_threshold: f32);
    setter!(enable_caching: bool);
    setter!(cache_min_confidence: f32);
    setter!(cache_ttl: Duration);
    setter!(irrelevant_confidence: f32);
    setter!(no_match_confidence: f32);
    setter!(max_concurrent: usize);
    setter!(embedding_timeout: Duration);
    setter!(search_timeout: Duration);
    setter!(rerank_timeout: Duration);
    setter!(scoring: RuleScoring);

    pub fn build(self) -> Result<HybridConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Default Qdrant collection holding the indexed intent examples.
pub const DEFAULT_COLLECTION: &str = "intent_examples";
pub const DEFAULT_EMBEDDING_URL: &str = "https://api.openai.com/v1/embeddings";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_EMBEDDING_DIM: u64 = 1536;
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// Collaborator wiring for the composition root.
#[derive(Clone)]
pub struct ServiceConfig {
    /// Rule-set JSON. `None` uses the built-in rules.
    pub rules_path: Option<PathBuf>,
    /// Qdrant endpoint. `None` disables the vector stage.
    pub qdrant_url: Option<String>,
    pub collection: String,
    pub embedding_url: String,
    pub embedding_model: String,
    /// API key for the embedding endpoint. Without it the hash embedder is used.
    pub embedding_api_key: Option<String>,
    pub embedding_dim: u64,
    /// Cross-encoder directory (BERT + tokenizer). `None` uses lexical scoring.
    pub reranker_path: Option<PathBuf>,
    /// Candidates kept after reranking. `None` keeps all.
    pub rerank_top_k: Option<usize>,
    /// Max entries in the result cache.
    pub cache_capacity: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            rules_path: None,
            qdrant_url: None,
            collection: DEFAULT_COLLECTION.to_string(),
            embedding_url: DEFAULT_EMBEDDING_URL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_api_key: None,
            embedding_dim: DEFAULT_EMBEDDING_DIM,
            reranker_path: None,
            rerank_top_k: None,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("rules_path", &self.rules_path)
            .field("qdrant_url", &self.qdrant_url)
            .field("collection", &self.collection)
            .field("embedding_url", &self.embedding_url)
            .field("embedding_model", &self.embedding_model)
            .field(
                "embedding_api_key",
                &self.embedding_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("embedding_dim", &self.embedding_dim)
            .field("reranker_path", &self.reranker_path)
            .field("rerank_top_k", &self.rerank_top_k)
            .field("cache_capacity", &self.cache_capacity)
            .finish()
    }
}

impl ServiceConfig {
    const ENV_RULES_PATH: &'static str = "INTENT_RULES_PATH";
    const ENV_QDRANT_URL: &'static str = "INTENT_QDRANT_URL";
    const ENV_COLLECTION: &'static str = "INTENT_COLLECTION";
    const ENV_EMBEDDING_URL: &'static str = "INTENT_EMBEDDING_URL";
    const ENV_EMBEDDING_MODEL: &'static str = "INTENT_EMBEDDING_MODEL";
    const ENV_EMBEDDING_API_KEY: &'static str = "OPENAI_API_KEY";
    const ENV_EMBEDDING_DIM: &'static str = "INTENT_EMBEDDING_DIM";
    const ENV_RERANKER_PATH: &'static str = "INTENT_RERANKER_PATH";
    const ENV_RERANK_TOP_K: &'static str = "INTENT_RERANK_TOP_K";
    const ENV_CACHE_CAPACITY: &'static str = "INTENT_CACHE_CAPACITY";

    /// Loads settings from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            rules_path: optional_env(Self::ENV_RULES_PATH).map(PathBuf::from),
            qdrant_url: optional_env(Self::ENV_QDRANT_URL),
            collection: optional_env(Self::ENV_COLLECTION).unwrap_or(defaults.collection),
            embedding_url: optional_env(Self::ENV_EMBEDDING_URL)
                .unwrap_or(defaults.embedding_url),
            embedding_model: optional_env(Self::ENV_EMBEDDING_MODEL)
                .unwrap_or(defaults.embedding_model),
            embedding_api_key: optional_env(Self::ENV_EMBEDDING_API_KEY),
            embedding_dim: parse_env(Self::ENV_EMBEDDING_DIM, defaults.embedding_dim)?,
            reranker_path: optional_env(Self::ENV_RERANKER_PATH).map(PathBuf::from),
            rerank_top_k: parse_env(Self::ENV_RERANK_TOP_K, 0usize)
                .map(|k| (k > 0).then_some(k))?,
            cache_capacity: parse_env(Self::ENV_CACHE_CAPACITY, defaults.cache_capacity)?,
        })
    }

    /// Checks that configured paths exist (does not open them).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ref path) = self.rules_path {
            if !path.exists() {
                return Err(ConfigError::PathNotFound { path: path.clone() });
            }
            if !path.is_file() {
                return Err(ConfigError::NotAFile { path: path.clone() });
            }
        }

        if let Some(ref path) = self.reranker_path {
            if !path.exists() {
                return Err(ConfigError::PathNotFound { path: path.clone() });
            }
            if !path.is_dir() {
                return Err(ConfigError::NotADirectory { path: path.clone() });
            }
        }

        if self.embedding_dim == 0 {
            return Err(ConfigError::InvalidValue {
                name: "embedding_dim",
                reason: "must be greater than 0".to_string(),
            });
        }

        if self.cache_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                name: "cache_capacity",
                reason: "must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

fn optional_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional_env(name) {
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::EnvParseError {
            name,
            reason: e.to_string(),
            value,
        }),
        None => Ok(default),
    }
}

fn parse_bool_env(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match optional_env(name) {
        Some(value) => match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::EnvParseError {
                name,
                value,
                reason: "expected true/false".to_string(),
            }),
        },
        None => Ok(default),
    }
}
