use super::*;
use serial_test::serial;
use std::env;

fn with_env_vars<F, R>(vars: &[(&str, &str)], f: F) -> R
where
    F: FnOnce() -> R,
{
    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    for (key, value) in vars {
        unsafe { env::set_var(key, value) };
    }

    let result = f();

    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    for (key, _) in vars {
        unsafe { env::remove_var(key) };
    }

    result
}

fn clear_intent_env() {
    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    unsafe {
        for key in [
            "INTENT_RULE_HIGH_THRESHOLD",
            "INTENT_RULE_MEDIUM_THRESHOLD",
            "INTENT_EARLY_EXIT_THRESHOLD",
            "INTENT_VECTOR_TOP_K",
            "INTENT_VECTOR_THRESHOLD",
            "INTENT_RERANK_ENABLED",
            "INTENT_RERANK_THRESHOLD",
            "INTENT_ENABLE_CACHING",
            "INTENT_CACHE_MIN_CONFIDENCE",
            "INTENT_CACHE_TTL_SECS",
            "INTENT_MAX_CONCURRENT",
            "INTENT_RULES_PATH",
            "INTENT_QDRANT_URL",
            "INTENT_COLLECTION",
            "INTENT_EMBEDDING_URL",
            "INTENT_EMBEDDING_MODEL",
            "INTENT_EMBEDDING_DIM",
            "INTENT_RERANKER_PATH",
            "INTENT_RERANK_TOP_K",
            "INTENT_CACHE_CAPACITY",
            "OPENAI_API_KEY",
        ] {
            env::remove_var(key);
        }
    }
}

#[test]
fn test_default_config() {
    let config = HybridConfig::default();

    assert_eq!(config.rule_high_confidence_threshold(), 0.7);
    assert_eq!(config.rule_medium_confidence_threshold(), 0.3);
    assert_eq!(config.early_exit_threshold(), 0.8);
    assert_eq!(config.vector_top_k(), 3);
    assert_eq!(config.vector_confidence_threshold(), 0.6);
    assert_eq!(config.cache_min_confidence(), 0.8);
    assert!(config.enable_caching());
    assert!(!config.rerank_enabled());
    assert_eq!(config.cache_ttl(), Duration::from_secs(3600));
    assert!(config.validate().is_ok());
}

#[test]
fn test_search_threshold_is_relaxed() {
    let config = HybridConfig::default();
    assert!((config.search_score_threshold() - 0.48).abs() < 1e-6);
}

#[test]
fn test_boost_only_applies_above_floor_and_is_capped() {
    let config = HybridConfig::default();
    assert_eq!(config.boost(0.85), 0.85);
    assert!((config.boost(0.9) - 0.95).abs() < 1e-6);
    assert!((config.boost(0.99) - 0.95).abs() < 1e-6);
}

#[test]
fn test_builder_rejects_out_of_range_threshold() {
    let err = HybridConfig::builder()
        .vector_confidence_threshold(1.5)
        .build()
        .unwrap_err();
    assert!(matches!(
        err,
        ConfigError::ThresholdOutOfRange {
            name: "vector_confidence_threshold",
            ..
        }
    ));

    let err = HybridConfig::builder()
        .cache_min_confidence(f32::NAN)
        .build()
        .unwrap_err();
    assert!(matches!(err, ConfigError::ThresholdOutOfRange { .. }));
}

#[test]
fn test_builder_rejects_early_exit_below_medium() {
    let err = HybridConfig::builder()
        .rule_medium_confidence_threshold(0.5)
        .early_exit_threshold(0.4)
        .build()
        .unwrap_err();
    assert!(matches!(err, ConfigError::InconsistentThresholds { .. }));
    assert!(err.to_string().contains("early_exit_threshold"));
}

#[test]
fn test_builder_rejects_medium_above_high() {
    let err = HybridConfig::builder()
        .rule_medium_confidence_threshold(0.75)
        .rule_high_confidence_threshold(0.7)
        .build()
        .unwrap_err();
    assert!(matches!(err, ConfigError::InconsistentThresholds { .. }));
}

#[test]
fn test_builder_rejects_zero_counts_and_durations() {
    assert!(HybridConfig::builder().vector_top_k(0).build().is_err());
    assert!(HybridConfig::builder().max_concurrent(0).build().is_err());
    assert!(
        HybridConfig::builder()
            .search_timeout(Duration::ZERO)
            .build()
            .is_err()
    );
}

#[test]
fn test_builder_rejects_negative_scoring_factor() {
    let scoring = RuleScoring {
        keyword_factor: -0.1,
        ..RuleScoring::default()
    };
    let err = HybridConfig::builder().scoring(scoring).build().unwrap_err();
    assert!(matches!(
        err,
        ConfigError::InvalidValue {
            name: "keyword_factor",
            ..
        }
    ));
}

#[test]
fn test_builder_accepts_custom_values() {
    let config = HybridConfig::builder()
        .early_exit_threshold(0.9)
        .rerank_enabled(true)
        .rerank_threshold(0.8)
        .max_concurrent(4)
        .build()
        .expect("valid config");

    assert_eq!(config.early_exit_threshold(), 0.9);
    assert!(config.rerank_enabled());
    assert_eq!(config.rerank_threshold(), 0.8);
    assert_eq!(config.max_concurrent(), 4);
}

#[test]
#[serial]
fn test_from_env_with_defaults() {
    clear_intent_env();

    let config = HybridConfig::from_env().expect("should parse with defaults");
    assert_eq!(config, HybridConfig::default());
}

#[test]
#[serial]
fn test_from_env_overrides() {
    clear_intent_env();

    let config = with_env_vars(
        &[
            ("INTENT_EARLY_EXIT_THRESHOLD", "0.85"),
            ("INTENT_VECTOR_TOP_K", "5"),
            ("INTENT_RERANK_ENABLED", "yes"),
            ("INTENT_CACHE_TTL_SECS", "60"),
        ],
        HybridConfig::from_env,
    )
    .expect("should parse overrides");

    assert_eq!(config.early_exit_threshold(), 0.85);
    assert_eq!(config.vector_top_k(), 5);
    assert!(config.rerank_enabled());
    assert_eq!(config.cache_ttl(), Duration::from_secs(60));
}

#[test]
#[serial]
fn test_from_env_rejects_garbage() {
    clear_intent_env();

    let result = with_env_vars(
        &[("INTENT_VECTOR_THRESHOLD", "not-a-number")],
        HybridConfig::from_env,
    );
    assert!(matches!(
        result,
        Err(ConfigError::EnvParseError {
            name: "INTENT_VECTOR_THRESHOLD",
            ..
        })
    ));

    let result = with_env_vars(&[("INTENT_ENABLE_CACHING", "maybe")], HybridConfig::from_env);
    assert!(matches!(result, Err(ConfigError::EnvParseError { .. })));
}

#[test]
#[serial]
fn test_from_env_validates_overrides() {
    clear_intent_env();

    let result = with_env_vars(
        &[("INTENT_EARLY_EXIT_THRESHOLD", "0.1")],
        HybridConfig::from_env,
    );
    assert!(matches!(
        result,
        Err(ConfigError::InconsistentThresholds { .. })
    ));
}

#[test]
#[serial]
fn test_service_config_from_env() {
    clear_intent_env();

    let config = with_env_vars(
        &[
            ("INTENT_QDRANT_URL", "http://qdrant:6334"),
            ("INTENT_COLLECTION", "intents_v2"),
            ("INTENT_CACHE_CAPACITY", "250"),
            ("INTENT_RERANK_TOP_K", "3"),
            ("OPENAI_API_KEY", "sk-test"),
            ("INTENT_RULES_PATH", "   "),
        ],
        ServiceConfig::from_env,
    )
    .expect("should parse");

    assert_eq!(config.qdrant_url.as_deref(), Some("http://qdrant:6334"));
    assert_eq!(config.collection, "intents_v2");
    assert_eq!(config.cache_capacity, 250);
    assert_eq!(config.rerank_top_k, Some(3));
    assert!(config.rules_path.is_none());
    assert!(!format!("{config:?}").contains("sk-test"));
}

#[test]
fn test_service_config_validate_paths() {
    let dir = tempfile::tempdir().unwrap();

    let config = ServiceConfig {
        rules_path: Some(dir.path().join("missing.json")),
        ..Default::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::PathNotFound { .. })
    ));

    let config = ServiceConfig {
        rules_path: Some(dir.path().to_path_buf()),
        ..Default::default()
    };
    assert!(matches!(config.validate(), Err(ConfigError::NotAFile { .. })));

    let file = dir.path().join("model.bin");
    std::fs::write(&file, b"x").unwrap();
    let config = ServiceConfig {
        reranker_path: Some(file),
        ..Default::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::NotADirectory { .. })
    ));

    assert!(ServiceConfig::default().validate().is_ok());
}
