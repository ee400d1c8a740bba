use std::path::PathBuf;
use thiserror::Error;

/// A single rule definition that cannot be compiled.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("rule intent_id cannot be empty")]
    EmptyIntentId,

    #[error("rule '{intent_id}' has neither keywords nor patterns")]
    NoMatchers { intent_id: String },

    #[error("rule '{intent_id}' weight {weight} is outside [0.1, 2.0]")]
    InvalidWeight { intent_id: String, weight: f32 },

    #[error("rule '{intent_id}' has invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        intent_id: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("malformed rule definition: {reason}")]
    Malformed { reason: String },
}

/// The rule file as a whole could not be used.
#[derive(Debug, Error)]
pub enum RuleLoadError {
    #[error("failed to read rule file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("rule file {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("rule file {path} has an invalid structure: {reason}")]
    InvalidStructure { path: PathBuf, reason: String },

    #[error("rule file {path} contains no usable rules")]
    Empty { path: PathBuf },
}
