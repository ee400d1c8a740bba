use std::path::Path;

use serde_json::Value;
use tracing::{info, warn};

use super::defaults::default_rule_definitions;
use super::error::{RuleError, RuleLoadError};
use super::model::{IntentRule, RuleDefinition};
use crate::intent::Metadata;
use crate::text::TextNormalizer;

/// A loaded collection of compiled rules.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    pub version: Option<String>,
    pub metadata: Metadata,
    pub rules: Vec<IntentRule>,
    /// Definitions rejected during load.
    pub skipped: usize,
}

impl RuleSet {
    /// Compiles definitions, skipping (and logging) the invalid ones.
    pub fn from_definitions(defs: Vec<RuleDefinition>, normalizer: &TextNormalizer) -> Self {
        let mut set = Self::default();
        for def in defs {
            let intent_id = def.intent_id.clone();
            match IntentRule::compile(def, normalizer) {
                Ok(rule) => set.rules.push(rule),
                Err(e) => {
                    warn!(intent_id = %intent_id, error = %e, "Skipping invalid rule");
                    set.skipped += 1;
                }
            }
        }
        set
    }

    /// The built-in rule set.
    pub fn builtin(normalizer: &TextNormalizer) -> Self {
        let mut set = Self::from_definitions(default_rule_definitions(), normalizer);
        set.version = Some("builtin".to_string());
        set
    }

    /// Reads a rule file, which is either a bare array of rules or an object
    /// `{version, metadata, rules: [...]}`. Invalid entries are skipped; a
    /// file with no usable rule is an error.
    pub fn load(path: &Path, normalizer: &TextNormalizer) -> Result<Self, RuleLoadError> {
        let content = std::fs::read_to_string(path).map_err(|source| RuleLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let root: Value = serde_json::from_str(&content).map_err(|source| RuleLoadError::Json {
            path: path.to_path_buf(),
            source,
        })?;

        let (version, metadata, entries) = split_root(root).map_err(|reason| {
            RuleLoadError::InvalidStructure {
                path: path.to_path_buf(),
                reason,
            }
        })?;

        let mut set = Self {
            version,
            metadata,
            ..Self::default()
        };

        for (idx, entry) in entries.into_iter().enumerate() {
            match parse_rule(entry).and_then(|def| IntentRule::compile(def, normalizer)) {
                Ok(rule) => set.rules.push(rule),
                Err(e) => {
                    warn!(index = idx, error = %e, "Skipping invalid rule");
                    set.skipped += 1;
                }
            }
        }

        if set.rules.is_empty() {
            return Err(RuleLoadError::Empty {
                path: path.to_path_buf(),
            });
        }

        info!(
            path = %path.display(),
            rules = set.rules.len(),
            skipped = set.skipped,
            version = set.version.as_deref().unwrap_or("unknown"),
            "Rule set loaded"
        );

        Ok(set)
    }

    /// Loads `path`, or falls back to [`RuleSet::builtin`] when no path is
    /// given or the file is missing, malformed or empty.
    pub fn load_or_builtin(path: Option<&Path>, normalizer: &TextNormalizer) -> Self {
        let Some(path) = path else {
            info!("No rule file configured, using built-in rules");
            return Self::builtin(normalizer);
        };

        match Self::load(path, normalizer) {
            Ok(set) => set,
            Err(e) => {
                warn!(error = %e, "Rule file unusable, falling back to built-in rules");
                Self::builtin(normalizer)
            }
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

type SplitRoot = (Option<String>, Metadata, Vec<Value>);

fn split_root(root: Value) -> Result<SplitRoot, String> {
    match root {
        Value::Array(entries) => Ok((None, Metadata::new(), entries)),
        Value::Object(mut obj) => {
            let version = obj.get("version").and_then(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            });
            let metadata = match obj.remove("metadata") {
                Some(Value::Object(m)) => m.into_iter().collect(),
                _ => Metadata::new(),
            };
            match obj.remove("rules") {
                Some(Value::Array(entries)) => Ok((version, metadata, entries)),
                Some(_) => Err("'rules' must be an array".to_string()),
                None => Err("object must contain a 'rules' array".to_string()),
            }
        }
        _ => Err("expected an array of rules or an object with 'rules'".to_string()),
    }
}

fn parse_rule(entry: Value) -> Result<RuleDefinition, RuleError> {
    serde_json::from_value(entry).map_err(|e| RuleError::Malformed {
        reason: e.to_string(),
    })
}
