use regex::Regex;
use serde::{Deserialize, Serialize};

use super::error::RuleError;
use crate::config::RuleScoring;
use crate::intent::Metadata;
use crate::text::TextNormalizer;

pub const MIN_RULE_WEIGHT: f32 = 0.1;
pub const MAX_RULE_WEIGHT: f32 = 2.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    #[inline]
    pub fn weight(&self, scoring: &RuleScoring) -> f32 {
        match self {
            Priority::Low => scoring.low_priority_weight,
            Priority::Medium => scoring.medium_priority_weight,
            Priority::High => scoring.high_priority_weight,
        }
    }
}

fn default_enabled() -> bool {
    true
}

/// One rule as written in the rule-set file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition {
    pub intent_id: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub patterns: Vec<String>,
    pub weight: f32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub negative_keywords: Vec<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub metadata: Metadata,
}

impl RuleDefinition {
    pub fn new(intent_id: impl Into<String>, weight: f32) -> Self {
        Self {
            intent_id: intent_id.into(),
            keywords: Vec::new(),
            patterns: Vec::new(),
            weight,
            description: String::new(),
            negative_keywords: Vec::new(),
            priority: Priority::Medium,
            enabled: true,
            metadata: Metadata::new(),
        }
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_negative_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.negative_keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pub source: String,
    pub regex: Regex,
}

/// A validated rule ready for matching.
///
/// Keywords are stored in normalized form so they compare directly against
/// normalized queries. Patterns are compiled case-insensitive.
#[derive(Debug, Clone)]
pub struct IntentRule {
    intent_id: String,
    description: String,
    keywords: Vec<String>,
    patterns: Vec<CompiledPattern>,
    negative_keywords: Vec<String>,
    weight: f32,
    priority: Priority,
    enabled: bool,
    metadata: Metadata,
}

impl IntentRule {
    pub fn compile(def: RuleDefinition, normalizer: &TextNormalizer) -> Result<Self, RuleError> {
        let intent_id = def.intent_id.trim().to_string();
        if intent_id.is_empty() {
            return Err(RuleError::EmptyIntentId);
        }

        if !def.weight.is_finite() || !(MIN_RULE_WEIGHT..=MAX_RULE_WEIGHT).contains(&def.weight) {
            return Err(RuleError::InvalidWeight {
                intent_id,
                weight: def.weight,
            });
        }

        let keywords = normalize_terms(&def.keywords, normalizer);
        let negative_keywords = normalize_terms(&def.negative_keywords, normalizer);

        let mut patterns = Vec::with_capacity(def.patterns.len());
        for pattern in def.patterns {
            let regex = Regex::new(&format!("(?i){pattern}")).map_err(|source| {
                RuleError::InvalidPattern {
                    intent_id: intent_id.clone(),
                    pattern: pattern.clone(),
                    source,
                }
            })?;
            patterns.push(CompiledPattern {
                source: pattern,
                regex,
            });
        }

        if keywords.is_empty() && patterns.is_empty() {
            return Err(RuleError::NoMatchers { intent_id });
        }

        Ok(Self {
            intent_id,
            description: def.description,
            keywords,
            patterns,
            negative_keywords,
            weight: def.weight,
            priority: def.priority,
            enabled: def.enabled,
            metadata: def.metadata,
        })
    }

    #[inline]
    pub fn intent_id(&self) -> &str {
        &self.intent_id
    }

    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[inline]
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    #[inline]
    pub fn patterns(&self) -> &[CompiledPattern] {
        &self.patterns
    }

    #[inline]
    pub fn negative_keywords(&self) -> &[String] {
        &self.negative_keywords
    }

    #[inline]
    pub fn weight(&self) -> f32 {
        self.weight
    }

    #[inline]
    pub fn priority(&self) -> Priority {
        self.priority
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}

fn normalize_terms(terms: &[String], normalizer: &TextNormalizer) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(terms.len());
    for term in terms {
        let normalized = normalizer.normalize(term);
        if !normalized.is_empty() && !out.contains(&normalized) {
            out.push(normalized);
        }
    }
    out
}

/// Outcome of evaluating one rule against one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleMatch {
    pub intent_id: String,
    /// Clamped to `[0, 1]`.
    pub score: f32,
    pub matched_keywords: Vec<String>,
    pub matched_patterns: Vec<String>,
    pub weight: f32,
    /// Character offset of the earliest keyword or pattern hit.
    pub position: usize,
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl RuleMatch {
    #[inline]
    pub fn total_matches(&self) -> usize {
        self.matched_keywords.len() + self.matched_patterns.len()
    }
}
