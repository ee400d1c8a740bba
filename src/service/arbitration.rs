//! Merges rule and vector evidence into one [`IntentResult`].
//!
//! First matching step wins:
//! 1. rule >= early exit -> RULE
//! 2. confident vector -> strongest of vector and (rule >= high, as HYBRID)
//! 3. rule >= high -> RULE
//! 4. rule >= medium -> RULE
//! 5. any vector candidate -> VECTOR
//! 6. FALLBACK at the no-match confidence

use crate::config::HybridConfig;
use crate::intent::{DetectionMethod, IntentResult, SearchCandidate};
use crate::rules::RuleMatch;

/// Top semantic candidate plus the stage that scored it.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorEvidence {
    pub candidate: SearchCandidate,
    /// `Vector`, or `Rerank` when the reranked score cleared its own threshold.
    pub method: DetectionMethod,
}

impl VectorEvidence {
    pub fn vector(candidate: SearchCandidate) -> Self {
        Self {
            candidate,
            method: DetectionMethod::Vector,
        }
    }

    pub fn reranked(candidate: SearchCandidate) -> Self {
        Self {
            candidate,
            method: DetectionMethod::Rerank,
        }
    }

    #[inline]
    pub fn score(&self) -> f32 {
        self.candidate.score
    }

    fn is_confident(&self, config: &HybridConfig) -> bool {
        match self.method {
            DetectionMethod::Rerank => self.score() >= config.rerank_threshold(),
            _ => self.score() >= config.vector_confidence_threshold(),
        }
    }
}

pub fn arbitrate(
    config: &HybridConfig,
    rule: Option<&RuleMatch>,
    vector: Option<&VectorEvidence>,
) -> IntentResult {
    if let Some(r) = rule
        && r.score >= config.early_exit_threshold()
    {
        return rule_result(r, DetectionMethod::Rule);
    }

    if let Some(v) = vector
        && v.is_confident(config)
    {
        if let Some(r) = rule
            && r.score >= config.rule_high_confidence_threshold()
            && r.score >= v.score()
        {
            return rule_result(r, DetectionMethod::Hybrid)
                .with_metadata("vector_intent", v.candidate.intent_id.clone())
                .with_metadata("vector_score", v.score());
        }
        return vector_result(v);
    }

    // medium <= high is enforced by the config, so this covers steps 3 and 4.
    if let Some(r) = rule
        && r.score >= config.rule_medium_confidence_threshold()
    {
        return rule_result(r, DetectionMethod::Rule);
    }

    if let Some(v) = vector {
        return vector_result(v);
    }

    IntentResult::fallback(config.no_match_confidence())
}

fn rule_result(rule: &RuleMatch, method: DetectionMethod) -> IntentResult {
    let mut result = IntentResult::new(&rule.intent_id, rule.score, method)
        .with_metadata("rule_score", rule.score)
        .with_metadata("rule_weight", rule.weight)
        .with_metadata("matched_keywords", rule.matched_keywords.clone())
        .with_metadata("matched_patterns", rule.matched_patterns.clone())
        .with_metadata("position", rule.position as u64)
        .with_metadata("priority", rule.priority.as_str());
    if !rule.description.is_empty() {
        result = result.with_metadata("description", rule.description.clone());
    }
    result
}

fn vector_result(v: &VectorEvidence) -> IntentResult {
    let c = &v.candidate;
    let mut result = IntentResult::new(&c.intent_id, c.score, v.method)
        .with_metadata("score", c.score)
        .with_metadata("matched_text", c.text.clone())
        .with_metadata("source", c.source.clone());
    if !c.metadata.is_empty() {
        let payload: serde_json::Map<String, serde_json::Value> = c
            .metadata
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        result = result.with_metadata("candidate", serde_json::Value::Object(payload));
    }
    result
}
