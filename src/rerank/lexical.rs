use std::collections::HashSet;

use super::{PairScorer, RerankError};
use crate::text::lexicon::STOP_WORDS;

/// Model-free pair scorer over content-word overlap.
///
/// `0.6 * recall + 0.4 * jaccard`, squashed by a sigmoid centred at 0.5 so
/// half-overlapping pairs land near 0.5 and full matches near 0.98.
#[derive(Debug, Clone)]
pub struct LexicalPairScorer {
    stop_words: HashSet<&'static str>,
}

impl Default for LexicalPairScorer {
    fn default() -> Self {
        Self {
            stop_words: STOP_WORDS.iter().copied().collect(),
        }
    }
}

impl LexicalPairScorer {
    pub fn new() -> Self {
        Self::default()
    }

    fn content_words<'a>(&self, lowered: &'a str) -> HashSet<&'a str> {
        lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty() && !self.stop_words.contains(w))
            .collect()
    }
}

impl PairScorer for LexicalPairScorer {
    fn score(&self, query: &str, candidate: &str) -> Result<f32, RerankError> {
        let query_lower = query.to_lowercase();
        let candidate_lower = candidate.to_lowercase();
        let query_words = self.content_words(&query_lower);
        let candidate_words = self.content_words(&candidate_lower);

        if query_words.is_empty() {
            let (q, c) = (query.chars().count(), candidate.chars().count());
            let len_ratio = q.min(c) as f32 / q.max(c).max(1) as f32;
            return Ok(len_ratio * 0.3);
        }

        let matches = query_words.intersection(&candidate_words).count();
        let recall = matches as f32 / query_words.len() as f32;
        let union = query_words.union(&candidate_words).count();
        let jaccard = if union > 0 {
            matches as f32 / union as f32
        } else {
            0.0
        };

        let base = 0.6 * recall + 0.4 * jaccard;
        Ok((1.0 / (1.0 + (-8.0 * (base - 0.5)).exp())).clamp(0.0, 1.0))
    }

    fn name(&self) -> &str {
        "lexical"
    }
}
