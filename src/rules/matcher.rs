use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::debug;

use super::loader::RuleSet;
use super::model::{IntentRule, Priority, RuleMatch};
use crate::config::RuleScoring;
use crate::text::TextNormalizer;

/// Weighted keyword/pattern matcher over a hot-swappable rule set.
///
/// Matching is pure CPU work; readers take a cheap `Arc` snapshot so a
/// concurrent [`RuleMatcher::replace_rules`] never blocks or tears a detection.
pub struct RuleMatcher {
    rules: RwLock<Arc<RuleSet>>,
    normalizer: Arc<TextNormalizer>,
    scoring: RuleScoring,
}

impl std::fmt::Debug for RuleMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleMatcher")
            .field("rules", &self.rules.read().len())
            .field("scoring", &self.scoring)
            .finish()
    }
}

impl RuleMatcher {
    pub fn new(rules: RuleSet, normalizer: Arc<TextNormalizer>, scoring: RuleScoring) -> Self {
        let sorted = sort_rules(rules, &scoring);
        Self {
            rules: RwLock::new(Arc::new(sorted)),
            normalizer,
            scoring,
        }
    }

    /// Matcher over the built-in rules with default scoring.
    pub fn builtin(normalizer: Arc<TextNormalizer>) -> Self {
        let rules = RuleSet::builtin(&normalizer);
        Self::new(rules, normalizer, RuleScoring::default())
    }

    /// Best rule for `query`, or `None` when no enabled rule scores.
    pub fn detect(&self, query: &str) -> Option<RuleMatch> {
        let rules = self.snapshot();
        let prepared = self.normalizer.clean_query(query);
        if prepared.is_empty() {
            return None;
        }
        let tokens: HashSet<&str> = prepared.split_whitespace().collect();

        let mut matches: Vec<RuleMatch> = Vec::new();
        for rule in rules.rules.iter().filter(|r| r.is_enabled()) {
            let Some(m) = self.evaluate(rule, &prepared, &tokens) else {
                continue;
            };

            if m.score >= self.scoring.early_exit_score
                && rule.weight() > self.scoring.early_exit_weight
            {
                debug!(intent_id = %m.intent_id, score = m.score, "Rule early exit");
                return Some(m);
            }
            matches.push(m);
        }

        let best = self.select(matches);
        if let Some(ref m) = best {
            debug!(
                intent_id = %m.intent_id,
                score = m.score,
                position = m.position,
                "Rule match"
            );
        }
        best
    }

    /// Every scoring rule for `query`, in tie-break order, without early exit.
    pub fn detect_all(&self, query: &str) -> Vec<RuleMatch> {
        let rules = self.snapshot();
        let prepared = self.normalizer.clean_query(query);
        if prepared.is_empty() {
            return Vec::new();
        }
        let tokens: HashSet<&str> = prepared.split_whitespace().collect();

        let mut matches: Vec<RuleMatch> = rules
            .rules
            .iter()
            .filter(|r| r.is_enabled())
            .filter_map(|r| self.evaluate(r, &prepared, &tokens))
            .collect();
        self.order(&mut matches);
        matches
    }

    fn evaluate(&self, rule: &IntentRule, text: &str, tokens: &HashSet<&str>) -> Option<RuleMatch> {
        if rule
            .negative_keywords()
            .iter()
            .any(|k| text.contains(k.as_str()))
        {
            return None;
        }

        let mut first_byte: Option<usize> = None;
        let mut note = |pos: usize| {
            first_byte = Some(first_byte.map_or(pos, |p| p.min(pos)));
        };

        let mut matched_keywords: Vec<String> = Vec::new();
        for keyword in rule.keywords() {
            if let Some(pos) = text.find(keyword.as_str()) {
                note(pos);
                matched_keywords.push(keyword.clone());
            }
        }

        let mut matched_patterns: Vec<String> = Vec::new();
        for pattern in rule.patterns() {
            if let Some(m) = pattern.regex.find(text) {
                note(m.start());
                matched_patterns.push(pattern.source.clone());
            }
        }

        let total = matched_keywords.len() + matched_patterns.len();
        if total == 0 {
            return None;
        }

        let s = &self.scoring;
        let mut score = matched_keywords.len() as f32 * s.keyword_factor * rule.weight()
            + matched_patterns.len() as f32 * s.pattern_factor * rule.weight();
        score *= rule.priority().weight(s);

        if total > 1 {
            score *= 1.0 + s.combination_bonus * (total - 1) as f32;
        }

        let exact = matched_keywords
            .iter()
            .filter(|k| tokens.contains(k.as_str()))
            .count();
        if exact > 0 {
            score *= 1.0 + s.exact_word_bonus * exact as f32;
        }

        let score = if score.is_finite() {
            score.clamp(0.0, 1.0)
        } else {
            0.0
        };
        if score <= 0.0 {
            return None;
        }

        let position = first_byte.map_or(0, |b| text[..b].chars().count());

        Some(RuleMatch {
            intent_id: rule.intent_id().to_string(),
            score,
            matched_keywords,
            matched_patterns,
            weight: rule.weight(),
            position,
            priority: rule.priority(),
            description: rule.description().to_string(),
        })
    }

    /// Orders by position when matches are far apart, by score otherwise.
    ///
    /// The relation is not transitive, so this is a stable insertion sort
    /// rather than `sort_by`, which may panic on such comparators.
    fn order(&self, matches: &mut [RuleMatch]) {
        let window = self.scoring.position_window;
        let cmp = |a: &RuleMatch, b: &RuleMatch| -> Ordering {
            if a.position.abs_diff(b.position) > window {
                a.position.cmp(&b.position)
            } else {
                b.score.total_cmp(&a.score)
            }
        };

        for i in 1..matches.len() {
            let mut j = i;
            while j > 0 && cmp(&matches[j - 1], &matches[j]) == Ordering::Greater {
                matches.swap(j - 1, j);
                j -= 1;
            }
        }
    }

    fn select(&self, mut matches: Vec<RuleMatch>) -> Option<RuleMatch> {
        if matches.len() <= 1 {
            return matches.pop();
        }

        self.order(&mut matches);
        if matches[0].score >= self.scoring.positional_min_score {
            return matches.into_iter().next();
        }

        // Positional winner too weak: take the first highest score.
        let mut best = 0;
        for (i, m) in matches.iter().enumerate().skip(1) {
            if m.score > matches[best].score {
                best = i;
            }
        }
        Some(matches.swap_remove(best))
    }

    /// Atomically swaps in a new rule set.
    pub fn replace_rules(&self, rules: RuleSet) {
        let sorted = Arc::new(sort_rules(rules, &self.scoring));
        let count = sorted.len();
        *self.rules.write() = sorted;
        debug!(rules = count, "Rule set replaced");
    }

    /// Adds one rule, keeping the set sorted.
    pub fn add_rule(&self, rule: IntentRule) {
        let mut guard = self.rules.write();
        let mut next = RuleSet::clone(&guard);
        next.rules.push(rule);
        *guard = Arc::new(sort_rules(next, &self.scoring));
    }

    /// Removes every rule with `intent_id`; returns whether anything was removed.
    pub fn remove_rule(&self, intent_id: &str) -> bool {
        let mut guard = self.rules.write();
        if !guard.rules.iter().any(|r| r.intent_id() == intent_id) {
            return false;
        }
        let mut next = RuleSet::clone(&guard);
        next.rules.retain(|r| r.intent_id() != intent_id);
        *guard = Arc::new(next);
        true
    }

    /// Current rule set, in evaluation order.
    pub fn snapshot(&self) -> Arc<RuleSet> {
        self.rules.read().clone()
    }

    #[inline]
    pub fn scoring(&self) -> &RuleScoring {
        &self.scoring
    }

    pub fn stats(&self) -> RuleStats {
        RuleStats::from_rules(&self.snapshot().rules)
    }
}

fn sort_rules(mut set: RuleSet, scoring: &RuleScoring) -> RuleSet {
    set.rules.sort_by(|a, b| {
        let pa = a.priority().weight(scoring);
        let pb = b.priority().weight(scoring);
        pb.total_cmp(&pa)
            .then_with(|| b.weight().total_cmp(&a.weight()))
    });
    set
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightStats {
    pub min: f32,
    pub max: f32,
    pub avg: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RuleStats {
    pub total_rules: usize,
    pub enabled_rules: usize,
    pub disabled_rules: usize,
    pub total_keywords: usize,
    pub total_patterns: usize,
    pub priority_distribution: BTreeMap<&'static str, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight_stats: Option<WeightStats>,
}

impl RuleStats {
    fn from_rules(rules: &[IntentRule]) -> Self {
        let mut stats = Self {
            total_rules: rules.len(),
            ..Self::default()
        };
        for p in [Priority::High, Priority::Medium, Priority::Low] {
            stats.priority_distribution.insert(p.as_str(), 0);
        }

        for rule in rules {
            if rule.is_enabled() {
                stats.enabled_rules += 1;
            } else {
                stats.disabled_rules += 1;
            }
            stats.total_keywords += rule.keywords().len();
            stats.total_patterns += rule.patterns().len();
            *stats
                .priority_distribution
                .entry(rule.priority().as_str())
                .or_insert(0) += 1;
        }

        if !rules.is_empty() {
            let weights = rules.iter().map(|r| r.weight());
            let min = weights.clone().fold(f32::INFINITY, f32::min);
            let max = weights.clone().fold(f32::NEG_INFINITY, f32::max);
            let avg = weights.sum::<f32>() / rules.len() as f32;
            stats.weight_stats = Some(WeightStats { min, max, avg });
        }

        stats
    }
}
