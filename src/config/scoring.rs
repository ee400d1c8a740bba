use super::ConfigError;

/// Tunable constants of the weighted rule score.
///
/// Defaults reproduce the calibrated behavior; override them to recalibrate
/// against a labeled query set.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleScoring {
    /// Contribution of each matched keyword, times rule weight.
    pub keyword_factor: f32,
    /// Contribution of each matched pattern, times rule weight.
    pub pattern_factor: f32,
    /// Per extra match: `score *= 1 + combination_bonus * (matches - 1)`.
    pub combination_bonus: f32,
    /// Per keyword equal to a whole query token.
    pub exact_word_bonus: f32,
    pub high_priority_weight: f32,
    pub medium_priority_weight: f32,
    pub low_priority_weight: f32,
    /// Matches further apart than this (in characters) are ordered by position.
    pub position_window: usize,
    /// A positional winner below this score yields to the global best.
    pub positional_min_score: f32,
    /// Scan stops at a rule scoring at least this much...
    pub early_exit_score: f32,
    /// ...whose weight is above this.
    pub early_exit_weight: f32,
}

impl Default for RuleScoring {
    fn default() -> Self {
        Self {
            keyword_factor: 0.4,
            pattern_factor: 0.6,
            combination_bonus: 0.1,
            exact_word_bonus: 0.05,
            high_priority_weight: 1.2,
            medium_priority_weight: 1.0,
            low_priority_weight: 0.8,
            position_window: 20,
            positional_min_score: 0.6,
            early_exit_score: 1.0,
            early_exit_weight: 1.3,
        }
    }
}

impl RuleScoring {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let factors = [
            ("keyword_factor", self.keyword_factor),
            ("pattern_factor", self.pattern_factor),
            ("combination_bonus", self.combination_bonus),
            ("exact_word_bonus", self.exact_word_bonus),
            ("high_priority_weight", self.high_priority_weight),
            ("medium_priority_weight", self.medium_priority_weight),
            ("low_priority_weight", self.low_priority_weight),
            ("early_exit_weight", self.early_exit_weight),
        ];
        for (name, value) in factors {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidValue {
                    name,
                    reason: format!("must be a non-negative number, got {value}"),
                });
            }
        }

        for (name, value) in [
            ("positional_min_score", self.positional_min_score),
            ("early_exit_score", self.early_exit_score),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ThresholdOutOfRange { name, value });
            }
        }

        Ok(())
    }
}
