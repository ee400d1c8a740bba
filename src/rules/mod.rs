//! Deterministic keyword/pattern intent rules.

pub mod defaults;
pub mod error;
mod loader;
mod matcher;
mod model;


pub use defaults::default_rule_definitions;
pub use error::{RuleError, RuleLoadError};
pub use loader::RuleSet;
pub use matcher::{RuleMatcher, RuleStats, WeightStats};
pub use model::{
    CompiledPattern, IntentRule, MAX_RULE_WEIGHT, MIN_RULE_WEIGHT, Priority, RuleDefinition,
    RuleMatch,
};
