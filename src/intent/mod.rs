//! Value types shared by every detection stage.

pub mod context;
pub mod types;


pub use context::DetectionContext;
pub use types::{
    ConfidenceLevel, DetectionMethod, FALLBACK_INTENT_ID, IntentCategory, IntentResult, Metadata,
    SearchCandidate,
};
pub(crate) use types::sort_candidates_desc;
