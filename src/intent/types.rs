use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Free-form metadata attached to results and candidates.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Intent id returned when nothing acceptable matched.
pub const FALLBACK_INTENT_ID: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Which stage produced an [`IntentResult`].
pub enum DetectionMethod {
    Rule,
    Vector,
    Rerank,
    Hybrid,
    Fallback,
}

impl DetectionMethod {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionMethod::Rule => "rule",
            DetectionMethod::Vector => "vector",
            DetectionMethod::Rerank => "rerank",
            DetectionMethod::Hybrid => "hybrid",
            DetectionMethod::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Coarse bucket over [`IntentResult::confidence`].
pub enum ConfidenceLevel {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl ConfidenceLevel {
    /// Buckets a confidence: `>=0.9`, `>=0.7`, `>=0.5`, `>=0.3`, else very low.
    pub fn from_confidence(confidence: f32) -> Self {
        if confidence >= 0.9 {
            ConfidenceLevel::VeryHigh
        } else if confidence >= 0.7 {
            ConfidenceLevel::High
        } else if confidence >= 0.5 {
            ConfidenceLevel::Medium
        } else if confidence >= 0.3 {
            ConfidenceLevel::Low
        } else {
            ConfidenceLevel::VeryLow
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::VeryHigh => "very_high",
            ConfidenceLevel::High => "high",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::Low => "low",
            ConfidenceLevel::VeryLow => "very_low",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Known intent families of the university assistant.
pub enum IntentCategory {
    TuitionInquiry,
    AdmissionRequirements,
    ProgramInformation,
    CampusFacilities,
    ScheduleAcademic,
    StudentServices,
    ContactInformation,
    GeneralInformation,
    TechnicalSupport,
    GraduationCareer,
    OutOfScope,
}

impl IntentCategory {
    pub const ALL: [IntentCategory; 11] = [
        IntentCategory::TuitionInquiry,
        IntentCategory::AdmissionRequirements,
        IntentCategory::ProgramInformation,
        IntentCategory::CampusFacilities,
        IntentCategory::ScheduleAcademic,
        IntentCategory::StudentServices,
        IntentCategory::ContactInformation,
        IntentCategory::GeneralInformation,
        IntentCategory::TechnicalSupport,
        IntentCategory::GraduationCareer,
        IntentCategory::OutOfScope,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IntentCategory::TuitionInquiry => "tuition_inquiry",
            IntentCategory::AdmissionRequirements => "admission_requirements",
            IntentCategory::ProgramInformation => "program_information",
            IntentCategory::CampusFacilities => "campus_facilities",
            IntentCategory::ScheduleAcademic => "schedule_academic",
            IntentCategory::StudentServices => "student_services",
            IntentCategory::ContactInformation => "contact_information",
            IntentCategory::GeneralInformation => "general_information",
            IntentCategory::TechnicalSupport => "technical_support",
            IntentCategory::GraduationCareer => "graduation_career",
            IntentCategory::OutOfScope => "out_of_scope",
        }
    }
}

impl FromStr for IntentCategory {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IntentCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Final classification returned to the caller (and stored in the result cache).
pub struct IntentResult {
    pub id: String,
    pub confidence: f32,
    pub method: DetectionMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<IntentCategory>,
    #[serde(default)]
    pub metadata: Metadata,
    pub timestamp: DateTime<Utc>,
}

impl IntentResult {
    /// Creates a result; `confidence` is clamped to `[0, 1]` and the category is
    /// derived from `id` when it names a known [`IntentCategory`].
    pub fn new(id: impl Into<String>, confidence: f32, method: DetectionMethod) -> Self {
        let id = id.into();
        let category = id.parse().ok();
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            id,
            confidence,
            method,
            category,
            metadata: Metadata::new(),
            timestamp: Utc::now(),
        }
    }

    /// The universal degraded result: `id="unknown"`, `metadata.fallback=true`.
    pub fn fallback(confidence: f32) -> Self {
        Self::new(FALLBACK_INTENT_ID, confidence, DetectionMethod::Fallback)
            .with_metadata("fallback", true)
    }

    /// Returns a copy with one more metadata entry.
    pub fn with_metadata(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    #[inline]
    pub fn confidence_level(&self) -> ConfidenceLevel {
        ConfidenceLevel::from_confidence(self.confidence)
    }

    #[inline]
    pub fn is_high_confidence(&self) -> bool {
        self.confidence >= 0.7
    }

    #[inline]
    pub fn is_fallback(&self) -> bool {
        self.method == DetectionMethod::Fallback
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A labeled example utterance returned by vector search or rerank.
pub struct SearchCandidate {
    pub text: String,
    pub intent_id: String,
    /// Cosine similarity, or the pairwise score after rerank.
    pub score: f32,
    #[serde(default)]
    pub metadata: Metadata,
    pub source: String,
}

impl SearchCandidate {
    pub fn new(
        text: impl Into<String>,
        intent_id: impl Into<String>,
        score: f32,
        source: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            intent_id: intent_id.into(),
            score,
            metadata: Metadata::new(),
            source: source.into(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// Sorts candidates by descending score; NaN scores sink to the end.
pub(crate) fn sort_candidates_desc(candidates: &mut [SearchCandidate]) {
    candidates.sort_by(|a, b| match (a.score.is_nan(), b.score.is_nan()) {
        (true, true) => std::cmp::Ordering::Equal,
        (true, false) => std::cmp::Ordering::Greater,
        (false, true) => std::cmp::Ordering::Less,
        (false, false) => b.score.total_cmp(&a.score),
    });
}
