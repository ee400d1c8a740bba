use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::Metadata;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Per-request input built by the calling agent; read-only inside the engine.
pub struct DetectionContext {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl DetectionContext {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            user_id: None,
            session_id: None,
            language: None,
            timestamp: Utc::now(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

impl From<&str> for DetectionContext {
    fn from(query: &str) -> Self {
        Self::new(query)
    }
}

impl From<String> for DetectionContext {
    fn from(query: String) -> Self {
        Self::new(query)
    }
}
