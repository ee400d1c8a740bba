use std::path::PathBuf;

use super::RerankError;

/// Token budget for one (query, candidate) pair.
pub const MAX_SEQ_LEN: usize = 512;

#[derive(Debug, Clone)]
pub struct RerankerConfig {
    /// Cross-encoder directory. `None` selects the lexical scorer.
    pub model_path: Option<PathBuf>,

    pub max_seq_len: usize,

    /// Keep only this many candidates after re-sorting.
    pub top_k: Option<usize>,
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            max_seq_len: MAX_SEQ_LEN,
            top_k: None,
        }
    }
}

impl RerankerConfig {
    pub fn new<P: Into<PathBuf>>(model_path: P) -> Self {
        Self {
            model_path: Some(model_path.into()),
            ..Self::default()
        }
    }

    pub fn lexical() -> Self {
        Self::default()
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn validate(&self) -> Result<(), RerankError> {
        if self.max_seq_len == 0 {
            return Err(RerankError::InvalidConfig {
                reason: "max_seq_len must be positive".to_string(),
            });
        }
        if self.top_k == Some(0) {
            return Err(RerankError::InvalidConfig {
                reason: "top_k must be positive when set".to_string(),
            });
        }
        if let Some(ref path) = self.model_path
            && path.as_os_str().is_empty()
        {
            return Err(RerankError::InvalidConfig {
                reason: "model_path cannot be empty when provided".to_string(),
            });
        }
        Ok(())
    }
}
