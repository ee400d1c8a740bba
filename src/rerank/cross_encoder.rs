use std::path::Path;

use candle_core::{Device, Tensor};
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{debug, info};

use super::bert::SequenceClassifier;
use super::device::select_device;
use super::{PairScorer, RerankError, RerankerConfig};

const REQUIRED_FILES: [&str; 3] = ["config.json", "model.safetensors", "tokenizer.json"];

/// Candle BERT cross-encoder; logits are mapped through a sigmoid to `[0, 1]`.
pub struct CrossEncoder {
    model: SequenceClassifier,
    tokenizer: Tokenizer,
    device: Device,
    name: String,
}

impl std::fmt::Debug for CrossEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrossEncoder")
            .field("name", &self.name)
            .field("device", &format!("{:?}", self.device))
            .finish()
    }
}

impl CrossEncoder {
    pub fn load(config: &RerankerConfig) -> Result<Self, RerankError> {
        config.validate()?;
        let model_dir = config
            .model_path
            .as_deref()
            .ok_or_else(|| RerankError::InvalidConfig {
                reason: "cross-encoder requires a model_path".to_string(),
            })?;

        if !model_dir.is_dir() {
            return Err(RerankError::ModelNotFound {
                path: model_dir.to_path_buf(),
            });
        }
        for file in REQUIRED_FILES {
            if !model_dir.join(file).is_file() {
                return Err(RerankError::ModelLoadFailed {
                    reason: format!("missing {file} in {}", model_dir.display()),
                });
            }
        }

        let device = select_device(false)?;
        info!(model_path = %model_dir.display(), ?device, "Loading cross-encoder");

        let model = SequenceClassifier::load(model_dir, &device)?;
        let tokenizer = load_tokenizer(model_dir, config.max_seq_len)?;
        let name = model_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "cross-encoder".to_string());

        Ok(Self {
            model,
            tokenizer,
            device,
            name,
        })
    }

    fn row(&self, data: &[u32]) -> Result<Tensor, RerankError> {
        Ok(Tensor::new(data, &self.device)?.unsqueeze(0)?)
    }
}

fn load_tokenizer(model_dir: &Path, max_len: usize) -> Result<Tokenizer, RerankError> {
    let path = model_dir.join("tokenizer.json");
    let mut tokenizer = Tokenizer::from_file(&path).map_err(|e| RerankError::ModelLoadFailed {
        reason: format!("loading {}: {e}", path.display()),
    })?;

    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length: max_len,
            ..Default::default()
        }))
        .map_err(|e| RerankError::ModelLoadFailed {
            reason: format!("configuring truncation: {e}"),
        })?;
    tokenizer.with_padding(None);
    Ok(tokenizer)
}

impl PairScorer for CrossEncoder {
    fn score(&self, query: &str, candidate: &str) -> Result<f32, RerankError> {
        let encoding = self
            .tokenizer
            .encode((query, candidate), true)
            .map_err(|e| RerankError::TokenizationFailed {
                reason: e.to_string(),
            })?;

        let input_ids = self.row(encoding.get_ids())?;
        let type_ids = self.row(encoding.get_type_ids())?;
        let attention_mask = self.row(encoding.get_attention_mask())?;

        let logits = self.model.forward(&input_ids, &type_ids, &attention_mask)?;
        let logit = logits
            .flatten_all()?
            .to_vec1::<f32>()?
            .first()
            .copied()
            .ok_or_else(|| RerankError::InferenceFailed {
                reason: "model returned no logits".to_string(),
            })?;

        let score = sigmoid(logit);
        debug!(logit, score, "Cross-encoder pair scored");
        Ok(score)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[inline]
pub(crate) fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
