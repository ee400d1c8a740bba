use std::path::Path;
use std::sync::Arc;

use candle_core::{DType, Device, IndexOp, Tensor};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config};

use super::RerankError;

/// Weight prefixes used by exported BERT-family cross-encoders.
const ENCODER_PREFIXES: [&str; 3] = ["bert", "roberta", "electra"];

struct SequenceClassifierImpl {
    encoder: BertModel,
    head: Linear,
}

/// BERT encoder with a single-logit relevance head over `[CLS]`.
#[derive(Clone)]
pub struct SequenceClassifier(Arc<SequenceClassifierImpl>);

impl SequenceClassifier {
    /// Loads `config.json` and `model.safetensors` from `model_dir`.
    pub fn load(model_dir: &Path, device: &Device) -> Result<Self, RerankError> {
        let config_path = model_dir.join("config.json");
        let weights_path = model_dir.join("model.safetensors");

        let raw = std::fs::read_to_string(&config_path).map_err(|e| {
            RerankError::ModelLoadFailed {
                reason: format!("reading {}: {e}", config_path.display()),
            }
        })?;
        let config: Config =
            serde_json::from_str(&raw).map_err(|e| RerankError::ModelLoadFailed {
                reason: format!("parsing {}: {e}", config_path.display()),
            })?;

        // SAFETY: the weights file is opened read-only and not modified while mapped.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, device)
        }?;

        let encoder_vb = ENCODER_PREFIXES
            .iter()
            .find(|p| vb.contains_tensor(&format!("{p}.embeddings.word_embeddings.weight")))
            .map(|p| vb.pp(*p))
            .unwrap_or_else(|| vb.clone());

        let encoder = BertModel::load(encoder_vb, &config)?;
        let head = candle_nn::linear(config.hidden_size, 1, vb.pp("classifier"))?;

        Ok(Self(Arc::new(SequenceClassifierImpl { encoder, head })))
    }

    /// Raw relevance logits, shape `[batch, 1]`.
    pub fn forward(
        &self,
        input_ids: &Tensor,
        token_type_ids: &Tensor,
        attention_mask: &Tensor,
    ) -> Result<Tensor, RerankError> {
        let hidden = self
            .0
            .encoder
            .forward(input_ids, token_type_ids, Some(attention_mask))?;
        let cls = hidden.i((.., 0, ..))?;
        Ok(self.0.head.forward(&cls)?)
    }
}
