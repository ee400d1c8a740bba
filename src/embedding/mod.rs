//! Query embedding backends.
//!
//! - [`OpenAiEmbedder`] calls an OpenAI-compatible HTTP endpoint.
//! - [`HashEmbedder`] is a deterministic offline embedder.

mod error;
mod hash;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod openai;


pub use error::EmbeddingError;
pub use hash::{DEFAULT_HASH_DIM, HashEmbedder};
#[cfg(any(test, feature = "mock"))]
pub use mock::MockEmbedder;
pub use openai::{MAX_BATCH, OpenAiEmbedder};

use async_trait::async_trait;

#[async_trait]
/// Turns text into a dense vector for similarity search.
pub trait QueryEmbedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Embeds several texts; the default issues one call per text.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    fn dimension(&self) -> usize;

    fn name(&self) -> &str;
}
