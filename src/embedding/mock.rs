use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{EmbeddingError, HashEmbedder, QueryEmbedder};

/// Test embedder: hash embeddings by default, canned vectors on request,
/// and switchable failure/stall modes. Counts every call.
#[derive(Default)]
pub struct MockEmbedder {
    inner: HashEmbedder,
    canned: Mutex<HashMap<String, Vec<f32>>>,
    failing: AtomicBool,
    delay: Mutex<Option<Duration>>,
    calls: AtomicUsize,
}

impl MockEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            inner: HashEmbedder::new(dimension),
            ..Self::default()
        }
    }

    /// Returns `vector` whenever `text` is embedded.
    pub fn with_vector(self, text: &str, vector: Vec<f32>) -> Self {
        self.canned.lock().insert(text.to_string(), vector);
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Sleeps this long before answering (to trip timeouts).
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock() = delay;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueryEmbedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(EmbeddingError::Unavailable {
                reason: "mock embedder set to fail".to_string(),
            });
        }

        if let Some(v) = self.canned.lock().get(text) {
            return Ok(v.clone());
        }
        self.inner.embed(text).await
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn name(&self) -> &str {
        "mock"
    }
}
