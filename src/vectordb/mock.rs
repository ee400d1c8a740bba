use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use super::model::{IndexPoint, IndexStats, candidate_from_payload};
use super::{IntentIndex, VectorSearchError};
use crate::intent::{SearchCandidate, sort_candidates_desc};

const MOCK_COLLECTION: &str = "mock";

/// In-memory brute-force [`IntentIndex`] with failure injection.
#[derive(Default)]
pub struct MockIntentIndex {
    vector_size: RwLock<Option<u64>>,
    points: RwLock<HashMap<u64, IndexPoint>>,
    failing: AtomicBool,
    delay: Mutex<Option<Duration>>,
    search_calls: AtomicUsize,
}

impl MockIntentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn point_count(&self) -> usize {
        self.points.read().len()
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock() = delay;
    }
}

#[async_trait]
impl IntentIndex for MockIntentIndex {
    async fn search(
        &self,
        vector: Vec<f32>,
        top_k: usize,
        score_threshold: f32,
    ) -> Result<Vec<SearchCandidate>, VectorSearchError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(VectorSearchError::SearchFailed {
                collection: MOCK_COLLECTION.to_string(),
                message: "mock index set to fail".to_string(),
            });
        }

        let mut results: Vec<SearchCandidate> = self
            .points
            .read()
            .values()
            .filter_map(|p| {
                let score = cosine_similarity(&vector, &p.vector);
                (score >= score_threshold).then(|| candidate_from_payload(score, p.payload(), "mock"))
            })
            .collect();

        sort_candidates_desc(&mut results);
        results.truncate(top_k);
        Ok(results)
    }

    async fn ensure_collection(&self, vector_size: u64) -> Result<(), VectorSearchError> {
        self.vector_size.write().get_or_insert(vector_size);
        Ok(())
    }

    async fn upsert(&self, points: Vec<IndexPoint>) -> Result<usize, VectorSearchError> {
        let size = self
            .vector_size
            .read()
            .ok_or_else(|| VectorSearchError::CollectionNotFound {
                collection: MOCK_COLLECTION.to_string(),
            })?;

        let mut stored = self.points.write();
        let count = points.len();
        for point in points {
            if point.vector.len() as u64 != size {
                return Err(VectorSearchError::InvalidDimension {
                    expected: size as usize,
                    actual: point.vector.len(),
                });
            }
            stored.insert(point.id, point);
        }
        Ok(count)
    }

    async fn stats(&self) -> IndexStats {
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return IndexStats::unavailable("mock", MOCK_COLLECTION, "mock index set to fail");
        }
        IndexStats {
            backend: "mock".to_string(),
            collection: MOCK_COLLECTION.to_string(),
            available: true,
            points_count: Some(self.point_count() as u64),
            error: None,
        }
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn collection(&self) -> &str {
        MOCK_COLLECTION
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}
