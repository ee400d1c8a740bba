use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointStruct, SearchPointsBuilder, UpsertPointsBuilder,
    VectorParamsBuilder,
};
use tracing::{debug, info, instrument};

use super::error::VectorSearchError;
use super::model::{IndexPoint, IndexStats, candidate_from_scored_point};
use crate::intent::SearchCandidate;

/// Nearest-neighbour index over embedded example utterances.
#[async_trait]
pub trait IntentIndex: Send + Sync {
    /// Top `top_k` candidates scoring at least `score_threshold`, best first.
    async fn search(
        &self,
        vector: Vec<f32>,
        top_k: usize,
        score_threshold: f32,
    ) -> Result<Vec<SearchCandidate>, VectorSearchError>;

    /// Creates the backing collection if missing.
    async fn ensure_collection(&self, vector_size: u64) -> Result<(), VectorSearchError>;

    /// Inserts or replaces points; returns how many were written.
    async fn upsert(&self, points: Vec<IndexPoint>) -> Result<usize, VectorSearchError>;

    async fn stats(&self) -> IndexStats;

    fn name(&self) -> &str;

    fn collection(&self) -> &str;
}

#[derive(Clone)]
/// Qdrant-backed [`IntentIndex`].
pub struct QdrantIndex {
    client: Qdrant,
    url: String,
    collection: String,
}

impl std::fmt::Debug for QdrantIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QdrantIndex")
            .field("url", &self.url)
            .field("collection", &self.collection)
            .finish()
    }
}

impl QdrantIndex {
    pub fn new(url: &str, collection: impl Into<String>) -> Result<Self, VectorSearchError> {
        let client =
            Qdrant::from_url(url)
                .build()
                .map_err(|e| VectorSearchError::ConnectionFailed {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;

        Ok(Self {
            client,
            url: url.to_string(),
            collection: collection.into(),
        })
    }

    #[inline]
    pub fn url(&self) -> &str {
        &self.url
    }

    fn collection_error(&self, e: impl ToString) -> VectorSearchError {
        VectorSearchError::CollectionFailed {
            collection: self.collection.clone(),
            message: e.to_string(),
        }
    }
}

#[async_trait]
impl IntentIndex for QdrantIndex {
    #[instrument(skip(self, vector), fields(collection = %self.collection))]
    async fn search(
        &self,
        vector: Vec<f32>,
        top_k: usize,
        score_threshold: f32,
    ) -> Result<Vec<SearchCandidate>, VectorSearchError> {
        let request = SearchPointsBuilder::new(&self.collection, vector, top_k as u64)
            .with_payload(true)
            .score_threshold(score_threshold);

        let response = self.client.search_points(request).await.map_err(|e| {
            VectorSearchError::SearchFailed {
                collection: self.collection.clone(),
                message: e.to_string(),
            }
        })?;

        let candidates: Vec<SearchCandidate> = response
            .result
            .into_iter()
            .map(candidate_from_scored_point)
            .collect();

        debug!(found = candidates.len(), "Qdrant search complete");
        Ok(candidates)
    }

    async fn ensure_collection(&self, vector_size: u64) -> Result<(), VectorSearchError> {
        let exists = self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| self.collection_error(e))?;

        if !exists {
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&self.collection)
                        .vectors_config(VectorParamsBuilder::new(vector_size, Distance::Cosine)),
                )
                .await
                .map_err(|e| self.collection_error(e))?;
            info!(collection = %self.collection, vector_size, "Created Qdrant collection");
        }

        Ok(())
    }

    async fn upsert(&self, points: Vec<IndexPoint>) -> Result<usize, VectorSearchError> {
        if points.is_empty() {
            return Ok(0);
        }

        let qdrant_points: Vec<PointStruct> = points
            .into_iter()
            .map(|p| {
                let payload = p.qdrant_payload();
                PointStruct::new(p.id, p.vector, payload)
            })
            .collect();
        let count = qdrant_points.len();

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, qdrant_points).wait(true))
            .await
            .map_err(|e| VectorSearchError::UpsertFailed {
                collection: self.collection.clone(),
                message: e.to_string(),
            })?;

        Ok(count)
    }

    async fn stats(&self) -> IndexStats {
        match self.client.collection_info(&self.collection).await {
            Ok(info) => IndexStats {
                backend: "qdrant".to_string(),
                collection: self.collection.clone(),
                available: true,
                points_count: info.result.and_then(|r| r.points_count),
                error: None,
            },
            Err(e) => IndexStats::unavailable("qdrant", &self.collection, e),
        }
    }

    fn name(&self) -> &str {
        "qdrant"
    }

    fn collection(&self) -> &str {
        &self.collection
    }
}
