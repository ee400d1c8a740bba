use std::time::Duration;

use async_trait::async_trait;

use super::{CacheError, CacheStats, TtlLruCache};
use crate::hashing::hash_query;
use crate::intent::IntentResult;
use crate::text::TextNormalizer;

/// Result-cache key: BLAKE3 of the normalized query.
pub type CacheKey = [u8; 32];

/// Queries that normalize identically share a key.
#[inline]
pub fn result_cache_key(normalizer: &TextNormalizer, query: &str) -> CacheKey {
    hash_query(&normalizer.normalize(query))
}

/// Storage for detection results. Only the orchestrator decides what is written.
#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<IntentResult>, CacheError>;

    async fn set(&self, key: CacheKey, value: IntentResult, ttl: Duration) -> Result<(), CacheError>;

    /// Returns whether an entry was removed.
    async fn delete(&self, key: &CacheKey) -> Result<bool, CacheError>;

    async fn clear(&self) -> Result<(), CacheError>;

    async fn stats(&self) -> CacheStats;
}

/// In-process [`ResultStore`] over [`TtlLruCache`].
#[derive(Debug)]
pub struct MemoryResultStore {
    entries: TtlLruCache<CacheKey, IntentResult>,
}

impl MemoryResultStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: TtlLruCache::new(capacity),
        }
    }

    #[inline]
    pub fn inner(&self) -> &TtlLruCache<CacheKey, IntentResult> {
        &self.entries
    }
}

#[async_trait]
impl ResultStore for MemoryResultStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<IntentResult>, CacheError> {
        Ok(self.entries.get(key))
    }

    async fn set(&self, key: CacheKey, value: IntentResult, ttl: Duration) -> Result<(), CacheError> {
        self.entries.insert(key, value, ttl);
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool, CacheError> {
        Ok(self.entries.remove(key))
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.entries.clear();
        Ok(())
    }

    async fn stats(&self) -> CacheStats {
        self.entries.stats()
    }
}

/// Memory store that can be switched into a failing backend.
#[cfg(any(test, feature = "mock"))]
#[derive(Debug)]
pub struct MockResultStore {
    inner: MemoryResultStore,
    failing: std::sync::atomic::AtomicBool,
}

#[cfg(any(test, feature = "mock"))]
impl MockResultStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: MemoryResultStore::new(capacity),
            failing: std::sync::atomic::AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing
            .store(failing, std::sync::atomic::Ordering::SeqCst);
    }

    fn check(&self, op: &'static str) -> Result<(), CacheError> {
        if self.failing.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(CacheError::OperationFailed {
                op,
                reason: "mock store set to fail".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(any(test, feature = "mock"))]
#[async_trait]
impl ResultStore for MockResultStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<IntentResult>, CacheError> {
        self.check("get")?;
        self.inner.get(key).await
    }

    async fn set(&self, key: CacheKey, value: IntentResult, ttl: Duration) -> Result<(), CacheError> {
        self.check("set")?;
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool, CacheError> {
        self.check("delete")?;
        self.inner.delete(key).await
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.check("clear")?;
        self.inner.clear().await
    }

    async fn stats(&self) -> CacheStats {
        if self.check("stats").is_err() {
            return CacheStats::unavailable("mock");
        }
        self.inner.stats().await
    }
}
