//! Detection-result cache: a sharded TTL/LRU map behind the [`ResultStore`] seam.

pub mod error;
pub mod lru;
pub mod store;
pub mod types;


pub use error::CacheError;
pub use lru::TtlLruCache;
#[cfg(any(test, feature = "mock"))]
pub use store::MockResultStore;
pub use store::{CacheKey, MemoryResultStore, ResultStore, result_cache_key};
pub use types::CacheStats;
