use serde::Serialize;

/// Counters and occupancy of a result cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    #[serde(rename = "type")]
    pub kind: String,
    pub available: bool,
    pub size: usize,
    pub max_size: usize,
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
    pub evictions: u64,
    /// Entries purged on access after their TTL elapsed.
    pub expired: u64,
    /// Entries past TTL still held (not yet accessed).
    pub expired_entries: usize,
    /// `hits / (hits + misses)`, 0 when idle.
    pub hit_rate: f64,
}

impl CacheStats {
    pub fn unavailable(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            available: false,
            ..Self::default()
        }
    }
}
