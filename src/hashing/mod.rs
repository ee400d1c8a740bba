use blake3::Hasher;

/// Result-cache key for an already-normalized query.
#[inline]
pub fn hash_query(normalized: &str) -> [u8; 32] {
    *blake3::hash(normalized.as_bytes()).as_bytes()
}

/// Computes a 64-bit hash of the input data using BLAKE3, truncated from 256 bits.
///
/// Used for vector point ids, where a rare collision overwrites one example
/// utterance and nothing else. Cache keys use the full [`hash_query`] output.
#[inline]
pub fn hash_to_u64(data: &[u8]) -> u64 {
    let hash = blake3::hash(data);
    let bytes: [u8; 8] = hash.as_bytes()[0..8]
        .try_into()
        .expect("BLAKE3 always produces at least 8 bytes");
    u64::from_le_bytes(bytes)
}

/// Stable point id for one example utterance of an intent.
#[inline]
pub fn example_point_id(intent_id: &str, text: &str) -> u64 {
    let mut hasher = Hasher::new();
    hasher.update(intent_id.as_bytes());
    hasher.update(b"|");
    hasher.update(text.as_bytes());

    let hash = hasher.finalize();
    let bytes: [u8; 8] = hash.as_bytes()[0..8]
        .try_into()
        .expect("BLAKE3 always produces at least 8 bytes");
    u64::from_le_bytes(bytes)
}
