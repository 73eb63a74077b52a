//! Round-seeded stable hashing for LexLSH bucket projection.
//!
//! Bucket assignments end up as indexed terms, so the hash must never change
//! silently: an index built with one version can only be queried with the
//! same version. Bump [`LEXLSH_HASH_VERSION`] whenever [`round_hash`] changes.

use blake3::Hasher;

/// Identifier of the hash construction used by [`round_hash`].
pub const LEXLSH_HASH_VERSION: &str = "blake3-le64-round-prefix/1";

/// 64-bit hash of `bytes` for hash round `round`.
///
/// BLAKE3 over the round index (little-endian `u64`) followed by the input
/// bytes; the first eight digest bytes are read as a little-endian `u64`.
#[must_use]
pub fn round_hash(round: u32, bytes: &[u8]) -> u64 {
    let mut h = Hasher::new();
    h.update(&u64::from(round).to_le_bytes());
    h.update(bytes);
    let digest = h.finalize();

    let mut word = [0u8; 8];
    word.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_le_bytes(word)
}

/// Maps `bytes` to a bucket in `[0, bucket_count)` for hash round `round`.
///
/// `bucket_count` must be non-zero.
#[must_use]
pub fn bucket(round: u32, bytes: &[u8], bucket_count: u64) -> u64 {
    debug_assert!(bucket_count > 0);
    round_hash(round, bytes) % bucket_count.max(1)
}
