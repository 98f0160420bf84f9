//! Blake2b hashing for batch digests and signing payloads.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest as _};
use tessera_types::Digest;

type Blake2b256 = Blake2b<U32>;

/// Compute a 256-bit Blake2b hash of arbitrary data.
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    let mut output = [0u8; 32];
    output.copy_from_slice(&hasher.finalize());
    output
}

/// Hash multiple byte slices in sequence (avoids concatenation allocation).
pub fn blake2b_256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    let mut output = [0u8; 32];
    output.copy_from_slice(&hasher.finalize());
    output
}

/// Fingerprint an encoded value as a protocol [`Digest`].
pub fn digest_of(bytes: &[u8]) -> Digest {
    Digest::new(blake2b_256(bytes))
}
