//! Ed25519 key generation and key-file encoding.
//!
//! Key files hold the 32-byte private seed as lowercase hex; the public half
//! is always derived, never stored.

use ed25519_dalek::SigningKey;
use tessera_types::{KeyPair, PrivateKey, PublicKey};

use crate::CryptoError;

/// Generate a new Ed25519 key pair from the operating system's entropy source.
pub fn generate_keypair() -> Result<KeyPair, CryptoError> {
    let mut seed = [0u8; 32];
    getrandom::getrandom(&mut seed).map_err(|e| CryptoError::Entropy(e.to_string()))?;
    let kp = keypair_from_seed(&seed);
    seed.fill(0);
    Ok(kp)
}

/// Derive the public key from a private key.
pub fn public_from_private(private: &PrivateKey) -> PublicKey {
    let signing_key = SigningKey::from_bytes(&private.0);
    PublicKey(signing_key.verifying_key().to_bytes())
}

/// Reconstruct a full key pair from a private key.
pub fn keypair_from_private(private: PrivateKey) -> KeyPair {
    let public = public_from_private(&private);
    KeyPair { public, private }
}

/// Derive a key pair from a 32-byte seed (deterministic).
pub fn keypair_from_seed(seed: &[u8; 32]) -> KeyPair {
    keypair_from_private(PrivateKey(*seed))
}

/// Parse a hex-encoded private seed, tolerating surrounding whitespace.
pub fn private_key_from_hex(text: &str) -> Result<PrivateKey, CryptoError> {
    let bytes = hex::decode(text.trim()).map_err(|e| CryptoError::KeyEncoding(e.to_string()))?;
    let seed: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| CryptoError::KeyEncoding(format!("expected 32 bytes, got {}", bytes.len())))?;
    Ok(PrivateKey(seed))
}

pub fn private_key_to_hex(private: &PrivateKey) -> String {
    hex::encode(private.0)
}
