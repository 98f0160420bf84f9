//! Cryptographic primitives for the Tessera protocol.
//!
//! - **Blake2b-256** content digests for batches and signing payloads
//! - **Ed25519** for signing and signature verification
//! - Seed-based key derivation and hex encoding of key files
//! - [`KeyProvider`] lookup of peer verifying keys

pub mod error;
pub mod hash;
pub mod keyring;
pub mod keys;
pub mod sign;

pub use error::CryptoError;
pub use hash::{blake2b_256, blake2b_256_multi, digest_of};
pub use keyring::{KeyProvider, Keyring};
pub use keys::{
    generate_keypair, keypair_from_private, keypair_from_seed, private_key_from_hex,
    private_key_to_hex, public_from_private,
};
pub use sign::{sign_message, verify_signature};
