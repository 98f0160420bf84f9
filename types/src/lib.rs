//! Fundamental types for the Tessera protocol.
//!
//! This crate defines the core types shared across every other crate in the
//! workspace: cluster and node identities, view and sequence counters,
//! batch digests, key material and timestamps.

pub mod digest;
pub mod error;
pub mod ids;
pub mod keys;
pub mod time;
pub mod view;

pub use digest::Digest;
pub use error::TypesError;
pub use ids::{ClusterId, NodeId};
pub use keys::{KeyPair, PrivateKey, PublicKey, Signature};
pub use time::Timestamp;
pub use view::{SequenceId, View, ViewId};
