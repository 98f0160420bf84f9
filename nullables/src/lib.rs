//! Nullable infrastructure for deterministic testing.
//!
//! External dependencies of a replica (transport, key material, peer
//! addresses) sit behind traits or plain values. This crate provides
//! test-friendly versions that:
//! - Return deterministic values
//! - Can be inspected programmatically
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod keys;
pub mod topology;
pub mod transport;

pub use keys::{seed_for, test_keypair, test_keyring};
pub use topology::{test_directory, test_topology, TestTopology};
pub use transport::{NullTransport, SentMessage};
