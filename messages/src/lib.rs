//! Protocol messages for Tessera replica-to-replica and client traffic.
//!
//! Every state-changing message carries an Ed25519 signature from its
//! purported sender over a domain-separated payload (see [`payload`]).
//! Messages travel as JSON; the canonical batch digest uses bincode.

pub mod error;
pub mod global;
pub mod payload;
pub mod phase;
pub mod request;
pub mod wire;

pub use error::MessageError;
pub use global::{GlobalShare, LocalEcho};
pub use phase::{PrePrepare, Vote, VoteKind};
pub use request::{Batch, Reply, Request, EXECUTED};
pub use wire::WireMessage;
