//! Consensus: PBFT inside a cluster, and the global barrier across clusters.
//!
//! ## Module overview
//!
//! - [`quorum`]: fault bound `F = (N - 1) / 3`, quorum `2F + 1`, courier fan-out `F + 1`.
//! - [`state`]: per-view state machine (GetRequest → PrePrepared → Prepared → Committed).
//! - [`engine`]: owns the view and the active instance; advances the view on commit.
//! - [`buffer`]: typed inbound queues and the one-action-per-turn selection rule.
//! - [`global_log`]: write-once cluster × view table of committed batches.
//! - [`aggregator`]: the AND-barrier producing the global decision stream.
//! - [`error`]: consensus error types.

pub mod aggregator;
pub mod buffer;
pub mod engine;
pub mod error;
pub mod global_log;
pub mod quorum;
pub mod state;
pub mod tally;

pub use aggregator::{GlobalAggregator, GlobalSlot};
pub use buffer::{BufferDepths, MessageBuffer, Selection, Work};
pub use engine::ConsensusEngine;
pub use error::ConsensusError;
pub use global_log::{GlobalLog, Recorded};
pub use quorum::FaultBound;
pub use state::{ConsensusState, LocalCommit, Stage};
pub use tally::VoteTally;
