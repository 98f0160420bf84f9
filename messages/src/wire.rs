//! Top-level wire message envelope.
//!
//! Every inbound message is decoded into [`WireMessage`] before it reaches
//! the replica; dispatch is an exhaustive match on this enum.

use serde::{Deserialize, Serialize};

use crate::{GlobalShare, LocalEcho, PrePrepare, Reply, Request, Vote, VoteKind};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WireMessage {
    /// Client submission to a primary
    Request(Request),
    /// Primary's proposal
    PrePrepare(PrePrepare),
    /// Prepare-phase vote
    Prepare(Vote),
    /// Commit-phase vote
    Commit(Vote),
    /// Courier message from another cluster's primary
    GlobalShare(GlobalShare),
    /// Courier recipient's re-broadcast inside the local cluster
    LocalEcho(LocalEcho),
    /// Reply to a client (or logged by a replica)
    Reply(Reply),
}

impl WireMessage {
    /// Wrap a vote in the variant matching its kind.
    pub fn vote(vote: Vote) -> Self {
        match vote.kind {
            VoteKind::Prepare => WireMessage::Prepare(vote),
            VoteKind::Commit => WireMessage::Commit(vote),
        }
    }

    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            WireMessage::Request(_) => "request",
            WireMessage::PrePrepare(_) => "pre_prepare",
            WireMessage::Prepare(_) => "prepare",
            WireMessage::Commit(_) => "commit",
            WireMessage::GlobalShare(_) => "global_share",
            WireMessage::LocalEcho(_) => "local_echo",
            WireMessage::Reply(_) => "reply",
        }
    }

    /// Whether this message is handled by the cross-cluster path.
    pub fn is_global(&self) -> bool {
        matches!(self, WireMessage::GlobalShare(_) | WireMessage::LocalEcho(_))
    }
}
