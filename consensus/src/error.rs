use tessera_messages::{MessageError, VoteKind};
use tessera_types::{ClusterId, NodeId, SequenceId, ViewId};
use thiserror::Error;

use crate::Stage;

#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("another consensus instance is still active")]
    AnotherConsensusActive,

    #[error("{0} is not the primary of this cluster")]
    NotPrimary(NodeId),

    #[error("proposal from {sender} but the primary is {primary}")]
    NotFromPrimary { sender: NodeId, primary: NodeId },

    #[error("view mismatch: expected {expected}, got {got}")]
    ViewMismatch { expected: ViewId, got: ViewId },

    #[error("sequence mismatch: expected {expected}, got {got}")]
    SequenceMismatch { expected: SequenceId, got: SequenceId },

    #[error("digest does not match the pending proposal")]
    DigestMismatch,

    #[error("a pre-prepare was already accepted for view {0}")]
    DuplicatePrePrepare(ViewId),

    #[error("{message} cannot be handled in stage {stage}")]
    WrongStage { stage: Stage, message: &'static str },

    #[error("unexpected {0} vote")]
    UnexpectedVoteKind(VoteKind),

    #[error("slot ({cluster}, {view}) already holds a different batch")]
    ConflictingSlot { cluster: ClusterId, view: ViewId },

    #[error("no committed batch for ({cluster}, {view})")]
    MissingCommittedBatch { cluster: ClusterId, view: ViewId },

    #[error("cluster {0} is not configured")]
    UnknownCluster(ClusterId),

    #[error(transparent)]
    Message(#[from] MessageError),
}
