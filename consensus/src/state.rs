//! Per-view three-phase state machine.
//!
//! A `ConsensusState` is created fresh for each view: by the primary when it
//! proposes a batch, by a replica when it accepts a pre-prepare. It moves
//! strictly forward through the stages and is replaced once committed.
//!
//! Votes are only counted when their `(view, sequence, digest)` triple
//! matches the pending proposal. Every rejection happens before any tally is
//! touched, so a rejected message never partially mutates the state.

use serde::{Deserialize, Serialize};
use std::fmt;
use tessera_messages::{Batch, PrePrepare, Vote, VoteKind};
use tessera_types::{Digest, NodeId, PrivateKey, SequenceId, ViewId};

use crate::tally::VoteTally;
use crate::ConsensusError;

/// Stage of the local three-phase protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Waiting for a batch to propose or a pre-prepare to accept.
    GetRequest,
    /// A proposal is bound; collecting prepare votes.
    PrePrepared,
    /// Prepare quorum reached; collecting commit votes.
    Prepared,
    /// Commit quorum reached. Terminal for this view.
    Committed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::GetRequest => "get-request",
            Stage::PrePrepared => "pre-prepared",
            Stage::Prepared => "prepared",
            Stage::Committed => "committed",
        };
        f.write_str(name)
    }
}

/// The proposal bound to a consensus instance.
#[derive(Clone, Debug)]
struct Proposal {
    sequence_id: SequenceId,
    digest: Digest,
    batch: Batch,
}

/// Outcome of a completed local commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalCommit {
    pub view_id: ViewId,
    pub sequence_id: SequenceId,
    pub digest: Digest,
    pub batch: Batch,
}

/// State of one consensus instance.
#[derive(Clone, Debug)]
pub struct ConsensusState {
    node_id: NodeId,
    view_id: ViewId,
    last_sequence_id: SequenceId,
    stage: Stage,
    proposal: Option<Proposal>,
    prepare_votes: VoteTally,
    commit_votes: VoteTally,
    quorum: usize,
}

impl ConsensusState {
    /// A fresh instance for `view_id`, expecting sequence `last_sequence_id + 1`.
    pub fn new(
        node_id: NodeId,
        view_id: ViewId,
        last_sequence_id: SequenceId,
        quorum: usize,
    ) -> Self {
        Self {
            node_id,
            view_id,
            last_sequence_id,
            stage: Stage::GetRequest,
            proposal: None,
            prepare_votes: VoteTally::new(),
            commit_votes: VoteTally::new(),
            quorum,
        }
    }

    /// Placeholder held before the first instance of a process exists.
    pub fn never_started(node_id: NodeId, quorum: usize) -> Self {
        Self::new(node_id, ViewId::default(), SequenceId::NEVER_STARTED, quorum)
    }

    pub fn view_id(&self) -> ViewId {
        self.view_id
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn last_sequence_id(&self) -> SequenceId {
        self.last_sequence_id
    }

    pub fn digest(&self) -> Option<Digest> {
        self.proposal.as_ref().map(|p| p.digest)
    }

    pub fn sequence_id(&self) -> Option<SequenceId> {
        self.proposal.as_ref().map(|p| p.sequence_id)
    }

    pub fn prepare_count(&self) -> usize {
        self.prepare_votes.count()
    }

    pub fn commit_count(&self) -> usize {
        self.commit_votes.count()
    }

    pub fn has_prepare_from(&self, voter: &NodeId) -> bool {
        self.prepare_votes.contains(voter)
    }

    pub fn has_commit_from(&self, voter: &NodeId) -> bool {
        self.commit_votes.contains(voter)
    }

    /// Whether a new instance may replace this one.
    pub fn is_idle(&self) -> bool {
        self.last_sequence_id.is_never_started()
            || matches!(self.stage, Stage::GetRequest | Stage::Committed)
    }

    /// Primary only: bind `batch` to the next sequence and produce the signed
    /// pre-prepare. Records the primary's implicit prepare vote.
    pub fn start_consensus(
        &mut self,
        mut batch: Batch,
        key: &PrivateKey,
    ) -> Result<PrePrepare, ConsensusError> {
        self.ensure_fresh()?;

        let sequence_id = self.last_sequence_id.next();
        batch.stamp_sequence(sequence_id.as_i64());
        let pre_prepare = PrePrepare::signed(
            self.view_id,
            sequence_id,
            batch,
            self.node_id.clone(),
            key,
        )?;

        self.bind(&pre_prepare);
        self.prepare_votes
            .record(self.node_id.clone(), pre_prepare.digest);
        self.stage = Stage::PrePrepared;
        Ok(pre_prepare)
    }

    /// Replica only: accept the primary's proposal and return this node's
    /// signed prepare vote.
    ///
    /// The proposer's pre-prepare stands as its prepare vote, so both the
    /// proposer and this node enter the prepare tally.
    pub fn accept_pre_prepare(
        &mut self,
        pre_prepare: &PrePrepare,
        key: &PrivateKey,
    ) -> Result<Vote, ConsensusError> {
        if self.proposal.is_some() && pre_prepare.view_id == self.view_id {
            return Err(ConsensusError::DuplicatePrePrepare(self.view_id));
        }
        self.ensure_fresh()?;
        if pre_prepare.view_id != self.view_id {
            return Err(ConsensusError::ViewMismatch {
                expected: self.view_id,
                got: pre_prepare.view_id,
            });
        }
        let expected = self.last_sequence_id.next();
        if pre_prepare.sequence_id != expected {
            return Err(ConsensusError::SequenceMismatch {
                expected,
                got: pre_prepare.sequence_id,
            });
        }
        if !pre_prepare.digest_matches()? {
            return Err(ConsensusError::DigestMismatch);
        }

        self.bind(pre_prepare);
        self.prepare_votes
            .record(pre_prepare.proposer.clone(), pre_prepare.digest);
        self.prepare_votes
            .record(self.node_id.clone(), pre_prepare.digest);
        self.stage = Stage::PrePrepared;

        Ok(self.own_vote(
            VoteKind::Prepare,
            pre_prepare.sequence_id,
            pre_prepare.digest,
            key,
        ))
    }

    /// Count a prepare vote. On reaching quorum, moves to `Prepared` and
    /// returns this node's signed commit vote (already counted locally).
    ///
    /// Prepares arriving after the quorum was reached are ignored.
    pub fn accept_prepare(
        &mut self,
        vote: &Vote,
        key: &PrivateKey,
    ) -> Result<Option<Vote>, ConsensusError> {
        if vote.kind != VoteKind::Prepare {
            return Err(ConsensusError::UnexpectedVoteKind(vote.kind));
        }
        match self.stage {
            Stage::GetRequest => {
                return Err(ConsensusError::WrongStage {
                    stage: self.stage,
                    message: "prepare",
                })
            }
            Stage::Prepared | Stage::Committed => return Ok(None),
            Stage::PrePrepared => {}
        }
        self.check_binding(vote)?;

        self.prepare_votes.record(vote.voter.clone(), vote.digest);
        if self.prepare_votes.count() < self.quorum {
            return Ok(None);
        }

        self.stage = Stage::Prepared;
        let commit = self.own_vote(VoteKind::Commit, vote.sequence_id, vote.digest, key);
        self.commit_votes.record(self.node_id.clone(), commit.digest);
        Ok(Some(commit))
    }

    /// Count a commit vote. On reaching quorum, moves to `Committed` and
    /// returns the committed batch.
    ///
    /// Commits arriving after `Committed` are ignored without error.
    pub fn accept_commit(&mut self, vote: &Vote) -> Result<Option<LocalCommit>, ConsensusError> {
        if vote.kind != VoteKind::Commit {
            return Err(ConsensusError::UnexpectedVoteKind(vote.kind));
        }
        match self.stage {
            Stage::Committed => return Ok(None),
            Stage::Prepared => {}
            stage => {
                return Err(ConsensusError::WrongStage {
                    stage,
                    message: "commit",
                })
            }
        }
        self.check_binding(vote)?;

        self.commit_votes.record(vote.voter.clone(), vote.digest);
        if self.commit_votes.count() < self.quorum {
            return Ok(None);
        }

        let Some(proposal) = self.proposal.as_ref() else {
            return Err(ConsensusError::WrongStage {
                stage: self.stage,
                message: "commit",
            });
        };
        self.stage = Stage::Committed;
        Ok(Some(LocalCommit {
            view_id: self.view_id,
            sequence_id: proposal.sequence_id,
            digest: proposal.digest,
            batch: proposal.batch.clone(),
        }))
    }

    // ── Internals ──────────────────────────────────────────────────────────

    fn ensure_fresh(&self) -> Result<(), ConsensusError> {
        if self.stage != Stage::GetRequest || self.proposal.is_some() {
            return Err(ConsensusError::AnotherConsensusActive);
        }
        Ok(())
    }

    fn bind(&mut self, pre_prepare: &PrePrepare) {
        self.proposal = Some(Proposal {
            sequence_id: pre_prepare.sequence_id,
            digest: pre_prepare.digest,
            batch: pre_prepare.batch.clone(),
        });
    }

    fn check_binding(&self, vote: &Vote) -> Result<(), ConsensusError> {
        if vote.view_id != self.view_id {
            return Err(ConsensusError::ViewMismatch {
                expected: self.view_id,
                got: vote.view_id,
            });
        }
        let Some(proposal) = self.proposal.as_ref() else {
            return Err(ConsensusError::WrongStage {
                stage: self.stage,
                message: "vote",
            });
        };
        if vote.sequence_id != proposal.sequence_id {
            return Err(ConsensusError::SequenceMismatch {
                expected: proposal.sequence_id,
                got: vote.sequence_id,
            });
        }
        if vote.digest != proposal.digest {
            return Err(ConsensusError::DigestMismatch);
        }
        Ok(())
    }

    fn own_vote(
        &self,
        kind: VoteKind,
        sequence_id: SequenceId,
        digest: Digest,
        key: &PrivateKey,
    ) -> Vote {
        Vote::signed(kind, self.view_id, sequence_id, digest, self.node_id.clone(), key)
    }
}
