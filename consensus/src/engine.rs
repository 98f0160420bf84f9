//! Consensus engine: owns the current view and the active consensus instance.
//!
//! The engine is single-owner by construction. The replica's resolver task
//! holds it exclusively, so it needs no internal locking.

use tessera_messages::{Batch, PrePrepare, Vote};
use tessera_types::{NodeId, PrivateKey, SequenceId, View, ViewId};

use crate::state::{ConsensusState, LocalCommit, Stage};
use crate::{ConsensusError, FaultBound};

pub struct ConsensusEngine {
    node_id: NodeId,
    view: View,
    last_committed: SequenceId,
    state: ConsensusState,
    fault_bound: FaultBound,
}

impl ConsensusEngine {
    pub fn new(node_id: NodeId, primary: NodeId, fault_bound: FaultBound) -> Self {
        let state = ConsensusState::never_started(node_id.clone(), fault_bound.quorum());
        Self {
            node_id,
            view: View::new(ViewId::default(), primary),
            last_committed: SequenceId::BEFORE_FIRST,
            state,
            fault_bound,
        }
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn view_id(&self) -> ViewId {
        self.view.id
    }

    pub fn is_primary(&self) -> bool {
        self.view.is_primary(&self.node_id)
    }

    pub fn is_idle(&self) -> bool {
        self.state.is_idle()
    }

    pub fn stage(&self) -> Stage {
        self.state.stage()
    }

    pub fn state(&self) -> &ConsensusState {
        &self.state
    }

    pub fn last_committed(&self) -> SequenceId {
        self.last_committed
    }

    pub fn fault_bound(&self) -> FaultBound {
        self.fault_bound
    }

    /// Open a new instance for the current view and propose `batch`.
    ///
    /// The new instance replaces the old one only if proposing succeeds.
    pub fn propose(&mut self, batch: Batch, key: &PrivateKey) -> Result<PrePrepare, ConsensusError> {
        if !self.is_primary() {
            return Err(ConsensusError::NotPrimary(self.node_id.clone()));
        }
        if !self.is_idle() {
            return Err(ConsensusError::AnotherConsensusActive);
        }

        let mut fresh = self.fresh_state();
        let pre_prepare = fresh.start_consensus(batch, key)?;
        self.state = fresh;
        tracing::info!(
            view = %self.view.id,
            sequence = %pre_prepare.sequence_id,
            digest = %pre_prepare.digest,
            "proposed batch"
        );
        Ok(pre_prepare)
    }

    /// Accept the primary's proposal for the current view, returning this
    /// node's prepare vote.
    pub fn on_pre_prepare(
        &mut self,
        pre_prepare: &PrePrepare,
        key: &PrivateKey,
    ) -> Result<Vote, ConsensusError> {
        if pre_prepare.proposer != self.view.primary {
            return Err(ConsensusError::NotFromPrimary {
                sender: pre_prepare.proposer.clone(),
                primary: self.view.primary.clone(),
            });
        }
        if !self.is_idle() {
            if self.state.view_id() == pre_prepare.view_id {
                return Err(ConsensusError::DuplicatePrePrepare(pre_prepare.view_id));
            }
            return Err(ConsensusError::AnotherConsensusActive);
        }

        let mut fresh = self.fresh_state();
        let prepare = fresh.accept_pre_prepare(pre_prepare, key)?;
        self.state = fresh;
        tracing::debug!(view = %self.view.id, digest = %pre_prepare.digest, "pre-prepared");
        Ok(prepare)
    }

    /// Count a prepare vote; returns this node's commit vote once prepared.
    pub fn on_prepare(
        &mut self,
        vote: &Vote,
        key: &PrivateKey,
    ) -> Result<Option<Vote>, ConsensusError> {
        let commit = self.state.accept_prepare(vote, key)?;
        if commit.is_some() {
            tracing::debug!(view = %self.view.id, "prepared");
        }
        Ok(commit)
    }

    /// Count a commit vote. On local commit the view advances by one.
    pub fn on_commit(&mut self, vote: &Vote) -> Result<Option<LocalCommit>, ConsensusError> {
        let Some(committed) = self.state.accept_commit(vote)? else {
            return Ok(None);
        };
        self.last_committed = committed.sequence_id;
        self.view.advance();
        tracing::info!(
            view = %committed.view_id,
            sequence = %committed.sequence_id,
            next_view = %self.view.id,
            "committed locally"
        );
        Ok(Some(committed))
    }

    fn fresh_state(&self) -> ConsensusState {
        ConsensusState::new(
            self.node_id.clone(),
            self.view.id,
            self.last_committed,
            self.fault_bound.quorum(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_crypto::keypair_from_seed;
    use tessera_messages::{Request, VoteKind};
    use tessera_types::KeyPair;

    fn key(seed: u8) -> KeyPair {
        keypair_from_seed(&[seed; 32])
    }

    fn engine(name: &str) -> ConsensusEngine {
        ConsensusEngine::new(
            NodeId::new(name),
            NodeId::new("N0"),
            FaultBound::for_cluster_size(4),
        )
    }

    fn batch(op: &str) -> Batch {
        Batch::new(vec![Request::new("client", op)]).unwrap()
    }

    fn vote(pp: &PrePrepare, kind: VoteKind, voter: &str) -> Vote {
        Vote::signed(
            kind,
            pp.view_id,
            pp.sequence_id,
            pp.digest,
            NodeId::new(voter),
            &key(7).private,
        )
    }

    /// Drive `engine` (the primary) through one full view.
    fn commit_round(primary: &mut ConsensusEngine, op: &str) -> LocalCommit {
        let pp = primary.propose(batch(op), &key(0).private).unwrap();
        primary.on_prepare(&vote(&pp, VoteKind::Prepare, "N1"), &key(0).private).unwrap();
        primary.on_prepare(&vote(&pp, VoteKind::Prepare, "N2"), &key(0).private).unwrap();
        primary.on_commit(&vote(&pp, VoteKind::Commit, "N1")).unwrap();
        primary
            .on_commit(&vote(&pp, VoteKind::Commit, "N2"))
            .unwrap()
            .expect("committed")
    }

    #[test]
    fn fresh_engine_is_idle_at_view_zero() {
        let e = engine("N0");
        assert!(e.is_idle());
        assert!(e.is_primary());
        assert_eq!(e.view_id(), ViewId::new(0));
        assert_eq!(e.last_committed(), SequenceId::BEFORE_FIRST);
    }

    #[test]
    fn replica_cannot_propose() {
        let mut e = engine("N1");
        let err = e.propose(batch("op"), &key(1).private);
        assert!(matches!(err, Err(ConsensusError::NotPrimary(_))));
        assert!(e.is_idle());
    }

    #[test]
    fn propose_while_active_fails() {
        let mut e = engine("N0");
        e.propose(batch("a"), &key(0).private).unwrap();
        let err = e.propose(batch("b"), &key(0).private);
        assert!(matches!(err, Err(ConsensusError::AnotherConsensusActive)));
        assert_eq!(e.stage(), Stage::PrePrepared);
    }

    #[test]
    fn commit_advances_view_and_sequence() {
        let mut e = engine("N0");
        let first = commit_round(&mut e, "a");
        assert_eq!(first.view_id, ViewId::new(0));
        assert_eq!(first.sequence_id, SequenceId::new(0));
        assert_eq!(e.view_id(), ViewId::new(1));
        assert!(e.is_idle());

        let second = commit_round(&mut e, "b");
        assert_eq!(second.view_id, ViewId::new(1));
        assert_eq!(second.sequence_id, SequenceId::new(1));
        assert_eq!(e.view_id(), ViewId::new(2));
    }

    #[test]
    fn replica_follows_primary_proposal() {
        let mut primary = engine("N0");
        let mut replica = engine("N1");
        let pp = primary.propose(batch("op"), &key(0).private).unwrap();

        let prepare = replica.on_pre_prepare(&pp, &key(1).private).unwrap();
        assert_eq!(prepare.voter, NodeId::new("N1"));
        assert_eq!(replica.stage(), Stage::PrePrepared);

        let err = replica.on_pre_prepare(&pp, &key(1).private);
        assert!(matches!(err, Err(ConsensusError::DuplicatePrePrepare(_))));
    }

    #[test]
    fn pre_prepare_from_non_primary_is_rejected() {
        let mut impostor = engine("N3");
        let forged = ConsensusState::new(
            NodeId::new("N3"),
            ViewId::new(0),
            SequenceId::BEFORE_FIRST,
            3,
        )
        .start_consensus(batch("op"), &key(3).private)
        .unwrap();

        let mut replica = engine("N1");
        let err = replica.on_pre_prepare(&forged, &key(1).private);
        assert!(matches!(err, Err(ConsensusError::NotFromPrimary { .. })));
        assert!(replica.is_idle());
        assert!(impostor.propose(batch("x"), &key(3).private).is_err());
    }

    #[test]
    fn failed_pre_prepare_keeps_previous_state() {
        let mut primary = engine("N0");
        let mut pp = primary.propose(batch("op"), &key(0).private).unwrap();
        pp.batch = batch("tampered");

        let mut replica = engine("N1");
        let err = replica.on_pre_prepare(&pp, &key(1).private);
        assert!(matches!(err, Err(ConsensusError::DigestMismatch)));
        assert!(replica.is_idle());
        assert!(replica.state().last_sequence_id().is_never_started());
    }
}
