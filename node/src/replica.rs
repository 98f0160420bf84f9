//! The replica: authenticates inbound traffic, drives the local consensus
//! engine one step at a time, and runs the cross-cluster barrier.
//!
//! `Replica` is synchronous and internally synchronized. The async tasks in
//! [`crate::node`] call into it; tests can drive it directly.
//!
//! ## Local path
//!
//! [`Replica::route`] verifies the sender's signature and parks the message
//! in the [`MessageBuffer`]. [`Replica::resolve_once`] then takes at most one
//! unit of work from the buffer and applies it to the [`ConsensusEngine`],
//! broadcasting whatever the engine produces.
//!
//! ## Global path
//!
//! On a local commit every replica records its own cluster's batch in the
//! [`GlobalLog`]; the primary also signs a [`GlobalShare`] and sends it to
//! the first `F + 1` replicas of every other cluster. A recipient verifies
//! the share, records it and echoes it to its own cluster. Whenever a slot
//! holds an entry for every cluster, the aggregator resolves it and the
//! primary replies to the clients of its own batch.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tessera_consensus::{
    BufferDepths, ConsensusEngine, ConsensusError, GlobalAggregator, GlobalLog, GlobalSlot,
    LocalCommit, MessageBuffer, Recorded, Selection, Work,
};
use tessera_crypto::KeyProvider;
use tessera_messages::{GlobalShare, LocalEcho, Reply, Vote, VoteKind, WireMessage};
use tessera_network::{PeerDirectory, Transport};
use tessera_types::{ClusterId, NodeId, PublicKey, SequenceId, ViewId};

use crate::config::ReplicaConfig;
use crate::metrics::NodeMetrics;
use crate::tracing_spans::{global_message_span, global_resolve_span, resolver_turn_span};
use crate::NodeError;

/// What [`Replica::route`] did with an inbound message.
#[derive(Debug, PartialEq, Eq)]
pub enum Routed {
    /// Parked in the message buffer; the resolver should wake.
    Buffered,
    /// A cross-cluster message for the global resolver.
    Global(WireMessage),
    /// Logged and consumed.
    Logged,
    /// Ignored (e.g. a request sent to a non-primary).
    Dropped,
}

/// Snapshot reported by the liveness alarm.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    pub local_view: ViewId,
    pub global_view: ViewId,
    pub decided: usize,
    pub depths: BufferDepths,
}

pub struct Replica {
    config: Arc<ReplicaConfig>,
    keys: Arc<dyn KeyProvider>,
    transport: Arc<dyn Transport>,
    directory: Arc<PeerDirectory>,
    buffer: MessageBuffer,
    global_log: GlobalLog,
    aggregator: GlobalAggregator,
    local_view: AtomicU64,
    metrics: Arc<NodeMetrics>,
}

impl Replica {
    pub fn new(
        config: Arc<ReplicaConfig>,
        keys: Arc<dyn KeyProvider>,
        transport: Arc<dyn Transport>,
        directory: Arc<PeerDirectory>,
    ) -> Self {
        let global_log = GlobalLog::new(config.clusters.clone());
        Self {
            config,
            keys,
            transport,
            directory,
            buffer: MessageBuffer::new(),
            global_log,
            aggregator: GlobalAggregator::new(),
            local_view: AtomicU64::new(0),
            metrics: Arc::new(NodeMetrics::new()),
        }
    }

    pub fn config(&self) -> &ReplicaConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<NodeMetrics> {
        &self.metrics
    }

    pub fn buffer(&self) -> &MessageBuffer {
        &self.buffer
    }

    pub fn global_log(&self) -> &GlobalLog {
        &self.global_log
    }

    pub fn aggregator(&self) -> &GlobalAggregator {
        &self.aggregator
    }

    /// A fresh engine for this replica. The resolver task owns it.
    pub fn new_engine(&self) -> ConsensusEngine {
        ConsensusEngine::new(
            self.config.node_id.clone(),
            self.config.own_primary(),
            self.config.fault_bound,
        )
    }

    /// The ordered stream of globally resolved slots.
    pub fn decided(&self) -> Vec<GlobalSlot> {
        self.aggregator.decided()
    }

    // ── Inbound routing ─────────────────────────────────────────────────

    /// Authenticate `message` and park it for the resolver, or hand it on
    /// to the global path.
    pub fn route(&self, message: WireMessage) -> Result<Routed, NodeError> {
        let kind = message.kind();
        let routed = self.route_inner(message);
        if let Err(e) = &routed {
            tracing::warn!(kind, error = %e, "rejected inbound message");
            self.metrics.reject(kind);
        }
        routed
    }

    fn route_inner(&self, message: WireMessage) -> Result<Routed, NodeError> {
        match message {
            WireMessage::Request(request) => {
                if !self.config.is_primary() {
                    tracing::warn!(
                        client = %request.client_id,
                        primary = %self.config.own_primary(),
                        "request sent to a non-primary, dropping"
                    );
                    return Ok(Routed::Dropped);
                }
                self.metrics.requests_received.inc();
                self.buffer.push_request(request);
                Ok(Routed::Buffered)
            }
            WireMessage::PrePrepare(pre_prepare) => {
                self.authenticate(
                    "pre_prepare",
                    &self.config.cluster,
                    &pre_prepare.proposer,
                    |key| pre_prepare.verify(key),
                )?;
                self.buffer.push_pre_prepare(pre_prepare);
                Ok(Routed::Buffered)
            }
            WireMessage::Prepare(vote) => {
                self.authenticate_vote(&vote, VoteKind::Prepare)?;
                self.buffer.push_prepare(vote);
                Ok(Routed::Buffered)
            }
            WireMessage::Commit(vote) => {
                self.authenticate_vote(&vote, VoteKind::Commit)?;
                self.buffer.push_commit(vote);
                Ok(Routed::Buffered)
            }
            WireMessage::Reply(reply) => {
                tracing::info!(
                    view = %reply.view_id,
                    client = %reply.client_id,
                    from = %reply.node_id,
                    result = %reply.result,
                    "reply received"
                );
                Ok(Routed::Logged)
            }
            global @ (WireMessage::GlobalShare(_) | WireMessage::LocalEcho(_)) => {
                Ok(Routed::Global(global))
            }
        }
    }

    fn authenticate_vote(&self, vote: &Vote, expected: VoteKind) -> Result<(), NodeError> {
        if vote.kind != expected {
            return Err(ConsensusError::UnexpectedVoteKind(vote.kind).into());
        }
        let kind = match expected {
            VoteKind::Prepare => "prepare",
            VoteKind::Commit => "commit",
        };
        self.authenticate(kind, &self.config.cluster, &vote.voter, |key| vote.verify(key))
    }

    /// Look up `signer`'s key and check the signature with `verify`.
    fn authenticate(
        &self,
        kind: &'static str,
        cluster: &ClusterId,
        signer: &NodeId,
        verify: impl FnOnce(&PublicKey) -> bool,
    ) -> Result<(), NodeError> {
        let key = self
            .keys
            .public_key(cluster, signer)
            .ok_or_else(|| NodeError::UnknownSigner {
                cluster: cluster.clone(),
                node: signer.clone(),
            })?;
        if !verify(&key) {
            return Err(NodeError::InvalidSignature {
                kind,
                signer: signer.clone(),
            });
        }
        Ok(())
    }

    // ── Resolver ────────────────────────────────────────────────────────

    /// Perform at most one unit of buffered work against `engine`.
    ///
    /// Returns `true` if work was taken from the buffer (even if the engine
    /// rejected it), so the caller knows to try again. Protocol rejections
    /// are logged and counted; only consistency violations are returned.
    pub fn resolve_once(&self, engine: &mut ConsensusEngine) -> Result<bool, NodeError> {
        let selection = Selection {
            is_primary: engine.is_primary(),
            is_idle: engine.is_idle(),
            stage: engine.stage(),
            view: engine.view_id(),
            batch_size: self.config.batch_size,
        };
        let Some(work) = self.buffer.next_work(&selection)? else {
            return Ok(false);
        };

        let _span = resolver_turn_span(
            self.config.cluster.as_str(),
            self.config.node_id.as_str(),
            selection.view.as_u64(),
        )
        .entered();

        let label = work_label(&work);
        if let Err(e) = self.apply(engine, work) {
            match e {
                NodeError::Consensus(
                    ConsensusError::ConflictingSlot { .. }
                    | ConsensusError::MissingCommittedBatch { .. },
                ) => {
                    tracing::error!(kind = label, error = %e, "consistency violation");
                    return Err(e);
                }
                _ => {
                    tracing::debug!(kind = label, error = %e, "buffered message rejected");
                    self.metrics.reject(label);
                }
            }
        }
        let view = engine.view_id().as_u64();
        self.local_view.store(view, Ordering::Relaxed);
        self.metrics.local_view.set(view as i64);
        Ok(true)
    }

    fn apply(&self, engine: &mut ConsensusEngine, work: Work) -> Result<(), NodeError> {
        let key = self.keys.private_key();
        match work {
            Work::Propose(batch) => match engine.propose(batch.clone(), key) {
                Ok(pre_prepare) => {
                    self.broadcast_local(WireMessage::PrePrepare(pre_prepare));
                    Ok(())
                }
                Err(ConsensusError::AnotherConsensusActive) => {
                    self.buffer.requeue_batch(batch);
                    Err(ConsensusError::AnotherConsensusActive.into())
                }
                Err(e) => Err(e.into()),
            },
            Work::PrePrepare(pre_prepare) => {
                let prepare = engine.on_pre_prepare(&pre_prepare, key)?;
                self.send_vote(prepare);
                Ok(())
            }
            Work::Prepare(vote) => {
                if let Some(commit) = engine.on_prepare(&vote, key)? {
                    self.send_vote(commit);
                }
                Ok(())
            }
            Work::Commit(vote) => {
                if let Some(committed) = engine.on_commit(&vote)? {
                    self.on_local_commit(committed)?;
                }
                Ok(())
            }
        }
    }

    fn send_vote(&self, mut vote: Vote) {
        if self.config.byzantine {
            vote.sequence_id = SequenceId::new(0);
        }
        self.broadcast_local(WireMessage::vote(vote));
    }

    /// Send to every other replica of this cluster.
    fn broadcast_local(&self, message: WireMessage) {
        for (_, address) in self
            .directory
            .peers_of(&self.config.cluster, &self.config.node_id)
        {
            self.transport.send(address, message.clone());
        }
    }

    fn on_local_commit(&self, commit: LocalCommit) -> Result<(), NodeError> {
        self.metrics.local_commits.inc();
        self.global_log
            .record(&self.config.cluster, commit.view_id, commit.batch.clone())?;

        if self.config.is_primary() {
            let share = GlobalShare::signed(
                self.config.cluster.clone(),
                self.config.node_id.clone(),
                commit.view_id,
                commit.batch,
                self.keys.private_key(),
            )?;
            let fanout = self.config.fault_bound.courier_fanout();
            for remote in self.config.clusters.iter().filter(|c| **c != self.config.cluster) {
                for (_, address) in self.directory.couriers(remote, fanout) {
                    self.transport
                        .send(address, WireMessage::GlobalShare(share.clone()));
                }
            }
            tracing::info!(view = %commit.view_id, "shared committed batch with remote clusters");
        }

        self.resolve_global()?;
        Ok(())
    }

    // ── Global path ─────────────────────────────────────────────────────

    /// Apply a courier share or a local echo.
    pub fn handle_global(&self, message: WireMessage) -> Result<(), NodeError> {
        let kind = message.kind();
        let result = match message {
            WireMessage::GlobalShare(share) => self.on_global_share(share),
            WireMessage::LocalEcho(echo) => self.on_local_echo(echo),
            other => {
                tracing::warn!(kind = other.kind(), "not a cross-cluster message, ignoring");
                Ok(())
            }
        };
        if let Err(e) = &result {
            tracing::warn!(kind, error = %e, "rejected cross-cluster message");
            self.metrics.reject(kind);
        }
        result
    }

    fn on_global_share(&self, share: GlobalShare) -> Result<(), NodeError> {
        let _span = global_message_span(
            "global_share",
            share.cluster.as_str(),
            share.view_id.as_u64(),
        )
        .entered();

        if !self.verify_share(&share)? {
            return Ok(());
        }
        let recorded = self
            .global_log
            .record(&share.cluster, share.view_id, share.batch.clone())?;
        if recorded == Recorded::New {
            let echo = LocalEcho::signed(share, self.config.node_id.clone(), self.keys.private_key());
            self.broadcast_local(WireMessage::LocalEcho(echo));
        }
        self.resolve_global()?;
        Ok(())
    }

    fn on_local_echo(&self, echo: LocalEcho) -> Result<(), NodeError> {
        let _span = global_message_span(
            "local_echo",
            echo.share.cluster.as_str(),
            echo.share.view_id.as_u64(),
        )
        .entered();

        self.authenticate("local_echo", &self.config.cluster, &echo.relayer, |key| {
            echo.verify(key)
        })?;
        if !self.verify_share(&echo.share)? {
            return Ok(());
        }
        self.global_log
            .record(&echo.share.cluster, echo.share.view_id, echo.share.batch)?;
        self.resolve_global()?;
        Ok(())
    }

    /// Check that `share` comes from the primary of a configured remote
    /// cluster and that its batch matches its digest.
    ///
    /// Returns `false` for a share about this replica's own cluster, whose
    /// entries come from local commits only.
    fn verify_share(&self, share: &GlobalShare) -> Result<bool, NodeError> {
        if share.cluster == self.config.cluster {
            tracing::debug!(view = %share.view_id, "ignoring share for own cluster");
            return Ok(false);
        }
        if !self.config.is_configured(&share.cluster) {
            return Err(ConsensusError::UnknownCluster(share.cluster.clone()).into());
        }
        if share.courier != self.config.primary_of(&share.cluster) {
            return Err(NodeError::NotFromPrimary {
                cluster: share.cluster.clone(),
                courier: share.courier.clone(),
            });
        }
        self.authenticate("global_share", &share.cluster, &share.courier, |key| {
            share.verify(key)
        })?;
        if !share.digest_matches()? {
            return Err(NodeError::DigestMismatch);
        }
        Ok(true)
    }

    /// Resolve every complete slot at the head of the global log.
    pub fn resolve_global(&self) -> Result<usize, NodeError> {
        let _span = global_resolve_span(self.aggregator.global_view().as_u64()).entered();
        let result = self
            .aggregator
            .resolve_ready(&self.global_log, |slot| self.on_slot_resolved(slot));
        self.metrics
            .global_view
            .set(self.aggregator.global_view().as_u64() as i64);
        match result {
            Ok(resolved) => Ok(resolved),
            Err(e) => {
                tracing::error!(error = %e, "global slot resolved without a reply");
                Err(e.into())
            }
        }
    }

    fn on_slot_resolved(&self, slot: &GlobalSlot) -> Result<(), ConsensusError> {
        self.metrics.global_slots_resolved.inc();
        tracing::info!(
            global_view = %slot.view_id,
            clusters = slot.batches.len(),
            "global slot resolved"
        );
        if !self.config.is_primary() {
            return Ok(());
        }

        let batch = slot
            .batch_for(&self.config.cluster)
            .ok_or_else(|| ConsensusError::MissingCommittedBatch {
                cluster: self.config.cluster.clone(),
                view: slot.view_id,
            })?;
        for request in &batch.requests {
            let reply = Reply::executed(slot.view_id, request, self.config.node_id.clone());
            let address = request
                .reply_to
                .as_deref()
                .or_else(|| self.directory.client_address(&self.config.cluster));
            match address {
                Some(address) => {
                    self.transport.send(address, WireMessage::Reply(reply));
                    self.metrics.replies_sent.inc();
                }
                None => {
                    tracing::warn!(client = %request.client_id, "no reply address for request");
                }
            }
        }
        Ok(())
    }

    // ── Diagnostics ─────────────────────────────────────────────────────

    pub fn progress(&self) -> Progress {
        Progress {
            local_view: ViewId::new(self.local_view.load(Ordering::Relaxed)),
            global_view: self.aggregator.global_view(),
            decided: self.aggregator.decided_len(),
            depths: self.buffer.depths(),
        }
    }

    /// Clusters still missing from the slot the barrier waits on.
    pub fn stalled_on(&self) -> Vec<ClusterId> {
        self.global_log.missing(self.aggregator.global_view())
    }
}

fn work_label(work: &Work) -> &'static str {
    match work {
        Work::Propose(_) => "propose",
        Work::PrePrepare(_) => "pre_prepare",
        Work::Prepare(_) => "prepare",
        Work::Commit(_) => "commit",
    }
}
