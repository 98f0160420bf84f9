//! Message buffer and resolver selection.
//!
//! Inbound consensus traffic is parked in five typed queues, each behind its
//! own lock. The resolver asks [`MessageBuffer::next_work`] for at most one
//! unit of work per turn, chosen by the engine's current stage and view:
//!
//! 1. primary and idle with a batch ready: propose it
//! 2. idle with a pre-prepare for the current view: accept it
//! 3. pre-prepared with a prepare for the current view: count it
//! 4. prepared with a commit for the current view: count it
//!
//! Messages for older views are discarded as they are scanned. Messages for
//! future views stay queued until the engine catches up.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use tessera_messages::{Batch, PrePrepare, Request, Vote};
use tessera_types::ViewId;

use crate::{ConsensusError, Stage};

/// One unit of resolver work.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Work {
    Propose(Batch),
    PrePrepare(PrePrepare),
    Prepare(Vote),
    Commit(Vote),
}

/// Snapshot of the engine that selection depends on.
#[derive(Clone, Copy, Debug)]
pub struct Selection {
    pub is_primary: bool,
    pub is_idle: bool,
    pub stage: Stage,
    pub view: ViewId,
    pub batch_size: usize,
}

/// Queue depths, for diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BufferDepths {
    pub requests: usize,
    pub pre_prepares: usize,
    pub prepares: usize,
    pub commits: usize,
    pub batches: usize,
}

#[derive(Default)]
pub struct MessageBuffer {
    requests: Mutex<VecDeque<Request>>,
    pre_prepares: Mutex<VecDeque<PrePrepare>>,
    prepares: Mutex<VecDeque<Vote>>,
    commits: Mutex<VecDeque<Vote>>,
    batches: Mutex<VecDeque<Batch>>,
}

/// A poisoned queue still holds valid messages; keep using it.
fn lock<T>(queue: &Mutex<T>) -> MutexGuard<'_, T> {
    queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Drop entries for views below `current` and remove the first entry for
/// `current`, leaving future views in place.
fn take_for_view<T>(
    queue: &mut VecDeque<T>,
    current: ViewId,
    view_of: impl Fn(&T) -> ViewId,
) -> (Option<T>, usize) {
    let before = queue.len();
    queue.retain(|m| view_of(m) >= current);
    let discarded = before - queue.len();
    let taken = queue
        .iter()
        .position(|m| view_of(m) == current)
        .and_then(|i| queue.remove(i));
    (taken, discarded)
}

impl MessageBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_request(&self, request: Request) {
        lock(&self.requests).push_back(request);
    }

    pub fn push_pre_prepare(&self, pre_prepare: PrePrepare) {
        lock(&self.pre_prepares).push_back(pre_prepare);
    }

    pub fn push_prepare(&self, vote: Vote) {
        lock(&self.prepares).push_back(vote);
    }

    pub fn push_commit(&self, vote: Vote) {
        lock(&self.commits).push_back(vote);
    }

    /// Put a batch back at the head of the batch queue after a failed proposal.
    pub fn requeue_batch(&self, batch: Batch) {
        lock(&self.batches).push_front(batch);
    }

    pub fn depths(&self) -> BufferDepths {
        BufferDepths {
            requests: lock(&self.requests).len(),
            pre_prepares: lock(&self.pre_prepares).len(),
            prepares: lock(&self.prepares).len(),
            commits: lock(&self.commits).len(),
            batches: lock(&self.batches).len(),
        }
    }

    /// Select the single next unit of work, or `None` if nothing is actionable.
    pub fn next_work(&self, sel: &Selection) -> Result<Option<Work>, ConsensusError> {
        if sel.is_primary && sel.is_idle {
            if let Some(batch) = self.next_batch(sel.batch_size)? {
                return Ok(Some(Work::Propose(batch)));
            }
        }

        if sel.is_idle {
            let (taken, discarded) =
                take_for_view(&mut *lock(&self.pre_prepares), sel.view, |m| m.view_id);
            log_discarded("pre_prepare", discarded, sel.view);
            if let Some(pp) = taken {
                return Ok(Some(Work::PrePrepare(pp)));
            }
        }

        if sel.stage == Stage::PrePrepared {
            let (taken, discarded) =
                take_for_view(&mut *lock(&self.prepares), sel.view, |v| v.view_id);
            log_discarded("prepare", discarded, sel.view);
            if let Some(vote) = taken {
                return Ok(Some(Work::Prepare(vote)));
            }
        }

        if sel.stage == Stage::Prepared {
            let (taken, discarded) =
                take_for_view(&mut *lock(&self.commits), sel.view, |v| v.view_id);
            log_discarded("commit", discarded, sel.view);
            if let Some(vote) = taken {
                return Ok(Some(Work::Commit(vote)));
            }
        }

        Ok(None)
    }

    /// Assemble a batch from `batch_size` buffered requests if enough are
    /// waiting, then hand out the oldest assembled batch.
    fn next_batch(&self, batch_size: usize) -> Result<Option<Batch>, ConsensusError> {
        let batch_size = batch_size.max(1);
        let drained: Option<Vec<Request>> = {
            let mut requests = lock(&self.requests);
            (requests.len() >= batch_size).then(|| requests.drain(..batch_size).collect())
        };
        let mut batches = lock(&self.batches);
        if let Some(requests) = drained {
            batches.push_back(Batch::new(requests)?);
        }
        Ok(batches.pop_front())
    }
}

fn log_discarded(kind: &str, discarded: usize, view: ViewId) {
    if discarded > 0 {
        tracing::debug!(kind, discarded, %view, "dropped stale buffered messages");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_messages::VoteKind;
    use tessera_types::{Digest, NodeId, SequenceId, Signature, Timestamp};

    fn request(op: &str) -> Request {
        Request {
            timestamp: Timestamp::new(1),
            client_id: "c".into(),
            operation: op.into(),
            sequence_id: 0,
            reply_to: None,
        }
    }

    fn vote(kind: VoteKind, view: u64, voter: &str) -> Vote {
        Vote {
            view_id: ViewId::new(view),
            sequence_id: SequenceId::new(view as i64),
            digest: Digest::ZERO,
            voter: NodeId::new(voter),
            kind,
            signature: Signature::EMPTY,
        }
    }

    fn pre_prepare(view: u64) -> PrePrepare {
        PrePrepare {
            view_id: ViewId::new(view),
            sequence_id: SequenceId::new(view as i64),
            digest: Digest::ZERO,
            proposer: NodeId::new("N0"),
            batch: Batch::new(vec![request("op")]).unwrap(),
            signature: Signature::EMPTY,
        }
    }

    fn sel(is_primary: bool, stage: Stage, view: u64) -> Selection {
        Selection {
            is_primary,
            is_idle: matches!(stage, Stage::GetRequest | Stage::Committed),
            stage,
            view: ViewId::new(view),
            batch_size: 1,
        }
    }

    #[test]
    fn primary_batches_requests_in_order() {
        let buf = MessageBuffer::new();
        buf.push_request(request("a"));
        buf.push_request(request("b"));

        let work = buf.next_work(&sel(true, Stage::GetRequest, 0)).unwrap();
        match work {
            Some(Work::Propose(batch)) => assert_eq!(batch.requests[0].operation, "a"),
            other => panic!("expected Propose, got {other:?}"),
        }
        assert_eq!(buf.depths().requests, 1);
        assert_eq!(buf.depths().batches, 0);
    }

    #[test]
    fn primary_waits_for_full_batch() {
        let buf = MessageBuffer::new();
        buf.push_request(request("a"));
        let mut s = sel(true, Stage::GetRequest, 0);
        s.batch_size = 2;
        assert!(buf.next_work(&s).unwrap().is_none());

        buf.push_request(request("b"));
        match buf.next_work(&s).unwrap() {
            Some(Work::Propose(batch)) => assert_eq!(batch.len(), 2),
            other => panic!("expected Propose, got {other:?}"),
        }
    }

    #[test]
    fn requeued_batch_is_proposed_first() {
        let buf = MessageBuffer::new();
        buf.push_request(request("new"));
        buf.requeue_batch(Batch::new(vec![request("old")]).unwrap());

        match buf.next_work(&sel(true, Stage::Committed, 0)).unwrap() {
            Some(Work::Propose(batch)) => assert_eq!(batch.requests[0].operation, "old"),
            other => panic!("expected Propose, got {other:?}"),
        }
        assert_eq!(buf.depths().batches, 1);
    }

    #[test]
    fn busy_primary_does_not_propose() {
        let buf = MessageBuffer::new();
        buf.push_request(request("a"));
        assert!(buf
            .next_work(&sel(true, Stage::PrePrepared, 0))
            .unwrap()
            .is_none());
        assert_eq!(buf.depths().requests, 1);
    }

    #[test]
    fn replica_never_batches() {
        let buf = MessageBuffer::new();
        buf.push_request(request("a"));
        assert!(buf
            .next_work(&sel(false, Stage::GetRequest, 0))
            .unwrap()
            .is_none());
    }

    #[test]
    fn stale_pre_prepares_dropped_future_kept() {
        let buf = MessageBuffer::new();
        buf.push_pre_prepare(pre_prepare(0));
        buf.push_pre_prepare(pre_prepare(3));
        buf.push_pre_prepare(pre_prepare(2));

        match buf.next_work(&sel(false, Stage::Committed, 2)).unwrap() {
            Some(Work::PrePrepare(pp)) => assert_eq!(pp.view_id, ViewId::new(2)),
            other => panic!("expected PrePrepare, got {other:?}"),
        }
        assert_eq!(buf.depths().pre_prepares, 1);

        assert!(buf
            .next_work(&sel(false, Stage::Committed, 2))
            .unwrap()
            .is_none());
        assert_eq!(buf.depths().pre_prepares, 1);
    }

    #[test]
    fn prepares_only_flow_when_pre_prepared() {
        let buf = MessageBuffer::new();
        buf.push_prepare(vote(VoteKind::Prepare, 1, "N2"));

        assert!(buf
            .next_work(&sel(false, Stage::GetRequest, 1))
            .unwrap()
            .is_none());
        assert_eq!(buf.depths().prepares, 1);

        match buf.next_work(&sel(false, Stage::PrePrepared, 1)).unwrap() {
            Some(Work::Prepare(v)) => assert_eq!(v.voter, NodeId::new("N2")),
            other => panic!("expected Prepare, got {other:?}"),
        }
    }

    #[test]
    fn prepare_scan_discards_lower_views() {
        let buf = MessageBuffer::new();
        buf.push_prepare(vote(VoteKind::Prepare, 0, "N1"));
        buf.push_prepare(vote(VoteKind::Prepare, 2, "N2"));
        buf.push_prepare(vote(VoteKind::Prepare, 1, "N3"));

        match buf.next_work(&sel(false, Stage::PrePrepared, 1)).unwrap() {
            Some(Work::Prepare(v)) => assert_eq!(v.voter, NodeId::new("N3")),
            other => panic!("expected Prepare, got {other:?}"),
        }
        assert_eq!(buf.depths().prepares, 1);
    }

    #[test]
    fn commits_only_flow_when_prepared() {
        let buf = MessageBuffer::new();
        buf.push_commit(vote(VoteKind::Commit, 0, "N1"));
        assert!(buf
            .next_work(&sel(false, Stage::PrePrepared, 0))
            .unwrap()
            .is_none());
        assert!(matches!(
            buf.next_work(&sel(false, Stage::Prepared, 0)).unwrap(),
            Some(Work::Commit(_))
        ));
        assert_eq!(buf.depths().commits, 0);
    }

    #[test]
    fn one_unit_of_work_per_call() {
        let buf = MessageBuffer::new();
        buf.push_prepare(vote(VoteKind::Prepare, 0, "N1"));
        buf.push_prepare(vote(VoteKind::Prepare, 0, "N2"));

        assert!(buf
            .next_work(&sel(false, Stage::PrePrepared, 0))
            .unwrap()
            .is_some());
        assert_eq!(buf.depths().prepares, 1);
    }
}
