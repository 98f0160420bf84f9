//! Global aggregator: the cross-cluster AND-barrier.
//!
//! Global slot `V` resolves only once every configured cluster has a batch
//! at `V` in the [`GlobalLog`]. Resolution appends the slot to the decision
//! stream, hands it to the caller (which emits client replies), and advances
//! the global view. All of this happens under one lock, so a slot is resolved
//! exactly once even when several tasks race to resolve it.

use std::sync::{Mutex, MutexGuard};
use tessera_messages::Batch;
use tessera_types::{ClusterId, ViewId};

use crate::{ConsensusError, GlobalLog};

/// A globally decided slot: one batch per cluster, in configuration order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlobalSlot {
    pub view_id: ViewId,
    pub batches: Vec<(ClusterId, Batch)>,
}

impl GlobalSlot {
    pub fn batch_for(&self, cluster: &ClusterId) -> Option<&Batch> {
        self.batches
            .iter()
            .find(|(c, _)| c == cluster)
            .map(|(_, b)| b)
    }
}

struct Progress {
    global_view: ViewId,
    decided: Vec<GlobalSlot>,
}

pub struct GlobalAggregator {
    progress: Mutex<Progress>,
}

impl Default for GlobalAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl GlobalAggregator {
    pub fn new() -> Self {
        Self {
            progress: Mutex::new(Progress {
                global_view: ViewId::default(),
                decided: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Progress> {
        self.progress
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The next global slot waiting to resolve.
    pub fn global_view(&self) -> ViewId {
        self.lock().global_view
    }

    pub fn decided_len(&self) -> usize {
        self.lock().decided.len()
    }

    /// A copy of the ordered decision stream.
    pub fn decided(&self) -> Vec<GlobalSlot> {
        self.lock().decided.clone()
    }

    /// Resolve every consecutive complete slot starting at the global view.
    ///
    /// `on_resolved` runs under the aggregator lock for each slot, before the
    /// global view moves past it. A slot is decided even if `on_resolved`
    /// fails; the failure stops this pass and is returned. Returns the number
    /// of slots resolved.
    pub fn resolve_ready<F>(&self, log: &GlobalLog, mut on_resolved: F) -> Result<usize, ConsensusError>
    where
        F: FnMut(&GlobalSlot) -> Result<(), ConsensusError>,
    {
        let mut progress = self.lock();
        let mut resolved = 0;
        while let Some(batches) = log.slot(progress.global_view) {
            let slot = GlobalSlot {
                view_id: progress.global_view,
                batches,
            };
            let outcome = on_resolved(&slot);
            progress.decided.push(slot);
            progress.global_view = progress.global_view.next();
            resolved += 1;
            outcome?;
        }
        Ok(resolved)
    }
}
