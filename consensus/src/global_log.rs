//! Global log: cluster → view → committed batch.
//!
//! Each `(cluster, view)` slot is written at most once. Re-recording the same
//! batch is a no-op; recording a different batch is a consistency violation.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use tessera_messages::Batch;
use tessera_types::{ClusterId, Digest, ViewId};

use crate::ConsensusError;

/// What [`GlobalLog::record`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Recorded {
    /// The slot was empty and now holds the batch.
    New,
    /// The slot already held this exact batch.
    AlreadyPresent,
}

#[derive(Clone, Debug)]
struct Entry {
    digest: Digest,
    batch: Batch,
}

pub struct GlobalLog {
    clusters: Vec<ClusterId>,
    slots: Mutex<HashMap<ClusterId, BTreeMap<ViewId, Entry>>>,
}

impl GlobalLog {
    /// A log over `clusters`, in the order global slots list their batches.
    pub fn new(clusters: Vec<ClusterId>) -> Self {
        let slots = clusters
            .iter()
            .map(|c| (c.clone(), BTreeMap::new()))
            .collect();
        Self {
            clusters,
            slots: Mutex::new(slots),
        }
    }

    pub fn clusters(&self) -> &[ClusterId] {
        &self.clusters
    }

    pub fn record(
        &self,
        cluster: &ClusterId,
        view: ViewId,
        batch: Batch,
    ) -> Result<Recorded, ConsensusError> {
        let digest = batch.digest()?;
        let mut slots = self
            .slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let column = slots
            .get_mut(cluster)
            .ok_or_else(|| ConsensusError::UnknownCluster(cluster.clone()))?;

        match column.get(&view) {
            Some(existing) if existing.digest == digest => Ok(Recorded::AlreadyPresent),
            Some(_) => Err(ConsensusError::ConflictingSlot {
                cluster: cluster.clone(),
                view,
            }),
            None => {
                column.insert(view, Entry { digest, batch });
                Ok(Recorded::New)
            }
        }
    }

    pub fn get(&self, cluster: &ClusterId, view: ViewId) -> Option<Batch> {
        let slots = self
            .slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        slots
            .get(cluster)
            .and_then(|column| column.get(&view))
            .map(|entry| entry.batch.clone())
    }

    /// Whether every configured cluster has an entry at `view`.
    pub fn is_complete(&self, view: ViewId) -> bool {
        let slots = self
            .slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        self.clusters.iter().all(|c| {
            slots
                .get(c)
                .is_some_and(|column| column.contains_key(&view))
        })
    }

    /// All batches at `view` in cluster order, if the slot is complete.
    pub fn slot(&self, view: ViewId) -> Option<Vec<(ClusterId, Batch)>> {
        if self.clusters.is_empty() {
            return None;
        }
        let slots = self
            .slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        self.clusters
            .iter()
            .map(|c| {
                slots
                    .get(c)
                    .and_then(|column| column.get(&view))
                    .map(|entry| (c.clone(), entry.batch.clone()))
            })
            .collect()
    }

    /// Clusters with no entry at `view`.
    pub fn missing(&self, view: ViewId) -> Vec<ClusterId> {
        let slots = self
            .slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        self.clusters
            .iter()
            .filter(|c| {
                !slots
                    .get(*c)
                    .is_some_and(|column| column.contains_key(&view))
            })
            .cloned()
            .collect()
    }
}
