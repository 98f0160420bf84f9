//! Fault bound and quorum arithmetic for a cluster.

use serde::{Deserialize, Serialize};

/// Fault tolerance of a cluster of `N` replicas: `F = (N - 1) / 3`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultBound {
    cluster_size: usize,
    faulty: usize,
}

impl FaultBound {
    pub fn for_cluster_size(cluster_size: usize) -> Self {
        Self {
            cluster_size,
            faulty: cluster_size.saturating_sub(1) / 3,
        }
    }

    pub fn cluster_size(&self) -> usize {
        self.cluster_size
    }

    /// Maximum number of byzantine replicas tolerated (`F`).
    pub fn faulty(&self) -> usize {
        self.faulty
    }

    /// Distinct matching votes needed to advance a phase (`2F + 1`).
    pub fn quorum(&self) -> usize {
        2 * self.faulty + 1
    }

    /// Replicas of each remote cluster that receive a courier share (`F + 1`).
    pub fn courier_fanout(&self) -> usize {
        self.faulty + 1
    }
}
