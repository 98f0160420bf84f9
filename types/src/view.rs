//! View and sequence counters.
//!
//! A view is one round of the local three-phase protocol. The view id doubles
//! as the per-cluster commit counter: it increments by one every time a local
//! commit completes, and it is also the coordinate of the cluster's entry in
//! the global log.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::NodeId;

/// Identifier of a local view (and of the matching global slot).
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ViewId(u64);

impl ViewId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// The view that follows this one.
    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sequence number assigned by a primary to a proposal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SequenceId(i64);

impl SequenceId {
    /// Sentinel carried by a consensus state that has never started.
    pub const NEVER_STARTED: Self = Self(-2);
    /// The "last committed" sequence before the first proposal of a cluster.
    pub const BEFORE_FIRST: Self = Self(-1);

    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }

    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }

    pub fn is_never_started(&self) -> bool {
        *self == Self::NEVER_STARTED
    }
}

impl fmt::Display for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A view together with the replica designated to propose in it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    pub id: ViewId,
    pub primary: NodeId,
}

impl View {
    pub fn new(id: ViewId, primary: NodeId) -> Self {
        Self { id, primary }
    }

    /// Move to the next view; the primary is fixed for the lifetime of a cluster.
    pub fn advance(&mut self) {
        self.id = self.id.next();
    }

    pub fn is_primary(&self, node: &NodeId) -> bool {
        &self.primary == node
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_sentinels_are_ordered() {
        assert!(SequenceId::NEVER_STARTED < SequenceId::BEFORE_FIRST);
        assert_eq!(SequenceId::BEFORE_FIRST.next(), SequenceId::new(0));
        assert!(SequenceId::NEVER_STARTED.is_never_started());
    }

    #[test]
    fn view_advance_keeps_primary() {
        let mut view = View::new(ViewId::new(7), NodeId::new("N0"));
        view.advance();
        assert_eq!(view.id, ViewId::new(8));
        assert!(view.is_primary(&NodeId::new("N0")));
        assert!(!view.is_primary(&NodeId::new("N1")));
    }
}
