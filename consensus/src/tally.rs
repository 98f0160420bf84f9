//! Per-phase vote tally keyed by voter identity.

use std::collections::HashMap;
use tessera_types::{Digest, NodeId};

/// Distinct voters for one phase of one proposal.
///
/// A repeat vote from the same voter overwrites the previous entry, so the
/// count is always the number of distinct identities.
#[derive(Clone, Debug, Default)]
pub struct VoteTally {
    votes: HashMap<NodeId, Digest>,
}

impl VoteTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `voter`'s vote. Returns `true` if the voter was not yet counted.
    pub fn record(&mut self, voter: NodeId, digest: Digest) -> bool {
        self.votes.insert(voter, digest).is_none()
    }

    pub fn count(&self) -> usize {
        self.votes.len()
    }

    pub fn contains(&self, voter: &NodeId) -> bool {
        self.votes.contains_key(voter)
    }

    pub fn voters(&self) -> impl Iterator<Item = &NodeId> {
        self.votes.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeat_vote_counts_once() {
        let mut tally = VoteTally::new();
        let d = Digest::new([1; 32]);
        assert!(tally.record(NodeId::new("N1"), d));
        assert!(!tally.record(NodeId::new("N1"), d));
        assert_eq!(tally.count(), 1);
    }

    #[test]
    fn distinct_voters_accumulate() {
        let mut tally = VoteTally::new();
        let d = Digest::new([1; 32]);
        tally.record(NodeId::new("N1"), d);
        tally.record(NodeId::new("N2"), d);
        assert_eq!(tally.count(), 2);
        assert!(tally.contains(&NodeId::new("N2")));
        assert!(!tally.contains(&NodeId::new("N3")));
    }
}
