//! Messages of the local three-phase protocol.

use serde::{Deserialize, Serialize};
use std::fmt;
use tessera_crypto::{sign_message, verify_signature};
use tessera_types::{Digest, NodeId, PrivateKey, PublicKey, SequenceId, Signature, ViewId};

use crate::{payload, Batch, MessageError};

/// The primary's proposal of a batch for a (view, sequence) slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrePrepare {
    pub view_id: ViewId,
    pub sequence_id: SequenceId,
    pub digest: Digest,
    pub proposer: NodeId,
    pub batch: Batch,
    pub signature: Signature,
}

impl PrePrepare {
    /// Digest the batch and sign the proposal as `proposer`.
    pub fn signed(
        view_id: ViewId,
        sequence_id: SequenceId,
        batch: Batch,
        proposer: NodeId,
        key: &PrivateKey,
    ) -> Result<Self, MessageError> {
        let digest = batch.digest()?;
        let signature = sign_message(
            &payload::pre_prepare(view_id, sequence_id, &digest, &proposer),
            key,
        );
        Ok(Self {
            view_id,
            sequence_id,
            digest,
            proposer,
            batch,
            signature,
        })
    }

    pub fn verify(&self, proposer_key: &PublicKey) -> bool {
        let payload =
            payload::pre_prepare(self.view_id, self.sequence_id, &self.digest, &self.proposer);
        verify_signature(&payload, &self.signature, proposer_key)
    }

    /// Whether the carried batch actually hashes to the carried digest.
    pub fn digest_matches(&self) -> Result<bool, MessageError> {
        Ok(self.batch.digest()? == self.digest)
    }
}

/// Which phase a [`Vote`] belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteKind {
    Prepare,
    Commit,
}

impl VoteKind {
    pub(crate) fn tag(self) -> u8 {
        match self {
            VoteKind::Prepare => 0,
            VoteKind::Commit => 1,
        }
    }
}

impl fmt::Display for VoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoteKind::Prepare => f.write_str("prepare"),
            VoteKind::Commit => f.write_str("commit"),
        }
    }
}

/// A replica's prepare or commit vote on a proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub view_id: ViewId,
    pub sequence_id: SequenceId,
    pub digest: Digest,
    pub voter: NodeId,
    pub kind: VoteKind,
    pub signature: Signature,
}

impl Vote {
    pub fn signed(
        kind: VoteKind,
        view_id: ViewId,
        sequence_id: SequenceId,
        digest: Digest,
        voter: NodeId,
        key: &PrivateKey,
    ) -> Self {
        let signature = sign_message(
            &payload::vote(kind, view_id, sequence_id, &digest, &voter),
            key,
        );
        Self {
            view_id,
            sequence_id,
            digest,
            voter,
            kind,
            signature,
        }
    }

    pub fn verify(&self, voter_key: &PublicKey) -> bool {
        let payload = payload::vote(
            self.kind,
            self.view_id,
            self.sequence_id,
            &self.digest,
            &self.voter,
        );
        verify_signature(&payload, &self.signature, voter_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Request;
    use tessera_crypto::keypair_from_seed;
    use tessera_types::Timestamp;

    fn batch() -> Batch {
        Batch::new(vec![Request {
            timestamp: Timestamp::new(1),
            client_id: "c".into(),
            operation: "op".into(),
            sequence_id: 0,
            reply_to: None,
        }])
        .unwrap()
    }

    #[test]
    fn pre_prepare_signature_verifies() {
        let kp = keypair_from_seed(&[1; 32]);
        let pp = PrePrepare::signed(
            ViewId::new(0),
            SequenceId::new(0),
            batch(),
            NodeId::new("N0"),
            &kp.private,
        )
        .unwrap();
        assert!(pp.verify(&kp.public));
        assert!(pp.digest_matches().unwrap());
    }

    #[test]
    fn tampered_batch_breaks_digest_binding() {
        let kp = keypair_from_seed(&[1; 32]);
        let mut pp = PrePrepare::signed(
            ViewId::new(0),
            SequenceId::new(0),
            batch(),
            NodeId::new("N0"),
            &kp.private,
        )
        .unwrap();
        pp.batch.requests[0].operation = "other".into();
        assert!(pp.verify(&kp.public));
        assert!(!pp.digest_matches().unwrap());
    }

    #[test]
    fn vote_with_rewritten_sequence_fails() {
        let kp = keypair_from_seed(&[2; 32]);
        let mut vote = Vote::signed(
            VoteKind::Prepare,
            ViewId::new(4),
            SequenceId::new(4),
            Digest::new([9; 32]),
            NodeId::new("N3"),
            &kp.private,
        );
        assert!(vote.verify(&kp.public));
        vote.sequence_id = SequenceId::new(0);
        assert!(!vote.verify(&kp.public));
    }

    #[test]
    fn vote_kind_is_bound_into_signature() {
        let kp = keypair_from_seed(&[2; 32]);
        let mut vote = Vote::signed(
            VoteKind::Prepare,
            ViewId::new(0),
            SequenceId::new(0),
            Digest::new([9; 32]),
            NodeId::new("N1"),
            &kp.private,
        );
        vote.kind = VoteKind::Commit;
        assert!(!vote.verify(&kp.public));
    }
}
