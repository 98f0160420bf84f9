//! Canonical signing payloads.
//!
//! Each payload is a Blake2b-256 hash over a per-message domain tag followed
//! by the fields that identify the message. Variable-length fields are
//! length-prefixed so distinct field splits never collide.

use tessera_crypto::blake2b_256_multi;
use tessera_types::{ClusterId, Digest, NodeId, SequenceId, ViewId};

use crate::VoteKind;

const PRE_PREPARE_TAG: &[u8] = b"tessera/pre-prepare/v1";
const VOTE_TAG: &[u8] = b"tessera/vote/v1";
const GLOBAL_SHARE_TAG: &[u8] = b"tessera/global-share/v1";
const LOCAL_ECHO_TAG: &[u8] = b"tessera/local-echo/v1";

fn len_prefix(field: &[u8]) -> [u8; 4] {
    (field.len() as u32).to_le_bytes()
}

pub fn pre_prepare(
    view: ViewId,
    sequence: SequenceId,
    digest: &Digest,
    proposer: &NodeId,
) -> [u8; 32] {
    blake2b_256_multi(&[
        PRE_PREPARE_TAG,
        &view.as_u64().to_le_bytes(),
        &sequence.as_i64().to_le_bytes(),
        digest.as_bytes(),
        &len_prefix(proposer.as_bytes()),
        proposer.as_bytes(),
    ])
}

pub fn vote(
    kind: VoteKind,
    view: ViewId,
    sequence: SequenceId,
    digest: &Digest,
    voter: &NodeId,
) -> [u8; 32] {
    blake2b_256_multi(&[
        VOTE_TAG,
        &[kind.tag()],
        &view.as_u64().to_le_bytes(),
        &sequence.as_i64().to_le_bytes(),
        digest.as_bytes(),
        &len_prefix(voter.as_bytes()),
        voter.as_bytes(),
    ])
}

pub fn global_share(
    cluster: &ClusterId,
    courier: &NodeId,
    view: ViewId,
    digest: &Digest,
) -> [u8; 32] {
    blake2b_256_multi(&[
        GLOBAL_SHARE_TAG,
        &len_prefix(cluster.as_str().as_bytes()),
        cluster.as_str().as_bytes(),
        &len_prefix(courier.as_bytes()),
        courier.as_bytes(),
        &view.as_u64().to_le_bytes(),
        digest.as_bytes(),
    ])
}

pub fn local_echo(
    share_digest: &Digest,
    cluster: &ClusterId,
    view: ViewId,
    relayer: &NodeId,
) -> [u8; 32] {
    blake2b_256_multi(&[
        LOCAL_ECHO_TAG,
        share_digest.as_bytes(),
        &len_prefix(cluster.as_str().as_bytes()),
        cluster.as_str().as_bytes(),
        &view.as_u64().to_le_bytes(),
        &len_prefix(relayer.as_bytes()),
        relayer.as_bytes(),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vote_kinds_sign_different_payloads() {
        let d = Digest::new([1; 32]);
        let n = NodeId::new("N1");
        let prepare = vote(VoteKind::Prepare, ViewId::new(0), SequenceId::new(0), &d, &n);
        let commit = vote(VoteKind::Commit, ViewId::new(0), SequenceId::new(0), &d, &n);
        assert_ne!(prepare, commit);
    }

    #[test]
    fn sequence_is_bound() {
        let d = Digest::new([1; 32]);
        let n = NodeId::new("N1");
        let a = vote(VoteKind::Prepare, ViewId::new(0), SequenceId::new(3), &d, &n);
        let b = vote(VoteKind::Prepare, ViewId::new(0), SequenceId::new(0), &d, &n);
        assert_ne!(a, b);
    }

    #[test]
    fn field_boundaries_do_not_collide() {
        let d = Digest::new([2; 32]);
        let a = global_share(&ClusterId::new("N"), &NodeId::new("M0"), ViewId::new(1), &d);
        let b = global_share(&ClusterId::new("NM"), &NodeId::new("0"), ViewId::new(1), &d);
        assert_ne!(a, b);
    }

    #[test]
    fn domains_are_separated() {
        let d = Digest::new([3; 32]);
        let n = NodeId::new("N0");
        let pp = pre_prepare(ViewId::new(0), SequenceId::new(0), &d, &n);
        let v = vote(VoteKind::Prepare, ViewId::new(0), SequenceId::new(0), &d, &n);
        assert_ne!(pp, v);
    }
}
