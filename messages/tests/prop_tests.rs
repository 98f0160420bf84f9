use proptest::prelude::*;

use tessera_crypto::keypair_from_seed;
use tessera_messages::{Batch, PrePrepare, Request, Vote, VoteKind};
use tessera_types::{Digest, NodeId, SequenceId, Timestamp, ViewId};

fn arb_request() -> impl Strategy<Value = Request> {
    ("[a-z]{1,8}", "[a-z0-9 ]{0,24}", 0i64..1_000_000).prop_map(|(client, op, ts)| Request {
        timestamp: Timestamp::new(ts),
        client_id: client,
        operation: op,
        sequence_id: 0,
        reply_to: None,
    })
}

proptest! {
    /// A signed proposal decoded from JSON still verifies and binds its batch.
    #[test]
    fn pre_prepare_survives_json(
        requests in prop::collection::vec(arb_request(), 1..4),
        view in 0u64..1000,
        seq in 0i64..1000,
    ) {
        let kp = keypair_from_seed(&[11; 32]);
        let batch = Batch::new(requests).unwrap();
        let pp = PrePrepare::signed(
            ViewId::new(view),
            SequenceId::new(seq),
            batch,
            NodeId::new("N0"),
            &kp.private,
        ).unwrap();
        let json = serde_json::to_string(&pp).unwrap();
        let back: PrePrepare = serde_json::from_str(&json).unwrap();
        prop_assert!(back.verify(&kp.public));
        prop_assert!(back.digest_matches().unwrap());
    }

    /// Changing any identifying field of a vote invalidates its signature.
    #[test]
    fn vote_fields_are_bound(view in 0u64..1000, seq in 0i64..1000, bump in 1u64..10) {
        let kp = keypair_from_seed(&[12; 32]);
        let vote = Vote::signed(
            VoteKind::Commit,
            ViewId::new(view),
            SequenceId::new(seq),
            Digest::new([5; 32]),
            NodeId::new("M2"),
            &kp.private,
        );
        prop_assert!(vote.verify(&kp.public));

        let mut moved = vote.clone();
        moved.view_id = ViewId::new(view + bump);
        prop_assert!(!moved.verify(&kp.public));

        let mut resequenced = vote;
        resequenced.sequence_id = SequenceId::new(seq + bump as i64);
        prop_assert!(!resequenced.verify(&kp.public));
    }

    /// Distinct operations never share a batch digest.
    #[test]
    fn digest_separates_operations(a in "[a-z]{1,12}", b in "[a-z]{1,12}") {
        prop_assume!(a != b);
        let ba = Batch::new(vec![Request { timestamp: Timestamp::new(1), client_id: "c".into(), operation: a, sequence_id: 0, reply_to: None }]).unwrap();
        let bb = Batch::new(vec![Request { timestamp: Timestamp::new(1), client_id: "c".into(), operation: b, sequence_id: 0, reply_to: None }]).unwrap();
        prop_assert_ne!(ba.digest().unwrap(), bb.digest().unwrap());
    }
}
