use proptest::prelude::*;

use tessera_types::{ClusterId, Digest, NodeId, SequenceId, Signature, Timestamp, ViewId};

proptest! {
    /// Digest::is_zero is true only for all-zero bytes.
    #[test]
    fn digest_is_zero_correct(bytes in prop::array::uniform32(0u8..)) {
        let digest = Digest::new(bytes);
        prop_assert_eq!(digest.is_zero(), bytes == [0u8; 32]);
    }

    /// Hex parsing recovers the digest that produced the string.
    #[test]
    fn digest_hex_parse(bytes in prop::array::uniform32(0u8..)) {
        let digest = Digest::new(bytes);
        let parsed: Digest = digest.to_hex().parse().unwrap();
        prop_assert_eq!(parsed, digest);
    }

    /// Digest JSON encoding keeps every byte.
    #[test]
    fn digest_json(bytes in prop::array::uniform32(0u8..)) {
        let digest = Digest::new(bytes);
        let json = serde_json::to_string(&digest).unwrap();
        let back: Digest = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back, digest);
    }

    /// Signatures of arbitrary content survive JSON.
    #[test]
    fn signature_json(bytes in prop::collection::vec(any::<u8>(), 64)) {
        let mut arr = [0u8; 64];
        arr.copy_from_slice(&bytes);
        let sig = Signature(arr);
        let json = serde_json::to_string(&sig).unwrap();
        let back: Signature = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back, sig);
    }

    /// ViewId::next is strictly greater below the saturation point.
    #[test]
    fn view_next_increments(v in 0u64..u64::MAX) {
        let id = ViewId::new(v);
        prop_assert!(id.next() > id);
        prop_assert_eq!(id.next().as_u64(), v + 1);
    }

    /// Sequence ordering follows the underlying integer.
    #[test]
    fn sequence_ordering(a in -2i64..1_000_000, b in -2i64..1_000_000) {
        prop_assert_eq!(SequenceId::new(a) <= SequenceId::new(b), a <= b);
    }

    /// Timestamp ordering: new(a) <= new(b) iff a <= b.
    #[test]
    fn timestamp_ordering(a in 0i64..i64::MAX, b in 0i64..i64::MAX) {
        let ta = Timestamp::new(a);
        let tb = Timestamp::new(b);
        prop_assert_eq!(ta <= tb, a <= b);
        prop_assert_eq!(ta == tb, a == b);
    }

    /// The default primary of any cluster name ends in `0`.
    #[test]
    fn default_primary_suffix(name in "[A-Z]{1,3}") {
        let primary = ClusterId::new(name.clone()).default_primary();
        prop_assert_eq!(primary, NodeId::new(format!("{name}0")));
    }
}
