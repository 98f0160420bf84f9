//! Deterministic key material derived from node names.

use tessera_crypto::{blake2b_256, keypair_from_seed, Keyring};
use tessera_types::{ClusterId, KeyPair, NodeId};

/// Seed for `(cluster, node)`: the same name always yields the same key.
pub fn seed_for(cluster: &ClusterId, node: &NodeId) -> [u8; 32] {
    blake2b_256(format!("tessera-test/{cluster}/{node}").as_bytes())
}

pub fn test_keypair(cluster: &ClusterId, node: &NodeId) -> KeyPair {
    keypair_from_seed(&seed_for(cluster, node))
}

/// Keyring for `me` that knows every `(cluster, node)` in `members`.
pub fn test_keyring(
    me_cluster: &ClusterId,
    me: &NodeId,
    members: &[(ClusterId, NodeId)],
) -> Keyring {
    let mut ring = Keyring::new(me_cluster.clone(), me.clone(), test_keypair(me_cluster, me));
    for (cluster, node) in members {
        ring.insert(cluster.clone(), node.clone(), test_keypair(cluster, node).public);
    }
    ring
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_crypto::KeyProvider;

    #[test]
    fn keys_are_stable_and_distinct() {
        let n = ClusterId::new("N");
        let a = test_keypair(&n, &NodeId::new("N0"));
        let b = test_keypair(&n, &NodeId::new("N0"));
        let c = test_keypair(&n, &NodeId::new("N1"));
        assert_eq!(a.public, b.public);
        assert_ne!(a.public, c.public);
    }

    #[test]
    fn keyring_knows_members() {
        let n = ClusterId::new("N");
        let members = vec![(n.clone(), NodeId::new("N0")), (n.clone(), NodeId::new("N1"))];
        let ring = test_keyring(&n, &NodeId::new("N1"), &members);
        assert_eq!(
            ring.public_key(&n, &NodeId::new("N0")),
            Some(test_keypair(&n, &NodeId::new("N0")).public)
        );
    }
}
