//! Key lookup for message authentication.

use std::collections::HashMap;
use tessera_types::{ClusterId, KeyPair, NodeId, PrivateKey, PublicKey};

/// Source of this node's signing key and every peer's verifying key.
pub trait KeyProvider: Send + Sync {
    /// Public key of `node` in `cluster`, if known.
    fn public_key(&self, cluster: &ClusterId, node: &NodeId) -> Option<PublicKey>;

    /// This node's private key.
    fn private_key(&self) -> &PrivateKey;
}

/// In-memory [`KeyProvider`] over a fixed set of public keys.
pub struct Keyring {
    private: PrivateKey,
    publics: HashMap<(ClusterId, NodeId), PublicKey>,
}

impl Keyring {
    /// A keyring that signs with `own` and knows its own public key as
    /// `(cluster, node)`.
    pub fn new(cluster: ClusterId, node: NodeId, own: KeyPair) -> Self {
        let mut publics = HashMap::new();
        publics.insert((cluster, node), own.public);
        Self {
            private: own.private,
            publics,
        }
    }

    pub fn insert(&mut self, cluster: ClusterId, node: NodeId, public: PublicKey) {
        self.publics.insert((cluster, node), public);
    }

    pub fn len(&self) -> usize {
        self.publics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.publics.is_empty()
    }
}

impl KeyProvider for Keyring {
    fn public_key(&self, cluster: &ClusterId, node: &NodeId) -> Option<PublicKey> {
        self.publics
            .get(&(cluster.clone(), node.clone()))
            .cloned()
    }

    fn private_key(&self) -> &PrivateKey {
        &self.private
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{keypair_from_seed, sign_message, verify_signature};

    #[test]
    fn keyring_signs_and_resolves_peers() {
        let own = keypair_from_seed(&[1; 32]);
        let own_public = own.public.clone();
        let peer = keypair_from_seed(&[2; 32]);

        let mut ring = Keyring::new(ClusterId::new("N"), NodeId::new("N0"), own);
        ring.insert(ClusterId::new("N"), NodeId::new("N1"), peer.public.clone());

        let sig = sign_message(b"msg", ring.private_key());
        let resolved = ring
            .public_key(&ClusterId::new("N"), &NodeId::new("N0"))
            .unwrap();
        assert_eq!(resolved, own_public);
        assert!(verify_signature(b"msg", &sig, &resolved));
        assert_eq!(
            ring.public_key(&ClusterId::new("N"), &NodeId::new("N1")),
            Some(peer.public)
        );
        assert!(ring
            .public_key(&ClusterId::new("M"), &NodeId::new("N1"))
            .is_none());
        assert_eq!(ring.len(), 2);
    }
}
