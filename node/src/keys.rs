//! On-disk key material.
//!
//! Layout: `<root>/<cluster>/<node>/<node>.key`, each file holding one
//! hex-encoded Ed25519 seed. Every replica reads its own seed for signing and
//! derives the verifying key of every other replica in the directory.

use std::path::{Path, PathBuf};

use tessera_crypto::{
    generate_keypair, keypair_from_private, private_key_from_hex, private_key_to_hex,
    public_from_private, Keyring,
};
use tessera_network::PeerDirectory;
use tessera_types::{ClusterId, NodeId, PrivateKey};

use crate::NodeError;

pub struct KeyDirectory {
    root: PathBuf,
}

impl KeyDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn key_path(&self, cluster: &ClusterId, node: &NodeId) -> PathBuf {
        self.root
            .join(cluster.as_str())
            .join(node.as_str())
            .join(format!("{node}.key"))
    }

    pub fn read_private(&self, cluster: &ClusterId, node: &NodeId) -> Result<PrivateKey, NodeError> {
        let path = self.key_path(cluster, node);
        let text = std::fs::read_to_string(&path).map_err(|e| {
            NodeError::KeyMaterial(format!("cannot read {}: {e}", path.display()))
        })?;
        private_key_from_hex(&text)
            .map_err(|e| NodeError::KeyMaterial(format!("{}: {e}", path.display())))
    }

    /// Build a keyring for `me`, covering every replica in `directory`.
    ///
    /// Any missing or malformed key file fails the whole load.
    pub fn load_keyring(
        &self,
        cluster: &ClusterId,
        me: &NodeId,
        directory: &PeerDirectory,
    ) -> Result<Keyring, NodeError> {
        let own = keypair_from_private(self.read_private(cluster, me)?);
        let mut ring = Keyring::new(cluster.clone(), me.clone(), own);
        for c in directory.clusters() {
            for (node, _) in directory.members(c) {
                let private = self.read_private(c, node)?;
                ring.insert(c.clone(), node.clone(), public_from_private(&private));
            }
        }
        tracing::info!(root = %self.root.display(), keys = ring.len(), "loaded key directory");
        Ok(ring)
    }

    /// Write a fresh seed for every replica in `directory`.
    ///
    /// Existing key files are kept unless `overwrite` is set. Returns the
    /// number of files written.
    pub fn generate(&self, directory: &PeerDirectory, overwrite: bool) -> Result<usize, NodeError> {
        let mut written = 0;
        for cluster in directory.clusters() {
            for (node, _) in directory.members(cluster) {
                let path = self.key_path(cluster, node);
                if path.exists() && !overwrite {
                    tracing::debug!(path = %path.display(), "keeping existing key");
                    continue;
                }
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                let pair = generate_keypair()?;
                std::fs::write(&path, private_key_to_hex(&pair.private))?;
                written += 1;
            }
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_crypto::KeyProvider;

    fn directory() -> PeerDirectory {
        PeerDirectory::from_node_table_str(
            "N N0 a:1\nN N1 a:2\nN N2 a:3\nN N3 a:4\nM M0 b:1\nM M1 b:2\nM M2 b:3\nM M3 b:4\n",
        )
        .unwrap()
    }

    #[test]
    fn generated_keys_load_into_keyring() {
        let tmp = tempfile::tempdir().unwrap();
        let keys = KeyDirectory::new(tmp.path());
        assert_eq!(keys.generate(&directory(), false).unwrap(), 8);

        let n = ClusterId::new("N");
        let ring = keys.load_keyring(&n, &NodeId::new("N1"), &directory()).unwrap();
        assert_eq!(ring.len(), 8);
        assert!(ring.public_key(&ClusterId::new("M"), &NodeId::new("M3")).is_some());
        assert_eq!(
            ring.public_key(&n, &NodeId::new("N1")),
            Some(public_from_private(ring.private_key()))
        );
    }

    #[test]
    fn generate_keeps_existing_keys() {
        let tmp = tempfile::tempdir().unwrap();
        let keys = KeyDirectory::new(tmp.path());
        keys.generate(&directory(), false).unwrap();
        let before = keys.read_private(&ClusterId::new("N"), &NodeId::new("N0")).unwrap();

        assert_eq!(keys.generate(&directory(), false).unwrap(), 0);
        let after = keys.read_private(&ClusterId::new("N"), &NodeId::new("N0")).unwrap();
        assert_eq!(before.0, after.0);
        assert_eq!(keys.generate(&directory(), true).unwrap(), 8);
    }

    #[test]
    fn missing_key_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let keys = KeyDirectory::new(tmp.path());
        let err = keys.load_keyring(&ClusterId::new("N"), &NodeId::new("N0"), &directory());
        assert!(matches!(err, Err(NodeError::KeyMaterial(_))));
    }

    #[test]
    fn malformed_key_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let keys = KeyDirectory::new(tmp.path());
        let path = keys.key_path(&ClusterId::new("N"), &NodeId::new("N0"));
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "not hex").unwrap();
        let err = keys.read_private(&ClusterId::new("N"), &NodeId::new("N0"));
        assert!(matches!(err, Err(NodeError::KeyMaterial(_))));
    }
}
