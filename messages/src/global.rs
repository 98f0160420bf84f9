//! Cross-cluster messages: courier shares and their local echoes.

use serde::{Deserialize, Serialize};
use tessera_crypto::{sign_message, verify_signature};
use tessera_types::{ClusterId, Digest, NodeId, PrivateKey, PublicKey, Signature, ViewId};

use crate::{payload, Batch, MessageError};

/// A cluster primary's signed announcement of its batch committed at `view_id`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalShare {
    pub cluster: ClusterId,
    /// The primary that signed and sent this share.
    pub courier: NodeId,
    pub batch: Batch,
    pub digest: Digest,
    pub view_id: ViewId,
    pub signature: Signature,
}

impl GlobalShare {
    pub fn signed(
        cluster: ClusterId,
        courier: NodeId,
        view_id: ViewId,
        batch: Batch,
        key: &PrivateKey,
    ) -> Result<Self, MessageError> {
        let digest = batch.digest()?;
        let signature = sign_message(
            &payload::global_share(&cluster, &courier, view_id, &digest),
            key,
        );
        Ok(Self {
            cluster,
            courier,
            batch,
            digest,
            view_id,
            signature,
        })
    }

    pub fn verify(&self, courier_key: &PublicKey) -> bool {
        let payload =
            payload::global_share(&self.cluster, &self.courier, self.view_id, &self.digest);
        verify_signature(&payload, &self.signature, courier_key)
    }

    pub fn digest_matches(&self) -> Result<bool, MessageError> {
        Ok(self.batch.digest()? == self.digest)
    }
}

/// A courier recipient's re-broadcast of a share to its own cluster.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalEcho {
    pub share: GlobalShare,
    pub relayer: NodeId,
    pub signature: Signature,
}

impl LocalEcho {
    pub fn signed(share: GlobalShare, relayer: NodeId, key: &PrivateKey) -> Self {
        let signature = sign_message(
            &payload::local_echo(&share.digest, &share.cluster, share.view_id, &relayer),
            key,
        );
        Self {
            share,
            relayer,
            signature,
        }
    }

    /// Checks the relayer's signature only; the inner share is verified separately.
    pub fn verify(&self, relayer_key: &PublicKey) -> bool {
        let payload = payload::local_echo(
            &self.share.digest,
            &self.share.cluster,
            self.share.view_id,
            &self.relayer,
        );
        verify_signature(&payload, &self.signature, relayer_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Request;
    use tessera_crypto::keypair_from_seed;

    fn share(key: &PrivateKey) -> GlobalShare {
        let batch = Batch::new(vec![Request::new("client", "op")]).unwrap();
        GlobalShare::signed(
            ClusterId::new("M"),
            NodeId::new("M0"),
            ViewId::new(2),
            batch,
            key,
        )
        .unwrap()
    }

    #[test]
    fn share_verifies_against_courier_key() {
        let primary = keypair_from_seed(&[1; 32]);
        let other = keypair_from_seed(&[2; 32]);
        let s = share(&primary.private);
        assert!(s.verify(&primary.public));
        assert!(!s.verify(&other.public));
        assert!(s.digest_matches().unwrap());
    }

    #[test]
    fn share_view_is_bound() {
        let primary = keypair_from_seed(&[1; 32]);
        let mut s = share(&primary.private);
        s.view_id = ViewId::new(3);
        assert!(!s.verify(&primary.public));
    }

    #[test]
    fn echo_binds_relayer() {
        let primary = keypair_from_seed(&[1; 32]);
        let relayer = keypair_from_seed(&[3; 32]);
        let echo = LocalEcho::signed(share(&primary.private), NodeId::new("N1"), &relayer.private);
        assert!(echo.verify(&relayer.public));
        assert!(echo.share.verify(&primary.public));

        let mut forged = echo.clone();
        forged.relayer = NodeId::new("N2");
        assert!(!forged.verify(&relayer.public));
    }
}
