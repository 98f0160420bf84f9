use tessera_types::{ClusterId, NodeId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("config error: {0}")]
    Config(String),

    #[error("key material error: {0}")]
    KeyMaterial(String),

    #[error("{kind} from {signer} carries an invalid signature")]
    InvalidSignature { kind: &'static str, signer: NodeId },

    #[error("no public key for {node} in cluster {cluster}")]
    UnknownSigner { cluster: ClusterId, node: NodeId },

    #[error("share for {cluster} was not sent by its primary ({courier})")]
    NotFromPrimary { cluster: ClusterId, courier: NodeId },

    #[error("batch does not hash to the carried digest")]
    DigestMismatch,

    #[error("consensus error: {0}")]
    Consensus(#[from] tessera_consensus::ConsensusError),

    #[error("network error: {0}")]
    Network(#[from] tessera_network::NetworkError),

    #[error("message error: {0}")]
    Message(#[from] tessera_messages::MessageError),

    #[error("crypto error: {0}")]
    Crypto(#[from] tessera_crypto::CryptoError),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
