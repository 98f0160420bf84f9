//! Ed25519 message signing and verification.

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use tessera_types::{PrivateKey, PublicKey, Signature};

/// Sign a message with a private key, returning the signature.
pub fn sign_message(message: &[u8], private_key: &PrivateKey) -> Signature {
    let signing_key = SigningKey::from_bytes(&private_key.0);
    Signature(signing_key.sign(message).to_bytes())
}

/// Verify a signature against a message and public key.
///
/// Malformed public keys verify as `false` rather than erroring.
pub fn verify_signature(message: &[u8], signature: &Signature, public_key: &PublicKey) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(&public_key.0) else {
        return false;
    };
    let dalek_sig = ed25519_dalek::Signature::from_bytes(&signature.0);
    verifying_key.verify_strict(message, &dalek_sig).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::keypair_from_seed;

    #[test]
    fn sign_and_verify() {
        let kp = keypair_from_seed(&[1u8; 32]);
        let msg = b"commit N 3";
        let sig = sign_message(msg, &kp.private);
        assert!(verify_signature(msg, &sig, &kp.public));
    }

    #[test]
    fn wrong_message_fails() {
        let kp = keypair_from_seed(&[2u8; 32]);
        let sig = sign_message(b"prepare", &kp.private);
        assert!(!verify_signature(b"commit", &sig, &kp.public));
    }

    #[test]
    fn wrong_key_fails() {
        let kp1 = keypair_from_seed(&[3u8; 32]);
        let kp2 = keypair_from_seed(&[4u8; 32]);
        let sig = sign_message(b"share", &kp1.private);
        assert!(!verify_signature(b"share", &sig, &kp2.public));
    }

    #[test]
    fn signature_deterministic() {
        let kp = keypair_from_seed(&[99u8; 32]);
        let a = sign_message(b"x", &kp.private);
        let b = sign_message(b"x", &kp.private);
        assert_eq!(a, b);
    }

    #[test]
    fn empty_signature_never_verifies() {
        let kp = keypair_from_seed(&[5u8; 32]);
        assert!(!verify_signature(b"x", &Signature::EMPTY, &kp.public));
    }

    #[test]
    fn invalid_public_key() {
        let kp = keypair_from_seed(&[6u8; 32]);
        let sig = sign_message(b"test", &kp.private);
        assert!(!verify_signature(b"test", &sig, &PublicKey([0xFF; 32])));
    }
}
