#![no_main]

use libfuzzer_sys::fuzz_target;

use tessera_crypto::keypair_from_seed;
use tessera_messages::{GlobalShare, LocalEcho, PrePrepare, Reply, Request, Vote, WireMessage};

// Endpoint bodies are untrusted JSON. Decoding, digesting and verifying
// whatever decodes must never panic.
fuzz_target!(|data: &[u8]| {
    let key = keypair_from_seed(&[7u8; 32]).public;

    let _ = serde_json::from_slice::<WireMessage>(data);
    let _ = serde_json::from_slice::<Request>(data);
    let _ = serde_json::from_slice::<Reply>(data);

    if let Ok(pp) = serde_json::from_slice::<PrePrepare>(data) {
        let _ = pp.verify(&key);
        let _ = pp.digest_matches();
    }
    if let Ok(vote) = serde_json::from_slice::<Vote>(data) {
        let _ = vote.verify(&key);
    }
    if let Ok(share) = serde_json::from_slice::<GlobalShare>(data) {
        let _ = share.verify(&key);
        let _ = share.digest_matches();
    }
    if let Ok(echo) = serde_json::from_slice::<LocalEcho>(data) {
        let _ = echo.verify(&key);
    }
});
