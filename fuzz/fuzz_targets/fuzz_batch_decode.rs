#![no_main]

use libfuzzer_sys::fuzz_target;

// The batch digest is taken over its bincode encoding; decoding arbitrary
// bytes must fail cleanly, and anything that decodes must digest.
fuzz_target!(|data: &[u8]| {
    if let Ok(batch) = bincode::deserialize::<tessera_messages::Batch>(data) {
        let _ = batch.digest();
    }
    let _ = bincode::deserialize::<tessera_types::Digest>(data);
    let _ = bincode::deserialize::<tessera_types::Signature>(data);
});
