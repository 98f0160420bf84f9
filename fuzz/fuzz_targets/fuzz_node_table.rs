#![no_main]

use libfuzzer_sys::fuzz_target;

use tessera_network::PeerDirectory;

// Node tables come from operator-edited files.
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(directory) = PeerDirectory::from_node_table_str(text) {
        let clusters: Vec<_> = directory.clusters().cloned().collect();
        for cluster in &clusters {
            let _ = directory.couriers(cluster, 2);
            let _ = directory.client_address(cluster);
        }
    }
});
