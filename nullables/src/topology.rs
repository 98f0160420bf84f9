//! In-memory cluster layouts.

use tessera_network::PeerDirectory;
use tessera_types::{ClusterId, NodeId};

/// Clusters named by the given letters, each with `size` replicas named
/// `<cluster><index>`, addressed as `mem://<cluster>/<node>`.
#[derive(Clone, Debug)]
pub struct TestTopology {
    pub clusters: Vec<ClusterId>,
    pub size: usize,
}

impl TestTopology {
    pub fn members(&self, cluster: &ClusterId) -> Vec<NodeId> {
        (0..self.size)
            .map(|i| NodeId::new(format!("{cluster}{i}")))
            .collect()
    }

    /// Every `(cluster, node)` pair, cluster by cluster.
    pub fn all_nodes(&self) -> Vec<(ClusterId, NodeId)> {
        self.clusters
            .iter()
            .flat_map(|c| self.members(c).into_iter().map(move |n| (c.clone(), n)))
            .collect()
    }

    pub fn address(cluster: &ClusterId, node: &NodeId) -> String {
        format!("mem://{cluster}/{node}")
    }

    pub fn client_address(cluster: &ClusterId) -> String {
        format!("mem://{cluster}/client")
    }
}

pub fn test_topology(names: &[&str], size: usize) -> TestTopology {
    TestTopology {
        clusters: names.iter().map(|n| ClusterId::new(*n)).collect(),
        size,
    }
}

/// A directory for `topology`, including a client address per cluster.
pub fn test_directory(topology: &TestTopology) -> PeerDirectory {
    let mut directory = PeerDirectory::new();
    for (cluster, node) in topology.all_nodes() {
        let address = TestTopology::address(&cluster, &node);
        directory.add_node(cluster, node, address);
    }
    for cluster in &topology.clusters {
        directory.set_client(cluster.clone(), TestTopology::client_address(cluster));
    }
    directory
}
