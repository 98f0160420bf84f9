//! Peer directory: where every replica and client of every cluster listens.
//!
//! Members of a cluster keep the order in which they were added. Courier
//! shares go to the first `F + 1` members of each remote cluster.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tessera_types::{ClusterId, NodeId};

use crate::NetworkError;

/// Node name that marks a cluster's client address in a node table.
pub const CLIENT_ENTRY: &str = "client";

#[derive(Clone, Debug, Default)]
pub struct PeerDirectory {
    clusters: BTreeMap<ClusterId, Vec<(NodeId, String)>>,
    clients: HashMap<ClusterId, String>,
}

impl PeerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or re-address) a replica.
    pub fn add_node(&mut self, cluster: ClusterId, node: NodeId, address: impl Into<String>) {
        let address = address.into();
        let members = self.clusters.entry(cluster).or_default();
        match members.iter_mut().find(|(n, _)| *n == node) {
            Some(entry) => entry.1 = address,
            None => members.push((node, address)),
        }
    }

    pub fn set_client(&mut self, cluster: ClusterId, address: impl Into<String>) {
        self.clients.insert(cluster, address.into());
    }

    pub fn address_of(&self, cluster: &ClusterId, node: &NodeId) -> Option<&str> {
        self.members(cluster)
            .iter()
            .find(|(n, _)| n == node)
            .map(|(_, a)| a.as_str())
    }

    /// Every replica of `cluster`, in directory order.
    pub fn members(&self, cluster: &ClusterId) -> &[(NodeId, String)] {
        self.clusters
            .get(cluster)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every replica of `cluster` except `me`.
    pub fn peers_of<'a>(
        &'a self,
        cluster: &ClusterId,
        me: &'a NodeId,
    ) -> impl Iterator<Item = (&'a NodeId, &'a str)> + 'a {
        self.members(cluster)
            .iter()
            .filter(move |(n, _)| n != me)
            .map(|(n, a)| (n, a.as_str()))
    }

    /// The first `fanout` replicas of `cluster`.
    pub fn couriers(&self, cluster: &ClusterId, fanout: usize) -> &[(NodeId, String)] {
        let members = self.members(cluster);
        &members[..fanout.min(members.len())]
    }

    pub fn client_address(&self, cluster: &ClusterId) -> Option<&str> {
        self.clients.get(cluster).map(String::as_str)
    }

    pub fn clusters(&self) -> impl Iterator<Item = &ClusterId> {
        self.clusters.keys()
    }

    /// Parse a node table: one `<cluster> <node> <address>` entry per line.
    ///
    /// Blank lines and lines starting with `#` are skipped. A node named
    /// `client` sets the cluster's client address.
    pub fn from_node_table_str(text: &str) -> Result<Self, NetworkError> {
        let mut directory = Self::new();
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let parts: Vec<&str> = line.split_whitespace().collect();
            let [cluster, node, address] = parts[..] else {
                return Err(NetworkError::NodeTable {
                    line: idx + 1,
                    reason: format!("expected 3 fields, found {}", parts.len()),
                });
            };
            if node == CLIENT_ENTRY {
                directory.set_client(ClusterId::new(cluster), address);
            } else {
                directory.add_node(ClusterId::new(cluster), NodeId::new(node), address);
            }
        }
        Ok(directory)
    }

    pub fn from_node_table_file(path: &Path) -> Result<Self, NetworkError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_node_table_str(&text)
    }
}
