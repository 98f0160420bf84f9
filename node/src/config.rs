//! Replica configuration with TOML file support.
//!
//! [`NodeConfig`] is the on-disk shape: every field has a serde default so
//! a minimal file only names the replica. [`NodeConfig::replica_config`]
//! validates it once and produces the immutable [`ReplicaConfig`] shared by
//! every task of a running replica.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tessera_consensus::FaultBound;
use tessera_network::PeerDirectory;
use tessera_types::{ClusterId, NodeId};

use crate::NodeError;

/// A replica address entry given inline in the TOML file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerEntry {
    pub cluster: String,
    pub node: String,
    pub address: String,
}

/// Configuration for a Tessera replica.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// This replica's name, e.g. `"N0"`.
    #[serde(default = "default_node_id")]
    pub node_id: String,

    /// The cluster this replica belongs to.
    #[serde(default = "default_cluster")]
    pub cluster: String,

    /// Every cluster taking part in the global barrier, in order.
    /// Empty means "every cluster in the peer directory".
    #[serde(default)]
    pub clusters: Vec<String>,

    /// Primary per cluster. Clusters not listed use `<cluster>0`.
    #[serde(default)]
    pub primaries: BTreeMap<String, String>,

    /// Replicas per cluster (N). Must be at least 4.
    #[serde(default = "default_cluster_size")]
    pub cluster_size: usize,

    /// Requests per proposed batch (B).
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Corrupt outgoing vote sequence ids after signing (fault injection).
    #[serde(default)]
    pub byzantine: bool,

    /// Address the HTTP listener binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Node table file with `<cluster> <node> <address>` lines.
    #[serde(default)]
    pub node_table: Option<PathBuf>,

    /// Replica addresses given inline; merged over the node table.
    #[serde(default)]
    pub peers: Vec<PeerEntry>,

    /// Client address per cluster; merged over the node table.
    #[serde(default)]
    pub clients: BTreeMap<String, String>,

    /// Root of the key directory (`<keys_dir>/<cluster>/<node>/<node>.key`).
    #[serde(default = "default_keys_dir")]
    pub keys_dir: PathBuf,

    /// Resolver wake-up tick in milliseconds.
    #[serde(default = "default_resolver_tick_ms")]
    pub resolver_tick_ms: u64,

    /// Liveness alarm interval in milliseconds.
    #[serde(default = "default_alarm_interval_ms")]
    pub alarm_interval_ms: u64,

    /// Timeout for one outbound HTTP post in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Capacity of each inbound channel.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// How long `stop()` waits for tasks to finish, in seconds.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_node_id() -> String {
    "N0".to_string()
}
fn default_cluster() -> String {
    "N".to_string()
}
fn default_cluster_size() -> usize {
    4
}
fn default_batch_size() -> usize {
    1
}
fn default_listen_addr() -> String {
    "0.0.0.0:1110".to_string()
}
fn default_keys_dir() -> PathBuf {
    PathBuf::from("./keys")
}
fn default_resolver_tick_ms() -> u64 {
    10
}
fn default_alarm_interval_ms() -> u64 {
    1_000
}
fn default_request_timeout_ms() -> u64 {
    2_000
}
fn default_channel_capacity() -> usize {
    1_024
}
fn default_shutdown_timeout_secs() -> u64 {
    5
}
fn default_log_format() -> String {
    "human".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            cluster: default_cluster(),
            clusters: Vec::new(),
            primaries: BTreeMap::new(),
            cluster_size: default_cluster_size(),
            batch_size: default_batch_size(),
            byzantine: false,
            listen_addr: default_listen_addr(),
            node_table: None,
            peers: Vec::new(),
            clients: BTreeMap::new(),
            keys_dir: default_keys_dir(),
            resolver_tick_ms: default_resolver_tick_ms(),
            alarm_interval_ms: default_alarm_interval_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            channel_capacity: default_channel_capacity(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}

impl NodeConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self, NodeError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(format!("invalid TOML config: {e}")))
    }

    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self)
            .map_err(|e| NodeError::Config(format!("failed to serialize config: {e}")))
    }

    /// Build the peer directory: node table first, then inline entries.
    pub fn peer_directory(&self) -> Result<PeerDirectory, NodeError> {
        let mut directory = match &self.node_table {
            Some(path) => PeerDirectory::from_node_table_file(path)?,
            None => PeerDirectory::new(),
        };
        for peer in &self.peers {
            directory.add_node(
                ClusterId::new(&peer.cluster),
                NodeId::new(&peer.node),
                &peer.address,
            );
        }
        for (cluster, address) in &self.clients {
            directory.set_client(ClusterId::new(cluster), address);
        }
        Ok(directory)
    }

    /// Validate against `directory` and freeze into a [`ReplicaConfig`].
    pub fn replica_config(&self, directory: &PeerDirectory) -> Result<ReplicaConfig, NodeError> {
        if self.cluster_size < 4 {
            return Err(NodeError::Config(format!(
                "cluster_size must be at least 4, got {}",
                self.cluster_size
            )));
        }
        if self.batch_size == 0 {
            return Err(NodeError::Config("batch_size must be at least 1".into()));
        }

        let cluster = ClusterId::new(&self.cluster);
        let node_id = NodeId::new(&self.node_id);

        let clusters: Vec<ClusterId> = if self.clusters.is_empty() {
            directory.clusters().cloned().collect()
        } else {
            self.clusters.iter().map(ClusterId::new).collect()
        };
        if clusters.is_empty() {
            return Err(NodeError::Config("no clusters configured".into()));
        }
        if !clusters.contains(&cluster) {
            return Err(NodeError::Config(format!(
                "own cluster {cluster} is not in the cluster list"
            )));
        }
        if directory.address_of(&cluster, &node_id).is_none() {
            return Err(NodeError::Config(format!(
                "{node_id} has no address in cluster {cluster}"
            )));
        }
        for c in &clusters {
            let members = directory.members(c).len();
            if members != self.cluster_size {
                return Err(NodeError::Config(format!(
                    "cluster {c} lists {members} replicas, expected {}",
                    self.cluster_size
                )));
            }
        }

        let primaries = self
            .primaries
            .iter()
            .map(|(c, n)| (ClusterId::new(c), NodeId::new(n)))
            .collect();

        Ok(ReplicaConfig {
            node_id,
            cluster,
            clusters,
            primaries,
            fault_bound: FaultBound::for_cluster_size(self.cluster_size),
            batch_size: self.batch_size,
            byzantine: self.byzantine,
            listen_addr: self.listen_addr.clone(),
            resolver_tick: Duration::from_millis(self.resolver_tick_ms.max(1)),
            alarm_interval: Duration::from_millis(self.alarm_interval_ms.max(1)),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            channel_capacity: self.channel_capacity.max(1),
            shutdown_timeout: Duration::from_secs(self.shutdown_timeout_secs),
        })
    }
}

/// Validated, immutable settings of one running replica.
#[derive(Clone, Debug)]
pub struct ReplicaConfig {
    pub node_id: NodeId,
    pub cluster: ClusterId,
    pub clusters: Vec<ClusterId>,
    pub primaries: HashMap<ClusterId, NodeId>,
    pub fault_bound: FaultBound,
    pub batch_size: usize,
    pub byzantine: bool,
    pub listen_addr: String,
    pub resolver_tick: Duration,
    pub alarm_interval: Duration,
    pub request_timeout: Duration,
    pub channel_capacity: usize,
    pub shutdown_timeout: Duration,
}

impl ReplicaConfig {
    /// Settings for `node` in `cluster` with defaults for everything else.
    pub fn for_node(cluster: ClusterId, node_id: NodeId, clusters: Vec<ClusterId>) -> Self {
        Self {
            node_id,
            cluster,
            clusters,
            primaries: HashMap::new(),
            fault_bound: FaultBound::for_cluster_size(default_cluster_size()),
            batch_size: default_batch_size(),
            byzantine: false,
            listen_addr: default_listen_addr(),
            resolver_tick: Duration::from_millis(default_resolver_tick_ms()),
            alarm_interval: Duration::from_millis(default_alarm_interval_ms()),
            request_timeout: Duration::from_millis(default_request_timeout_ms()),
            channel_capacity: default_channel_capacity(),
            shutdown_timeout: Duration::from_secs(default_shutdown_timeout_secs()),
        }
    }

    pub fn primary_of(&self, cluster: &ClusterId) -> NodeId {
        self.primaries
            .get(cluster)
            .cloned()
            .unwrap_or_else(|| cluster.default_primary())
    }

    pub fn own_primary(&self) -> NodeId {
        self.primary_of(&self.cluster)
    }

    pub fn is_primary(&self) -> bool {
        self.own_primary() == self.node_id
    }

    pub fn is_configured(&self, cluster: &ClusterId) -> bool {
        self.clusters.contains(cluster)
    }
}
