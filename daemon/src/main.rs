//! Tessera daemon: entry point for running a replica, generating key
//! material and submitting test requests.

mod client;

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tessera_node::{init_logging, KeyDirectory, LogFormat, NodeConfig, ReplicaNode};

#[derive(Parser)]
#[command(name = "tessera-daemon", about = "Tessera two-tier BFT replica daemon")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "TESSERA_CONFIG")]
    config: Option<PathBuf>,

    /// Node table file (`<cluster> <node> <address>` per line).
    #[arg(long, env = "TESSERA_NODE_TABLE")]
    node_table: Option<PathBuf>,

    /// Root of the key directory.
    #[arg(long, env = "TESSERA_KEYS_DIR")]
    keys_dir: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "TESSERA_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "TESSERA_LOG_FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Replica operations.
    #[command(name = "node")]
    Node {
        #[command(subcommand)]
        action: NodeAction,
    },

    /// Write a key for every replica in the node table.
    Keygen {
        /// Replace keys that already exist.
        #[arg(long)]
        force: bool,
    },

    /// Submit requests to a cluster primary and wait for the replies.
    Client(client::ClientArgs),
}

#[derive(clap::Subcommand)]
enum NodeAction {
    /// Run a replica until SIGINT/SIGTERM.
    Run {
        /// This replica's name, e.g. "N0".
        #[arg(long, env = "TESSERA_NODE_ID")]
        node_id: Option<String>,

        /// The cluster this replica belongs to.
        #[arg(long, env = "TESSERA_CLUSTER")]
        cluster: Option<String>,

        /// Address to listen on.
        #[arg(long, env = "TESSERA_LISTEN_ADDR")]
        listen_addr: Option<String>,

        /// Requests per proposed batch.
        #[arg(long, env = "TESSERA_BATCH_SIZE")]
        batch_size: Option<usize>,

        /// Corrupt outgoing vote sequence ids (fault injection).
        #[arg(long, env = "TESSERA_BYZANTINE")]
        byzantine: bool,
    },
}

impl Cli {
    /// File config (or defaults) with the global flags applied on top.
    fn base_config(&self) -> anyhow::Result<NodeConfig> {
        let mut config = match &self.config {
            Some(path) => NodeConfig::from_toml_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => NodeConfig::default(),
        };
        if let Some(path) = &self.node_table {
            config.node_table = Some(path.clone());
        }
        if let Some(dir) = &self.keys_dir {
            config.keys_dir = dir.clone();
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.log_format = format.clone();
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = cli.base_config()?;

    let format: LogFormat = config.log_format.parse()?;
    init_logging(format, &config.log_level)?;

    match cli.command {
        Command::Node { action } => match action {
            NodeAction::Run {
                node_id,
                cluster,
                listen_addr,
                batch_size,
                byzantine,
            } => {
                if let Some(node_id) = node_id {
                    config.node_id = node_id;
                }
                if let Some(cluster) = cluster {
                    config.cluster = cluster;
                }
                if let Some(addr) = listen_addr {
                    config.listen_addr = addr;
                }
                if let Some(size) = batch_size {
                    config.batch_size = size;
                }
                config.byzantine |= byzantine;

                tracing::info!(
                    node = %config.node_id,
                    cluster = %config.cluster,
                    listen = %config.listen_addr,
                    "starting Tessera replica"
                );

                let mut node = ReplicaNode::from_config(&config)?;
                let listener = tokio::net::TcpListener::bind(&config.listen_addr)
                    .await
                    .with_context(|| format!("binding {}", config.listen_addr))?;
                node.start(Some(listener)).await?;

                node.wait_for_signal().await;
                tracing::info!("shutdown signal received, stopping replica");
                node.stop().await;

                tracing::info!("Tessera daemon exited cleanly");
            }
        },
        Command::Keygen { force } => {
            let directory = config.peer_directory()?;
            let keys = KeyDirectory::new(&config.keys_dir);
            let written = keys.generate(&directory, force)?;
            tracing::info!(
                written,
                root = %keys.root().display(),
                "key generation finished"
            );
        }
        Command::Client(args) => {
            let directory = config.peer_directory()?;
            client::run(args, &directory).await?;
        }
    }

    Ok(())
}
