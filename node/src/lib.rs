//! Tessera replica node: wires consensus, transport and key material into a
//! running replica.
//!
//! ## Module overview
//!
//! - [`config`]: TOML-backed [`NodeConfig`] and the validated [`ReplicaConfig`].
//! - [`replica`]: authentication, routing, one-step resolver, global barrier.
//! - [`node`]: background tasks, HTTP listener and graceful stop.
//! - [`keys`]: on-disk key directory.
//! - [`metrics`]: Prometheus counters and gauges.
//! - [`logging`], [`tracing_spans`]: structured logging setup and spans.
//! - [`shutdown`]: signal handling and the shutdown broadcast.

pub mod config;
pub mod error;
pub mod keys;
pub mod logging;
pub mod metrics;
pub mod node;
pub mod replica;
pub mod shutdown;
pub mod tracing_spans;

pub use config::{NodeConfig, PeerEntry, ReplicaConfig};
pub use error::NodeError;
pub use keys::KeyDirectory;
pub use logging::{init_logging, LogFormat};
pub use metrics::NodeMetrics;
pub use node::ReplicaNode;
pub use replica::{Progress, Replica, Routed};
pub use shutdown::ShutdownController;
