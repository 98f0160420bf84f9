//! The running replica: background tasks around a shared [`Replica`].
//!
//! [`ReplicaNode::start`] spawns:
//! - the **dispatcher**, which authenticates and routes inbound messages,
//!   wakes the resolver and reports progress on every liveness alarm;
//! - the **resolver**, the sole owner of the consensus engine, which takes
//!   one unit of buffered work per turn;
//! - the **global resolver**, which applies courier shares and echoes;
//! - the **liveness timer**;
//! - optionally the **HTTP listener** serving the protocol endpoints and
//!   `GET /metrics`.
//!
//! Every task selects on the shutdown broadcast and exits when it fires.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use tessera_messages::WireMessage;
use tessera_network::{inbound_router, HttpTransport, InboundChannels};

use crate::config::NodeConfig;
use crate::keys::KeyDirectory;
use crate::metrics::NodeMetrics;
use crate::replica::{Progress, Replica, Routed};
use crate::shutdown::ShutdownController;
use crate::NodeError;

pub struct ReplicaNode {
    replica: Arc<Replica>,
    shutdown: ShutdownController,
    task_handles: Vec<JoinHandle<()>>,
}

impl ReplicaNode {
    pub fn new(replica: Arc<Replica>) -> Self {
        Self {
            replica,
            shutdown: ShutdownController::new(),
            task_handles: Vec::new(),
        }
    }

    /// Assemble a replica from its TOML configuration: peer directory, key
    /// directory and HTTP transport.
    ///
    /// Must be called from within a tokio runtime.
    pub fn from_config(config: &NodeConfig) -> Result<Self, NodeError> {
        let directory = config.peer_directory()?;
        let replica_config = config.replica_config(&directory)?;
        let keys = KeyDirectory::new(&config.keys_dir).load_keyring(
            &replica_config.cluster,
            &replica_config.node_id,
            &directory,
        )?;
        let transport = HttpTransport::new(replica_config.request_timeout)?;

        tracing::info!(
            node = %replica_config.node_id,
            cluster = %replica_config.cluster,
            primary = replica_config.is_primary(),
            clusters = replica_config.clusters.len(),
            quorum = replica_config.fault_bound.quorum(),
            byzantine = replica_config.byzantine,
            "replica configured"
        );

        let replica = Replica::new(
            Arc::new(replica_config),
            Arc::new(keys),
            Arc::new(transport),
            Arc::new(directory),
        );
        Ok(Self::new(Arc::new(replica)))
    }

    pub fn replica(&self) -> &Arc<Replica> {
        &self.replica
    }

    /// Wait for SIGINT/SIGTERM and broadcast shutdown to every task.
    pub async fn wait_for_signal(&self) {
        self.shutdown.wait_for_signal().await;
    }

    /// Spawn every replica task. With a `listener`, also serve the protocol
    /// endpoints on it.
    ///
    /// Returns the channels inbound messages are delivered on.
    pub async fn start(&mut self, listener: Option<TcpListener>) -> Result<InboundChannels, NodeError> {
        let config = self.replica.config().clone();
        let capacity = config.channel_capacity;

        let (entrance_tx, mut entrance_rx) = mpsc::channel::<WireMessage>(capacity);
        let (global_tx, mut global_rx) = mpsc::channel::<WireMessage>(capacity);
        let (delivery_tx, mut delivery_rx) = mpsc::channel::<WireMessage>(capacity);
        let (alarm_tx, mut alarm_rx) = mpsc::channel::<()>(1);
        let wake = Arc::new(Notify::new());

        let inbound = InboundChannels {
            entrance: entrance_tx,
            global: global_tx,
        };

        // ── Dispatcher ──────────────────────────────────────────────────
        let replica = Arc::clone(&self.replica);
        let wake_resolver = Arc::clone(&wake);
        let mut shutdown_rx = self.shutdown.subscribe();
        let dispatcher_handle = tokio::spawn(async move {
            let mut last_progress: Option<Progress> = None;
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => {
                        tracing::info!("dispatcher shutting down");
                        break;
                    }
                    Some(message) = entrance_rx.recv() => {
                        match replica.route(message) {
                            Ok(Routed::Buffered) => wake_resolver.notify_one(),
                            Ok(Routed::Global(message)) => {
                                if delivery_tx.send(message).await.is_err() {
                                    break;
                                }
                            }
                            Ok(Routed::Logged | Routed::Dropped) | Err(_) => {}
                        }
                    }
                    Some(()) = alarm_rx.recv() => {
                        report_progress(&replica, &mut last_progress);
                    }
                    Some(message) = global_rx.recv() => {
                        if delivery_tx.send(message).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });
        self.task_handles.push(dispatcher_handle);

        // ── Resolver: sole owner of the consensus engine ────────────────
        let replica = Arc::clone(&self.replica);
        let wake_resolver = Arc::clone(&wake);
        let tick = config.resolver_tick;
        let mut shutdown_rx = self.shutdown.subscribe();
        let resolver_handle = tokio::spawn(async move {
            let mut engine = replica.new_engine();
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => {
                        tracing::info!("resolver shutting down");
                        break;
                    }
                    _ = wake_resolver.notified() => {}
                    _ = interval.tick() => {}
                }
                match replica.resolve_once(&mut engine) {
                    Ok(true) => wake_resolver.notify_one(),
                    Ok(false) => {}
                    Err(e) => {
                        tracing::error!(error = %e, view = %engine.view_id(), "resolver turn failed");
                        wake_resolver.notify_one();
                    }
                }
            }
        });
        self.task_handles.push(resolver_handle);

        // ── Global resolver ─────────────────────────────────────────────
        let replica = Arc::clone(&self.replica);
        let mut shutdown_rx = self.shutdown.subscribe();
        let global_handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => {
                        tracing::info!("global resolver shutting down");
                        break;
                    }
                    message = delivery_rx.recv() => {
                        let Some(message) = message else { break };
                        // Rejections are logged and counted by the replica.
                        let _ = replica.handle_global(message);
                    }
                }
            }
        });
        self.task_handles.push(global_handle);

        // ── Liveness timer ──────────────────────────────────────────────
        let alarm_interval = config.alarm_interval;
        let mut shutdown_rx = self.shutdown.subscribe();
        let alarm_handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(alarm_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => {
                        tracing::info!("liveness timer shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        // A pending alarm is as good as a new one.
                        let _ = alarm_tx.try_send(());
                    }
                }
            }
        });
        self.task_handles.push(alarm_handle);

        // ── HTTP listener ───────────────────────────────────────────────
        if let Some(listener) = listener {
            let router = inbound_router(inbound.clone())
                .merge(metrics_router(Arc::clone(self.replica.metrics())));
            let local_addr = listener.local_addr()?;
            let mut shutdown_rx = self.shutdown.subscribe();
            tracing::info!(%local_addr, "replica listening");
            let server_handle = tokio::spawn(async move {
                let served = axum::serve(listener, router)
                    .with_graceful_shutdown(async move {
                        let _ = shutdown_rx.recv().await;
                    })
                    .await;
                if let Err(e) = served {
                    tracing::error!(error = %e, "HTTP listener failed");
                }
            });
            self.task_handles.push(server_handle);
        }

        tracing::info!(
            node = %config.node_id,
            cluster = %config.cluster,
            tasks = self.task_handles.len(),
            "replica started"
        );
        Ok(inbound)
    }

    /// Broadcast shutdown and wait for every task, up to the configured
    /// shutdown timeout.
    pub async fn stop(&mut self) {
        tracing::info!("stopping replica");
        self.shutdown.shutdown();

        let handles: Vec<JoinHandle<()>> = self.task_handles.drain(..).collect();
        let wait_all = async {
            for handle in handles {
                let _ = handle.await;
            }
        };
        let timeout = self.replica.config().shutdown_timeout;
        if tokio::time::timeout(timeout, wait_all).await.is_err() {
            tracing::warn!(?timeout, "replica tasks did not stop in time");
        } else {
            tracing::info!("replica stopped");
        }
    }
}

fn metrics_router(metrics: Arc<NodeMetrics>) -> Router {
    Router::new()
        .route("/metrics", get(serve_metrics))
        .with_state(metrics)
}

async fn serve_metrics(State(metrics): State<Arc<NodeMetrics>>) -> Result<String, StatusCode> {
    metrics.encode().map_err(|e| {
        tracing::warn!(error = %e, "failed to encode metrics");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

/// Log view movement, or what the barrier is waiting on when nothing moved.
fn report_progress(replica: &Replica, last: &mut Option<Progress>) {
    let now = replica.progress();
    let moved = last.map_or(true, |prev| {
        prev.local_view != now.local_view || prev.global_view != now.global_view
    });
    if moved {
        tracing::info!(
            local_view = %now.local_view,
            global_view = %now.global_view,
            decided = now.decided,
            "view progress"
        );
    } else if now.local_view > now.global_view {
        tracing::warn!(
            global_view = %now.global_view,
            missing = ?replica.stalled_on(),
            depths = ?now.depths,
            "global view stalled"
        );
    }
    *last = Some(now);
}
