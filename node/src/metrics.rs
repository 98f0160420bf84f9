//! Prometheus metrics for a Tessera replica.
//!
//! All metrics live in a dedicated [`Registry`] and are served as text at
//! `GET /metrics` on the replica's listener.

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

use crate::NodeError;

pub struct NodeMetrics {
    pub registry: Registry,

    // ── Inbound ─────────────────────────────────────────────────────────
    pub requests_received: IntCounter,
    pub messages_rejected: IntCounterVec,

    // ── Consensus progress ──────────────────────────────────────────────
    pub local_commits: IntCounter,
    pub global_slots_resolved: IntCounter,
    pub replies_sent: IntCounter,
    pub local_view: IntGauge,
    pub global_view: IntGauge,
}

impl NodeMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let requests_received = IntCounter::with_opts(Opts::new(
            "tessera_requests_received_total",
            "Client requests accepted into the request queue",
        ))
        .expect("valid requests_received descriptor");
        let messages_rejected = IntCounterVec::new(
            Opts::new(
                "tessera_messages_rejected_total",
                "Inbound messages rejected, by message kind",
            ),
            &["kind"],
        )
        .expect("valid messages_rejected descriptor");
        let local_commits = IntCounter::with_opts(Opts::new(
            "tessera_local_commits_total",
            "Views committed by the local cluster",
        ))
        .expect("valid local_commits descriptor");
        let global_slots_resolved = IntCounter::with_opts(Opts::new(
            "tessera_global_slots_resolved_total",
            "Global slots resolved by the barrier",
        ))
        .expect("valid global_slots_resolved descriptor");
        let replies_sent = IntCounter::with_opts(Opts::new(
            "tessera_replies_sent_total",
            "Replies sent to clients",
        ))
        .expect("valid replies_sent descriptor");
        let local_view = IntGauge::with_opts(Opts::new(
            "tessera_local_view",
            "Current local view of this replica",
        ))
        .expect("valid local_view descriptor");
        let global_view = IntGauge::with_opts(Opts::new(
            "tessera_global_view",
            "Next global slot waiting to resolve",
        ))
        .expect("valid global_view descriptor");

        registry
            .register(Box::new(requests_received.clone()))
            .expect("failed to register requests_received");
        registry
            .register(Box::new(messages_rejected.clone()))
            .expect("failed to register messages_rejected");
        registry
            .register(Box::new(local_commits.clone()))
            .expect("failed to register local_commits");
        registry
            .register(Box::new(global_slots_resolved.clone()))
            .expect("failed to register global_slots_resolved");
        registry
            .register(Box::new(replies_sent.clone()))
            .expect("failed to register replies_sent");
        registry
            .register(Box::new(local_view.clone()))
            .expect("failed to register local_view");
        registry
            .register(Box::new(global_view.clone()))
            .expect("failed to register global_view");

        Self {
            registry,
            requests_received,
            messages_rejected,
            local_commits,
            global_slots_resolved,
            replies_sent,
            local_view,
            global_view,
        }
    }

    pub fn reject(&self, kind: &str) {
        self.messages_rejected.with_label_values(&[kind]).inc();
    }

    /// Render every metric in the Prometheus text format.
    pub fn encode(&self) -> Result<String, NodeError> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}
