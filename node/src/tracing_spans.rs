//! Pre-built [`tracing::Span`] constructors for replica operations.
//!
//! Consistent span names and fields make it easy to follow one view or one
//! global slot across the log of every replica.

use tracing::{debug_span, info_span, Span};

/// One resolver turn against the local consensus engine.
pub fn resolver_turn_span(cluster: &str, node: &str, view: u64) -> Span {
    debug_span!("resolver_turn", cluster = %cluster, node = %node, view)
}

/// Handling of one inbound cross-cluster message.
pub fn global_message_span(kind: &str, from_cluster: &str, view: u64) -> Span {
    info_span!("global_message", kind = %kind, from = %from_cluster, view)
}

/// Resolution pass over the global log.
pub fn global_resolve_span(global_view: u64) -> Span {
    debug_span!("global_resolve", global_view)
}
