//! Test client: submit requests to a cluster primary and collect replies
//! on a local `/reply` listener.

use anyhow::{bail, Context};
use std::time::Duration;
use tokio::sync::mpsc;

use tessera_messages::{Request, WireMessage};
use tessera_network::{inbound_router, HttpTransport, InboundChannels, PeerDirectory, Transport};
use tessera_types::{ClusterId, NodeId};

#[derive(clap::Args)]
pub struct ClientArgs {
    /// Cluster to submit to.
    #[arg(long, default_value = "N", env = "TESSERA_CLUSTER")]
    cluster: String,

    /// Primary to submit to (defaults to `<cluster>0`).
    #[arg(long)]
    primary: Option<String>,

    /// Number of requests to submit.
    #[arg(long, default_value_t = 1)]
    count: usize,

    /// Client id carried by every request.
    #[arg(long, default_value = "tessera-client")]
    client_id: String,

    /// Address the reply listener binds to.
    #[arg(long, default_value = "127.0.0.1:5000")]
    listen: String,

    /// Address replicas should post replies to (defaults to `--listen`).
    #[arg(long)]
    reply_to: Option<String>,

    /// Seconds to wait for all replies.
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
}

pub async fn run(args: ClientArgs, directory: &PeerDirectory) -> anyhow::Result<()> {
    let cluster = ClusterId::new(&args.cluster);
    let primary = args
        .primary
        .map(NodeId::new)
        .unwrap_or_else(|| cluster.default_primary());
    let Some(primary_addr) = directory.address_of(&cluster, &primary) else {
        bail!("{primary} has no address in cluster {cluster}");
    };

    let (entrance, mut replies) = mpsc::channel(args.count.max(1) * 2);
    let (global, _global_rx) = mpsc::channel(1);
    let router = inbound_router(InboundChannels { entrance, global });
    let listener = tokio::net::TcpListener::bind(&args.listen)
        .await
        .with_context(|| format!("binding {}", args.listen))?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!(error = %e, "reply listener failed");
        }
    });

    let reply_to = args.reply_to.unwrap_or_else(|| args.listen.clone());
    let transport = HttpTransport::new(Duration::from_secs(5))?;
    for i in 0..args.count {
        let request = Request::new(&args.client_id, format!("op-{i}")).with_reply_to(&reply_to);
        transport.send(primary_addr, WireMessage::Request(request));
    }
    tracing::info!(count = args.count, %primary, %primary_addr, "requests submitted");

    let deadline = tokio::time::sleep(Duration::from_secs(args.timeout_secs));
    tokio::pin!(deadline);
    let mut received = 0;
    while received < args.count {
        tokio::select! {
            _ = &mut deadline => {
                bail!("timed out with {received}/{} replies", args.count);
            }
            message = replies.recv() => match message {
                Some(WireMessage::Reply(reply)) => {
                    received += 1;
                    tracing::info!(
                        view = %reply.view_id,
                        from = %reply.node_id,
                        result = %reply.result,
                        received,
                        "reply"
                    );
                }
                Some(other) => tracing::debug!(kind = other.kind(), "ignoring non-reply message"),
                None => bail!("reply listener closed"),
            }
        }
    }
    tracing::info!(received, "all replies received");
    Ok(())
}
