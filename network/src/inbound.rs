//! Inbound HTTP endpoints.
//!
//! Each endpoint decodes its JSON body into the matching typed message and
//! forwards it as a [`WireMessage`]: cross-cluster messages to the global
//! channel, everything else to the entrance channel.

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tessera_messages::{GlobalShare, LocalEcho, PrePrepare, Reply, Request, Vote, VoteKind, WireMessage};
use tokio::sync::mpsc;

use crate::Endpoint;

#[derive(Clone)]
pub struct InboundChannels {
    pub entrance: mpsc::Sender<WireMessage>,
    pub global: mpsc::Sender<WireMessage>,
}

impl InboundChannels {
    async fn deliver(&self, message: WireMessage) -> StatusCode {
        let channel = if message.is_global() {
            &self.global
        } else {
            &self.entrance
        };
        match channel.send(message).await {
            Ok(()) => StatusCode::OK,
            Err(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Router serving every protocol endpoint.
///
/// Bodies are unbounded: a pre-prepare or share carries a whole batch.
pub fn inbound_router(channels: InboundChannels) -> Router {
    Router::new()
        .route(Endpoint::Request.path(), post(on_request))
        .route(Endpoint::PrePrepare.path(), post(on_pre_prepare))
        .route(Endpoint::Prepare.path(), post(on_prepare))
        .route(Endpoint::Commit.path(), post(on_commit))
        .route(Endpoint::GlobalShare.path(), post(on_global_share))
        .route(Endpoint::LocalEcho.path(), post(on_local_echo))
        .route(Endpoint::Reply.path(), post(on_reply))
        .layer(DefaultBodyLimit::disable())
        .with_state(channels)
}

async fn on_request(State(ch): State<InboundChannels>, Json(msg): Json<Request>) -> StatusCode {
    ch.deliver(WireMessage::Request(msg)).await
}

async fn on_pre_prepare(
    State(ch): State<InboundChannels>,
    Json(msg): Json<PrePrepare>,
) -> StatusCode {
    ch.deliver(WireMessage::PrePrepare(msg)).await
}

async fn on_prepare(State(ch): State<InboundChannels>, Json(vote): Json<Vote>) -> StatusCode {
    if vote.kind != VoteKind::Prepare {
        return StatusCode::BAD_REQUEST;
    }
    ch.deliver(WireMessage::Prepare(vote)).await
}

async fn on_commit(State(ch): State<InboundChannels>, Json(vote): Json<Vote>) -> StatusCode {
    if vote.kind != VoteKind::Commit {
        return StatusCode::BAD_REQUEST;
    }
    ch.deliver(WireMessage::Commit(vote)).await
}

async fn on_global_share(
    State(ch): State<InboundChannels>,
    Json(msg): Json<GlobalShare>,
) -> StatusCode {
    ch.deliver(WireMessage::GlobalShare(msg)).await
}

async fn on_local_echo(State(ch): State<InboundChannels>, Json(msg): Json<LocalEcho>) -> StatusCode {
    ch.deliver(WireMessage::LocalEcho(msg)).await
}

async fn on_reply(State(ch): State<InboundChannels>, Json(msg): Json<Reply>) -> StatusCode {
    ch.deliver(WireMessage::Reply(msg)).await
}
