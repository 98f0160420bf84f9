//! Messages posted by `HttpTransport` arrive, typed, on the inbound router.

use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tessera_crypto::keypair_from_seed;
use tessera_messages::{Batch, GlobalShare, PrePrepare, Request, Vote, VoteKind, WireMessage};
use tessera_network::{inbound_router, HttpTransport, InboundChannels, Transport};
use tessera_types::{ClusterId, Digest, NodeId, SequenceId, ViewId};
use tokio::sync::mpsc;

async fn serve() -> (String, mpsc::Receiver<WireMessage>, mpsc::Receiver<WireMessage>) {
    let (entrance_tx, entrance_rx) = mpsc::channel(16);
    let (global_tx, global_rx) = mpsc::channel(16);
    let router = inbound_router(InboundChannels {
        entrance: entrance_tx,
        global: global_tx,
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (address, entrance_rx, global_rx)
}

async fn recv(rx: &mut mpsc::Receiver<WireMessage>) -> WireMessage {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("message within timeout")
        .expect("channel open")
}

#[tokio::test]
async fn vote_arrives_on_entrance_channel() {
    let (address, mut entrance, _global) = serve().await;
    let transport = HttpTransport::new(Duration::from_secs(2)).unwrap();
    let kp = keypair_from_seed(&[1; 32]);
    let vote = Vote::signed(
        VoteKind::Commit,
        ViewId::new(3),
        SequenceId::new(3),
        Digest::new([4; 32]),
        NodeId::new("N2"),
        &kp.private,
    );

    transport.send(&address, WireMessage::vote(vote.clone()));

    assert_eq!(recv(&mut entrance).await, WireMessage::Commit(vote));
}

#[tokio::test]
async fn share_arrives_on_global_channel() {
    let (address, _entrance, mut global) = serve().await;
    let transport = HttpTransport::new(Duration::from_secs(2)).unwrap();
    let kp = keypair_from_seed(&[2; 32]);
    let batch = Batch::new(vec![Request::new("client", "op")]).unwrap();
    let share = GlobalShare::signed(
        ClusterId::new("M"),
        NodeId::new("M0"),
        ViewId::new(0),
        batch,
        &kp.private,
    )
    .unwrap();

    transport.send(&address, WireMessage::GlobalShare(share.clone()));

    match recv(&mut global).await {
        WireMessage::GlobalShare(got) => {
            assert_eq!(got, share);
            assert!(got.verify(&kp.public));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn request_with_reply_address_is_preserved() {
    let (address, mut entrance, _global) = serve().await;
    let transport = HttpTransport::new(Duration::from_secs(2)).unwrap();
    let request = Request::new("client-1", "transfer").with_reply_to("localhost:5000");

    transport.send(&address, WireMessage::Request(request.clone()));

    assert_eq!(recv(&mut entrance).await, WireMessage::Request(request));
}

#[tokio::test]
async fn pre_prepare_larger_than_two_megabytes_is_delivered() {
    let (address, mut entrance, _global) = serve().await;
    let transport = HttpTransport::new(Duration::from_secs(10)).unwrap();
    let kp = keypair_from_seed(&[3; 32]);
    let requests = (0..64)
        .map(|i| Request::new(format!("client-{i}"), "x".repeat(40_000)))
        .collect();
    let pre_prepare = PrePrepare::signed(
        ViewId::new(0),
        SequenceId::new(0),
        Batch::new(requests).unwrap(),
        NodeId::new("N0"),
        &kp.private,
    )
    .unwrap();
    let body = serde_json::to_vec(&pre_prepare).unwrap();
    assert!(body.len() > 2 * 1024 * 1024);

    transport.send(&address, WireMessage::PrePrepare(pre_prepare.clone()));

    match recv(&mut entrance).await {
        WireMessage::PrePrepare(got) => {
            assert_eq!(got, pre_prepare);
            assert!(got.verify(&kp.public));
            assert!(got.digest_matches().unwrap());
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[derive(Clone, Default)]
struct CapturedLog(Arc<Mutex<Vec<u8>>>);

impl io::Write for CapturedLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl CapturedLog {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

#[tokio::test]
async fn failed_send_is_logged_at_warn() {
    let log = CapturedLog::default();
    let writer = log.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let closed = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = closed.local_addr().unwrap().to_string();
    drop(closed);

    let transport = HttpTransport::new(Duration::from_secs(2)).unwrap();
    transport.send(&address, WireMessage::Request(Request::new("client", "op")));

    for _ in 0..200 {
        if log.contents().contains("send failed") {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let output = log.contents();
    assert!(output.contains("WARN"), "{output}");
    assert!(output.contains("send failed"), "{output}");
}

#[test]
fn transport_needs_runtime() {
    assert!(HttpTransport::new(Duration::from_secs(1)).is_err());
}
