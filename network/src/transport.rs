//! Outbound message delivery.

use std::time::Duration;
use tessera_messages::WireMessage;
use tokio::runtime::Handle;

use crate::endpoint::{encode_body, Endpoint};
use crate::NetworkError;

/// Fire-and-forget delivery of a message to a peer address.
///
/// Implementations must not block the caller; failures are logged, never
/// retried.
pub trait Transport: Send + Sync {
    fn send(&self, address: &str, message: WireMessage);
}

/// [`Transport`] that POSTs each message as JSON to the matching endpoint.
pub struct HttpTransport {
    client: reqwest::Client,
    runtime: Handle,
}

impl HttpTransport {
    /// Must be called from within a tokio runtime; posts are spawned onto it.
    pub fn new(request_timeout: Duration) -> Result<Self, NetworkError> {
        let runtime = Handle::try_current().map_err(|_| NetworkError::NoRuntime)?;
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self { client, runtime })
    }
}

impl Transport for HttpTransport {
    fn send(&self, address: &str, message: WireMessage) {
        let url = Endpoint::for_message(&message).url(address);
        let kind = message.kind();
        let body = match encode_body(&message) {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(kind, error = %e, "failed to encode outbound message");
                return;
            }
        };

        let client = self.client.clone();
        self.runtime.spawn(async move {
            let result = client
                .post(&url)
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body)
                .send()
                .await;
            match result {
                Ok(resp) if !resp.status().is_success() => {
                    tracing::warn!(kind, %url, status = %resp.status(), "peer refused message");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(kind, %url, error = %e, "send failed");
                }
            }
        });
    }
}
