//! Nullable transport: record messages instead of sending them.

use std::sync::Mutex;
use tessera_messages::WireMessage;
use tessera_network::Transport;

/// A message "sent" through a [`NullTransport`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentMessage {
    pub address: String,
    pub message: WireMessage,
}

/// A [`Transport`] that records every outbound message for later inspection
/// or manual delivery.
#[derive(Default)]
pub struct NullTransport {
    sent: Mutex<Vec<SentMessage>>,
}

impl NullTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages sent so far (for assertions).
    pub fn sent(&self) -> Vec<SentMessage> {
        self.lock().clone()
    }

    /// Remove and return everything sent so far.
    pub fn take(&self) -> Vec<SentMessage> {
        std::mem::take(&mut *self.lock())
    }

    pub fn sent_to(&self, address: &str) -> Vec<WireMessage> {
        self.lock()
            .iter()
            .filter(|s| s.address == address)
            .map(|s| s.message.clone())
            .collect()
    }

    pub fn reset(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<SentMessage>> {
        self.sent.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl Transport for NullTransport {
    fn send(&self, address: &str, message: WireMessage) {
        self.lock().push(SentMessage {
            address: address.to_string(),
            message,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_messages::Request;

    #[test]
    fn records_and_drains() {
        let t = NullTransport::new();
        t.send("a", WireMessage::Request(Request::new("c", "x")));
        t.send("b", WireMessage::Request(Request::new("c", "y")));

        assert_eq!(t.sent().len(), 2);
        assert_eq!(t.sent_to("a").len(), 1);
        assert_eq!(t.take().len(), 2);
        assert!(t.sent().is_empty());
    }
}
