//! Client requests, the batches agreed on, and replies.

use serde::{Deserialize, Serialize};
use tessera_types::{Digest, NodeId, Timestamp, ViewId};

use crate::MessageError;

/// Result string carried by every reply for an executed request.
pub const EXECUTED: &str = "Executed";

/// A client operation submitted to a cluster primary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub timestamp: Timestamp,
    pub client_id: String,
    pub operation: String,
    /// Stamped by the primary with the proposal's sequence number.
    #[serde(default)]
    pub sequence_id: i64,
    /// Where replies for this request should be posted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}

impl Request {
    pub fn new(client_id: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            timestamp: Timestamp::now(),
            client_id: client_id.into(),
            operation: operation.into(),
            sequence_id: 0,
            reply_to: None,
        }
    }

    pub fn with_reply_to(mut self, address: impl Into<String>) -> Self {
        self.reply_to = Some(address.into());
        self
    }
}

/// The unit of agreement: an ordered group of requests.
///
/// `timestamp` and `client_id` are copied from the first request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub requests: Vec<Request>,
    pub timestamp: Timestamp,
    pub client_id: String,
}

impl Batch {
    pub fn new(requests: Vec<Request>) -> Result<Self, MessageError> {
        let first = requests.first().ok_or(MessageError::EmptyBatch)?;
        Ok(Self {
            timestamp: first.timestamp,
            client_id: first.client_id.clone(),
            requests,
        })
    }

    /// Blake2b-256 over the canonical bincode encoding.
    pub fn digest(&self) -> Result<Digest, MessageError> {
        let encoded = bincode::serialize(self)?;
        Ok(tessera_crypto::digest_of(&encoded))
    }

    /// Assign the proposal's sequence number to every request.
    pub fn stamp_sequence(&mut self, sequence_id: i64) {
        for request in &mut self.requests {
            request.sequence_id = sequence_id;
        }
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

/// A replica's answer to a client once its request is globally decided.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub view_id: ViewId,
    pub timestamp: Timestamp,
    pub client_id: String,
    pub node_id: NodeId,
    pub result: String,
}

impl Reply {
    pub fn executed(view_id: ViewId, request: &Request, node_id: NodeId) -> Self {
        Self {
            view_id,
            timestamp: request.timestamp,
            client_id: request.client_id.clone(),
            node_id,
            result: EXECUTED.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(client: &str, op: &str, ts: i64) -> Request {
        Request {
            timestamp: Timestamp::new(ts),
            client_id: client.into(),
            operation: op.into(),
            sequence_id: 0,
            reply_to: None,
        }
    }

    #[test]
    fn batch_takes_header_from_first_request() {
        let batch = Batch::new(vec![request("c1", "a", 10), request("c2", "b", 20)]).unwrap();
        assert_eq!(batch.client_id, "c1");
        assert_eq!(batch.timestamp, Timestamp::new(10));
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn empty_batch_is_rejected() {
        assert!(matches!(Batch::new(vec![]), Err(MessageError::EmptyBatch)));
    }

    #[test]
    fn digest_depends_on_content() {
        let a = Batch::new(vec![request("c", "x", 1)]).unwrap();
        let b = Batch::new(vec![request("c", "y", 1)]).unwrap();
        assert_eq!(a.digest().unwrap(), a.clone().digest().unwrap());
        assert_ne!(a.digest().unwrap(), b.digest().unwrap());
    }

    #[test]
    fn stamping_changes_digest() {
        let mut batch = Batch::new(vec![request("c", "x", 1)]).unwrap();
        let before = batch.digest().unwrap();
        batch.stamp_sequence(4);
        assert_eq!(batch.requests[0].sequence_id, 4);
        assert_ne!(batch.digest().unwrap(), before);
    }

    #[test]
    fn request_without_reply_to_parses() {
        let json = r#"{"timestamp":5,"client_id":"c","operation":"op"}"#;
        let req: Request = serde_json::from_str(json).unwrap();
        assert_eq!(req.sequence_id, 0);
        assert!(req.reply_to.is_none());
    }

    #[test]
    fn executed_reply_echoes_request() {
        let req = request("client-7", "op", 99);
        let reply = Reply::executed(ViewId::new(3), &req, NodeId::new("N0"));
        assert_eq!(reply.result, EXECUTED);
        assert_eq!(reply.timestamp, Timestamp::new(99));
        assert_eq!(reply.client_id, "client-7");
    }
}
