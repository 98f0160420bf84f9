//! HTTP endpoint paths, one per message type.

use tessera_messages::WireMessage;

use crate::NetworkError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Request,
    PrePrepare,
    Prepare,
    Commit,
    GlobalShare,
    LocalEcho,
    Reply,
}

impl Endpoint {
    pub const ALL: [Endpoint; 7] = [
        Endpoint::Request,
        Endpoint::PrePrepare,
        Endpoint::Prepare,
        Endpoint::Commit,
        Endpoint::GlobalShare,
        Endpoint::LocalEcho,
        Endpoint::Reply,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Request => "/request",
            Endpoint::PrePrepare => "/preprepare",
            Endpoint::Prepare => "/prepare",
            Endpoint::Commit => "/commit",
            Endpoint::GlobalShare => "/global",
            Endpoint::LocalEcho => "/GlobalToLocal",
            Endpoint::Reply => "/reply",
        }
    }

    pub fn for_message(message: &WireMessage) -> Self {
        match message {
            WireMessage::Request(_) => Endpoint::Request,
            WireMessage::PrePrepare(_) => Endpoint::PrePrepare,
            WireMessage::Prepare(_) => Endpoint::Prepare,
            WireMessage::Commit(_) => Endpoint::Commit,
            WireMessage::GlobalShare(_) => Endpoint::GlobalShare,
            WireMessage::LocalEcho(_) => Endpoint::LocalEcho,
            WireMessage::Reply(_) => Endpoint::Reply,
        }
    }

    /// Full URL of this endpoint at `address` (`host:port`, scheme optional).
    pub fn url(self, address: &str) -> String {
        let base = address.trim_end_matches('/');
        if base.starts_with("http://") || base.starts_with("https://") {
            format!("{base}{}", self.path())
        } else {
            format!("http://{base}{}", self.path())
        }
    }
}

/// JSON body for `message`: the inner typed message, without the enum tag.
pub fn encode_body(message: &WireMessage) -> Result<Vec<u8>, NetworkError> {
    let body = match message {
        WireMessage::Request(m) => serde_json::to_vec(m)?,
        WireMessage::PrePrepare(m) => serde_json::to_vec(m)?,
        WireMessage::Prepare(m) | WireMessage::Commit(m) => serde_json::to_vec(m)?,
        WireMessage::GlobalShare(m) => serde_json::to_vec(m)?,
        WireMessage::LocalEcho(m) => serde_json::to_vec(m)?,
        WireMessage::Reply(m) => serde_json::to_vec(m)?,
    };
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_adds_scheme_once() {
        assert_eq!(
            Endpoint::Commit.url("localhost:1111"),
            "http://localhost:1111/commit"
        );
        assert_eq!(
            Endpoint::LocalEcho.url("http://10.0.0.2:1200/"),
            "http://10.0.0.2:1200/GlobalToLocal"
        );
    }

    #[test]
    fn paths_are_distinct() {
        let mut paths: Vec<_> = Endpoint::ALL.iter().map(|e| e.path()).collect();
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), Endpoint::ALL.len());
    }
}
