use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("node table line {line}: {reason}")]
    NodeTable { line: usize, reason: String },

    #[error("no runtime available to drive outbound requests")]
    NoRuntime,

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("message encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
