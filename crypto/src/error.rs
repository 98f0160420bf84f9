use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("operating system randomness unavailable: {0}")]
    Entropy(String),

    #[error("malformed key encoding: {0}")]
    KeyEncoding(String),
}
