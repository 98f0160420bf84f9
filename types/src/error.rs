//! Errors raised while constructing or parsing fundamental types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TypesError {
    #[error("invalid digest: {0}")]
    InvalidDigest(String),

    #[error("invalid key material: {0}")]
    InvalidKey(String),
}
