use thiserror::Error;

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("batch encoding failed: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("a batch needs at least one request")]
    EmptyBatch,
}
