//! Client error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("client id '{0}' is already connected to this server")]
    DuplicateClientId(String),

    #[error("stream not found")]
    StreamNotFound,

    #[error("connection error: {0}")]
    ConnectionError(String),
}
