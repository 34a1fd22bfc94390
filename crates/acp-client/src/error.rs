//! Client-side error type.

use acp_core::error::AcpError;

/// Errors a client call can fail with.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server returned an error: {0}")]
    Server(AcpError),

    #[error("malformed server-sent event stream: {0}")]
    Stream(String),

    #[error("decoding error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Convenience alias.
pub type ClientResult<T> = Result<T, ClientError>;
