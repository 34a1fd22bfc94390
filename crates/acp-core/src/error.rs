//! The wire error taxonomy shared by server and client.
//!
//! Collapses the richer internal error hierarchies of the server crate
//! (modeled on `ag-ui-server::error`'s `AgentError`/`StateError`/
//! `TransportError` split) onto the three-way classification the protocol
//! actually exposes at its boundary.

use serde::{Deserialize, Serialize};

/// The three error classes the protocol exposes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcpErrorCode {
    InvalidInput,
    NotFound,
    ServerError,
}

impl AcpErrorCode {
    /// The HTTP status this error class maps to. `400` is reserved for
    /// body-parse failures the server never gets to classify, so
    /// `invalid_input` maps to `422` instead.
    #[must_use]
    pub fn status_code(self) -> u16 {
        match self {
            AcpErrorCode::InvalidInput => 422,
            AcpErrorCode::NotFound => 404,
            AcpErrorCode::ServerError => 500,
        }
    }
}

/// The error body shape sent on the wire: `{ "code": ..., "message": ... }`.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct AcpError {
    pub code: AcpErrorCode,
    pub message: String,
}

impl AcpError {
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self {
            code: AcpErrorCode::InvalidInput,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            code: AcpErrorCode::NotFound,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn server_error(message: impl Into<String>) -> Self {
        Self {
            code: AcpErrorCode::ServerError,
            message: message.into(),
        }
    }
}
