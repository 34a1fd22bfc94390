//! Internal error hierarchy for the run engine.
//!
//! Mirrors the shape of `ag-ui-server::error`'s `AgentError` (a `thiserror`
//! enum with a handful of causes, `#[non_exhaustive]`, `#[source]` chains)
//! but collapses onto the three-way [`acp_core::AcpErrorCode`] taxonomy at
//! the boundary instead of carrying protocol-specific variants.

use acp_core::error::{AcpError, AcpErrorCode};

/// Errors raised while driving a run or talking to the store.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum EngineError {
    #[error("unknown agent: {0}")]
    UnknownAgent(String),

    #[error("run not found: {0}")]
    RunNotFound(String),

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    #[error("cannot cancel a terminal run")]
    CancelTerminalRun,

    #[error("malformed request: {0}")]
    InvalidRequest(String),

    #[error("store error: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("agent error: {0}")]
    Agent(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Classifies this error onto the wire taxonomy and renders it to an
    /// [`AcpError`] body.
    #[must_use]
    pub fn into_acp_error(self) -> AcpError {
        let code = self.code();
        AcpError {
            code,
            message: self.to_string(),
        }
    }

    /// The wire error class this variant maps to.
    #[must_use]
    pub fn code(&self) -> AcpErrorCode {
        match self {
            EngineError::UnknownAgent(_)
            | EngineError::CancelTerminalRun
            | EngineError::InvalidRequest(_) => AcpErrorCode::InvalidInput,
            EngineError::RunNotFound(_)
            | EngineError::SessionNotFound(_)
            | EngineError::ResourceNotFound(_) => AcpErrorCode::NotFound,
            EngineError::Store(_) | EngineError::Agent(_) | EngineError::Internal(_) => {
                AcpErrorCode::ServerError
            }
        }
    }
}

/// Convenience alias used throughout the engine.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_matches_spec_taxonomy() {
        assert_eq!(
            EngineError::RunNotFound("r1".into()).code(),
            AcpErrorCode::NotFound
        );
        assert_eq!(
            EngineError::CancelTerminalRun.code(),
            AcpErrorCode::InvalidInput
        );
        assert_eq!(
            EngineError::Internal("boom".into()).code(),
            AcpErrorCode::ServerError
        );
    }

    #[test]
    fn into_acp_error_preserves_message() {
        let err = EngineError::InvalidRequest("bad resume".to_string()).into_acp_error();
        assert_eq!(err.code, AcpErrorCode::InvalidInput);
        assert!(err.message.contains("resume"));
    }
}
