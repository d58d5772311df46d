//! Error types for the REST client.
//!
//! # Design
//! Failures are split by layer. `TransportError` covers what can go wrong in
//! one POST round trip and nothing more. `ApiError` is what the dispatcher
//! hands back to callers: the transport kinds plus configuration problems and
//! faults the server reports inside an otherwise well-formed JSON payload.

use thiserror::Error;

/// Failure of a single POST exchange, classified at the transport boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The server answered with a 4xx or 5xx status.
    #[error("HTTP {status}: {body}")]
    ServerRejected { status: u16, body: String },

    /// A response arrived but its body is not JSON.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// No response was received: DNS, connect, TLS, I/O or timeout.
    #[error("network unavailable: {0}")]
    NetworkUnavailable(String),
}

/// Failure of a dispatched remote operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The entry point template or its placeholders cannot produce a URL, or
    /// the client configuration is invalid.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("network unavailable: {0}")]
    NetworkUnavailable(String),

    /// The server refused the call, either with an HTTP error status or with
    /// a fault payload that has no more specific classification.
    #[error("server rejected request (HTTP {status}): {message}")]
    ServerRejected { status: u16, message: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The server refused the supplied credentials.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The call needed a session the server no longer accepts, or no session
    /// was open locally.
    #[error("session expired: {0}")]
    SessionExpired(String),
}

impl ApiError {
    /// True when logging in again and retrying once could succeed.
    pub fn is_session_error(&self) -> bool {
        matches!(self, ApiError::SessionExpired(_))
    }

    /// True when the local session should be dropped after this failure.
    pub fn invalidates_session(&self) -> bool {
        matches!(
            self,
            ApiError::SessionExpired(_) | ApiError::AuthenticationFailed(_)
        )
    }
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::ServerRejected { status, body } => ApiError::ServerRejected {
                status,
                message: body,
            },
            TransportError::MalformedResponse(msg) => ApiError::MalformedResponse(msg),
            TransportError::NetworkUnavailable(msg) => ApiError::NetworkUnavailable(msg),
        }
    }
}
