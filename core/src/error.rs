//! Error taxonomy for transports and operations.

use thiserror::Error;

/// Errors raised by a transport capability.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The request never produced a response (connection refused, DNS
    /// failure, broken pipe, ...).
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-success status.
    #[error("status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly truncated by the transport.
        body: String,
    },

    /// The transport-level timeout elapsed.
    #[error("request timed out")]
    Timeout,

    /// The attempt was cancelled through its cancellation token.
    #[error("request aborted")]
    Aborted,

    /// The response body could not be decoded into a payload value.
    #[error("response decode failed: {0}")]
    Decode(String),
}

/// Errors observable through an operation's `error` state field.
#[derive(Debug, Clone, Error)]
pub enum OperationError {
    /// The transport failed, after the client's error handle was applied.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The response handle rejected an otherwise successful response.
    #[error("response rejected: {0}")]
    Handler(String),

    /// The raw payload could not be decoded into the operation's data type.
    #[error("payload decode failed: {0}")]
    Decode(String),

    /// A configuration problem. Reported and degraded, never fatal.
    #[error("configuration error: {0}")]
    Config(String),
}

impl OperationError {
    /// Whether this error came from an aborted attempt.
    #[must_use]
    pub const fn is_aborted(&self) -> bool {
        matches!(self, Self::Transport(TransportError::Aborted))
    }
}
