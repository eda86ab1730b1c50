//! Error types for the gateway crate.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// How a gateway failure should be handled by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Timeout, connection failure, 5xx, cancellation - safe to retry later.
    Transient,
    /// The request itself was rejected - retrying the same request is pointless.
    Permanent,
    /// The device is unknown to the gateway.
    NotFound,
    /// The gateway answered with something that violates the contract.
    Internal,
}

/// Gateway error types.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("gateway call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("gateway unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("gateway server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("configuration rejected: {reason}")]
    Rejected { reason: String },

    #[error("device '{identifier}' not found")]
    NotFound { identifier: String },

    #[error("gateway call cancelled")]
    Cancelled,

    #[error("invalid gateway response: {reason}")]
    InvalidResponse { reason: String },
}

impl GatewayError {
    /// Create a timeout error.
    pub fn timeout(after: Duration) -> Self {
        Self::Timeout {
            timeout_ms: u64::try_from(after.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Create an unavailable error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Create a server error.
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: message.into(),
        }
    }

    /// Create a rejection error.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }

    /// Create a not found error.
    pub fn not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            identifier: identifier.into(),
        }
    }

    /// Create an invalid response error.
    pub fn invalid_response(reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            reason: reason.into(),
        }
    }

    /// Classify the failure.
    #[must_use]
    pub const fn class(&self) -> FailureClass {
        match self {
            Self::Timeout { .. }
            | Self::Unavailable { .. }
            | Self::Server { .. }
            | Self::Cancelled => FailureClass::Transient,
            Self::Rejected { .. } => FailureClass::Permanent,
            Self::NotFound { .. } => FailureClass::NotFound,
            Self::InvalidResponse { .. } => FailureClass::Internal,
        }
    }

    /// Whether the same call may succeed if retried later.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.class(), FailureClass::Transient | FailureClass::Internal)
    }
}

/// Device record store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("device record '{identifier}' not found")]
    NotFound { identifier: String },
}

impl From<StoreError> for GatewayError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { identifier } => Self::NotFound { identifier },
        }
    }
}
