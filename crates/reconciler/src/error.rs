//! Error types for the reconciler crate.

use std::fmt;
use std::time::Duration;

use optical_core::ObjectKey;

/// Result type alias for reconciler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Reconciler error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Backend failure that may clear on its own (timeout, connection, 5xx,
    /// repeated status-write conflict).
    Transient { reason: String, retry_after: Duration },
    /// The desired configuration was rejected; not retried until it changes.
    Permanent { reason: String },
    /// The gateway broke its contract. Handled like a transient failure.
    Internal { reason: String, retry_after: Duration },
    /// The cycle was cancelled before it could finish; no status was written.
    Cancelled { retry_after: Duration },
    /// Status write lost an optimistic concurrency race.
    Conflict {
        key: ObjectKey,
        expected: u64,
        actual: u64,
    },
    /// Resource does not exist.
    NotFound { key: ObjectKey },
    /// Invalid configuration.
    InvalidConfig { reason: String },
    /// Metrics registration or encoding failed.
    Metrics { reason: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient {
                reason,
                retry_after,
            } => {
                write!(
                    f,
                    "transient failure (retry in {}s): {reason}",
                    retry_after.as_secs()
                )
            }
            Self::Permanent { reason } => {
                write!(f, "invalid configuration: {reason}")
            }
            Self::Internal {
                reason,
                retry_after,
            } => {
                write!(
                    f,
                    "internal error (retry in {}s): {reason}",
                    retry_after.as_secs()
                )
            }
            Self::Cancelled { .. } => {
                write!(f, "reconciliation cancelled")
            }
            Self::Conflict {
                key,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "conflict writing '{key}': expected version {expected}, found {actual}"
                )
            }
            Self::NotFound { key } => {
                write!(f, "resource '{key}' not found")
            }
            Self::InvalidConfig { reason } => {
                write!(f, "invalid reconciler configuration: {reason}")
            }
            Self::Metrics { reason } => {
                write!(f, "metrics error: {reason}")
            }
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// Create a transient error.
    pub fn transient(reason: impl Into<String>, retry_after: Duration) -> Self {
        Self::Transient {
            reason: reason.into(),
            retry_after,
        }
    }

    /// Create a permanent error.
    pub fn permanent(reason: impl Into<String>) -> Self {
        Self::Permanent {
            reason: reason.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(reason: impl Into<String>, retry_after: Duration) -> Self {
        Self::Internal {
            reason: reason.into(),
            retry_after,
        }
    }

    /// Create a not found error.
    #[must_use]
    pub const fn not_found(key: ObjectKey) -> Self {
        Self::NotFound { key }
    }

    /// Create an invalid config error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create a metrics error.
    pub fn metrics(reason: impl Into<String>) -> Self {
        Self::Metrics {
            reason: reason.into(),
        }
    }

    /// Delay before the key should be reconciled again, if at all.
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Transient { retry_after, .. }
            | Self::Internal { retry_after, .. }
            | Self::Cancelled { retry_after } => Some(*retry_after),
            Self::Conflict { .. } => Some(Duration::ZERO),
            Self::Permanent { .. }
            | Self::NotFound { .. }
            | Self::InvalidConfig { .. }
            | Self::Metrics { .. } => None,
        }
    }

    /// Short label used for the error counter.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Transient { .. } => "transient",
            Self::Permanent { .. } => "permanent",
            Self::Internal { .. } => "internal",
            Self::Cancelled { .. } => "cancelled",
            Self::Conflict { .. } => "conflict",
            Self::NotFound { .. } => "not_found",
            Self::InvalidConfig { .. } => "config",
            Self::Metrics { .. } => "metrics",
        }
    }
}
