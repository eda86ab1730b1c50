//! Core types for the reconciler.

use std::fmt;
use std::time::Duration;

/// Finalizer that keeps a resource around until its device is deconfigured.
pub const DECONFIGURE_FINALIZER: &str = "hardware.ran.example.com/deconfigure";

/// What should happen to a key after a successful reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Reconcile again after the delay (periodic resync).
    Requeue(Duration),
    /// Nothing to do until the resource changes.
    AwaitChange,
}

impl Action {
    /// Delay before the next reconciliation, if one is scheduled.
    #[must_use]
    pub const fn requeue_after(&self) -> Option<Duration> {
        match self {
            Self::Requeue(delay) => Some(*delay),
            Self::AwaitChange => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Requeue(delay) => write!(f, "requeue in {}s", delay.as_secs()),
            Self::AwaitChange => write!(f, "await change"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requeue_after() {
        assert_eq!(
            Action::Requeue(Duration::from_secs(300)).requeue_after(),
            Some(Duration::from_secs(300))
        );
        assert_eq!(Action::AwaitChange.requeue_after(), None);
        assert_eq!(Action::Requeue(Duration::from_secs(5)).to_string(), "requeue in 5s");
    }
}
