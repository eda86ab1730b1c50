//! Status conditions with Kubernetes-style transition semantics.
//!
//! A [`ConditionSet`] holds at most one [`Condition`] per type, in insertion
//! order. The `last_transition_time` of a condition only moves when its
//! status value changes; reason/message-only updates keep the original
//! timestamp.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Condition type reported once the device matches its desired configuration.
pub const CONDITION_READY: &str = "Ready";

/// Reason used when a reconciliation cycle applied the configuration.
pub const REASON_RECONCILIATION_SUCCESS: &str = "ReconciliationSuccess";
/// Reason used when the gateway failed in a way that will be retried.
pub const REASON_TRANSIENT_ERROR: &str = "TransientError";
/// Reason used when the gateway rejected the configuration itself.
pub const REASON_INVALID_CONFIGURATION: &str = "InvalidConfiguration";

/// Tri-state status of a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl std::fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::True => write!(f, "True"),
            Self::False => write!(f, "False"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// A single named status flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Condition type, unique within a set (e.g. `Ready`).
    #[serde(rename = "type")]
    pub condition_type: String,
    /// Current status value.
    pub status: ConditionStatus,
    /// Short machine-readable token.
    pub reason: String,
    /// Human-readable detail.
    #[serde(default)]
    pub message: String,
    /// When `status` last changed value.
    pub last_transition_time: DateTime<Utc>,
}

/// Ordered set of conditions keyed by type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Condition>", into = "Vec<Condition>")]
pub struct ConditionSet {
    conditions: Vec<Condition>,
}

impl ConditionSet {
    /// Create an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            conditions: Vec::new(),
        }
    }

    /// Insert or update the condition of `condition_type`.
    ///
    /// Returns `true` when the status value transitioned (or the condition
    /// was newly added), i.e. when `last_transition_time` was set to `now`.
    pub fn upsert(
        &mut self,
        condition_type: &str,
        status: ConditionStatus,
        reason: &str,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> bool {
        let message = message.into();
        match self
            .conditions
            .iter_mut()
            .find(|c| c.condition_type == condition_type)
        {
            Some(existing) => {
                let transitioned = existing.status != status;
                if transitioned {
                    existing.status = status;
                    existing.last_transition_time = now;
                }
                existing.reason = reason.to_string();
                existing.message = message;
                transitioned
            }
            None => {
                self.conditions.push(Condition {
                    condition_type: condition_type.to_string(),
                    status,
                    reason: reason.to_string(),
                    message,
                    last_transition_time: now,
                });
                true
            }
        }
    }

    /// Look up a condition by type.
    #[must_use]
    pub fn get(&self, condition_type: &str) -> Option<&Condition> {
        self.conditions
            .iter()
            .find(|c| c.condition_type == condition_type)
    }

    /// Whether the condition exists and is `True`.
    #[must_use]
    pub fn is_true(&self, condition_type: &str) -> bool {
        self.get(condition_type)
            .is_some_and(|c| c.status == ConditionStatus::True)
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Condition> {
        self.conditions.iter()
    }

    /// Number of conditions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

impl From<Vec<Condition>> for ConditionSet {
    /// Duplicate types collapse into the first position, last value wins.
    fn from(conditions: Vec<Condition>) -> Self {
        let mut set = Self::new();
        for condition in conditions {
            match set
                .conditions
                .iter_mut()
                .find(|c| c.condition_type == condition.condition_type)
            {
                Some(existing) => *existing = condition,
                None => set.conditions.push(condition),
            }
        }
        set
    }
}

impl From<ConditionSet> for Vec<Condition> {
    fn from(set: ConditionSet) -> Self {
        set.conditions
    }
}
