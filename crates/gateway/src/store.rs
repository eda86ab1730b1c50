//! Device record store.
//!
//! Maps a device identifier to the configuration last applied to it. The map
//! is sharded ([`DashMap`]): operations on the same identifier are mutually
//! exclusive and ordered by arrival, operations on identifiers in different
//! shards proceed in parallel. Every operation holds a shard lock only for an
//! in-memory copy; no I/O happens under it.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::wire::{ConfigureRequest, DeviceId};

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Snapshot of what a device currently has applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    pub identifier: DeviceId,
    pub port: u16,
    pub bandwidth: String,
    pub laser_power: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<u32>,
    pub applied_at: DateTime<Utc>,
}

impl DeviceRecord {
    /// Record the configuration carried by a configure request.
    #[must_use]
    pub fn from_request(request: &ConfigureRequest, applied_at: DateTime<Utc>) -> Self {
        Self {
            identifier: request.identifier.clone(),
            port: request.port,
            bandwidth: request.bandwidth.clone(),
            laser_power: request.laser_power.clone(),
            channel: request.channel,
            applied_at,
        }
    }
}

/// Concurrency-safe device record map.
#[derive(Debug, Default)]
pub struct DeviceRecordStore {
    records: DashMap<DeviceId, DeviceRecord>,
}

impl DeviceRecordStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the record for `id`, returning the previous one.
    pub fn set(&self, id: DeviceId, record: DeviceRecord) -> Option<DeviceRecord> {
        self.records.insert(id, record)
    }

    /// Fetch a copy of the record for `id`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no record exists.
    pub fn get(&self, id: &DeviceId) -> StoreResult<DeviceRecord> {
        self.records
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::NotFound {
                identifier: id.to_string(),
            })
    }

    /// Remove the record for `id`, returning it.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no record exists.
    pub fn delete(&self, id: &DeviceId) -> StoreResult<DeviceRecord> {
        self.records
            .remove(id)
            .map(|(_, record)| record)
            .ok_or_else(|| StoreError::NotFound {
                identifier: id.to_string(),
            })
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Copies of all records, sorted by identifier.
    #[must_use]
    pub fn list(&self) -> Vec<DeviceRecord> {
        let mut records: Vec<DeviceRecord> =
            self.records.iter().map(|entry| entry.value().clone()).collect();
        records.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        records
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn record(id: &str, bandwidth: &str) -> DeviceRecord {
        DeviceRecord {
            identifier: DeviceId::new(id),
            port: 830,
            bandwidth: bandwidth.to_string(),
            laser_power: "15dBm".to_string(),
            channel: None,
            applied_at: Utc::now(),
        }
    }

    #[test]
    fn test_set_then_get() {
        let store = DeviceRecordStore::new();
        let r = record("laser-a1", "100Gbps");

        assert!(store.set(r.identifier.clone(), r.clone()).is_none());
        assert_eq!(store.get(&DeviceId::new("laser-a1")).unwrap(), r);
    }

    #[test]
    fn test_set_overwrites() {
        let store = DeviceRecordStore::new();
        let id = DeviceId::new("laser-a1");
        store.set(id.clone(), record("laser-a1", "100Gbps"));

        let previous = store.set(id.clone(), record("laser-a1", "400Gbps"));

        assert_eq!(previous.map(|r| r.bandwidth), Some("100Gbps".to_string()));
        assert_eq!(store.get(&id).unwrap().bandwidth, "400Gbps");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_delete_then_get_is_not_found() {
        let store = DeviceRecordStore::new();
        let id = DeviceId::new("laser-a1");
        store.set(id.clone(), record("laser-a1", "100Gbps"));

        assert!(store.delete(&id).is_ok());
        assert!(matches!(store.get(&id), Err(StoreError::NotFound { .. })));
        assert!(matches!(store.delete(&id), Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn test_list_is_sorted() {
        let store = DeviceRecordStore::new();
        for id in ["c", "a", "b"] {
            store.set(DeviceId::new(id), record(id, "100Gbps"));
        }
        let ids: Vec<String> = store.list().into_iter().map(|r| r.identifier.to_string()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
