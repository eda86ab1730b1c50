//! Access to `OpticalDevice` resources.
//!
//! [`ResourceClient`] is the slice of the host resource API the reconciler
//! needs. [`InMemoryResourceClient`] implements it with the platform's
//! semantics: generations, resource versions, finalizers and a watch stream.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use optical_core::{ObjectKey, OpticalDevice, OpticalDeviceStatus};
use tokio::sync::{RwLock, broadcast};
use tracing::debug;

use crate::error::{Error, Result};

const WATCH_CAPACITY: usize = 256;

/// Resource API used by the reconciler.
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// Fetch a resource. `None` if it does not exist.
    async fn get(&self, key: &ObjectKey) -> Result<Option<OpticalDevice>>;

    /// Keys of all existing resources.
    async fn list_keys(&self) -> Result<Vec<ObjectKey>>;

    /// Replace the status sub-resource.
    ///
    /// Fails with `Error::Conflict` if the object changed since
    /// `resource_version` was read.
    async fn update_status(
        &self,
        key: &ObjectKey,
        resource_version: u64,
        status: OpticalDeviceStatus,
    ) -> Result<OpticalDevice>;

    /// Add a finalizer if absent.
    async fn add_finalizer(&self, key: &ObjectKey, finalizer: &str) -> Result<OpticalDevice>;

    /// Remove a finalizer. A deleting object whose last finalizer goes away
    /// is removed.
    async fn remove_finalizer(&self, key: &ObjectKey, finalizer: &str) -> Result<()>;

    /// Subscribe to keys whose spec or lifecycle changed.
    fn watch(&self) -> broadcast::Receiver<ObjectKey>;
}

/// In-process resource API.
pub struct InMemoryResourceClient {
    objects: RwLock<HashMap<ObjectKey, OpticalDevice>>,
    events: broadcast::Sender<ObjectKey>,
    pending_foreign_writes: AtomicU32,
}

impl Default for InMemoryResourceClient {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryResourceClient {
    /// Create an empty client.
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(WATCH_CAPACITY);
        Self {
            objects: RwLock::new(HashMap::new()),
            events,
            pending_foreign_writes: AtomicU32::new(0),
        }
    }

    /// Create or update a resource the way a user would.
    ///
    /// The incoming status is ignored. On update the generation is bumped
    /// only if the spec changed; status and finalizers are preserved.
    pub async fn apply(&self, device: OpticalDevice) -> OpticalDevice {
        let key = device.key();
        let stored = {
            let mut objects = self.objects.write().await;
            let next = match objects.get(&key) {
                Some(existing) => {
                    let mut next = existing.clone();
                    if next.spec != device.spec {
                        next.metadata.generation = next.metadata.generation.saturating_add(1);
                        next.spec = device.spec;
                    }
                    next.metadata.resource_version =
                        next.metadata.resource_version.saturating_add(1);
                    next
                }
                None => {
                    let mut next = OpticalDevice::new(device.metadata, device.spec);
                    next.metadata.generation = 1;
                    next.metadata.resource_version = 1;
                    next.metadata.deletion_timestamp = None;
                    next
                }
            };
            objects.insert(key.clone(), next.clone());
            next
        };

        debug!(key = %key, generation = stored.metadata.generation, "Applied resource");
        self.notify(key);
        stored
    }

    /// Request deletion. Returns `false` if the resource did not exist.
    ///
    /// Objects with finalizers only get a deletion timestamp and stay until
    /// the finalizers are removed.
    pub async fn delete(&self, key: &ObjectKey) -> bool {
        let existed = {
            let mut objects = self.objects.write().await;
            if let Some(object) = objects.get_mut(key) {
                if object.metadata.finalizers.is_empty() {
                    objects.remove(key);
                } else if object.metadata.deletion_timestamp.is_none() {
                    object.metadata.deletion_timestamp = Some(Utc::now());
                    object.metadata.resource_version =
                        object.metadata.resource_version.saturating_add(1);
                }
                true
            } else {
                false
            }
        };

        if existed {
            debug!(key = %key, "Deletion requested");
            self.notify(key.clone());
        }
        existed
    }

    /// Copies of all resources, sorted by key.
    pub async fn snapshot(&self) -> Vec<OpticalDevice> {
        let mut devices: Vec<OpticalDevice> = self.objects.read().await.values().cloned().collect();
        devices.sort_by_key(OpticalDevice::key);
        devices
    }

    /// Make the next `count` status writes lose their race against another
    /// writer.
    pub fn simulate_foreign_writes(&self, count: u32) {
        self.pending_foreign_writes.store(count, Ordering::SeqCst);
    }

    fn take_foreign_write(&self) -> bool {
        self.pending_foreign_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn notify(&self, key: ObjectKey) {
        // No receivers is fine.
        let _ = self.events.send(key);
    }
}

#[async_trait]
impl ResourceClient for InMemoryResourceClient {
    async fn get(&self, key: &ObjectKey) -> Result<Option<OpticalDevice>> {
        Ok(self.objects.read().await.get(key).cloned())
    }

    async fn list_keys(&self) -> Result<Vec<ObjectKey>> {
        let mut keys: Vec<ObjectKey> = self.objects.read().await.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    async fn update_status(
        &self,
        key: &ObjectKey,
        resource_version: u64,
        status: OpticalDeviceStatus,
    ) -> Result<OpticalDevice> {
        let mut objects = self.objects.write().await;
        let object = objects
            .get_mut(key)
            .ok_or_else(|| Error::not_found(key.clone()))?;

        if self.take_foreign_write() {
            object.metadata.resource_version = object.metadata.resource_version.saturating_add(1);
        }

        if object.metadata.resource_version != resource_version {
            return Err(Error::Conflict {
                key: key.clone(),
                expected: resource_version,
                actual: object.metadata.resource_version,
            });
        }

        object.status = status;
        object.metadata.resource_version = object.metadata.resource_version.saturating_add(1);
        Ok(object.clone())
    }

    async fn add_finalizer(&self, key: &ObjectKey, finalizer: &str) -> Result<OpticalDevice> {
        let mut objects = self.objects.write().await;
        let object = objects
            .get_mut(key)
            .ok_or_else(|| Error::not_found(key.clone()))?;

        if !object.metadata.has_finalizer(finalizer) {
            object.metadata.finalizers.push(finalizer.to_string());
            object.metadata.resource_version = object.metadata.resource_version.saturating_add(1);
        }
        Ok(object.clone())
    }

    async fn remove_finalizer(&self, key: &ObjectKey, finalizer: &str) -> Result<()> {
        let mut objects = self.objects.write().await;
        let Some(object) = objects.get_mut(key) else {
            return Ok(());
        };

        object.metadata.finalizers.retain(|f| f != finalizer);
        object.metadata.resource_version = object.metadata.resource_version.saturating_add(1);

        if object.is_being_deleted() && object.metadata.finalizers.is_empty() {
            objects.remove(key);
            debug!(key = %key, "Resource removed");
        }
        Ok(())
    }

    fn watch(&self) -> broadcast::Receiver<ObjectKey> {
        self.events.subscribe()
    }
}
