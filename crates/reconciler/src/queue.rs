//! De-duplicating work queue of resource keys.
//!
//! A key is handed to at most one worker at a time. Adding a key that is
//! already queued is a no-op; adding a key that is being processed marks it
//! dirty so it is queued again once the worker calls [`WorkQueue::done`].
//! Delayed adds keep only the earliest pending deadline per key.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use optical_core::ObjectKey;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::trace;

#[derive(Debug, Default)]
struct QueueState {
    queue: VecDeque<ObjectKey>,
    /// Keys waiting to be processed (queued, or re-added while processing).
    dirty: HashSet<ObjectKey>,
    processing: HashSet<ObjectKey>,
    /// Earliest pending deadline of each delayed key.
    delayed: HashMap<ObjectKey, Instant>,
    shutting_down: bool,
}

/// Work queue shared by the loop's workers.
#[derive(Debug, Default)]
pub struct WorkQueue {
    state: Mutex<QueueState>,
    notify: Notify,
    shutdown: CancellationToken,
}

impl WorkQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `key` for processing.
    pub fn add(&self, key: ObjectKey) {
        {
            let mut state = self.state.lock();
            if state.shutting_down || state.dirty.contains(&key) {
                return;
            }
            state.dirty.insert(key.clone());
            if state.processing.contains(&key) {
                trace!(key = %key, "Key in flight, deferring");
                return;
            }
            state.queue.push_back(key);
        }
        self.notify.notify_one();
    }

    /// Queue `key` after `delay`. Dropped if the queue shuts down first.
    ///
    /// A key already waiting for an earlier deadline is left alone; a later
    /// pending deadline is superseded.
    pub fn add_after(self: &Arc<Self>, key: ObjectKey, delay: Duration) {
        if delay.is_zero() {
            self.add(key);
            return;
        }
        let deadline = Instant::now() + delay;
        {
            let mut state = self.state.lock();
            if state.shutting_down {
                return;
            }
            if state.delayed.get(&key).is_some_and(|pending| *pending <= deadline) {
                trace!(key = %key, "Earlier requeue already pending");
                return;
            }
            state.delayed.insert(key.clone(), deadline);
        }

        let queue = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                () = queue.shutdown.cancelled() => {}
                () = tokio::time::sleep_until(deadline) => queue.fire_delayed(key, deadline),
            }
        });
    }

    fn fire_delayed(&self, key: ObjectKey, deadline: Instant) {
        let current = {
            let mut state = self.state.lock();
            if state.delayed.get(&key) == Some(&deadline) {
                state.delayed.remove(&key);
                true
            } else {
                false
            }
        };
        if current {
            self.add(key);
        }
    }

    /// Number of keys waiting for a delayed add.
    #[must_use]
    pub fn delayed_len(&self) -> usize {
        self.state.lock().delayed.len()
    }

    /// Wait for the next key. `None` once the queue is shut down.
    pub async fn get(&self) -> Option<ObjectKey> {
        loop {
            let notified = self.notify.notified();
            {
                let mut state = self.state.lock();
                if state.shutting_down {
                    return None;
                }
                if let Some(key) = state.queue.pop_front() {
                    state.dirty.remove(&key);
                    state.processing.insert(key.clone());
                    return Some(key);
                }
            }
            notified.await;
        }
    }

    /// Mark `key` as processed, re-queueing it if it was added meanwhile.
    pub fn done(&self, key: &ObjectKey) {
        let requeued = {
            let mut state = self.state.lock();
            state.processing.remove(key);
            if state.dirty.contains(key) && !state.shutting_down {
                state.queue.push_back(key.clone());
                true
            } else {
                false
            }
        };
        if requeued {
            self.notify.notify_one();
        }
    }

    /// Stop handing out keys and drop pending delayed adds.
    pub fn shutdown(&self) {
        {
            let mut state = self.state.lock();
            state.shutting_down = true;
            state.delayed.clear();
        }
        self.shutdown.cancel();
        self.notify.notify_waiters();
    }

    /// Number of keys waiting to be handed out.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().queue.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
