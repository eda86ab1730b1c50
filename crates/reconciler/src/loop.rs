//! Continuous reconciliation loop.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::client::ResourceClient;
use crate::error::Result;
use crate::queue::WorkQueue;
use crate::reconciler::Reconciler;

/// Continuous reconciliation loop.
///
/// Feeds keys from the resource watch into a [`WorkQueue`] and runs a fixed
/// pool of workers over it. Each result decides when the key comes back:
/// the resync interval on success, the error's backoff on failure, never for
/// permanent rejections.
pub struct ReconciliationLoop {
    /// The reconciler.
    reconciler: Arc<Reconciler>,
    /// Source of keys and change notifications.
    client: Arc<dyn ResourceClient>,
    /// Pending keys.
    queue: Arc<WorkQueue>,
    /// Number of workers.
    workers: usize,
    /// Stop signal; also cancels in-flight gateway calls.
    stop: CancellationToken,
}

impl ReconciliationLoop {
    /// Create a new reconciliation loop using the reconciler's worker count.
    pub fn new(reconciler: Arc<Reconciler>, client: Arc<dyn ResourceClient>) -> Self {
        let workers = reconciler.config().workers.max(1);
        Self {
            reconciler,
            client,
            queue: Arc::new(WorkQueue::new()),
            workers,
            stop: CancellationToken::new(),
        }
    }

    /// The loop's work queue.
    #[must_use]
    pub const fn queue(&self) -> &Arc<WorkQueue> {
        &self.queue
    }

    /// Run until stopped.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial listing of resources fails.
    pub async fn run(&self) -> Result<()> {
        info!(workers = self.workers, "Starting reconciliation loop");

        // Subscribe before listing so no change between the two is lost.
        let mut events = self.client.watch();
        self.enqueue_all().await?;

        let mut workers = JoinSet::new();
        for worker_id in 0..self.workers {
            workers.spawn(worker(
                worker_id,
                Arc::clone(&self.reconciler),
                Arc::clone(&self.queue),
                self.stop.clone(),
            ));
        }

        loop {
            tokio::select! {
                biased;
                () = self.stop.cancelled() => break,
                event = events.recv() => match event {
                    Ok(key) => self.queue.add(key),
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "Watch lagged, relisting resources");
                        if let Err(e) = self.enqueue_all().await {
                            error!(error = %e, "Relist failed");
                        }
                    }
                    Err(RecvError::Closed) => {
                        warn!("Watch closed, no further change notifications");
                        self.stop.cancelled().await;
                        break;
                    }
                },
            }
        }

        self.queue.shutdown();
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Worker terminated abnormally");
            }
        }

        info!("Reconciliation loop stopped");
        Ok(())
    }

    async fn enqueue_all(&self) -> Result<()> {
        let keys = self.client.list_keys().await?;
        debug!(count = keys.len(), "Enqueueing resources");
        for key in keys {
            self.queue.add(key);
        }
        Ok(())
    }

    /// Stop the loop.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    /// Get a stopper handle.
    #[must_use]
    pub fn stopper(&self) -> LoopStopper {
        LoopStopper {
            stop: self.stop.clone(),
        }
    }
}

async fn worker(
    worker_id: usize,
    reconciler: Arc<Reconciler>,
    queue: Arc<WorkQueue>,
    stop: CancellationToken,
) {
    debug!(worker_id, "Worker started");
    while let Some(key) = queue.get().await {
        match reconciler.reconcile(&key, &stop).await {
            Ok(action) => {
                if let Some(delay) = action.requeue_after() {
                    queue.add_after(key.clone(), delay);
                }
            }
            Err(e) => match e.retry_after() {
                Some(delay) => queue.add_after(key.clone(), delay),
                None => debug!(key = %key, error = %e, "Not retrying until the resource changes"),
            },
        }
        queue.done(&key);
    }
    debug!(worker_id, "Worker stopped");
}

/// Handle to stop a reconciliation loop.
#[derive(Clone)]
pub struct LoopStopper {
    stop: CancellationToken,
}

impl LoopStopper {
    /// Stop the loop.
    pub fn stop(&self) {
        self.stop.cancel();
    }
}
