//! Opt-in background cleanup.
//!
//! Nothing sweeps unless [`KvStore::spawn_sweeper`] is called. Each pass is
//! an ordinary [`KvStore::cleanup`], so it serializes with every other
//! operation on the shared connection and never races a lazy expiry.

use super::handle::KvStore;
use crate::error::{Error, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Handle to a running sweeper. Dropping it without calling
/// [`SweeperHandle::shutdown`] leaves the task running until the runtime stops.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
    passes: Arc<AtomicU64>,
}

impl SweeperHandle {
    /// Number of completed cleanup passes, successful or not.
    pub fn passes(&self) -> u64 {
        self.passes.load(Ordering::Relaxed)
    }

    /// Stops the sweeper and waits for an in-flight pass to finish.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Task`] if the sweeper task panicked.
    pub async fn shutdown(self) -> Result<()> {
        // The task may already be gone; a closed channel is fine
        let _ = self.shutdown_tx.send(());
        self.task
            .await
            .map_err(|e| Error::Task(format!("Sweeper task failed: {e}")))?;

        info!(passes = self.passes.load(Ordering::Relaxed), "Sweeper stopped");
        Ok(())
    }
}

impl KvStore {
    /// Starts a task that runs [`KvStore::cleanup`] every `interval`.
    ///
    /// The first pass runs one full interval after the call. A failing pass
    /// is logged and the loop keeps going.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] if `interval` is zero
    /// - [`Error::Task`] if called outside a tokio runtime
    pub fn spawn_sweeper(&self, interval: Duration) -> Result<SweeperHandle> {
        if interval.is_zero() {
            return Err(Error::validation("sweep interval must be greater than zero"));
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Task(format!("Sweeper needs a tokio runtime: {e}")))?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let passes = Arc::new(AtomicU64::new(0));
        let task = runtime.spawn(run_sweeper(self.clone(), interval, shutdown_rx, passes.clone()));

        info!(interval = ?interval, path = %self.path().display(), "Sweeper started");

        Ok(SweeperHandle {
            shutdown_tx,
            task,
            passes,
        })
    }
}

async fn run_sweeper(
    store: KvStore,
    period: Duration,
    mut shutdown_rx: oneshot::Receiver<()>,
    passes: Arc<AtomicU64>,
) {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => {
                debug!("Sweeper received shutdown");
                break;
            },
            _ = interval.tick() => {
                match store.cleanup_async().await {
                    Ok(removed) => debug!(removed, "Sweep pass completed"),
                    Err(e) => warn!(error = %e, "Sweep pass failed"),
                }
                passes.fetch_add(1, Ordering::Relaxed);
            },
        }
    }
}
