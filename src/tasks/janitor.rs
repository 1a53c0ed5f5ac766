//! Expiration Janitor
//!
//! Background task that periodically sweeps expired cache entries.

use std::sync::Weak;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::{CacheError, Result};

/// Upper bound on how long [`Janitor::stop`] waits for the task to exit.
const STOP_GRACE: Duration = Duration::from_secs(1);

/// Owned handle to a running sweep task.
///
/// Call [`Janitor::stop`] to shut the task down and wait for it. Dropping the
/// handle signals and aborts the task without waiting.
#[derive(Debug)]
pub struct Janitor {
    interval: Duration,
    stop_tx: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl Janitor {
    /// Spawns a task on the current Tokio runtime that calls `sweep` every
    /// `interval`.
    ///
    /// The task only holds `target` weakly and exits on its own once the
    /// target has been dropped. `sweep` returns the number of removed entries.
    ///
    /// # Errors
    /// Returns [`CacheError::NoRuntime`] when called outside a Tokio runtime.
    pub fn spawn<T, F>(interval: Duration, target: Weak<T>, sweep: F) -> Result<Self>
    where
        T: Send + Sync + 'static,
        F: Fn(&T) -> usize + Send + 'static,
    {
        let runtime = Handle::try_current().map_err(|_| CacheError::NoRuntime)?;
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let handle = runtime.spawn(async move {
            info!("Starting cache janitor with interval of {:?}", interval);

            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = stop_rx.changed() => break,
                    _ = ticker.tick() => {
                        let Some(target) = target.upgrade() else {
                            debug!("Cache dropped, janitor exiting");
                            break;
                        };
                        let removed = sweep(target.as_ref());

                        if removed > 0 {
                            info!("Janitor sweep: removed {} expired entries", removed);
                        } else {
                            debug!("Janitor sweep: no expired entries found");
                        }
                    }
                }
            }

            info!("Cache janitor stopped");
        });

        Ok(Self {
            interval,
            stop_tx,
            handle: Some(handle),
        })
    }

    /// Tick period of the task.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns true once the task has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Signals the task to stop and waits for it to exit.
    ///
    /// Signalling never blocks. The wait is bounded; a task still running
    /// after the grace period is aborted.
    pub async fn stop(mut self) {
        let _ = self.stop_tx.send(true);

        let Some(mut handle) = self.handle.take() else {
            return;
        };
        match tokio::time::timeout(STOP_GRACE, &mut handle).await {
            Ok(_) => debug!("Janitor task joined"),
            Err(_) => {
                warn!("Janitor did not stop within {:?}, aborting", STOP_GRACE);
                handle.abort();
            }
        }
    }
}

impl Drop for Janitor {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.stop_tx.send(true);
            handle.abort();
        }
    }
}
