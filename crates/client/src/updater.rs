//! Background snapshot auto-updater.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};
use tracing::{debug, error, info};

use switcher_core::error::SwitcherError;

/// Callback invoked after every update check with `(error, updated)`.
pub type UpdateCallback = Box<dyn Fn(Option<&SwitcherError>, bool) + Send + Sync>;

/// How long `terminate` waits for the worker to observe the stop signal
/// before aborting it.
const JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Handle to the single background update worker.
pub(crate) struct SnapshotUpdater {
    shutdown_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl SnapshotUpdater {
    /// Spawn the update worker. The first check runs one full `interval`
    /// after scheduling; errors are delivered to the callback and never
    /// stop the loop.
    pub(crate) fn schedule<F, Fut>(interval: Duration, check: F, callback: UpdateCallback) -> Self
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<bool, SwitcherError>> + Send + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        let handle = tokio::spawn(async move {
            info!(interval = ?interval, "snapshot auto-updater starting");
            let mut ticker = interval_at(Instant::now() + interval, interval);

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        debug!("snapshot auto-updater received shutdown signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        match check().await {
                            Ok(updated) => callback(None, updated),
                            Err(e) => {
                                error!(error = %e, "snapshot auto-update check failed");
                                callback(Some(&e), false);
                            }
                        }
                    }
                }
            }

            info!("snapshot auto-updater stopped");
        });

        Self {
            shutdown_tx,
            handle,
        }
    }

    /// Signal the worker to stop and join it with a bounded timeout; a
    /// straggler is aborted.
    pub(crate) async fn terminate(mut self) {
        let _ = self.shutdown_tx.send(()).await;
        if tokio::time::timeout(JOIN_TIMEOUT, &mut self.handle)
            .await
            .is_err()
        {
            debug!("snapshot auto-updater did not stop in time, aborting");
            self.handle.abort();
        }
    }
}
