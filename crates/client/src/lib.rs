//! Switcher API client
//!
//! A Rust client for the Switcher feature-flag service. Decisions are
//! evaluated remotely over the authenticated criteria API or locally
//! against a cached snapshot of the domain, with silent-mode degradation,
//! decision throttling, and background snapshot auto-update.
//!
//! # Quick Start
//!
//! ```no_run
//! use switcher_client::{Client, Context, ContextOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), switcher_client::SwitcherError> {
//!     let client = Client::build_context(Context::new(
//!         "Playground",
//!         "https://api.switcherapi.com",
//!         "[API_KEY]",
//!         "switcher-playground",
//!         "default",
//!         ContextOptions::default(),
//!     ))?;
//!
//!     let mut switcher = client.switcher("FF2FOR2020");
//!     if switcher.check_value("Japan").is_on().await? {
//!         println!("feature is on");
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Local mode
//!
//! With `ContextOptions::with_local(true)` and a snapshot loaded via
//! [`Client::load_snapshot`], decisions are computed by the embedded rule
//! engine without touching the network. Remote contexts fall back to the
//! same local path while silent mode is active.

mod auth;
mod logger;
mod remote;
mod snapshot_loader;
mod switcher;
mod updater;

pub use logger::{ExecutionEntry, ExecutionLogger};
pub use snapshot_loader::{load_domain, save_snapshot};
pub use switcher::Switcher;
pub use updater::UpdateCallback;

pub use switcher_core::context::{Context, ContextOptions, DEFAULT_ENVIRONMENT};
pub use switcher_core::entry::Entry;
pub use switcher_core::error::SwitcherError;
pub use switcher_core::result::ResultDetail;
pub use switcher_core::snapshot::{Snapshot, StrategyKind};

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, RwLock};
use std::thread;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{info, warn};

use switcher_core::duration::parse_duration;
use switcher_rules::TimedMatch;

use crate::auth::Auth;
use crate::remote::Remote;
use crate::updater::SnapshotUpdater;

/// Options for [`Client::load_snapshot`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadSnapshotOptions {
    /// Fetch from the remote API when the loaded file carries version 0,
    /// even for local-only contexts.
    pub fetch_remote: bool,
}

/// Shared state owned by a [`Client`] and referenced by every
/// [`Switcher`] handle and background task.
pub(crate) struct ClientCore {
    pub(crate) context: Context,
    pub(crate) remote: Remote,
    pub(crate) auth: Auth,
    pub(crate) snapshot: RwLock<Option<Arc<Snapshot>>>,
    pub(crate) logger: ExecutionLogger,
    pub(crate) matcher: TimedMatch,
    pub(crate) refresh_permits: Arc<Semaphore>,
    updater: Mutex<Option<SnapshotUpdater>>,
}

impl ClientCore {
    pub(crate) fn current_snapshot(&self) -> Option<Arc<Snapshot>> {
        self.snapshot.read().expect("snapshot lock poisoned").clone()
    }

    pub(crate) fn snapshot_version(&self) -> i64 {
        self.current_snapshot().map_or(0, |s| s.version())
    }

    fn store_snapshot(&self, snapshot: Arc<Snapshot>) {
        *self.snapshot.write().expect("snapshot lock poisoned") = Some(snapshot);
    }

    /// Check the snapshot version against the service and swap in a new
    /// tree when stale. Returns `true` when an update was applied.
    pub(crate) async fn check_snapshot(&self) -> Result<bool, SwitcherError> {
        let token = self.ensure_snapshot_token().await?;

        if self
            .remote
            .check_snapshot_version(&token, self.snapshot_version())
            .await?
        {
            return Ok(false);
        }

        let snapshot = Arc::new(self.remote.resolve_snapshot(&token).await?);
        self.store_snapshot(Arc::clone(&snapshot));
        info!(version = snapshot.version(), "snapshot updated");

        // Best-effort persistence, after the in-memory swap.
        if let Some(location) = &self.context.options.snapshot_location
            && let Err(error) = save_snapshot(&snapshot, location, &self.context.environment)
        {
            warn!(error = %error, "failed to persist the updated snapshot");
        }

        Ok(true)
    }

    async fn ensure_snapshot_token(&self) -> Result<String, SwitcherError> {
        if let Some(token) = self.auth.bearer_token() {
            return Ok(token);
        }
        let (token, exp) = self.remote.auth().await?;
        self.auth.set_token(token.clone(), exp);
        Ok(token)
    }
}

/// Entry point to the Switcher client.
///
/// Owns the process-wide state: context, snapshot store, auth cell,
/// execution logger, regex guard, and background workers. Cheap to share
/// through the handles it produces; build it once per process.
pub struct Client {
    core: Arc<ClientCore>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").finish_non_exhaustive()
    }
}

impl Client {
    /// Build the client for the given context, replacing any prior one
    /// the caller held.
    ///
    /// Validates the silent-mode duration string and, when
    /// `snapshot_auto_update_interval` is set, schedules the auto-updater
    /// (requires a running Tokio runtime).
    ///
    /// # Errors
    ///
    /// [`SwitcherError::InvalidInput`] for a malformed silent-mode
    /// duration; [`SwitcherError::Connection`] when the HTTP client cannot
    /// be constructed.
    pub fn build_context(context: Context) -> Result<Self, SwitcherError> {
        let silent_window = context
            .options
            .silent_mode
            .as_deref()
            .map(parse_duration)
            .transpose()?;

        let remote = Remote::new(&context)?;
        let matcher = TimedMatch::new(
            context.options.regex_max_black_list,
            context.options.regex_max_time_limit,
        );
        let workers = context.options.throttle_max_workers.unwrap_or_else(|| {
            thread::available_parallelism().map_or(1, NonZeroUsize::get)
        });

        let client = Self {
            core: Arc::new(ClientCore {
                remote,
                auth: Auth::new(silent_window),
                snapshot: RwLock::new(None),
                logger: ExecutionLogger::default(),
                matcher,
                refresh_permits: Arc::new(Semaphore::new(workers)),
                updater: Mutex::new(None),
                context,
            }),
        };

        if let Some(interval) = client.core.context.options.snapshot_auto_update_interval {
            client.schedule_snapshot_auto_update(Some(interval), None);
        }

        Ok(client)
    }

    /// Get a switcher handle for a key.
    pub fn switcher(&self, key: impl Into<String>) -> Switcher {
        Switcher::new(Arc::clone(&self.core), key.into())
    }

    /// Load the domain snapshot from the configured location, consulting
    /// the remote API when the file is absent or stale (version 0) and
    /// the context allows it. Returns the loaded snapshot version.
    pub async fn load_snapshot(&self, options: LoadSnapshotOptions) -> Result<i64, SwitcherError> {
        let location = self
            .core
            .context
            .options
            .snapshot_location
            .clone()
            .unwrap_or_default();

        let snapshot = load_domain(&location, &self.core.context.environment)?;
        self.core.store_snapshot(Arc::new(snapshot));

        if self.core.snapshot_version() == 0
            && (options.fetch_remote || !self.core.context.options.local)
        {
            self.core.check_snapshot().await?;
        }

        Ok(self.core.snapshot_version())
    }

    /// Verify the current snapshot against the service and swap in a new
    /// one when stale. Returns `true` when an update was applied.
    pub async fn check_snapshot(&self) -> Result<bool, SwitcherError> {
        self.core.check_snapshot().await
    }

    /// Schedule the periodic snapshot auto-update, replacing any prior
    /// worker. `interval` falls back to the context option; without
    /// either this is a no-op. The callback receives `(error, updated)`
    /// after every check.
    pub fn schedule_snapshot_auto_update(
        &self,
        interval: Option<Duration>,
        callback: Option<UpdateCallback>,
    ) {
        let Some(interval) =
            interval.or(self.core.context.options.snapshot_auto_update_interval)
        else {
            return;
        };
        if interval.is_zero() {
            return;
        }

        let weak = Arc::downgrade(&self.core);
        let check = move || {
            let weak = weak.clone();
            async move {
                match weak.upgrade() {
                    Some(core) => core.check_snapshot().await,
                    None => Ok(false),
                }
            }
        };
        let callback = callback.unwrap_or_else(|| Box::new(|_, _| {}));

        let updater = SnapshotUpdater::schedule(interval, check, callback);
        let prior = self
            .core
            .updater
            .lock()
            .expect("updater lock poisoned")
            .replace(updater);
        if let Some(prior) = prior {
            tokio::spawn(prior.terminate());
        }
    }

    /// Stop the snapshot auto-updater, if one is running.
    pub async fn terminate_snapshot_auto_update(&self) {
        let prior = self
            .core
            .updater
            .lock()
            .expect("updater lock poisoned")
            .take();
        if let Some(updater) = prior {
            updater.terminate().await;
        }
    }

    /// Version of the currently loaded snapshot, 0 when none is loaded.
    pub fn snapshot_version(&self) -> i64 {
        self.core.snapshot_version()
    }

    /// Retrieve the logged execution matching a switcher's key and
    /// inputs, or an empty placeholder.
    pub fn get_execution(&self, switcher: &Switcher) -> ExecutionEntry {
        self.core
            .logger
            .get_execution(switcher.key(), switcher.entries())
    }

    /// All logged executions for a key.
    pub fn get_executions_by_key(&self, key: &str) -> Vec<ExecutionEntry> {
        self.core.logger.get_by_key(key)
    }

    /// Drop every logged execution (and with it the throttle cache).
    pub fn clear_logger(&self) {
        self.core.logger.clear();
    }

    /// Subscribe to asynchronous, non-fatal errors (silent-mode and
    /// default-result fallbacks, background refresh failures). A single
    /// subscriber is held; subscribing again replaces it.
    pub fn subscribe_notify_error(
        &self,
        callback: impl Fn(&SwitcherError) + Send + Sync + 'static,
    ) {
        self.core.logger.subscribe_error(Box::new(callback));
    }

    /// Tear down background workers and caches: the auto-updater, the
    /// execution log, the snapshot store, the auth state, and the regex
    /// worker.
    pub async fn clear_resources(&self) {
        self.terminate_snapshot_auto_update().await;
        self.core.logger.clear();
        *self.core.snapshot.write().expect("snapshot lock poisoned") = None;
        self.core.auth.init();
        self.core.matcher.clear_blacklist();
        self.core.matcher.shutdown().await;
    }
}
