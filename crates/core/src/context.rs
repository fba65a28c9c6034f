//! Process-wide configuration for the Switcher client.

use std::time::Duration;

use crate::error::SwitcherError;

/// Environment used when the caller does not set one.
pub const DEFAULT_ENVIRONMENT: &str = "default";

const DEFAULT_REGEX_MAX_BLACKLISTED: usize = 100;
const DEFAULT_REGEX_MAX_TIME_LIMIT_MS: u64 = 3000;

/// Optional behavior switches for a [`Context`].
#[derive(Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct ContextOptions {
    /// Evaluate criteria from the local snapshot instead of the remote API.
    pub local: bool,
    /// Record every decision in the execution logger.
    pub logger: bool,
    /// Prevent background cache refresh when using throttle.
    pub freeze: bool,
    /// Restrict relay usage when operating locally.
    pub restrict_relay: bool,
    /// Directory holding `<environment>.json` snapshot files.
    pub snapshot_location: Option<String>,
    /// Interval for the snapshot auto-updater. `None` disables it.
    pub snapshot_auto_update_interval: Option<Duration>,
    /// Silent-mode duration string (`"5s"`, `"10m"`, `"1h"`). `None` disables
    /// the silent fallback.
    pub silent_mode: Option<String>,
    /// Maximum workers for throttle background refresh. Defaults to the host
    /// CPU count when `None`.
    pub throttle_max_workers: Option<usize>,
    /// Maximum number of blacklisted regex entries kept by the timed matcher.
    pub regex_max_black_list: usize,
    /// Hard wall-clock limit for a single regex match.
    pub regex_max_time_limit: Duration,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            local: false,
            logger: false,
            freeze: false,
            restrict_relay: true,
            snapshot_location: None,
            snapshot_auto_update_interval: None,
            silent_mode: None,
            throttle_max_workers: None,
            regex_max_black_list: DEFAULT_REGEX_MAX_BLACKLISTED,
            regex_max_time_limit: Duration::from_millis(DEFAULT_REGEX_MAX_TIME_LIMIT_MS),
        }
    }
}

impl ContextOptions {
    /// Evaluate criteria locally from the snapshot.
    #[must_use]
    pub fn with_local(mut self, local: bool) -> Self {
        self.local = local;
        self
    }

    /// Enable the execution logger.
    #[must_use]
    pub fn with_logger(mut self, logger: bool) -> Self {
        self.logger = logger;
        self
    }

    /// Freeze throttle background refresh.
    #[must_use]
    pub fn with_freeze(mut self, freeze: bool) -> Self {
        self.freeze = freeze;
        self
    }

    /// Restrict relay usage when operating locally.
    #[must_use]
    pub fn with_restrict_relay(mut self, restrict: bool) -> Self {
        self.restrict_relay = restrict;
        self
    }

    /// Set the snapshot file location.
    #[must_use]
    pub fn with_snapshot_location(mut self, location: impl Into<String>) -> Self {
        self.snapshot_location = Some(location.into());
        self
    }

    /// Enable snapshot auto-update on the given interval.
    #[must_use]
    pub fn with_snapshot_auto_update_interval(mut self, interval: Duration) -> Self {
        self.snapshot_auto_update_interval = Some(interval);
        self
    }

    /// Enable silent mode with a duration string such as `"5s"`.
    #[must_use]
    pub fn with_silent_mode(mut self, duration: impl Into<String>) -> Self {
        self.silent_mode = Some(duration.into());
        self
    }

    /// Bound the throttle background refresh pool.
    #[must_use]
    pub fn with_throttle_max_workers(mut self, workers: usize) -> Self {
        self.throttle_max_workers = Some(workers);
        self
    }

    /// Bound the regex blacklist size.
    #[must_use]
    pub fn with_regex_max_black_list(mut self, max: usize) -> Self {
        self.regex_max_black_list = max;
        self
    }

    /// Bound the regex match wall-clock time.
    #[must_use]
    pub fn with_regex_max_time_limit(mut self, limit: Duration) -> Self {
        self.regex_max_time_limit = limit;
        self
    }
}

/// Process-wide configuration built once by `Client::build_context`.
#[derive(Debug, Clone)]
pub struct Context {
    /// Domain name registered in the Switcher API.
    pub domain: String,
    /// Base URL of the Switcher API.
    pub url: String,
    /// API key generated for the application component.
    pub api_key: String,
    /// Application component name.
    pub component: String,
    /// Environment name.
    pub environment: String,
    /// Optional behavior switches.
    pub options: ContextOptions,
}

impl Context {
    /// Create a new context.
    pub fn new(
        domain: impl Into<String>,
        url: impl Into<String>,
        api_key: impl Into<String>,
        component: impl Into<String>,
        environment: impl Into<String>,
        options: ContextOptions,
    ) -> Self {
        let environment = environment.into();
        Self {
            domain: domain.into(),
            url: url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            component: component.into(),
            environment: if environment.is_empty() {
                DEFAULT_ENVIRONMENT.to_string()
            } else {
                environment
            },
            options,
        }
    }

    /// Verify the fields required for remote operation are present.
    ///
    /// # Errors
    ///
    /// Returns [`SwitcherError::ContextInvalid`] naming every missing field.
    pub fn validate(&self) -> Result<(), SwitcherError> {
        let mut missing = Vec::new();
        if self.url.is_empty() {
            missing.push("url");
        }
        if self.component.is_empty() {
            missing.push("component");
        }
        if self.api_key.is_empty() {
            missing.push("apiKey");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(SwitcherError::ContextInvalid(missing.join(", ")))
        }
    }
}
