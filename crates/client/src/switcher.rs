//! Caller-facing switcher handle and the decision path.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::warn;

use switcher_core::entry::Entry;
use switcher_core::error::SwitcherError;
use switcher_core::result::ResultDetail;
use switcher_core::snapshot::StrategyKind;
use switcher_rules::check_criteria;

use crate::ClientCore;
use crate::auth::{Token, is_expired};

/// A per-call handle for evaluating one switcher key.
///
/// Built by [`Client::switcher`](crate::Client::switcher). Input builders
/// are chainable and each replaces any prior entry of the same strategy
/// kind:
///
/// ```no_run
/// # async fn example(client: &switcher_client::Client) -> Result<(), switcher_client::SwitcherError> {
/// let mut switcher = client.switcher("FF2FOR2020");
/// let enabled = switcher
///     .check_value("Japan")
///     .check_network("10.0.0.3")
///     .is_on()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct Switcher {
    core: Arc<ClientCore>,
    key: String,
    entries: Vec<Entry>,
    throttle_period: Duration,
    next_refresh: Instant,
    default_result: Option<bool>,
    restrict_relay: bool,
}

impl Switcher {
    pub(crate) fn new(core: Arc<ClientCore>, key: String) -> Self {
        let restrict_relay = core.context.options.restrict_relay;
        Self {
            core,
            key,
            entries: Vec::new(),
            throttle_period: Duration::ZERO,
            next_refresh: Instant::now(),
            default_result: None,
            restrict_relay,
        }
    }

    /// Point the handle at another key, keeping its inputs and settings.
    pub fn prepare(&mut self, key: impl Into<String>) -> &mut Self {
        self.key = key.into();
        self
    }

    /// Validate the handle before execution.
    ///
    /// # Errors
    ///
    /// [`SwitcherError::InvalidInput`] when no key was set.
    pub fn check(&self) -> Result<(), SwitcherError> {
        if self.key.is_empty() {
            return Err(SwitcherError::InvalidInput("missing key field".to_string()));
        }
        Ok(())
    }

    /// Key this handle evaluates.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Inputs accumulated by the `check_*` builders.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    // -- Input builders ---------------------------------------------------

    /// Provide input for `VALUE_VALIDATION` strategies.
    pub fn check_value(&mut self, input: impl Into<String>) -> &mut Self {
        self.set_entry(StrategyKind::Value, input.into())
    }

    /// Provide input for `NUMERIC_VALIDATION` strategies.
    pub fn check_numeric(&mut self, input: impl Into<String>) -> &mut Self {
        self.set_entry(StrategyKind::Numeric, input.into())
    }

    /// Provide input for `DATE_VALIDATION` strategies.
    pub fn check_date(&mut self, input: impl Into<String>) -> &mut Self {
        self.set_entry(StrategyKind::Date, input.into())
    }

    /// Provide input for `TIME_VALIDATION` strategies.
    pub fn check_time(&mut self, input: impl Into<String>) -> &mut Self {
        self.set_entry(StrategyKind::Time, input.into())
    }

    /// Provide input for `NETWORK_VALIDATION` strategies.
    pub fn check_network(&mut self, input: impl Into<String>) -> &mut Self {
        self.set_entry(StrategyKind::Network, input.into())
    }

    /// Provide input for `REGEX_VALIDATION` strategies.
    pub fn check_regex(&mut self, input: impl Into<String>) -> &mut Self {
        self.set_entry(StrategyKind::Regex, input.into())
    }

    /// Provide a raw JSON string for `PAYLOAD_VALIDATION` strategies.
    pub fn check_payload(&mut self, payload: impl Into<String>) -> &mut Self {
        self.set_entry(StrategyKind::Payload, payload.into())
    }

    /// Provide a JSON value for `PAYLOAD_VALIDATION` strategies,
    /// serializing it for the caller.
    pub fn check_payload_value(&mut self, payload: &serde_json::Value) -> &mut Self {
        self.set_entry(StrategyKind::Payload, payload.to_string())
    }

    fn set_entry(&mut self, strategy: StrategyKind, input: String) -> &mut Self {
        self.entries.retain(|e| e.strategy != strategy);
        self.entries.push(Entry::new(strategy, input));
        self
    }

    // -- Behavior switches ------------------------------------------------

    /// Cache decisions for `period`: calls within the period return the
    /// last known result while a background refresh keeps it current.
    /// Implies execution logging for this handle.
    pub fn throttle(&mut self, period: Duration) -> &mut Self {
        self.throttle_period = period;
        self
    }

    /// Result returned when the decision fails instead of surfacing the
    /// error.
    pub fn default_result(&mut self, result: bool) -> &mut Self {
        self.default_result = Some(result);
        self
    }

    /// Override the context-level relay restriction for this handle.
    /// Relay configurations are informational; evaluation is unaffected.
    pub fn restrict_relay(&mut self, restrict: bool) -> &mut Self {
        self.restrict_relay = restrict;
        self
    }

    /// Whether relay usage is restricted for this handle.
    pub fn is_relay_restricted(&self) -> bool {
        self.restrict_relay
    }

    // -- Decision path ----------------------------------------------------

    /// Evaluate the switcher.
    pub async fn is_on(&mut self) -> Result<bool, SwitcherError> {
        Ok(self.execute(false).await?.result)
    }

    /// Evaluate the switcher, returning the full result detail.
    pub async fn is_on_with_details(&mut self) -> Result<ResultDetail, SwitcherError> {
        self.execute(true).await
    }

    async fn execute(&mut self, show_details: bool) -> Result<ResultDetail, SwitcherError> {
        self.check()?;

        if !self.throttle_period.is_zero()
            && let Some(cached) = self.core.logger.get(&self.key, &self.entries)
        {
            if !self.core.context.options.freeze {
                self.schedule_background_refresh(show_details);
            }
            return Ok(cached.response);
        }

        let detail = match submit(&self.core, &self.key, &self.entries, show_details).await {
            Ok(detail) => detail,
            Err(error) => {
                let Some(default) = self.default_result else {
                    return Err(error);
                };
                warn!(error = %error, default, "decision failed, returning default result");
                self.core.logger.notify_error(&error);
                ResultDetail {
                    result: default,
                    reason: Some("Default result".to_string()),
                    metadata: None,
                }
            }
        };

        if !self.throttle_period.is_zero() {
            self.next_refresh = Instant::now() + self.throttle_period;
        }
        if (self.core.context.options.logger || !self.throttle_period.is_zero())
            && !self.key.is_empty()
        {
            self.core.logger.add(&detail, &self.key, &self.entries);
        }

        Ok(detail)
    }

    /// Submit a refresh to the bounded worker pool once the throttle
    /// period has elapsed. Does nothing while the period is still
    /// running.
    fn schedule_background_refresh(&mut self, show_details: bool) {
        let now = Instant::now();
        if now < self.next_refresh {
            return;
        }
        self.next_refresh = now + self.throttle_period;

        let core = Arc::clone(&self.core);
        let permits = Arc::clone(&self.core.refresh_permits);
        let key = self.key.clone();
        let entries = self.entries.clone();

        tokio::spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            match submit(&core, &key, &entries, show_details).await {
                Ok(detail) => core.logger.add(&detail, &key, &entries),
                Err(error) => {
                    warn!(error = %error, key, "throttled background refresh failed");
                    core.logger.notify_error(&error);
                }
            }
        });
    }
}

enum Mode {
    Remote(String),
    Local,
}

/// Run one decision: local snapshot or authenticated remote call, with
/// the silent-mode fallback applied to remote failures.
pub(crate) async fn submit(
    core: &ClientCore,
    key: &str,
    entries: &[Entry],
    show_details: bool,
) -> Result<ResultDetail, SwitcherError> {
    if core.context.options.local {
        return resolve_local(core, key, entries).await;
    }

    core.context.validate()?;

    match ensure_mode(core).await? {
        Mode::Local => resolve_local(core, key, entries).await,
        Mode::Remote(token) => {
            match core
                .remote
                .check_criteria(&token, key, entries, show_details)
                .await
            {
                Ok(detail) => Ok(detail),
                Err(error) if error.is_remote() && core.auth.silent_mode_configured() => {
                    warn!(error = %error, key, "remote criteria failed, switching to silent mode");
                    core.logger.notify_error(&error);
                    core.auth.arm_silent();
                    resolve_local(core, key, entries).await
                }
                Err(error) => Err(error),
            }
        }
    }
}

/// Decide whether this call goes remote (with which token) or local.
async fn ensure_mode(core: &ClientCore) -> Result<Mode, SwitcherError> {
    match core.auth.state() {
        Token::Valid { token, exp } if !is_expired(exp) => Ok(Mode::Remote(token)),
        Token::Silent { until } if Instant::now() < until => Ok(Mode::Local),
        Token::Silent { .. } => {
            // Window elapsed: only a healthy service is worth a new auth.
            if core.remote.check_health().await {
                core.auth.init();
                authenticate(core).await
            } else {
                core.auth.arm_silent();
                Ok(Mode::Local)
            }
        }
        Token::Missing | Token::Valid { .. } => authenticate(core).await,
    }
}

async fn authenticate(core: &ClientCore) -> Result<Mode, SwitcherError> {
    match core.remote.auth().await {
        Ok((token, exp)) => {
            core.auth.set_token(token.clone(), exp);
            Ok(Mode::Remote(token))
        }
        Err(error) if error.is_remote() && core.auth.silent_mode_configured() => {
            warn!(error = %error, "authentication failed, switching to silent mode");
            core.logger.notify_error(&error);
            core.auth.arm_silent();
            Ok(Mode::Local)
        }
        Err(error) => Err(error),
    }
}

async fn resolve_local(
    core: &ClientCore,
    key: &str,
    entries: &[Entry],
) -> Result<ResultDetail, SwitcherError> {
    let snapshot = core.current_snapshot();
    check_criteria(snapshot.as_deref(), key, entries, &core.matcher).await
}
