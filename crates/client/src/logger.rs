//! In-memory log of recent decisions.
//!
//! The logger keeps the latest result for each `(key, input)` pair. It
//! doubles as the throttle decision cache: entries are stored with
//! `cached: true` metadata so throttled callers can tell a cache hit from
//! a fresh evaluation. It also hosts the asynchronous error subscription
//! point used by silent-mode and default-result fallbacks.

use std::sync::Mutex;

use serde_json::Value;
use tracing::debug;

use switcher_core::entry::Entry;
use switcher_core::error::SwitcherError;
use switcher_core::result::ResultDetail;

type ErrorCallback = Box<dyn Fn(&SwitcherError) + Send + Sync>;

/// A logged execution.
#[derive(Debug, Clone, Default)]
pub struct ExecutionEntry {
    /// Switcher key.
    pub key: String,
    /// Inputs the decision was made with.
    pub input: Vec<Entry>,
    /// The recorded result, with `cached: true` metadata.
    pub response: ResultDetail,
}

/// Keeps track of the latest execution results.
#[derive(Default)]
pub struct ExecutionLogger {
    entries: Mutex<Vec<ExecutionEntry>>,
    on_error: Mutex<Option<ErrorCallback>>,
}

impl ExecutionLogger {
    /// Record a result for `(key, input)`, replacing any prior entry for
    /// the same pair. The stored metadata is extended with `cached: true`.
    pub fn add(&self, response: &ResultDetail, key: &str, input: &[Entry]) {
        let mut metadata = response.metadata.clone().unwrap_or_default();
        metadata.insert("cached".to_string(), Value::Bool(true));

        let entry = ExecutionEntry {
            key: key.to_string(),
            input: input.to_vec(),
            response: ResultDetail {
                result: response.result,
                reason: response.reason.clone(),
                metadata: Some(metadata),
            },
        };

        let mut entries = self.entries.lock().expect("logger lock poisoned");
        entries.retain(|log| !has_execution(log, key, input));
        entries.push(entry);
    }

    /// Retrieve the entry for `(key, input)`, if one was recorded.
    pub fn get(&self, key: &str, input: &[Entry]) -> Option<ExecutionEntry> {
        self.entries
            .lock()
            .expect("logger lock poisoned")
            .iter()
            .find(|log| has_execution(log, key, input))
            .cloned()
    }

    /// Retrieve the entry for `(key, input)` or an empty placeholder.
    pub fn get_execution(&self, key: &str, input: &[Entry]) -> ExecutionEntry {
        self.get(key, input).unwrap_or_default()
    }

    /// All entries recorded for a key.
    pub fn get_by_key(&self, key: &str) -> Vec<ExecutionEntry> {
        self.entries
            .lock()
            .expect("logger lock poisoned")
            .iter()
            .filter(|log| log.key == key)
            .cloned()
            .collect()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.lock().expect("logger lock poisoned").clear();
    }

    /// Install the single error subscriber, replacing any prior one.
    pub fn subscribe_error(&self, callback: ErrorCallback) {
        *self.on_error.lock().expect("logger lock poisoned") = Some(callback);
    }

    /// Deliver a non-fatal error to the subscriber, if any.
    pub fn notify_error(&self, error: &SwitcherError) {
        debug!(error = %error, "notifying error subscriber");
        if let Some(callback) = self.on_error.lock().expect("logger lock poisoned").as_ref() {
            callback(error);
        }
    }
}

/// An entry matches when the key is equal and every logged `(strategy,
/// input)` pair appears in the query inputs. Empty logged inputs require
/// empty query inputs.
fn has_execution(log: &ExecutionEntry, key: &str, input: &[Entry]) -> bool {
    log.key == key && inputs_match(&log.input, input)
}

fn inputs_match(logged: &[Entry], query: &[Entry]) -> bool {
    if logged.is_empty() {
        return query.is_empty();
    }
    logged.iter().all(|entry| query.contains(entry))
}
