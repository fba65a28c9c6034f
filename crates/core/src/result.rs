//! Decision results.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Outcome of a criteria evaluation, local or remote.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultDetail {
    /// Whether the switcher is on.
    pub result: bool,
    /// Reason for the outcome, when details were requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Additional metadata; the execution logger extends this with
    /// `cached: true` for entries served from the cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl ResultDetail {
    /// A successful (enabled) outcome.
    pub fn success() -> Self {
        Self {
            result: true,
            reason: Some("Success".to_string()),
            metadata: None,
        }
    }

    /// A disabled outcome with the given reason.
    pub fn disabled(reason: impl Into<String>) -> Self {
        Self {
            result: false,
            reason: Some(reason.into()),
            metadata: None,
        }
    }

    /// Returns `true` when the metadata carries `cached: true`.
    pub fn is_cached(&self) -> bool {
        self.metadata
            .as_ref()
            .and_then(|m| m.get("cached"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}
