//! Input entries carried by a pending decision.

use serde::{Deserialize, Serialize};

use crate::snapshot::StrategyKind;

/// A single `(strategy, input)` pair supplied by the caller.
///
/// The input list of a pending decision holds at most one entry per
/// strategy kind; re-setting a strategy replaces the prior value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Strategy kind this input feeds.
    pub strategy: StrategyKind,
    /// Raw input value.
    pub input: String,
}

impl Entry {
    /// Create a new entry.
    pub fn new(strategy: StrategyKind, input: impl Into<String>) -> Self {
        Self {
            strategy,
            input: input.into(),
        }
    }
}
