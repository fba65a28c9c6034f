//! Snapshot domain model.
//!
//! A snapshot is an immutable image of a feature-flag domain: a `Domain`
//! holds groups, groups hold configs, configs hold strategies and an
//! optional relay. Snapshots are parsed from the `{data: {domain: ...}}`
//! JSON envelope used by both the snapshot file format and the GraphQL
//! resolve response, and are replaced wholesale on refresh.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Strategy kinds attached to a config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyKind {
    /// Plain value membership.
    #[serde(rename = "VALUE_VALIDATION")]
    Value,
    /// Floating-point comparisons.
    #[serde(rename = "NUMERIC_VALIDATION")]
    Numeric,
    /// Date comparisons (`YYYY-MM-DD` or `YYYY-MM-DDTHH:MM`).
    #[serde(rename = "DATE_VALIDATION")]
    Date,
    /// Time-of-day comparisons (`HH:MM`).
    #[serde(rename = "TIME_VALIDATION")]
    Time,
    /// JSON payload shape checks.
    #[serde(rename = "PAYLOAD_VALIDATION")]
    Payload,
    /// IPv4 address / CIDR membership.
    #[serde(rename = "NETWORK_VALIDATION")]
    Network,
    /// Regular expression matching.
    #[serde(rename = "REGEX_VALIDATION")]
    Regex,
}

impl StrategyKind {
    /// Wire name of the strategy, as carried by snapshots and the API.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Value => "VALUE_VALIDATION",
            Self::Numeric => "NUMERIC_VALIDATION",
            Self::Date => "DATE_VALIDATION",
            Self::Time => "TIME_VALIDATION",
            Self::Payload => "PAYLOAD_VALIDATION",
            Self::Network => "NETWORK_VALIDATION",
            Self::Regex => "REGEX_VALIDATION",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operations a strategy can apply to its values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    Exist,
    NotExist,
    Equal,
    NotEqual,
    Greater,
    Lower,
    Between,
    HasOne,
    HasAll,
}

/// A single strategy attached to a config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Strategy kind.
    pub strategy: StrategyKind,
    /// Whether this strategy participates in resolution.
    #[serde(default)]
    pub activated: bool,
    /// Operation applied against `values`.
    #[serde(default)]
    pub operation: Option<Operation>,
    /// Operand values, interpreted per strategy kind.
    #[serde(default)]
    pub values: Vec<String>,
}

/// Relay attached to a config. Carried for completeness; resolution does
/// not consult it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relay {
    /// Relay type.
    #[serde(default, rename = "type")]
    pub relay_type: String,
    /// Whether the relay is active.
    #[serde(default)]
    pub activated: bool,
}

/// A named feature flag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Switcher key. Unique across all groups within a domain.
    #[serde(default)]
    pub key: String,
    /// Whether the config is enabled.
    #[serde(default)]
    pub activated: bool,
    /// Strategies that must all agree for the config to be on.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub strategies: Vec<StrategyConfig>,
    /// Optional relay forwarding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relay: Option<Relay>,
    /// Components registered to this config.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<String>,
}

/// A group of configs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Group {
    /// Group name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Whether the group is enabled.
    #[serde(default)]
    pub activated: bool,
    /// Configs in this group.
    #[serde(default, rename = "config", skip_serializing_if = "Vec::is_empty")]
    pub configs: Vec<Config>,
}

/// The root of the feature-flag taxonomy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Domain {
    /// Domain name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Monotonically increasing snapshot version.
    #[serde(default)]
    pub version: i64,
    /// Whether the domain is enabled.
    #[serde(default)]
    pub activated: bool,
    /// Groups in this domain.
    #[serde(default, rename = "group", skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<Group>,
}

/// The `{data: {domain: ...}}` envelope used by snapshot files and the
/// GraphQL resolve response. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotDocument {
    /// Document payload.
    #[serde(default)]
    pub data: SnapshotData,
}

/// Payload of a [`SnapshotDocument`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotData {
    /// The domain tree.
    #[serde(default)]
    pub domain: Domain,
}

/// An immutable in-memory image of a domain.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// The domain tree.
    pub domain: Domain,
}

impl Snapshot {
    /// Build a snapshot from a parsed document.
    pub fn from_document(document: SnapshotDocument) -> Self {
        Self {
            domain: document.data.domain,
        }
    }

    /// Re-wrap the snapshot into its serializable envelope.
    pub fn to_document(&self) -> SnapshotDocument {
        SnapshotDocument {
            data: SnapshotData {
                domain: self.domain.clone(),
            },
        }
    }

    /// Snapshot version, 0 for the placeholder snapshot.
    pub fn version(&self) -> i64 {
        self.domain.version
    }
}
