//! Core types shared by the Switcher client crates.
//!
//! This crate defines the process-wide [`Context`], the snapshot domain
//! model (`Domain` → `Group` → `Config` → strategies), the input
//! [`Entry`] pairs, decision [`ResultDetail`]s, and the shared
//! [`SwitcherError`] enum. It carries no I/O; the transport and rule
//! engine live in their own crates.

pub mod context;
pub mod duration;
pub mod entry;
pub mod error;
pub mod result;
pub mod snapshot;

pub use context::{Context, ContextOptions, DEFAULT_ENVIRONMENT};
pub use duration::parse_duration;
pub use entry::Entry;
pub use error::SwitcherError;
pub use result::ResultDetail;
pub use snapshot::{
    Config, Domain, Group, Operation, Relay, Snapshot, SnapshotDocument, StrategyConfig,
    StrategyKind,
};
