//! Local rule engine for the Switcher client.
//!
//! Evaluates a switcher request against an in-memory snapshot: the
//! [`resolver`] walks the domain tree and the [`operation`] module applies
//! the strategy predicates. Regular-expression strategies are routed
//! through the [`TimedMatch`] guard, which bounds match time and
//! blacklists pathological pattern/input pairs.

pub mod network;
pub mod operation;
pub mod payload;
pub mod resolver;
pub mod timed_match;

pub use operation::evaluate;
pub use resolver::check_criteria;
pub use timed_match::TimedMatch;
