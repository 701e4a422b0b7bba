//! Conditions: pluggable gates evaluated before an operation runs.

mod condition;
mod mutually_exclusive;
mod negated;
mod no_cancelled_dependencies;
mod no_failed_dependencies;
mod silent;

pub use condition::{Condition, ConditionResult};
pub use mutually_exclusive::MutuallyExclusive;
pub use negated::NegatedCondition;
pub use no_cancelled_dependencies::NoCancelledDependencies;
pub use no_failed_dependencies::NoFailedDependencies;
pub use silent::SilentCondition;
