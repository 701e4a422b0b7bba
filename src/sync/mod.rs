//! Synchronization primitives shared by the scheduling core.

mod cell;
mod completion;

pub use cell::SyncCell;
pub use completion::CompletionGroup;
