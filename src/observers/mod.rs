//! Observers: passive listeners for operation lifecycle events.

mod block;
mod observer;
mod timeout;

pub use block::BlockObserver;
pub use observer::Observer;
pub use timeout::TimeoutObserver;

#[cfg(feature = "logging")]
mod log;
#[cfg(feature = "logging")]
pub use log::LogObserver;
