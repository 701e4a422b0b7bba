//! Ready-made leaf operations.

mod block;
mod delay;

pub use block::BlockOperation;
pub use delay::DelayOperation;
