//! # Simple logging observer for debugging and demos.
//!
//! [`LogObserver`] prints lifecycle events to stdout in a human-readable
//! format. Enabled via the `logging` feature; primarily useful for
//! development and examples.
//!
//! ## Output format
//! ```text
//! [started] op=0x55cbbc21f230
//! [produced] op=0x55cbbc21f230 new=0x55cbbc220410
//! [finished] op=0x55cbbc21f230 cancelled=false errors=0
//! ```

use std::sync::Arc;

use crate::core::Operation;
use crate::error::OperationError;
use crate::observers::Observer;

/// Simple stdout logging observer.
///
/// Not intended for production use - implement a custom [`Observer`] for
/// structured logging or metrics collection.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl Observer for LogObserver {
    fn on_start(&self, operation: &Arc<Operation>) {
        println!("[started] op={:#x}", operation.id());
    }

    fn on_produce(&self, operation: &Arc<Operation>, produced: &Arc<Operation>) {
        println!(
            "[produced] op={:#x} new={:#x}",
            operation.id(),
            produced.id()
        );
    }

    fn on_finish(&self, operation: &Arc<Operation>, cancelled: bool, errors: &[OperationError]) {
        println!(
            "[finished] op={:#x} cancelled={cancelled} errors={}",
            operation.id(),
            errors.len()
        );
        for error in errors {
            println!("[finished]   {}: {}", error.as_label(), error.as_message());
        }
    }
}
