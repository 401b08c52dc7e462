//! Global log stream instances.
//!
//! One stream per producer context, one drain.

use crate::logging::LogStream;

/// Log stream for the WSPR task (scheduler transitions, symbols, faults).
pub static TASK_LOG_STREAM: LogStream = LogStream::new();

/// Log stream for interrupt-side producers (timer and alarm callbacks,
/// GPS collaborator).
pub static ISR_LOG_STREAM: LogStream = LogStream::new();
