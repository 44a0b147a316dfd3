//! # Notification Jobs
//!
//! Periodic background sweeps over the notification store: retrying emails
//! that did not go out and pruning old read notifications.

/// Retry and cleanup sweeps plus the task loops that drive them.
pub mod scheduler;

pub use scheduler::*;
