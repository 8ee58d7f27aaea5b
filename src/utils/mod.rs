//! Utility functions and helpers
//!
//! Timestamp formatting and atomic file writes.

pub mod atomic;
pub mod time;

pub use atomic::{atomic_write, atomic_write_with, cleanup_temp_files};
pub use time::{current_timestamp_millis, now_rfc3339_millis};
