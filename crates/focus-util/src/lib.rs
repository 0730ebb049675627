//! Shared utilities for focusd
//!
//! This crate provides:
//! - ID types (ClientId, TaskId)
//! - Wall-clock helpers with debug-build mock time
//! - Countdown and focus-time formatting
//! - Default paths for socket, data, config and log directories

mod ids;
mod paths;
mod time;

pub use ids::*;
pub use paths::*;
pub use time::*;
