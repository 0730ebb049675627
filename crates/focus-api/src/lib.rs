//! Protocol types for focusd
//!
//! This crate defines the stable contract between the service and every
//! observer (CLI, browser bridge, status bar):
//! - Commands (requests from observers) and responses
//! - Push events (service -> observers)
//! - The persisted shapes: settings, session state, daily stats, tasks
//! - Domain normalisation and denylist matching
//! - Versioning

mod commands;
mod domain;
mod events;
mod settings;
mod types;

pub use commands::*;
pub use domain::*;
pub use events::*;
pub use settings::*;
pub use types::*;

/// Current API version
pub const API_VERSION: u32 = 1;
