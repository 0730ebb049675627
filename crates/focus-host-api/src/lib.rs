//! Collaborator trait interfaces for focusd
//!
//! This crate defines the boundary between the session controller and the
//! platform pieces it drives: something that installs a domain denylist and
//! something that shows notifications. It contains no platform code itself.

mod mock;
mod traits;

pub use mock::*;
pub use traits::*;
