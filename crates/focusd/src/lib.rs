//! focusd service internals
//!
//! [`Daemon`] owns the session controller and applies its side effects to
//! the enforcer, the notifier and subscribed observers. The binary wires it
//! to the IPC server, the tick timer and signal handling.

mod daemon;

pub use daemon::*;
