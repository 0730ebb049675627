//! Session state machine for focusd
//!
//! This crate is the heart of focusd, containing:
//! - The timer state machine (Idle -> Running(mode) <-> Paused(mode))
//! - Wall-clock interval accounting that survives restarts and suspension
//! - Denylist blocking intent and re-synchronisation after failures
//! - Daily statistics with midnight rollover
//! - The task list and productivity score
//!
//! The controller performs no I/O besides its store. Side effects are
//! returned as [`CoreEvent`]s for the service to apply.

mod blocking;
mod engine;
mod events;
mod tasks;
mod timer;

pub use blocking::*;
pub use engine::*;
pub use events::*;
pub use tasks::*;
pub use timer::*;
