//! Core events emitted by the controller

use focus_api::{DailyStats, Notification, Settings, Task, TimerMode};
use std::collections::BTreeSet;

/// What the enforcer should have installed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnforcementRequest {
    Install(BTreeSet<String>),
    Clear,
}

/// Events emitted by the controller.
///
/// `Enforce` and `Notify` are side effects for the service to carry out;
/// the rest are state changes to broadcast to observers.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreEvent {
    /// Countdown moved
    Tick {
        mode: TimerMode,
        remaining_seconds: u64,
    },

    /// Interval kind or run state changed
    ModeChanged {
        mode: TimerMode,
        running: bool,
        paused: bool,
        sessions_completed: u32,
        remaining_seconds: u64,
    },

    /// Blocking turned on/off or its domain set changed
    BlockingChanged {
        active: bool,
        domains: BTreeSet<String>,
    },

    StatsChanged(DailyStats),

    SettingsChanged(Settings),

    TasksChanged(Vec<Task>),

    /// Several parts changed at once (import, reset); observers should
    /// re-pull the snapshot
    StateReplaced,

    /// Bring the enforcer in line with the blocking intent
    Enforce(EnforcementRequest),

    /// Show a notification
    Notify(Notification),
}
