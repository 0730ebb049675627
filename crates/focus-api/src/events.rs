//! Event types for focusd -> observer streaming

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::{DailyStats, Settings, StateSnapshot, Task, TimerMode, API_VERSION};

/// Event envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub api_version: u32,
    pub timestamp: DateTime<Local>,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            api_version: API_VERSION,
            timestamp: focus_util::now(),
            payload,
        }
    }
}

/// All possible events from the service to observers.
///
/// Delivery is best effort: observers that are not listening, or that fall
/// behind, miss events and should re-pull the snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// Countdown moved
    Tick {
        mode: TimerMode,
        remaining_seconds: u64,
    },

    /// Interval kind changed, or the timer started/stopped
    ModeChanged {
        mode: TimerMode,
        running: bool,
        paused: bool,
        sessions_completed: u32,
        remaining_seconds: u64,
    },

    /// Denylist enforcement turned on/off or changed domains
    BlockingChanged {
        active: bool,
        domains: BTreeSet<String>,
    },

    StatsChanged(DailyStats),

    SettingsChanged(Settings),

    TasksChanged { tasks: Vec<Task> },

    /// Full state snapshot, sent after an import replaces state
    StateChanged(StateSnapshot),

    /// Service is shutting down
    Shutdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serialization() {
        let event = Event::new(EventPayload::Tick {
            mode: TimerMode::Work,
            remaining_seconds: 1499,
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"tick""#));

        let parsed: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.api_version, API_VERSION);
        assert!(matches!(
            parsed.payload,
            EventPayload::Tick { remaining_seconds: 1499, .. }
        ));
    }

    #[test]
    fn blocking_event_serialization() {
        let event = Event::new(EventPayload::BlockingChanged {
            active: true,
            domains: ["youtube.com".to_string()].into_iter().collect(),
        });

        let json = serde_json::to_string(&event).unwrap();
        let parsed: Event = serde_json::from_str(&json).unwrap();

        if let EventPayload::BlockingChanged { active, domains } = parsed.payload {
            assert!(active);
            assert!(domains.contains("youtube.com"));
        } else {
            panic!("Expected BlockingChanged");
        }
    }
}
