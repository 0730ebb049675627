//! Shared types for the focusd API

use chrono::{DateTime, Local, NaiveDate};
use focus_util::TaskId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::{Settings, SettingsPatch};

/// Timer interval kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerMode {
    #[default]
    Work,
    Break,
    LongBreak,
}

impl TimerMode {
    pub fn is_work(&self) -> bool {
        matches!(self, TimerMode::Work)
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimerMode::Work => "work",
            TimerMode::Break => "break",
            TimerMode::LongBreak => "long break",
        }
    }
}

/// Canonical timer state, persisted under the `sessionState` key.
///
/// `remaining_seconds` is a cache: while running it is recomputed from
/// `started_at` and `elapsed_before_pause` on every tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionState {
    pub running: bool,
    pub paused: bool,
    pub mode: TimerMode,
    pub remaining_seconds: u64,
    /// Completed work intervals; drives the long-break cadence
    pub sessions_completed: u32,
    /// Length of the current interval when it was started
    pub duration_seconds: u64,
    /// Start of the current running stretch
    pub started_at: Option<DateTime<Local>>,
    /// Seconds consumed by running stretches before the last pause
    pub elapsed_before_pause: u64,
    /// Focus seconds of this interval already credited to the daily stats
    pub focus_accounted_seconds: u64,
}

impl SessionState {
    pub fn phase(&self) -> SessionPhase {
        match (self.running, self.paused) {
            (true, false) => SessionPhase::Running { mode: self.mode },
            (true, true) => SessionPhase::Paused { mode: self.mode },
            _ => SessionPhase::Idle,
        }
    }

    pub fn is_active(&self) -> bool {
        self.running
    }
}

/// Where the state machine currently sits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    Running { mode: TimerMode },
    Paused { mode: TimerMode },
}

/// Per-day counters, persisted under the `dailyStats` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DailyStats {
    pub date: NaiveDate,
    pub focus_seconds_accumulated: u64,
    pub sessions_completed_today: u32,
    pub blocked_attempts_today: u32,
}

impl Default for DailyStats {
    fn default() -> Self {
        Self::new(focus_util::today())
    }
}

impl DailyStats {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            focus_seconds_accumulated: 0,
            sessions_completed_today: 0,
            blocked_attempts_today: 0,
        }
    }

    pub fn is_stale(&self, today: NaiveDate) -> bool {
        self.date != today
    }

    /// Reset to zero for `today` if the stored date is another day.
    /// Returns the finished day's totals when a reset happened.
    pub fn roll_over(&mut self, today: NaiveDate) -> Option<DailyStats> {
        if !self.is_stale(today) {
            return None;
        }
        Some(std::mem::replace(self, DailyStats::new(today)))
    }

    pub fn is_empty(&self) -> bool {
        self.focus_seconds_accumulated == 0
            && self.sessions_completed_today == 0
            && self.blocked_attempts_today == 0
    }
}

/// A to-do item, persisted as part of the `tasks` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Local>,
}

/// Productivity score for the day, 0..=100.
///
/// Share of completed tasks plus one point per five minutes of focus,
/// the focus bonus capped at 25.
pub fn productivity_score(tasks: &[Task], focus_seconds: u64) -> u8 {
    let total = tasks.len() as u64;
    let completed = tasks.iter().filter(|t| t.completed).count() as u64;

    let task_score = if total == 0 {
        0
    } else {
        (completed * 200 + total) / (total * 2)
    };
    let focus_bonus = (focus_seconds / 300).min(25);

    (task_score + focus_bonus).min(100) as u8
}

/// Current denylist enforcement status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockingStatus {
    pub active: bool,
    pub domains: BTreeSet<String>,
    /// False while the last enforcer call failed and awaits a retry
    pub in_sync: bool,
}

/// Full state snapshot returned by `get_state` and pushed on major changes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub api_version: u32,
    pub session: SessionState,
    pub phase: SessionPhase,
    pub daily_stats: DailyStats,
    pub settings: Settings,
    pub blocking: BlockingStatus,
    pub productivity_score: u8,
}

/// Backup document written by `export_data`.
///
/// Members use the persisted shapes so an export can be fed straight back
/// through `import_data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub settings: Settings,
    pub daily_stats: DailyStats,
    pub tasks: Vec<Task>,
    pub export_date: DateTime<Local>,
}

/// Document accepted by `import_data`. Every member is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImportDocument {
    pub settings: Option<SettingsPatch>,
    pub daily_stats: Option<DailyStats>,
    pub tasks: Option<Vec<Task>>,
    pub export_date: Option<DateTime<Local>>,
}

impl From<ExportDocument> for ImportDocument {
    fn from(doc: ExportDocument) -> Self {
        Self {
            settings: Some(SettingsPatch::from(&doc.settings)),
            daily_stats: Some(doc.daily_stats),
            tasks: Some(doc.tasks),
            export_date: Some(doc.export_date),
        }
    }
}

/// Kind of user-facing notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    SessionStarted,
    SessionPaused,
    SessionStopped,
    WorkComplete,
    BreakComplete,
    NavigationBlocked,
}

/// Notification handed to the notifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn new(kind: NotificationKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Client role for authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientRole {
    /// Same user as the service (or root): may issue every command
    Controller,
    /// Other users: read state, subscribe, check and report domains
    Observer,
}

impl ClientRole {
    pub fn can_control(&self) -> bool {
        matches!(self, ClientRole::Controller)
    }
}

/// Health status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub live: bool,
    pub ready: bool,
    pub store_ok: bool,
    pub enforcer_ok: bool,
    pub enforcement_in_sync: bool,
    /// Unsaved state waiting for the next persistence retry
    pub persist_pending: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn task(id: u64, completed: bool) -> Task {
        Task {
            id: TaskId::new(id),
            text: format!("task {}", id),
            completed,
            created_at: Local.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn phase_from_flags() {
        let mut s = SessionState::default();
        assert_eq!(s.phase(), SessionPhase::Idle);

        s.running = true;
        s.mode = TimerMode::Break;
        assert_eq!(s.phase(), SessionPhase::Running { mode: TimerMode::Break });

        s.paused = true;
        assert_eq!(s.phase(), SessionPhase::Paused { mode: TimerMode::Break });
    }

    #[test]
    fn session_state_field_merge() {
        let parsed: SessionState =
            serde_json::from_str(r#"{"running":true,"mode":"break","unknown":1}"#).unwrap();
        assert!(parsed.running);
        assert_eq!(parsed.mode, TimerMode::Break);
        assert_eq!(parsed.sessions_completed, 0);
        assert!(parsed.started_at.is_none());
    }

    #[test]
    fn daily_stats_rollover() {
        let monday = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let tuesday = NaiveDate::from_ymd_opt(2025, 6, 3).unwrap();

        let mut stats = DailyStats::new(monday);
        stats.focus_seconds_accumulated = 3000;
        stats.blocked_attempts_today = 4;

        assert!(stats.roll_over(monday).is_none());

        let finished = stats.roll_over(tuesday).unwrap();
        assert_eq!(finished.date, monday);
        assert_eq!(finished.focus_seconds_accumulated, 3000);
        assert_eq!(stats, DailyStats::new(tuesday));
        assert!(stats.is_empty());
    }

    #[test]
    fn productivity_score_formula() {
        assert_eq!(productivity_score(&[], 0), 0);
        assert_eq!(productivity_score(&[task(1, true), task(2, false)], 0), 50);
        // 1/3 rounds to 33, 2/3 rounds to 67
        assert_eq!(productivity_score(&[task(1, true), task(2, false), task(3, false)], 0), 33);
        assert_eq!(productivity_score(&[task(1, true), task(2, true), task(3, false)], 0), 67);
        // 25 minutes of focus is worth 5 points
        assert_eq!(productivity_score(&[], 1500), 5);
        // Bonus caps at 25 and total at 100
        assert_eq!(productivity_score(&[], 10 * 3600), 25);
        assert_eq!(productivity_score(&[task(1, true)], 10 * 3600), 100);
    }

    #[test]
    fn export_converts_to_import() {
        let doc = ExportDocument {
            settings: Settings::default(),
            daily_stats: DailyStats::new(NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()),
            tasks: vec![task(1, false)],
            export_date: Local.with_ymd_and_hms(2025, 6, 2, 18, 0, 0).unwrap(),
        };
        let json = serde_json::to_string_pretty(&doc).unwrap();
        assert!(json.contains("\"dailyStats\""));
        assert!(json.contains("\"exportDate\""));

        let import: ImportDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(Settings::from_patch(&import.settings.unwrap()), doc.settings);
        assert_eq!(import.tasks.unwrap(), doc.tasks);
    }

    #[test]
    fn client_role_permissions() {
        assert!(ClientRole::Controller.can_control());
        assert!(!ClientRole::Observer.can_control());
    }
}
