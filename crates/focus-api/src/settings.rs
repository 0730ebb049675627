//! User settings and partial updates

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::{default_denylist, normalize_domains, NotificationKind, TimerMode};

pub const MIN_DURATION_MINUTES: u32 = 1;
pub const MAX_DURATION_MINUTES: u32 = 240;
pub const MIN_SESSIONS_BEFORE_LONG_BREAK: u32 = 1;
pub const MAX_SESSIONS_BEFORE_LONG_BREAK: u32 = 12;

/// Process-wide timer and blocking configuration.
///
/// Persisted under the `settings` key. Values are always in range: every
/// write path goes through [`Settings::apply`], which clamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub work_duration_minutes: u32,
    pub break_duration_minutes: u32,
    pub long_break_duration_minutes: u32,
    pub sessions_before_long_break: u32,
    pub notifications_enabled: bool,
    pub blocking_enabled: bool,
    pub denylist: BTreeSet<String>,
    /// Domains never blocked, even when they match the denylist
    pub allowlist: BTreeSet<String>,
    /// Continue into a break without an explicit start
    pub auto_start_breaks: bool,
    /// Continue into work after a break without an explicit start
    pub auto_start_work: bool,
    /// Keep the denylist installed while a work interval is paused
    pub block_while_paused: bool,
    pub notify_start: bool,
    pub notify_complete: bool,
    pub notify_break: bool,
    pub notify_blocked: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            work_duration_minutes: 25,
            break_duration_minutes: 5,
            long_break_duration_minutes: 15,
            sessions_before_long_break: 4,
            notifications_enabled: true,
            blocking_enabled: true,
            denylist: default_denylist(),
            allowlist: BTreeSet::new(),
            auto_start_breaks: true,
            auto_start_work: false,
            block_while_paused: true,
            notify_start: true,
            notify_complete: true,
            notify_break: true,
            notify_blocked: false,
        }
    }
}

impl Settings {
    /// Defaults with `patch` applied on top.
    pub fn from_patch(patch: &SettingsPatch) -> Self {
        let mut settings = Self::default();
        settings.apply(patch);
        settings
    }

    /// Lenient load of a stored blob: unknown fields are ignored, missing
    /// fields take defaults, out-of-range values are clamped.
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        let patch: SettingsPatch = serde_json::from_value(value)?;
        Ok(Self::from_patch(&patch))
    }

    /// Configured length of `mode` in seconds.
    pub fn duration_for(&self, mode: TimerMode) -> u64 {
        let minutes = match mode {
            TimerMode::Work => self.work_duration_minutes,
            TimerMode::Break => self.break_duration_minutes,
            TimerMode::LongBreak => self.long_break_duration_minutes,
        };
        u64::from(minutes) * 60
    }

    /// The break that follows `sessions_completed` finished work intervals.
    pub fn break_after(&self, sessions_completed: u32) -> TimerMode {
        if sessions_completed > 0 && sessions_completed % self.sessions_before_long_break == 0 {
            TimerMode::LongBreak
        } else {
            TimerMode::Break
        }
    }

    /// Whether `next` should start running without an explicit start.
    pub fn auto_continues_into(&self, next: TimerMode) -> bool {
        if next.is_work() {
            self.auto_start_work
        } else {
            self.auto_start_breaks
        }
    }

    pub fn should_notify(&self, kind: NotificationKind) -> bool {
        if !self.notifications_enabled {
            return false;
        }
        match kind {
            NotificationKind::SessionStarted
            | NotificationKind::SessionPaused
            | NotificationKind::SessionStopped => self.notify_start,
            NotificationKind::WorkComplete => self.notify_complete,
            NotificationKind::BreakComplete => self.notify_break,
            NotificationKind::NavigationBlocked => self.notify_blocked,
        }
    }

    /// Merge `patch` into these settings. Returns whether anything changed.
    pub fn apply(&mut self, patch: &SettingsPatch) -> bool {
        let before = self.clone();

        if let Some(v) = patch.work_duration_minutes {
            self.work_duration_minutes = clamp_duration(v);
        }
        if let Some(v) = patch.break_duration_minutes {
            self.break_duration_minutes = clamp_duration(v);
        }
        if let Some(v) = patch.long_break_duration_minutes {
            self.long_break_duration_minutes = clamp_duration(v);
        }
        if let Some(v) = patch.sessions_before_long_break {
            self.sessions_before_long_break = clamp_i64(
                v,
                MIN_SESSIONS_BEFORE_LONG_BREAK,
                MAX_SESSIONS_BEFORE_LONG_BREAK,
            );
        }
        if let Some(ref domains) = patch.denylist {
            self.denylist = normalize_domains(domains);
        }
        if let Some(ref domains) = patch.allowlist {
            self.allowlist = normalize_domains(domains);
        }

        let flags = [
            (patch.notifications_enabled, &mut self.notifications_enabled),
            (patch.blocking_enabled, &mut self.blocking_enabled),
            (patch.auto_start_breaks, &mut self.auto_start_breaks),
            (patch.auto_start_work, &mut self.auto_start_work),
            (patch.block_while_paused, &mut self.block_while_paused),
            (patch.notify_start, &mut self.notify_start),
            (patch.notify_complete, &mut self.notify_complete),
            (patch.notify_break, &mut self.notify_break),
            (patch.notify_blocked, &mut self.notify_blocked),
        ];
        for (value, slot) in flags {
            if let Some(v) = value {
                *slot = v;
            }
        }

        *self != before
    }
}

fn clamp_duration(minutes: i64) -> u32 {
    clamp_i64(minutes, MIN_DURATION_MINUTES, MAX_DURATION_MINUTES)
}

fn clamp_i64(value: i64, min: u32, max: u32) -> u32 {
    value.clamp(i64::from(min), i64::from(max)) as u32
}

/// Partial settings update. Absent fields are left alone.
///
/// Numeric fields are signed so that nonsense input (negative durations)
/// can be clamped instead of failing to parse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_duration_minutes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub break_duration_minutes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long_break_duration_minutes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sessions_before_long_break: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notifications_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocking_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub denylist: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowlist: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_start_breaks: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_start_work: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_while_paused: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify_start: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify_complete: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify_break: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify_blocked: Option<bool>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl From<&Settings> for SettingsPatch {
    fn from(s: &Settings) -> Self {
        Self {
            work_duration_minutes: Some(s.work_duration_minutes.into()),
            break_duration_minutes: Some(s.break_duration_minutes.into()),
            long_break_duration_minutes: Some(s.long_break_duration_minutes.into()),
            sessions_before_long_break: Some(s.sessions_before_long_break.into()),
            notifications_enabled: Some(s.notifications_enabled),
            blocking_enabled: Some(s.blocking_enabled),
            denylist: Some(s.denylist.iter().cloned().collect()),
            allowlist: Some(s.allowlist.iter().cloned().collect()),
            auto_start_breaks: Some(s.auto_start_breaks),
            auto_start_work: Some(s.auto_start_work),
            block_while_paused: Some(s.block_while_paused),
            notify_start: Some(s.notify_start),
            notify_complete: Some(s.notify_complete),
            notify_break: Some(s.notify_break),
            notify_blocked: Some(s.notify_blocked),
        }
    }
}
