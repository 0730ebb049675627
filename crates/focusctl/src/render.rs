//! Human-readable output

use focus_api::{
    BlockingStatus, DailyStats, Event, EventPayload, HealthStatus, SessionPhase, Settings,
    StateSnapshot, Task, TimerMode,
};
use focus_util::{format_countdown, format_focus_time};

fn mode_title(mode: TimerMode) -> &'static str {
    match mode {
        TimerMode::Work => "Work",
        TimerMode::Break => "Break",
        TimerMode::LongBreak => "Long break",
    }
}

pub fn phase_line(snapshot: &StateSnapshot) -> String {
    let session = &snapshot.session;
    match snapshot.phase {
        SessionPhase::Running { mode } => format!(
            "{} {} remaining",
            mode_title(mode),
            format_countdown(session.remaining_seconds)
        ),
        SessionPhase::Paused { mode } => format!(
            "{} paused at {}",
            mode_title(mode),
            format_countdown(session.remaining_seconds)
        ),
        SessionPhase::Idle if session.remaining_seconds > 0 => format!(
            "Idle, {} of {} pending",
            format_countdown(session.remaining_seconds),
            mode_title(session.mode).to_lowercase()
        ),
        SessionPhase::Idle => "Idle".to_string(),
    }
}

pub fn stats_line(stats: &DailyStats) -> String {
    format!(
        "{}: {} focused, {} sessions, {} blocked",
        stats.date,
        format_focus_time(stats.focus_seconds_accumulated),
        stats.sessions_completed_today,
        stats.blocked_attempts_today
    )
}

pub fn blocking_line(status: &BlockingStatus) -> String {
    if !status.active {
        return "Blocking off".to_string();
    }
    let sync = if status.in_sync { "" } else { " (retrying)" };
    format!("Blocking {} domains{}", status.domains.len(), sync)
}

pub fn snapshot(snapshot: &StateSnapshot) -> String {
    [
        phase_line(snapshot),
        format!(
            "Sessions this cycle: {}/{}",
            snapshot.session.sessions_completed % snapshot.settings.sessions_before_long_break.max(1),
            snapshot.settings.sessions_before_long_break
        ),
        blocking_line(&snapshot.blocking),
        stats_line(&snapshot.daily_stats),
        format!("Productivity: {}", snapshot.productivity_score),
    ]
    .join("\n")
}

pub fn tasks(tasks: &[Task], score: u8) -> String {
    if tasks.is_empty() {
        return format!("No tasks (productivity {})", score);
    }
    let mut lines: Vec<String> = tasks
        .iter()
        .map(|t| format!("[{}] {:>4}  {}", if t.completed { "x" } else { " " }, t.id.to_string(), t.text))
        .collect();
    lines.push(format!("Productivity: {}", score));
    lines.join("\n")
}

pub fn settings(s: &Settings) -> String {
    let list = |set: &std::collections::BTreeSet<String>| {
        if set.is_empty() {
            "-".to_string()
        } else {
            set.iter().cloned().collect::<Vec<_>>().join(", ")
        }
    };
    [
        format!(
            "Durations: work {}m, break {}m, long break {}m every {} sessions",
            s.work_duration_minutes,
            s.break_duration_minutes,
            s.long_break_duration_minutes,
            s.sessions_before_long_break
        ),
        format!(
            "Auto-start: breaks {}, work {}",
            on_off(s.auto_start_breaks),
            on_off(s.auto_start_work)
        ),
        format!(
            "Blocking: {}, while paused {}",
            on_off(s.blocking_enabled),
            on_off(s.block_while_paused)
        ),
        format!("Notifications: {}", on_off(s.notifications_enabled)),
        format!("Denylist: {}", list(&s.denylist)),
        format!("Allowlist: {}", list(&s.allowlist)),
    ]
    .join("\n")
}

pub fn health(h: &HealthStatus) -> String {
    format!(
        "live {}, ready {}, store {}, enforcer {}, enforcement {}, persistence {}",
        yes_no(h.live),
        yes_no(h.ready),
        ok_bad(h.store_ok),
        ok_bad(h.enforcer_ok),
        if h.enforcement_in_sync { "in sync" } else { "retrying" },
        if h.persist_pending { "pending" } else { "saved" }
    )
}

/// One line per event for `watch`
pub fn event(event: &Event) -> String {
    match &event.payload {
        EventPayload::Tick {
            mode,
            remaining_seconds,
        } => format!("{} {}", mode_title(*mode), format_countdown(*remaining_seconds)),
        EventPayload::ModeChanged {
            mode,
            running,
            paused,
            sessions_completed,
            ..
        } => {
            let state = match (running, paused) {
                (true, false) => "running",
                (true, true) => "paused",
                _ => "idle",
            };
            format!(
                "-> {} {} ({} completed)",
                mode_title(*mode),
                state,
                sessions_completed
            )
        }
        EventPayload::BlockingChanged { active, domains } => {
            if *active {
                format!("Blocking {} domains", domains.len())
            } else {
                "Blocking off".to_string()
            }
        }
        EventPayload::StatsChanged(stats) => stats_line(stats),
        EventPayload::SettingsChanged(_) => "Settings changed".to_string(),
        EventPayload::TasksChanged { tasks } => format!("Tasks changed ({})", tasks.len()),
        EventPayload::StateChanged(s) => phase_line(s),
        EventPayload::Shutdown => "focusd shutting down".to_string(),
    }
}

fn on_off(v: bool) -> &'static str {
    if v { "on" } else { "off" }
}

fn yes_no(v: bool) -> &'static str {
    if v { "yes" } else { "no" }
}

fn ok_bad(v: bool) -> &'static str {
    if v { "ok" } else { "failing" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use focus_api::SessionState;

    fn snapshot_with(session: SessionState) -> StateSnapshot {
        StateSnapshot {
            api_version: focus_api::API_VERSION,
            phase: session.phase(),
            session,
            daily_stats: DailyStats::new(NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()),
            settings: Settings::default(),
            blocking: BlockingStatus::default(),
            productivity_score: 0,
        }
    }

    #[test]
    fn test_phase_line() {
        let mut session = SessionState {
            running: true,
            remaining_seconds: 1499,
            ..Default::default()
        };
        assert_eq!(phase_line(&snapshot_with(session.clone())), "Work 24:59 remaining");

        session.paused = true;
        assert_eq!(phase_line(&snapshot_with(session.clone())), "Work paused at 24:59");

        let idle = SessionState {
            mode: TimerMode::Break,
            remaining_seconds: 300,
            ..Default::default()
        };
        assert_eq!(phase_line(&snapshot_with(idle)), "Idle, 05:00 of break pending");
        assert_eq!(phase_line(&snapshot_with(SessionState::default())), "Idle");
    }

    #[test]
    fn test_stats_line() {
        let mut stats = DailyStats::new(NaiveDate::from_ymd_opt(2025, 6, 2).unwrap());
        stats.focus_seconds_accumulated = 3900;
        stats.sessions_completed_today = 2;
        stats.blocked_attempts_today = 3;
        assert_eq!(stats_line(&stats), "2025-06-02: 1h 5m focused, 2 sessions, 3 blocked");
    }

    #[test]
    fn test_blocking_line() {
        let mut status = BlockingStatus {
            active: true,
            domains: ["a.com".to_string(), "b.com".to_string()].into_iter().collect(),
            in_sync: true,
        };
        assert_eq!(blocking_line(&status), "Blocking 2 domains");
        status.in_sync = false;
        assert_eq!(blocking_line(&status), "Blocking 2 domains (retrying)");
        assert_eq!(blocking_line(&BlockingStatus::default()), "Blocking off");
    }
}
