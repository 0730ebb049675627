//! Wall-clock interval accounting
//!
//! Remaining time is derived from the start of the current running stretch
//! plus the seconds banked by earlier stretches. Missed ticks therefore
//! never cause drift.

use chrono::{DateTime, Local};
use focus_api::{SessionState, TimerMode};
use focus_util::seconds_between;

/// Seconds of the current interval consumed as of `now`
pub fn elapsed_seconds(state: &SessionState, now: DateTime<Local>) -> u64 {
    let current = match state.started_at {
        Some(started) if state.running && !state.paused => seconds_between(started, now),
        _ => 0,
    };
    state.elapsed_before_pause.saturating_add(current)
}

/// Seconds left in the current interval as of `now`
pub fn remaining_seconds(state: &SessionState, now: DateTime<Local>) -> u64 {
    state
        .duration_seconds
        .saturating_sub(elapsed_seconds(state, now))
}

/// Begin running a fresh interval of `mode` at `now`
pub fn begin_interval(state: &mut SessionState, mode: TimerMode, duration: u64, now: DateTime<Local>) {
    state.running = true;
    state.paused = false;
    state.mode = mode;
    state.duration_seconds = duration;
    state.remaining_seconds = duration;
    state.started_at = Some(now);
    state.elapsed_before_pause = 0;
    state.focus_accounted_seconds = 0;
}

/// Leave the timer idle with `mode` pending and `remaining` displayed
pub fn park_interval(state: &mut SessionState, mode: TimerMode, remaining: u64) {
    state.running = false;
    state.paused = false;
    state.mode = mode;
    state.duration_seconds = remaining;
    state.remaining_seconds = remaining;
    state.started_at = None;
    state.elapsed_before_pause = 0;
    state.focus_accounted_seconds = 0;
}

/// Bank the running stretch and freeze the countdown
pub fn freeze(state: &mut SessionState, now: DateTime<Local>) {
    state.elapsed_before_pause = elapsed_seconds(state, now).min(state.duration_seconds);
    state.remaining_seconds = state.duration_seconds - state.elapsed_before_pause;
    state.started_at = None;
    state.paused = true;
}

/// Start a new running stretch from a frozen countdown
pub fn thaw(state: &mut SessionState, now: DateTime<Local>) {
    state.started_at = Some(now);
    state.paused = false;
}
