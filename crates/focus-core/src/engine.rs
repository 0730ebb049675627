//! The session controller

use chrono::{DateTime, Local};
use focus_api::{
    match_denylist, normalize_domains, productivity_score, DailyStats, ErrorCode, ExportDocument,
    ImportDocument, Notification, NotificationKind, SessionState, Settings, SettingsPatch,
    StateSnapshot, Task, TimerMode, API_VERSION,
};
use focus_store::{load_persisted, PersistedState, StateKey, Store, StoreError};
use focus_util::{format_countdown, TaskId};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{timer, BlockingState, CoreEvent, TaskList};

/// A command that does not apply in the current state. The state is left
/// untouched when one of these is returned.
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("A session is already running")]
    SessionActive,

    #[error("No active session")]
    NoActiveSession,

    #[error("Timer is not counting down")]
    NotRunning,

    #[error("Timer is not paused")]
    NotPaused,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl TransitionError {
    pub fn code(&self) -> ErrorCode {
        match self {
            TransitionError::SessionActive => ErrorCode::SessionActive,
            TransitionError::NoActiveSession => ErrorCode::NoActiveSession,
            TransitionError::NotRunning | TransitionError::NotPaused => ErrorCode::InvalidState,
            TransitionError::InvalidInput(_) => ErrorCode::InvalidRequest,
            TransitionError::TaskNotFound(_) => ErrorCode::TaskNotFound,
            TransitionError::Store(_) => ErrorCode::StoreError,
        }
    }
}

pub type TransitionResult<T> = Result<T, TransitionError>;

/// Owns the canonical timer, settings, statistics and task list.
///
/// Every mutation goes through the methods below, each of which takes the
/// current time and returns the events it produced. State is written back
/// to the store after each call; a failed write is kept dirty and retried
/// on the next call.
pub struct SessionController {
    store: Arc<dyn Store>,
    default_settings: Settings,
    settings: Settings,
    session: SessionState,
    daily: DailyStats,
    tasks: TaskList,
    blocking: BlockingState,
    dirty: HashSet<StateKey>,
    persist_failed: bool,
    /// Stored state could not be read yet; writes are held until it is
    load_pending: bool,
}

impl SessionController {
    /// Restore from `store`, seeding settings from `default_settings` when
    /// none are stored. An unreadable store yields defaults; the read is
    /// retried on every tick and command, and nothing is written back until
    /// it succeeds.
    pub fn new(store: Arc<dyn Store>, default_settings: Settings, now: DateTime<Local>) -> Self {
        let (persisted, loaded) = match load_persisted(store.as_ref()) {
            Ok(persisted) => (persisted, true),
            Err(e) => {
                warn!(error = %e, "Failed to load stored state, starting from defaults");
                (PersistedState::default(), false)
            }
        };

        let mut dirty = HashSet::new();
        let settings = match persisted.settings {
            Some(settings) => settings,
            None => {
                if loaded {
                    dirty.insert(StateKey::Settings);
                }
                default_settings.clone()
            }
        };
        let daily = persisted
            .daily_stats
            .unwrap_or_else(|| DailyStats::new(now.date_naive()));

        let mut controller = Self {
            store,
            default_settings,
            settings,
            session: persisted.session,
            daily,
            tasks: TaskList::new(persisted.tasks),
            blocking: BlockingState::new(),
            dirty,
            persist_failed: false,
            load_pending: !loaded,
        };
        controller.repair_session(now);

        info!(
            phase = ?controller.session.phase(),
            sessions_completed = controller.session.sessions_completed,
            tasks = controller.tasks.len(),
            "Session controller initialized"
        );

        controller
    }

    /// Make a restored session self-consistent. Older blobs carry only
    /// `remainingSeconds`, so the interval is rebuilt from it.
    fn repair_session(&mut self, now: DateTime<Local>) {
        let s = &mut self.session;
        if !s.running {
            s.paused = false;
            s.started_at = None;
            return;
        }

        if s.duration_seconds == 0 {
            s.duration_seconds = s.remaining_seconds;
            s.elapsed_before_pause = 0;
            s.focus_accounted_seconds = 0;
            if !s.paused {
                s.started_at = Some(now);
            }
            self.dirty.insert(StateKey::SessionState);
        } else if !s.paused && s.started_at.is_none() {
            s.started_at = Some(now);
            self.dirty.insert(StateKey::SessionState);
        }
    }

    /// Roll the day over if needed and bring the enforcer in line with the
    /// restored state. Call once before the first tick.
    pub fn startup(&mut self, now: DateTime<Local>) -> Vec<CoreEvent> {
        let mut events = Vec::new();
        self.retry_load(now, &mut events);
        self.roll_over(now, &mut events);

        if self.blocking_wanted(&self.settings) {
            let domains = effective_denylist(&self.settings);
            self.blocking.enable(domains, &mut events);
        }
        // Clears whatever a previous run may have left installed
        self.blocking.resync(&mut events);

        self.finish(events)
    }

    // Accessors

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn daily_stats(&self) -> &DailyStats {
        &self.daily
    }

    pub fn tasks(&self) -> &[Task] {
        self.tasks.as_slice()
    }

    pub fn blocking(&self) -> &BlockingState {
        &self.blocking
    }

    pub fn productivity_score(&self) -> u8 {
        productivity_score(self.tasks.as_slice(), self.daily.focus_seconds_accumulated)
    }

    /// Unsaved changes are waiting for a retry
    pub fn persist_pending(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Stored state has not been read successfully yet
    pub fn load_pending(&self) -> bool {
        self.load_pending
    }

    pub fn store_healthy(&self) -> bool {
        self.store.is_healthy()
    }

    /// Full snapshot as of `now`. Rolls the day over first so stale
    /// statistics are never reported.
    pub fn snapshot(&mut self, now: DateTime<Local>) -> StateSnapshot {
        self.refresh_day(now);

        let mut session = self.session.clone();
        if session.running && !session.paused {
            session.remaining_seconds = timer::remaining_seconds(&session, now);
        }

        StateSnapshot {
            api_version: API_VERSION,
            phase: session.phase(),
            session,
            daily_stats: self.daily.clone(),
            settings: self.settings.clone(),
            blocking: self.blocking.status(),
            productivity_score: self.productivity_score(),
        }
    }

    /// Roll the day over if the date changed. Called on every read path.
    pub fn refresh_day(&mut self, now: DateTime<Local>) -> Vec<CoreEvent> {
        let mut events = Vec::new();
        self.retry_load(now, &mut events);
        self.roll_over(now, &mut events);
        self.finish(events)
    }

    // Timer transitions

    /// Idle -> Running(pending mode)
    pub fn start(&mut self, now: DateTime<Local>) -> TransitionResult<Vec<CoreEvent>> {
        if self.session.running {
            return Err(TransitionError::SessionActive);
        }

        let mut events = Vec::new();
        self.roll_over(now, &mut events);

        let mode = self.session.mode;
        let duration = self.settings.duration_for(mode);
        timer::begin_interval(&mut self.session, mode, duration, now);
        self.mark_dirty(StateKey::SessionState);

        if mode.is_work() && self.settings.blocking_enabled {
            self.blocking.enable(effective_denylist(&self.settings), &mut events);
        }

        info!(mode = ?mode, duration_secs = duration, "Session started");

        events.push(self.mode_changed_event());
        self.notify(
            NotificationKind::SessionStarted,
            format!("{} started", title_case(mode.label())),
            format!("{} minutes on the clock", duration / 60),
            &mut events,
        );

        Ok(self.finish(events))
    }

    /// Running -> Paused
    pub fn pause(&mut self, now: DateTime<Local>) -> TransitionResult<Vec<CoreEvent>> {
        if !self.session.running || self.session.paused {
            return Err(TransitionError::NotRunning);
        }

        let mut events = Vec::new();
        self.roll_over(now, &mut events);
        self.credit_focus(now);
        timer::freeze(&mut self.session, now);
        self.mark_dirty(StateKey::SessionState);

        if self.session.mode.is_work() && !self.settings.block_while_paused {
            self.blocking.disable(&mut events);
        }

        info!(
            mode = ?self.session.mode,
            remaining_secs = self.session.remaining_seconds,
            "Session paused"
        );

        events.push(self.mode_changed_event());
        if self.session.mode.is_work() {
            events.push(CoreEvent::StatsChanged(self.daily.clone()));
        }
        self.notify(
            NotificationKind::SessionPaused,
            format!("{} paused", title_case(self.session.mode.label())),
            format!("{} left on the clock", format_countdown(self.session.remaining_seconds)),
            &mut events,
        );

        Ok(self.finish(events))
    }

    /// Paused -> Running
    pub fn resume(&mut self, now: DateTime<Local>) -> TransitionResult<Vec<CoreEvent>> {
        if !self.session.running || !self.session.paused {
            return Err(TransitionError::NotPaused);
        }

        let mut events = Vec::new();
        self.roll_over(now, &mut events);
        timer::thaw(&mut self.session, now);
        self.mark_dirty(StateKey::SessionState);

        if self.session.mode.is_work() && self.settings.blocking_enabled {
            self.blocking.enable(effective_denylist(&self.settings), &mut events);
        }

        info!(
            mode = ?self.session.mode,
            remaining_secs = self.session.remaining_seconds,
            "Session resumed"
        );

        events.push(self.mode_changed_event());
        Ok(self.finish(events))
    }

    /// Running/Paused -> Idle. Takes precedence over a completion that is
    /// due but not yet ticked: no completion side effects fire.
    pub fn stop(&mut self, now: DateTime<Local>) -> TransitionResult<Vec<CoreEvent>> {
        if !self.session.running {
            return Err(TransitionError::NoActiveSession);
        }

        let mut events = Vec::new();
        self.roll_over(now, &mut events);

        let stopped_mode = self.session.mode;
        if stopped_mode.is_work() {
            self.credit_focus(now);
            events.push(CoreEvent::StatsChanged(self.daily.clone()));
        }

        timer::park_interval(&mut self.session, TimerMode::Work, 0);
        self.mark_dirty(StateKey::SessionState);
        self.blocking.disable(&mut events);

        info!(mode = ?stopped_mode, "Session stopped");

        events.push(self.mode_changed_event());
        self.notify(
            NotificationKind::SessionStopped,
            "Session stopped",
            format!("{} interval abandoned", title_case(stopped_mode.label())),
            &mut events,
        );

        Ok(self.finish(events))
    }

    /// Advance the clock. Recomputes the countdown from wall-clock time,
    /// accrues focus time and applies the completion rule when the interval
    /// has run out. An interval that expired during a suspension completes
    /// once, and the next one starts at `now`.
    pub fn tick(&mut self, now: DateTime<Local>) -> Vec<CoreEvent> {
        let mut events = Vec::new();
        self.retry_load(now, &mut events);
        self.roll_over(now, &mut events);
        self.blocking.resync(&mut events);

        if self.session.running && !self.session.paused {
            self.credit_focus(now);

            let remaining = timer::remaining_seconds(&self.session, now);
            if remaining == 0 {
                self.complete(now, &mut events);
            } else if remaining != self.session.remaining_seconds {
                self.session.remaining_seconds = remaining;
                events.push(CoreEvent::Tick {
                    mode: self.session.mode,
                    remaining_seconds: remaining,
                });
            }
        }

        self.finish(events)
    }

    fn complete(&mut self, now: DateTime<Local>, events: &mut Vec<CoreEvent>) {
        let finished = self.session.mode;

        let next = if finished.is_work() {
            self.session.sessions_completed += 1;
            self.daily.sessions_completed_today += 1;
            self.mark_dirty(StateKey::DailyStats);
            events.push(CoreEvent::StatsChanged(self.daily.clone()));

            self.blocking.disable(events);

            let next = self.settings.break_after(self.session.sessions_completed);
            self.notify(
                NotificationKind::WorkComplete,
                "Work session complete",
                format!("Time for a {}", next.label()),
                events,
            );
            next
        } else {
            self.notify(
                NotificationKind::BreakComplete,
                "Break is over",
                "Ready to focus again?",
                events,
            );
            TimerMode::Work
        };

        let duration = self.settings.duration_for(next);
        let auto = self.settings.auto_continues_into(next);
        if auto {
            timer::begin_interval(&mut self.session, next, duration, now);
            if next.is_work() && self.settings.blocking_enabled {
                self.blocking.enable(effective_denylist(&self.settings), events);
            }
        } else {
            timer::park_interval(&mut self.session, next, duration);
        }
        self.mark_dirty(StateKey::SessionState);

        info!(
            finished = ?finished,
            next = ?next,
            auto_started = auto,
            sessions_completed = self.session.sessions_completed,
            "Interval complete"
        );

        events.push(self.mode_changed_event());
    }

    /// Credit focus seconds of the current work interval not yet counted.
    fn credit_focus(&mut self, now: DateTime<Local>) {
        if !self.session.running || !self.session.mode.is_work() {
            return;
        }

        let elapsed = timer::elapsed_seconds(&self.session, now).min(self.session.duration_seconds);
        let delta = elapsed.saturating_sub(self.session.focus_accounted_seconds);
        if delta == 0 {
            return;
        }

        self.daily.focus_seconds_accumulated += delta;
        self.session.focus_accounted_seconds = elapsed;
        self.mark_dirty(StateKey::DailyStats);
        self.mark_dirty(StateKey::SessionState);
    }

    // Settings

    pub fn update_settings(&mut self, patch: &SettingsPatch) -> Vec<CoreEvent> {
        let previous = self.settings.clone();
        if !self.settings.apply(patch) {
            debug!("Settings update changed nothing");
            return Vec::new();
        }

        info!("Settings updated");
        self.settings_replaced(&previous)
    }

    pub fn reset_settings(&mut self) -> Vec<CoreEvent> {
        if self.settings == self.default_settings {
            return Vec::new();
        }
        let previous = std::mem::replace(&mut self.settings, self.default_settings.clone());

        info!("Settings reset to defaults");
        self.settings_replaced(&previous)
    }

    fn settings_replaced(&mut self, previous: &Settings) -> Vec<CoreEvent> {
        let mut events = Vec::new();
        self.mark_dirty(StateKey::Settings);
        events.push(CoreEvent::SettingsChanged(self.settings.clone()));
        self.repark_pending(&mut events);
        self.reconcile_blocking(previous, &mut events);
        self.finish(events)
    }

    /// An idle timer waiting on a parked interval shows the current
    /// duration of that mode. A running interval keeps its length.
    fn repark_pending(&mut self, events: &mut Vec<CoreEvent>) {
        if self.session.running || self.session.remaining_seconds == 0 {
            return;
        }

        let mode = self.session.mode;
        let duration = self.settings.duration_for(mode);
        if duration == self.session.remaining_seconds {
            return;
        }

        timer::park_interval(&mut self.session, mode, duration);
        self.mark_dirty(StateKey::SessionState);
        debug!(mode = ?mode, remaining_secs = duration, "Pending interval resized");
        events.push(self.mode_changed_event());
    }

    /// Follow a settings change with the blocking state: toggling
    /// `blockingEnabled` mid-work, or editing the denylist while it is
    /// installed.
    fn reconcile_blocking(&mut self, previous: &Settings, events: &mut Vec<CoreEvent>) {
        let was_wanted = self.blocking_wanted(previous);
        let wanted = self.blocking_wanted(&self.settings);
        let old_list = effective_denylist(previous);
        let new_list = effective_denylist(&self.settings);

        if wanted {
            if !was_wanted || old_list != new_list {
                self.blocking.enable(new_list, events);
            }
        } else if was_wanted {
            self.blocking.disable(events);
        } else if self.blocking.is_active() && *self.blocking.domains() == old_list && old_list != new_list {
            // Manually enabled with the settings denylist
            self.blocking.enable(new_list, events);
        }
    }

    fn blocking_wanted(&self, settings: &Settings) -> bool {
        self.session.running
            && self.session.mode.is_work()
            && settings.blocking_enabled
            && (!self.session.paused || settings.block_while_paused)
    }

    // Blocking

    /// Turn blocking on. `domains` replaces the settings denylist for this
    /// activation; an empty or unusable list is refused.
    pub fn enable_blocking(&mut self, domains: Option<&[String]>) -> TransitionResult<Vec<CoreEvent>> {
        let set = match domains {
            Some(list) => {
                let set = normalize_domains(list);
                if set.is_empty() {
                    return Err(TransitionError::InvalidInput(
                        "no usable domains in denylist".into(),
                    ));
                }
                set
            }
            None => effective_denylist(&self.settings),
        };

        let mut events = Vec::new();
        self.blocking.enable(set, &mut events);
        Ok(self.finish(events))
    }

    pub fn disable_blocking(&mut self) -> Vec<CoreEvent> {
        let mut events = Vec::new();
        self.blocking.disable(&mut events);
        self.finish(events)
    }

    /// The service failed to apply the last enforcement request
    pub fn enforcement_failed(&mut self) {
        warn!(
            active = self.blocking.is_active(),
            "Enforcement out of sync, will retry"
        );
        self.blocking.mark_out_of_sync();
    }

    /// The denylist entry blocking `host`, if blocking is active
    pub fn check_domain(&self, host: &str) -> Option<String> {
        if !self.blocking.is_active() {
            return None;
        }
        match_denylist(host, self.blocking.domains(), &self.settings.allowlist).map(str::to_string)
    }

    /// Count one blocked navigation. Reports while blocking is off are
    /// ignored; returns whether the report was counted.
    pub fn record_blocked(&mut self, domain: &str, now: DateTime<Local>) -> (bool, Vec<CoreEvent>) {
        let mut events = Vec::new();
        self.roll_over(now, &mut events);

        if !self.blocking.is_active() {
            debug!(domain, "Ignoring blocked-navigation report while blocking is off");
            return (false, self.finish(events));
        }

        self.daily.blocked_attempts_today += 1;
        self.mark_dirty(StateKey::DailyStats);
        events.push(CoreEvent::StatsChanged(self.daily.clone()));

        info!(
            domain,
            blocked_today = self.daily.blocked_attempts_today,
            "Navigation blocked"
        );

        self.notify(
            NotificationKind::NavigationBlocked,
            "Site blocked",
            format!("{} is blocked during focus time", domain),
            &mut events,
        );

        (true, self.finish(events))
    }

    // Tasks

    pub fn add_task(&mut self, text: &str, now: DateTime<Local>) -> TransitionResult<(Task, Vec<CoreEvent>)> {
        let task = self.tasks.add(text, now)?;
        debug!(task_id = %task.id, "Task added");
        Ok((task, self.tasks_changed()))
    }

    pub fn toggle_task(&mut self, id: TaskId) -> TransitionResult<(Task, Vec<CoreEvent>)> {
        let task = self.tasks.toggle(id)?;
        debug!(task_id = %id, completed = task.completed, "Task toggled");
        Ok((task, self.tasks_changed()))
    }

    pub fn delete_task(&mut self, id: TaskId) -> TransitionResult<Vec<CoreEvent>> {
        self.tasks.remove(id)?;
        debug!(task_id = %id, "Task deleted");
        Ok(self.tasks_changed())
    }

    fn tasks_changed(&mut self) -> Vec<CoreEvent> {
        self.mark_dirty(StateKey::Tasks);
        let events = vec![CoreEvent::TasksChanged(self.tasks.as_slice().to_vec())];
        self.finish(events)
    }

    // Statistics

    pub fn reset_stats(&mut self, now: DateTime<Local>) -> Vec<CoreEvent> {
        self.daily = DailyStats::new(now.date_naive());
        self.mark_dirty(StateKey::DailyStats);
        info!("Daily statistics reset");
        self.finish(vec![CoreEvent::StatsChanged(self.daily.clone())])
    }

    /// Archived days, newest first
    pub fn history(&self, days: usize) -> TransitionResult<Vec<DailyStats>> {
        Ok(self.store.recent_days(days)?)
    }

    fn roll_over(&mut self, now: DateTime<Local>, events: &mut Vec<CoreEvent>) {
        let Some(finished) = self.daily.roll_over(now.date_naive()) else {
            return;
        };

        if !finished.is_empty() {
            if let Err(e) = self.store.archive_day(&finished) {
                warn!(day = %finished.date, error = %e, "Failed to archive daily stats");
            }
        }

        info!(
            previous_day = %finished.date,
            today = %self.daily.date,
            "Daily stats rolled over"
        );
        self.mark_dirty(StateKey::DailyStats);
        events.push(CoreEvent::StatsChanged(self.daily.clone()));
    }

    /// Read the store again after a failed startup load and fold what is
    /// stored under what changed in memory since. Memory wins for settings
    /// and the session when they were changed; tasks and today's counters
    /// are combined.
    fn retry_load(&mut self, now: DateTime<Local>, events: &mut Vec<CoreEvent>) {
        if !self.load_pending {
            return;
        }

        let persisted = match load_persisted(self.store.as_ref()) {
            Ok(persisted) => persisted,
            Err(e) => {
                debug!(error = %e, "Stored state still unreadable");
                return;
            }
        };
        self.load_pending = false;

        match persisted.settings {
            Some(settings) if !self.dirty.contains(&StateKey::Settings) => self.settings = settings,
            Some(_) => {}
            None => self.mark_dirty(StateKey::Settings),
        }

        if !self.dirty.contains(&StateKey::SessionState) {
            self.session = persisted.session;
            self.repair_session(now);
        }

        if let Some(mut stored) = persisted.daily_stats {
            self.roll_over(now, events);
            if let Some(finished) = stored.roll_over(now.date_naive()) {
                self.mark_dirty(StateKey::DailyStats);
                if !finished.is_empty() {
                    if let Err(e) = self.store.archive_day(&finished) {
                        warn!(day = %finished.date, error = %e, "Failed to archive daily stats");
                    }
                }
            }
            if self.dirty.contains(&StateKey::DailyStats) {
                stored.focus_seconds_accumulated += self.daily.focus_seconds_accumulated;
                stored.sessions_completed_today += self.daily.sessions_completed_today;
                stored.blocked_attempts_today += self.daily.blocked_attempts_today;
            }
            self.daily = stored;
        }

        if self.dirty.contains(&StateKey::Tasks) {
            let mut merged: Vec<Task> = persisted
                .tasks
                .into_iter()
                .filter(|stored| !self.tasks.as_slice().iter().any(|t| t.id == stored.id))
                .collect();
            merged.extend(self.tasks.as_slice().iter().cloned());
            self.tasks.replace(merged);
        } else {
            self.tasks.replace(persisted.tasks);
        }

        if self.blocking_wanted(&self.settings) {
            self.blocking.enable(effective_denylist(&self.settings), events);
        }

        info!(
            phase = ?self.session.phase(),
            tasks = self.tasks.len(),
            held_writes = self.dirty.len(),
            "Stored state loaded after retry"
        );
        events.push(CoreEvent::StateReplaced);
    }

    // Export / import

    pub fn export(&mut self, now: DateTime<Local>) -> ExportDocument {
        self.refresh_day(now);
        ExportDocument {
            settings: self.settings.clone(),
            daily_stats: self.daily.clone(),
            tasks: self.tasks.as_slice().to_vec(),
            export_date: now,
        }
    }

    /// Apply a backup. Settings merge over the defaults, stale statistics
    /// roll over, tasks are replaced. Absent members are left alone.
    pub fn import(&mut self, document: ImportDocument, now: DateTime<Local>) -> Vec<CoreEvent> {
        let mut events = Vec::new();
        let previous = self.settings.clone();

        if let Some(patch) = &document.settings {
            let mut settings = self.default_settings.clone();
            settings.apply(patch);
            self.settings = settings;
            self.mark_dirty(StateKey::Settings);
            events.push(CoreEvent::SettingsChanged(self.settings.clone()));
            self.repark_pending(&mut events);
        }

        if let Some(stats) = document.daily_stats {
            self.daily = stats;
            self.mark_dirty(StateKey::DailyStats);
            self.roll_over(now, &mut events);
            events.push(CoreEvent::StatsChanged(self.daily.clone()));
        }

        if let Some(tasks) = document.tasks {
            self.tasks.replace(tasks);
            self.mark_dirty(StateKey::Tasks);
            events.push(CoreEvent::TasksChanged(self.tasks.as_slice().to_vec()));
        }

        self.reconcile_blocking(&previous, &mut events);

        info!(
            exported_at = ?document.export_date,
            tasks = self.tasks.len(),
            "Data imported"
        );

        events.push(CoreEvent::StateReplaced);
        self.finish(events)
    }

    // Internals

    fn notify(
        &self,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        events: &mut Vec<CoreEvent>,
    ) {
        if self.settings.should_notify(kind) {
            events.push(CoreEvent::Notify(Notification::new(kind, title, message)));
        }
    }

    fn mode_changed_event(&self) -> CoreEvent {
        CoreEvent::ModeChanged {
            mode: self.session.mode,
            running: self.session.running,
            paused: self.session.paused,
            sessions_completed: self.session.sessions_completed,
            remaining_seconds: self.session.remaining_seconds,
        }
    }

    fn mark_dirty(&mut self, key: StateKey) {
        self.dirty.insert(key);
    }

    fn finish(&mut self, events: Vec<CoreEvent>) -> Vec<CoreEvent> {
        self.flush();
        events
    }

    /// Write dirty blobs in one batch. On failure they stay dirty and the
    /// in-memory state remains authoritative.
    pub fn flush(&mut self) {
        if self.dirty.is_empty() {
            return;
        }
        if self.load_pending {
            debug!(pending = self.dirty.len(), "Holding writes until stored state is loaded");
            return;
        }

        let mut blobs = Vec::with_capacity(self.dirty.len());
        for key in StateKey::ALL {
            if !self.dirty.contains(&key) {
                continue;
            }
            let value = match key {
                StateKey::Settings => serde_json::to_value(&self.settings),
                StateKey::SessionState => serde_json::to_value(&self.session),
                StateKey::DailyStats => serde_json::to_value(&self.daily),
                StateKey::Tasks => serde_json::to_value(self.tasks.as_slice()),
            };
            match value {
                Ok(value) => blobs.push((key, value)),
                Err(e) => warn!(key = %key, error = %e, "Failed to serialize state"),
            }
        }

        match self.store.save_blobs(&blobs) {
            Ok(()) => {
                if self.persist_failed {
                    info!("Persistence recovered");
                }
                self.dirty.clear();
                self.persist_failed = false;
            }
            Err(e) => {
                if !self.persist_failed {
                    warn!(error = %e, pending = self.dirty.len(), "Failed to persist state, will retry");
                } else {
                    debug!(error = %e, "Persistence retry failed");
                }
                self.persist_failed = true;
            }
        }
    }
}

/// Denylist to install: the settings denylist minus exact allowlist entries
fn effective_denylist(settings: &Settings) -> BTreeSet<String> {
    settings
        .denylist
        .difference(&settings.allowlist)
        .cloned()
        .collect()
}

fn title_case(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EnforcementRequest;
    use chrono::{Duration, NaiveDate, TimeZone};
    use focus_api::SessionPhase;
    use focus_store::{MemoryStore, SqliteStore, StoreExt};

    fn t0() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap()
    }

    fn at(secs: i64) -> DateTime<Local> {
        t0() + Duration::seconds(secs)
    }

    fn make_controller() -> (SessionController, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let mut controller = SessionController::new(store.clone(), Settings::default(), t0());
        controller.startup(t0());
        (controller, store)
    }

    fn notifications(events: &[CoreEvent]) -> Vec<NotificationKind> {
        events
            .iter()
            .filter_map(|e| match e {
                CoreEvent::Notify(n) => Some(n.kind),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_start_from_idle() {
        let (mut c, _) = make_controller();
        let events = c.start(t0()).unwrap();

        assert_eq!(c.session().phase(), SessionPhase::Running { mode: TimerMode::Work });
        assert_eq!(c.session().remaining_seconds, 1500);
        assert!(c.blocking().is_active());
        assert!(events.iter().any(|e| matches!(e, CoreEvent::Enforce(EnforcementRequest::Install(_)))));
        assert_eq!(notifications(&events), vec![NotificationKind::SessionStarted]);
    }

    #[test]
    fn test_start_without_blocking_enabled() {
        let (mut c, _) = make_controller();
        c.update_settings(&SettingsPatch {
            blocking_enabled: Some(false),
            ..Default::default()
        });
        c.start(t0()).unwrap();
        assert!(!c.blocking().is_active());
    }

    #[test]
    fn test_invalid_transitions_leave_state_alone() {
        let (mut c, _) = make_controller();
        assert!(matches!(c.pause(t0()), Err(TransitionError::NotRunning)));
        assert!(matches!(c.resume(t0()), Err(TransitionError::NotPaused)));
        assert!(matches!(c.stop(t0()), Err(TransitionError::NoActiveSession)));
        assert_eq!(c.session().phase(), SessionPhase::Idle);

        c.start(t0()).unwrap();
        let before = c.session().clone();
        assert!(matches!(c.start(at(5)), Err(TransitionError::SessionActive)));
        assert!(matches!(c.resume(at(5)), Err(TransitionError::NotPaused)));
        assert_eq!(c.session(), &before);

        assert_eq!(TransitionError::NotRunning.code(), ErrorCode::InvalidState);
    }

    #[test]
    fn test_tick_counts_down() {
        let (mut c, _) = make_controller();
        c.start(t0()).unwrap();

        let events = c.tick(at(1));
        assert_eq!(
            events,
            vec![CoreEvent::Tick {
                mode: TimerMode::Work,
                remaining_seconds: 1499
            }]
        );

        // Missed ticks do not cause drift
        c.tick(at(600));
        assert_eq!(c.session().remaining_seconds, 900);
        assert_eq!(c.daily_stats().focus_seconds_accumulated, 600);
    }

    #[test]
    fn test_classic_cycle_25_5_4() {
        let (mut c, _) = make_controller();
        c.start(t0()).unwrap();

        let events = c.tick(at(1500));
        assert_eq!(c.session().mode, TimerMode::Break);
        assert!(c.session().running);
        assert_eq!(c.session().sessions_completed, 1);
        assert_eq!(c.session().remaining_seconds, 300);
        assert!(!c.blocking().is_active());
        assert!(events.contains(&CoreEvent::Enforce(EnforcementRequest::Clear)));
        assert_eq!(notifications(&events), vec![NotificationKind::WorkComplete]);
        assert_eq!(c.daily_stats().sessions_completed_today, 1);
        assert_eq!(c.daily_stats().focus_seconds_accumulated, 1500);

        let events = c.tick(at(1800));
        assert_eq!(c.session().mode, TimerMode::Work);
        assert_eq!(c.session().remaining_seconds, 1500);
        assert_eq!(c.session().phase(), SessionPhase::Idle);
        assert_eq!(notifications(&events), vec![NotificationKind::BreakComplete]);
    }

    #[test]
    fn test_work_of_any_length_completes_after_its_duration() {
        for minutes in [1_i64, 7, 60] {
            let (mut c, _) = make_controller();
            c.update_settings(&SettingsPatch {
                work_duration_minutes: Some(minutes),
                ..Default::default()
            });
            c.start(t0()).unwrap();

            c.tick(at(minutes * 60 - 1));
            assert_eq!(c.session().mode, TimerMode::Work);

            c.tick(at(minutes * 60));
            assert_eq!(c.session().mode, TimerMode::Break);
            assert_eq!(c.session().sessions_completed, 1);
        }
    }

    #[test]
    fn test_long_break_cadence() {
        let (mut c, _) = make_controller();
        c.update_settings(&SettingsPatch {
            sessions_before_long_break: Some(2),
            auto_start_work: Some(true),
            ..Default::default()
        });
        c.start(t0()).unwrap();

        c.tick(at(1500));
        assert_eq!(c.session().mode, TimerMode::Break);
        c.tick(at(1800));
        assert_eq!(c.session().mode, TimerMode::Work);
        assert!(c.session().running);
        assert!(c.blocking().is_active());
        c.tick(at(3300));
        assert_eq!(c.session().mode, TimerMode::LongBreak);
        assert_eq!(c.session().remaining_seconds, 900);
        assert_eq!(c.session().sessions_completed, 2);
    }

    #[test]
    fn test_no_auto_start_parks_break() {
        let (mut c, _) = make_controller();
        c.update_settings(&SettingsPatch {
            auto_start_breaks: Some(false),
            ..Default::default()
        });
        c.start(t0()).unwrap();
        c.tick(at(1500));

        assert_eq!(c.session().phase(), SessionPhase::Idle);
        assert_eq!(c.session().mode, TimerMode::Break);
        assert_eq!(c.session().remaining_seconds, 300);

        // Explicit start runs the pending break without blocking
        c.start(at(2000)).unwrap();
        assert_eq!(c.session().phase(), SessionPhase::Running { mode: TimerMode::Break });
        assert!(!c.blocking().is_active());
    }

    #[test]
    fn test_stop_with_one_second_left() {
        let (mut c, _) = make_controller();
        c.start(t0()).unwrap();
        c.tick(at(1499));
        assert_eq!(c.session().remaining_seconds, 1);

        let events = c.stop(at(1499)).unwrap();
        assert_eq!(c.session().phase(), SessionPhase::Idle);
        assert_eq!(c.session().mode, TimerMode::Work);
        assert_eq!(c.session().remaining_seconds, 0);
        assert_eq!(c.session().sessions_completed, 0);
        assert!(!c.blocking().is_active());
        assert_eq!(notifications(&events), vec![NotificationKind::SessionStopped]);

        // The tick that would have completed it finds nothing to do
        let events = c.tick(at(1500));
        assert!(notifications(&events).is_empty());
    }

    #[test]
    fn test_stop_beats_pending_completion() {
        let (mut c, _) = make_controller();
        c.start(t0()).unwrap();

        // Deadline passed but no tick handled yet
        let events = c.stop(at(1510)).unwrap();
        assert!(!notifications(&events).contains(&NotificationKind::WorkComplete));
        assert_eq!(c.session().sessions_completed, 0);
        assert_eq!(c.daily_stats().focus_seconds_accumulated, 1500);
    }

    #[test]
    fn test_pause_resume_symmetry() {
        let (mut c, _) = make_controller();
        c.start(t0()).unwrap();
        c.tick(at(100));

        c.pause(at(100)).unwrap();
        let paused_remaining = c.session().remaining_seconds;
        assert_eq!(paused_remaining, 1400);

        c.resume(at(100)).unwrap();
        assert_eq!(c.snapshot(at(100)).session.remaining_seconds, paused_remaining);
    }

    #[test]
    fn test_time_does_not_pass_while_paused() {
        let (mut c, _) = make_controller();
        c.start(t0()).unwrap();
        c.pause(at(60)).unwrap();

        assert!(c.tick(at(5000)).is_empty());
        c.resume(at(5000)).unwrap();
        c.tick(at(5010));
        assert_eq!(c.session().remaining_seconds, 1430);
        assert_eq!(c.daily_stats().focus_seconds_accumulated, 70);
    }

    #[test]
    fn test_pause_keeps_blocking_by_default() {
        let (mut c, _) = make_controller();
        c.start(t0()).unwrap();
        c.pause(at(10)).unwrap();
        assert!(c.blocking().is_active());
    }

    #[test]
    fn test_pause_drops_blocking_when_configured() {
        let (mut c, _) = make_controller();
        c.update_settings(&SettingsPatch {
            block_while_paused: Some(false),
            ..Default::default()
        });
        c.start(t0()).unwrap();

        let events = c.pause(at(10)).unwrap();
        assert!(!c.blocking().is_active());
        assert!(events.contains(&CoreEvent::Enforce(EnforcementRequest::Clear)));

        c.resume(at(20)).unwrap();
        assert!(c.blocking().is_active());
    }

    #[test]
    fn test_enable_blocking_is_idempotent() {
        let (mut c, _) = make_controller();
        let first = c.enable_blocking(None).unwrap();
        assert!(!first.is_empty());
        let domains = c.blocking().domains().clone();

        let second = c.enable_blocking(None).unwrap();
        assert!(second.is_empty());
        assert_eq!(c.blocking().domains(), &domains);

        assert!(!c.disable_blocking().is_empty());
        assert!(c.disable_blocking().is_empty());
    }

    #[test]
    fn test_enable_blocking_with_domains() {
        let (mut c, _) = make_controller();
        let domains = vec!["https://www.Example.com/page".to_string()];
        c.enable_blocking(Some(&domains)).unwrap();

        assert_eq!(c.check_domain("news.example.com").as_deref(), Some("example.com"));
        assert_eq!(c.check_domain("youtube.com"), None);

        let empty = vec!["  ".to_string()];
        assert!(matches!(
            c.enable_blocking(Some(&empty)),
            Err(TransitionError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_check_domain_respects_allowlist_and_state() {
        let (mut c, _) = make_controller();
        assert_eq!(c.check_domain("youtube.com"), None);

        c.update_settings(&SettingsPatch {
            allowlist: Some(vec!["music.youtube.com".into()]),
            ..Default::default()
        });
        c.start(t0()).unwrap();

        assert_eq!(c.check_domain("www.youtube.com").as_deref(), Some("youtube.com"));
        assert_eq!(c.check_domain("music.youtube.com"), None);
    }

    #[test]
    fn test_navigation_blocked_counts_each_report() {
        let (mut c, _) = make_controller();
        c.start(t0()).unwrap();

        let (counted, events) = c.record_blocked("youtube.com", at(5));
        assert!(counted);
        assert!(events.iter().any(|e| matches!(e, CoreEvent::StatsChanged(_))));
        c.record_blocked("youtube.com", at(6));
        assert_eq!(c.daily_stats().blocked_attempts_today, 2);

        c.stop(at(7)).unwrap();
        let (counted, _) = c.record_blocked("youtube.com", at(8));
        assert!(!counted);
        assert_eq!(c.daily_stats().blocked_attempts_today, 2);
    }

    #[test]
    fn test_blocked_notification_follows_toggle() {
        let (mut c, _) = make_controller();
        c.start(t0()).unwrap();
        let (_, events) = c.record_blocked("youtube.com", at(1));
        assert!(notifications(&events).is_empty());

        c.update_settings(&SettingsPatch {
            notify_blocked: Some(true),
            ..Default::default()
        });
        let (_, events) = c.record_blocked("youtube.com", at(2));
        assert_eq!(notifications(&events), vec![NotificationKind::NavigationBlocked]);
    }

    #[test]
    fn test_enforcement_failure_is_retried_on_tick() {
        let (mut c, _) = make_controller();
        c.start(t0()).unwrap();
        c.enforcement_failed();
        assert!(!c.snapshot(t0()).blocking.in_sync);

        let events = c.tick(at(1));
        assert!(events.iter().any(|e| matches!(e, CoreEvent::Enforce(EnforcementRequest::Install(_)))));
        assert!(c.blocking().in_sync());
        assert!(c.blocking().is_active());
    }

    #[test]
    fn test_daily_rollover_on_read() {
        let store = Arc::new(MemoryStore::new());
        let yesterday = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let mut stale = DailyStats::new(yesterday);
        stale.focus_seconds_accumulated = 4200;
        stale.sessions_completed_today = 3;
        stale.blocked_attempts_today = 7;
        store.save_json(StateKey::DailyStats, &stale).unwrap();

        let mut c = SessionController::new(store.clone(), Settings::default(), t0());
        let snapshot = c.snapshot(t0());

        assert_eq!(snapshot.daily_stats, DailyStats::new(t0().date_naive()));
        assert_eq!(c.history(7).unwrap(), vec![stale]);
    }

    #[test]
    fn test_rollover_at_midnight_during_work() {
        let (mut c, _) = make_controller();
        let late = Local.with_ymd_and_hms(2025, 6, 2, 23, 50, 0).unwrap();
        c.start(late).unwrap();
        c.tick(late + Duration::seconds(300));
        assert_eq!(c.daily_stats().focus_seconds_accumulated, 300);

        let after_midnight = late + Duration::seconds(900);
        let events = c.tick(after_midnight);
        assert!(events.iter().any(|e| matches!(e, CoreEvent::StatsChanged(s) if s.date == after_midnight.date_naive())));
        assert_eq!(c.daily_stats().date, after_midnight.date_naive());
        assert_eq!(c.daily_stats().focus_seconds_accumulated, 600);
    }

    #[test]
    fn test_settings_are_clamped() {
        let (mut c, _) = make_controller();
        let events = c.update_settings(&SettingsPatch {
            work_duration_minutes: Some(-10),
            ..Default::default()
        });
        assert!(matches!(events[0], CoreEvent::SettingsChanged(_)));
        assert_eq!(c.settings().work_duration_minutes, 1);

        assert!(c.update_settings(&SettingsPatch::default()).is_empty());
    }

    #[test]
    fn test_settings_change_during_work_updates_blocking() {
        let (mut c, _) = make_controller();
        c.start(t0()).unwrap();

        let events = c.update_settings(&SettingsPatch {
            denylist: Some(vec!["reddit.com".into()]),
            ..Default::default()
        });
        assert!(events.contains(&CoreEvent::Enforce(EnforcementRequest::Install(
            ["reddit.com".to_string()].into_iter().collect()
        ))));

        c.update_settings(&SettingsPatch {
            blocking_enabled: Some(false),
            ..Default::default()
        });
        assert!(!c.blocking().is_active());
    }

    #[test]
    fn test_persistence_retry() {
        let (mut c, store) = make_controller();
        store.set_fail_writes(true);

        c.start(t0()).unwrap();
        assert!(c.persist_pending());
        assert_eq!(c.session().phase(), SessionPhase::Running { mode: TimerMode::Work });

        store.set_fail_writes(false);
        c.tick(at(1));
        assert!(!c.persist_pending());

        let restored: SessionState = store.load_json(StateKey::SessionState).unwrap().unwrap();
        assert!(restored.running);
    }

    #[test]
    fn test_restart_mid_interval() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        {
            let mut c = SessionController::new(store.clone(), Settings::default(), t0());
            c.startup(t0());
            c.start(t0()).unwrap();
            c.tick(at(600));
        }

        let mut c = SessionController::new(store.clone(), Settings::default(), at(900));
        let events = c.startup(at(900));
        assert!(c.blocking().is_active());
        assert!(events.iter().any(|e| matches!(e, CoreEvent::Enforce(EnforcementRequest::Install(_)))));

        c.tick(at(900));
        assert_eq!(c.session().remaining_seconds, 600);
        // Focus already credited before the restart is not counted twice
        assert_eq!(c.daily_stats().focus_seconds_accumulated, 900);
    }

    #[test]
    fn test_suspension_completes_once() {
        let store = Arc::new(MemoryStore::new());
        {
            let mut c = SessionController::new(store.clone(), Settings::default(), t0());
            c.start(t0()).unwrap();
        }

        // Host slept for two hours
        let wake = at(7200);
        let mut c = SessionController::new(store.clone(), Settings::default(), wake);
        c.startup(wake);
        c.tick(wake);

        assert_eq!(c.session().sessions_completed, 1);
        assert_eq!(c.session().phase(), SessionPhase::Running { mode: TimerMode::Break });
        assert_eq!(c.session().started_at, Some(wake));
        assert_eq!(c.daily_stats().focus_seconds_accumulated, 1500);
    }

    #[test]
    fn test_legacy_session_blob() {
        let store = Arc::new(MemoryStore::new());
        store.insert_raw(
            StateKey::SessionState,
            serde_json::json!({"running": true, "paused": false, "mode": "work", "remainingSeconds": 120}),
        );

        let mut c = SessionController::new(store.clone(), Settings::default(), t0());
        c.tick(at(20));
        assert_eq!(c.session().remaining_seconds, 100);
    }

    #[test]
    fn test_startup_clears_stale_enforcement() {
        let store = Arc::new(MemoryStore::new());
        let mut c = SessionController::new(store, Settings::default(), t0());
        let events = c.startup(t0());
        assert_eq!(events, vec![CoreEvent::Enforce(EnforcementRequest::Clear)]);
    }

    #[test]
    fn test_seeds_settings_from_defaults() {
        let store = Arc::new(MemoryStore::new());
        let seeded = Settings {
            work_duration_minutes: 50,
            ..Settings::default()
        };
        let mut c = SessionController::new(store.clone(), seeded, t0());
        c.flush();

        let stored = Settings::from_json(store.load_blob(StateKey::Settings).unwrap().unwrap()).unwrap();
        assert_eq!(stored.work_duration_minutes, 50);
    }

    #[test]
    fn test_tasks_and_score() {
        let (mut c, _) = make_controller();
        let (a, events) = c.add_task("write report", t0()).unwrap();
        assert!(matches!(&events[0], CoreEvent::TasksChanged(list) if list.len() == 1));
        c.add_task("review PR", t0()).unwrap();

        c.toggle_task(a.id).unwrap();
        assert_eq!(c.productivity_score(), 50);

        c.delete_task(a.id).unwrap();
        assert_eq!(c.tasks().len(), 1);
        assert!(matches!(c.delete_task(a.id), Err(TransitionError::TaskNotFound(_))));
        assert!(matches!(c.add_task("", t0()), Err(TransitionError::InvalidInput(_))));
    }

    #[test]
    fn test_export_import_round_trip() {
        let (mut a, _) = make_controller();
        a.update_settings(&SettingsPatch {
            work_duration_minutes: Some(45),
            allowlist: Some(vec!["docs.rs".into()]),
            ..Default::default()
        });
        a.add_task("write report", t0()).unwrap();
        a.start(t0()).unwrap();
        a.record_blocked("youtube.com", at(10));
        a.tick(at(600));

        let exported = a.export(at(600));
        let json = serde_json::to_string_pretty(&exported).unwrap();

        let (mut b, _) = make_controller();
        let document: ImportDocument = serde_json::from_str(&json).unwrap();
        let events = b.import(document, at(600));
        assert!(events.contains(&CoreEvent::StateReplaced));

        assert_eq!(b.settings(), a.settings());
        assert_eq!(b.daily_stats(), a.daily_stats());
        assert_eq!(b.tasks(), a.tasks());
    }

    #[test]
    fn test_import_of_stale_stats_rolls_over() {
        let (mut c, _) = make_controller();
        let mut old = DailyStats::new(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        old.sessions_completed_today = 5;

        c.import(
            ImportDocument {
                daily_stats: Some(old.clone()),
                ..Default::default()
            },
            t0(),
        );

        assert_eq!(c.daily_stats(), &DailyStats::new(t0().date_naive()));
        assert_eq!(c.history(10).unwrap(), vec![old]);
    }

    #[test]
    fn test_reset_stats_and_settings() {
        let (mut c, _) = make_controller();
        c.start(t0()).unwrap();
        c.tick(at(300));
        c.reset_stats(at(300));
        assert!(c.daily_stats().is_empty());

        c.update_settings(&SettingsPatch {
            break_duration_minutes: Some(10),
            ..Default::default()
        });
        assert!(!c.reset_settings().is_empty());
        assert_eq!(c.settings(), &Settings::default());
        assert!(c.reset_settings().is_empty());
    }

    fn stored_tasks(store: &MemoryStore) -> Vec<Task> {
        store.load_json(StateKey::Tasks).unwrap().unwrap_or_default()
    }

    #[test]
    fn test_unreadable_store_does_not_clobber_stored_state() {
        let store = Arc::new(MemoryStore::new());
        {
            let mut c = SessionController::new(store.clone(), Settings::default(), t0());
            for text in ["a", "b", "c"] {
                c.add_task(text, t0()).unwrap();
            }
            c.update_settings(&SettingsPatch {
                work_duration_minutes: Some(50),
                ..Default::default()
            });
        }
        assert_eq!(stored_tasks(&store).len(), 3);

        store.set_fail_reads(true);
        let mut c = SessionController::new(store.clone(), Settings::default(), at(60));
        assert!(c.load_pending());
        assert!(c.tasks().is_empty());

        // Still unreadable: changes are held in memory only
        c.add_task("d", at(61)).unwrap();
        c.tick(at(62));
        assert!(c.load_pending());
        assert!(c.persist_pending());
        assert_eq!(stored_tasks(&store).len(), 3);

        store.set_fail_reads(false);
        let events = c.tick(at(63));
        assert!(!c.load_pending());
        assert!(events.contains(&CoreEvent::StateReplaced));
        assert_eq!(c.settings().work_duration_minutes, 50);

        c.add_task("e", at(64)).unwrap();
        let texts: Vec<String> = stored_tasks(&store).into_iter().map(|t| t.text).collect();
        assert_eq!(texts, vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn test_load_retry_combines_todays_counters() {
        let store = Arc::new(MemoryStore::new());
        {
            let mut c = SessionController::new(store.clone(), Settings::default(), t0());
            c.reset_stats(t0());
        }
        let mut stats: DailyStats = store.load_json(StateKey::DailyStats).unwrap().unwrap();
        stats.blocked_attempts_today = 2;
        store.insert_raw(StateKey::DailyStats, serde_json::to_value(&stats).unwrap());

        store.set_fail_reads(true);
        let mut c = SessionController::new(store.clone(), Settings::default(), at(10));
        c.enable_blocking(None).unwrap();
        c.record_blocked("youtube.com", at(11));

        store.set_fail_reads(false);
        c.tick(at(12));
        assert_eq!(c.daily_stats().blocked_attempts_today, 3);

        let stored: DailyStats = store.load_json(StateKey::DailyStats).unwrap().unwrap();
        assert_eq!(stored.blocked_attempts_today, 3);
    }

    #[test]
    fn test_duration_change_resizes_pending_interval() {
        let (mut c, _) = make_controller();
        c.update_settings(&SettingsPatch {
            auto_start_breaks: Some(false),
            ..Default::default()
        });
        c.start(t0()).unwrap();
        c.tick(at(1500));
        assert_eq!(c.session().phase(), SessionPhase::Idle);
        assert_eq!(c.session().remaining_seconds, 300);

        let events = c.update_settings(&SettingsPatch {
            break_duration_minutes: Some(10),
            ..Default::default()
        });
        assert_eq!(c.session().mode, TimerMode::Break);
        assert_eq!(c.session().remaining_seconds, 600);
        assert!(events.iter().any(|e| matches!(
            e,
            CoreEvent::ModeChanged { remaining_seconds: 600, .. }
        )));

        c.start(at(1600)).unwrap();
        assert_eq!(c.session().remaining_seconds, 600);
    }

    #[test]
    fn test_duration_change_leaves_running_and_stopped_alone() {
        let (mut c, _) = make_controller();
        c.start(t0()).unwrap();
        c.update_settings(&SettingsPatch {
            work_duration_minutes: Some(50),
            ..Default::default()
        });
        c.tick(at(10));
        assert_eq!(c.session().remaining_seconds, 1490);

        c.stop(at(20)).unwrap();
        let events = c.update_settings(&SettingsPatch {
            work_duration_minutes: Some(30),
            ..Default::default()
        });
        assert_eq!(c.session().remaining_seconds, 0);
        assert!(!events.iter().any(|e| matches!(e, CoreEvent::ModeChanged { .. })));
    }

    #[test]
    fn test_pause_notifies() {
        let (mut c, _) = make_controller();
        c.start(t0()).unwrap();
        let events = c.pause(at(30)).unwrap();
        assert_eq!(notifications(&events), vec![NotificationKind::SessionPaused]);

        c.resume(at(40)).unwrap();
        c.update_settings(&SettingsPatch {
            notify_start: Some(false),
            ..Default::default()
        });
        assert!(notifications(&c.pause(at(50)).unwrap()).is_empty());
    }
}
