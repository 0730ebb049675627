//! SQLite-based store implementation

use chrono::NaiveDate;
use focus_api::DailyStats;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::{StateKey, Store, StoreError, StoreResult};

const DAY_FORMAT: &str = "%Y-%m-%d";

/// SQLite-based store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            r#"
            -- Namespaced state blobs, whole-object overwrites
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value_json TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- Finished days
            CREATE TABLE IF NOT EXISTS stats_history (
                day TEXT PRIMARY KEY,
                focus_seconds INTEGER NOT NULL DEFAULT 0,
                sessions INTEGER NOT NULL DEFAULT 0,
                blocked INTEGER NOT NULL DEFAULT 0
            );
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }
}

impl Store for SqliteStore {
    fn load_blob(&self, key: StateKey) -> StoreResult<Option<Value>> {
        let conn = self.lock()?;

        let json: Option<String> = conn
            .query_row(
                "SELECT value_json FROM kv WHERE key = ?",
                [key.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(s) => Ok(Some(serde_json::from_str(&s)?)),
            None => Ok(None),
        }
    }

    fn save_blobs(&self, blobs: &[(StateKey, Value)]) -> StoreResult<()> {
        let mut conn = self.lock()?;
        let now = focus_util::now().to_rfc3339();

        let tx = conn.transaction()?;
        for (key, value) in blobs {
            let json = serde_json::to_string(value)?;
            tx.execute(
                r#"
                INSERT INTO kv (key, value_json, updated_at)
                VALUES (?, ?, ?)
                ON CONFLICT(key)
                DO UPDATE SET value_json = excluded.value_json, updated_at = excluded.updated_at
                "#,
                params![key.as_str(), json, now],
            )?;
        }
        tx.commit()?;

        debug!(count = blobs.len(), "State blobs saved");
        Ok(())
    }

    fn archive_day(&self, stats: &DailyStats) -> StoreResult<()> {
        let conn = self.lock()?;
        let day_str = stats.date.format(DAY_FORMAT).to_string();

        conn.execute(
            r#"
            INSERT INTO stats_history (day, focus_seconds, sessions, blocked)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(day)
            DO UPDATE SET
                focus_seconds = excluded.focus_seconds,
                sessions = excluded.sessions,
                blocked = excluded.blocked
            "#,
            params![
                day_str,
                stats.focus_seconds_accumulated as i64,
                stats.sessions_completed_today,
                stats.blocked_attempts_today
            ],
        )?;

        debug!(
            day = %day_str,
            focus_secs = stats.focus_seconds_accumulated,
            sessions = stats.sessions_completed_today,
            blocked = stats.blocked_attempts_today,
            "Day archived"
        );
        Ok(())
    }

    fn recent_days(&self, limit: usize) -> StoreResult<Vec<DailyStats>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT day, focus_seconds, sessions, blocked FROM stats_history ORDER BY day DESC LIMIT ?",
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            let day: String = row.get(0)?;
            let focus_seconds: i64 = row.get(1)?;
            let sessions: u32 = row.get(2)?;
            let blocked: u32 = row.get(3)?;
            Ok((day, focus_seconds, sessions, blocked))
        })?;

        let mut days = Vec::new();
        for row in rows {
            let (day, focus_seconds, sessions, blocked) = row?;
            let Ok(date) = NaiveDate::parse_from_str(&day, DAY_FORMAT) else {
                warn!(day = %day, "Skipping history row with unparsable day");
                continue;
            };
            days.push(DailyStats {
                date,
                focus_seconds_accumulated: focus_seconds.max(0) as u64,
                sessions_completed_today: sessions,
                blocked_attempts_today: blocked,
            });
        }

        Ok(days)
    }

    fn is_healthy(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => {
                warn!("Store lock poisoned");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreExt;
    use focus_api::{SessionState, TimerMode};
    use serde_json::json;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    #[test]
    fn test_in_memory_store() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.is_healthy());
        assert!(store.load_blob(StateKey::Settings).unwrap().is_none());
    }

    #[test]
    fn test_blob_overwrite() {
        let store = SqliteStore::in_memory().unwrap();

        store
            .save_blobs(&[(StateKey::Tasks, json!([1, 2]))])
            .unwrap();
        store
            .save_blobs(&[(StateKey::Tasks, json!([3]))])
            .unwrap();

        assert_eq!(store.load_blob(StateKey::Tasks).unwrap(), Some(json!([3])));
    }

    #[test]
    fn test_typed_helpers() {
        let store = SqliteStore::in_memory().unwrap();
        let state = SessionState {
            running: true,
            mode: TimerMode::Break,
            remaining_seconds: 120,
            ..Default::default()
        };

        store.save_json(StateKey::SessionState, &state).unwrap();
        let loaded: SessionState = store.load_json(StateKey::SessionState).unwrap().unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn test_history_order_and_replace() {
        let store = SqliteStore::in_memory().unwrap();

        let mut first = DailyStats::new(day(1));
        first.focus_seconds_accumulated = 1500;
        store.archive_day(&first).unwrap();

        let mut second = DailyStats::new(day(2));
        second.sessions_completed_today = 3;
        store.archive_day(&second).unwrap();

        first.blocked_attempts_today = 9;
        store.archive_day(&first).unwrap();

        let days = store.recent_days(10).unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(days[0], second);
        assert_eq!(days[1], first);

        assert_eq!(store.recent_days(1).unwrap().len(), 1);
    }

    #[test]
    fn test_reopen_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("focusd.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store
                .save_blobs(&[(StateKey::Settings, json!({"workDurationMinutes": 40}))])
                .unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(
            store.load_blob(StateKey::Settings).unwrap(),
            Some(json!({"workDurationMinutes": 40}))
        );
    }
}
