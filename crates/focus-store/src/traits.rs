//! Store trait definitions

use focus_api::DailyStats;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::StoreResult;

/// Key of a persisted state blob
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKey {
    Settings,
    SessionState,
    DailyStats,
    Tasks,
}

impl StateKey {
    pub const ALL: [StateKey; 4] = [
        StateKey::Settings,
        StateKey::SessionState,
        StateKey::DailyStats,
        StateKey::Tasks,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StateKey::Settings => "settings",
            StateKey::SessionState => "sessionState",
            StateKey::DailyStats => "dailyStats",
            StateKey::Tasks => "tasks",
        }
    }
}

impl std::fmt::Display for StateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main store trait
pub trait Store: Send + Sync {
    // State blobs

    /// Load the blob stored under `key`
    fn load_blob(&self, key: StateKey) -> StoreResult<Option<Value>>;

    /// Overwrite several blobs at once. Either all are written or none.
    fn save_blobs(&self, blobs: &[(StateKey, Value)]) -> StoreResult<()>;

    // History

    /// Record the totals of a finished day, replacing any earlier record
    fn archive_day(&self, stats: &DailyStats) -> StoreResult<()>;

    /// Most recent archived days, newest first
    fn recent_days(&self, limit: usize) -> StoreResult<Vec<DailyStats>>;

    // Health

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}

/// Typed helpers over the blob interface
pub trait StoreExt: Store {
    fn load_json<T: DeserializeOwned>(&self, key: StateKey) -> StoreResult<Option<T>> {
        match self.load_blob(key)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    fn save_json<T: Serialize>(&self, key: StateKey, value: &T) -> StoreResult<()> {
        self.save_blobs(&[(key, serde_json::to_value(value)?)])
    }
}

impl<S: Store + ?Sized> StoreExt for S {}
