//! Lenient loading of the persisted state blobs
//!
//! Stored blobs may come from an older or newer build. Each one is merged
//! over defaults field by field; a blob that cannot be read at all is
//! replaced by defaults with a warning rather than failing startup.

use focus_api::{DailyStats, SessionState, Settings, Task};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::{StateKey, Store, StoreResult};

/// Everything the controller restores at startup
#[derive(Debug, Clone, Default)]
pub struct PersistedState {
    /// None when nothing usable is stored; the caller seeds from config
    pub settings: Option<Settings>,
    pub session: SessionState,
    pub daily_stats: Option<DailyStats>,
    pub tasks: Vec<Task>,
}

/// Load all blobs. Only a failing store is an error; bad blobs are not.
pub fn load_persisted(store: &dyn Store) -> StoreResult<PersistedState> {
    let settings = match store.load_blob(StateKey::Settings)? {
        Some(value) => match Settings::from_json(value) {
            Ok(settings) => Some(settings),
            Err(e) => {
                warn!(key = %StateKey::Settings, error = %e, "Discarding unreadable blob");
                None
            }
        },
        None => None,
    };

    Ok(PersistedState {
        settings,
        session: parse_or_warn(StateKey::SessionState, store.load_blob(StateKey::SessionState)?)
            .unwrap_or_default(),
        daily_stats: parse_or_warn(StateKey::DailyStats, store.load_blob(StateKey::DailyStats)?),
        tasks: load_tasks(store.load_blob(StateKey::Tasks)?),
    })
}

fn parse_or_warn<T: DeserializeOwned>(key: StateKey, value: Option<Value>) -> Option<T> {
    let value = value?;
    match serde_json::from_value(value) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!(key = %key, error = %e, "Discarding unreadable blob");
            None
        }
    }
}

/// Tasks are parsed one by one so a single bad entry does not lose the list.
fn load_tasks(value: Option<Value>) -> Vec<Task> {
    let Some(items) = parse_or_warn::<Vec<Value>>(StateKey::Tasks, value) else {
        return Vec::new();
    };

    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<Task>(item) {
            Ok(task) => Some(task),
            Err(e) => {
                warn!(error = %e, "Skipping unreadable task");
                None
            }
        })
        .collect()
}
