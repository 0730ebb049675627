//! Persistence layer for focusd
//!
//! Provides:
//! - Namespaced JSON blobs (`settings`, `sessionState`, `dailyStats`, `tasks`)
//! - Archived per-day statistics
//! - Lenient loading of stored state
//! - An in-memory store with failure injection for tests

mod memory;
mod persisted;
mod sqlite;
mod traits;

pub use memory::*;
pub use persisted::*;
pub use sqlite::*;
pub use traits::*;

use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store lock poisoned")]
    LockPoisoned,

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
