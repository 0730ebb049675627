//! In-memory store for tests

use focus_api::DailyStats;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::{StateKey, Store, StoreError, StoreResult};

/// Store that keeps everything in memory and can be told to fail
#[derive(Default)]
pub struct MemoryStore {
    blobs: Mutex<HashMap<StateKey, Value>>,
    history: Mutex<BTreeMap<chrono::NaiveDate, DailyStats>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    write_count: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail (or succeed again)
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Number of successful `save_blobs` calls
    pub fn write_count(&self) -> usize {
        self.write_count.load(Ordering::SeqCst)
    }

    /// Put a raw blob in place, bypassing failure injection
    pub fn insert_raw(&self, key: StateKey, value: Value) {
        if let Ok(mut blobs) = self.blobs.lock() {
            blobs.insert(key, value);
        }
    }

    fn blobs(&self) -> StoreResult<MutexGuard<'_, HashMap<StateKey, Value>>> {
        self.blobs.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn history(&self) -> StoreResult<MutexGuard<'_, BTreeMap<chrono::NaiveDate, DailyStats>>> {
        self.history.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn check_read(&self) -> StoreResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected read failure".into()));
        }
        Ok(())
    }

    fn check_write(&self) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected write failure".into()));
        }
        Ok(())
    }
}

impl Store for MemoryStore {
    fn load_blob(&self, key: StateKey) -> StoreResult<Option<Value>> {
        self.check_read()?;
        Ok(self.blobs()?.get(&key).cloned())
    }

    fn save_blobs(&self, blobs: &[(StateKey, Value)]) -> StoreResult<()> {
        self.check_write()?;
        let mut stored = self.blobs()?;
        for (key, value) in blobs {
            stored.insert(*key, value.clone());
        }
        self.write_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn archive_day(&self, stats: &DailyStats) -> StoreResult<()> {
        self.check_write()?;
        self.history()?.insert(stats.date, stats.clone());
        Ok(())
    }

    fn recent_days(&self, limit: usize) -> StoreResult<Vec<DailyStats>> {
        self.check_read()?;
        Ok(self.history()?.values().rev().take(limit).cloned().collect())
    }

    fn is_healthy(&self) -> bool {
        !self.fail_reads.load(Ordering::SeqCst) && !self.fail_writes.load(Ordering::SeqCst)
    }
}
