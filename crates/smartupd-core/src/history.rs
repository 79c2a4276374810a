//! Bounded, newest-first log of applied updates
//!
//! `History` is the in-memory list owned by the updater actor. Every append
//! is written through to a `HistoryStore`, which persists the whole list as a
//! versioned blob.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use smartupd_api::{HISTORY_CAPACITY, HistoryRecord};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::CoreError;

/// Storage format version written by this build
pub const STORAGE_VERSION: u32 = 1;
/// Storage key, also used as the file stem
pub const STORAGE_KEY: &str = "smart_updater_history";

/// Persistence boundary for the update history
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Load the persisted records, empty if nothing was stored yet
    async fn load(&self) -> Result<Vec<HistoryRecord>, CoreError>;

    /// Overwrite the persisted records
    async fn save(&self, records: &[HistoryRecord]) -> Result<(), CoreError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredBlob<T> {
    version: u32,
    key: String,
    data: T,
}

/// `HistoryStore` writing a JSON file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<dir>/smart_updater_history.json`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(format!("{STORAGE_KEY}.json")))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl HistoryStore for JsonFileStore {
    async fn load(&self) -> Result<Vec<HistoryRecord>, CoreError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no stored history");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let blob: StoredBlob<Vec<HistoryRecord>> = serde_json::from_str(&content)?;
        if blob.version > STORAGE_VERSION {
            return Err(CoreError::Storage(format!(
                "{} has version {}, newest supported is {STORAGE_VERSION}",
                self.path.display(),
                blob.version
            )));
        }
        if blob.key != STORAGE_KEY {
            warn!(path = %self.path.display(), key = %blob.key, "unexpected storage key");
        }
        Ok(blob.data)
    }

    async fn save(&self, records: &[HistoryRecord]) -> Result<(), CoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let blob = StoredBlob {
            version: STORAGE_VERSION,
            key: STORAGE_KEY.to_string(),
            data: records,
        };
        let content = serde_json::to_string_pretty(&blob)?;

        // Write then rename so a crash never leaves a truncated file behind
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        debug!(path = %self.path.display(), count = records.len(), "history saved");
        Ok(())
    }
}

/// In-memory `HistoryStore` for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<HistoryRecord>>,
    saves: AtomicUsize,
    fail_saves: AtomicBool,
}

impl MemoryStore {
    /// Store pre-filled with records
    #[must_use]
    pub fn with_records(records: Vec<HistoryRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Self::default()
        }
    }

    /// Number of successful `save` calls
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Make every following `save` fail
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub async fn snapshot(&self) -> Vec<HistoryRecord> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl HistoryStore for MemoryStore {
    async fn load(&self) -> Result<Vec<HistoryRecord>, CoreError> {
        Ok(self.records.lock().await.clone())
    }

    async fn save(&self, records: &[HistoryRecord]) -> Result<(), CoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(CoreError::Storage("save rejected".to_string()));
        }
        *self.records.lock().await = records.to_vec();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// The live history list
pub struct History {
    records: Vec<HistoryRecord>,
    capacity: usize,
    store: Arc<dyn HistoryStore>,
}

impl History {
    /// Load the history from its store
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub async fn load(store: Arc<dyn HistoryStore>) -> Result<Self, CoreError> {
        Self::load_with_capacity(store, HISTORY_CAPACITY).await
    }

    /// Load with a custom capacity
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub async fn load_with_capacity(
        store: Arc<dyn HistoryStore>,
        capacity: usize,
    ) -> Result<Self, CoreError> {
        let mut records = store.load().await?;
        records.truncate(capacity);
        Ok(Self {
            records,
            capacity,
            store,
        })
    }

    /// Records, newest first
    #[must_use]
    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Prepend a record, drop the oldest beyond capacity and persist
    ///
    /// # Errors
    /// Returns an error if persisting fails. The in-memory list keeps the
    /// record either way.
    pub async fn record(&mut self, record: HistoryRecord) -> Result<(), CoreError> {
        self.records.insert(0, record);
        self.records.truncate(self.capacity);
        self.store.save(&self.records).await
    }
}

impl std::fmt::Debug for History {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("History")
            .field("len", &self.records.len())
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Local, TimeZone};

    use super::*;

    fn record(n: i64) -> HistoryRecord {
        let base = Local.with_ymd_and_hms(2024, 1, 1, 3, 0, 0).unwrap();
        HistoryRecord {
            name: format!("component {n}"),
            old_version: format!("1.{n}"),
            new_version: format!("1.{}", n + 1),
            timestamp: (base + Duration::minutes(n)).fixed_offset(),
        }
    }

    #[tokio::test]
    async fn test_record_prepends_and_persists() {
        let store = Arc::new(MemoryStore::default());
        let mut history = History::load(store.clone()).await.unwrap();

        history.record(record(1)).await.unwrap();
        history.record(record(2)).await.unwrap();

        assert_eq!(history.records()[0], record(2));
        assert_eq!(history.records()[1], record(1));
        assert_eq!(store.save_count(), 2);
        assert_eq!(store.snapshot().await, history.records());
    }

    #[tokio::test]
    async fn test_full_history_drops_oldest() {
        let existing: Vec<_> = (0..100).rev().map(record).collect();
        let store = Arc::new(MemoryStore::with_records(existing));
        let mut history = History::load(store.clone()).await.unwrap();
        assert_eq!(history.len(), 100);

        history.record(record(100)).await.unwrap();

        assert_eq!(history.len(), 100);
        assert_eq!(history.records()[0], record(100));
        assert_eq!(history.records()[99], record(1));
        assert!(!history.records().contains(&record(0)));
        assert_eq!(store.snapshot().await.len(), 100);
    }

    #[tokio::test]
    async fn test_length_never_exceeds_capacity() {
        let store = Arc::new(MemoryStore::default());
        let mut history = History::load_with_capacity(store, 5).await.unwrap();

        for n in 0..12 {
            history.record(record(n)).await.unwrap();
            assert!(history.len() <= 5);
        }
        let newest_first: Vec<_> = history.records().iter().map(|r| r.timestamp).collect();
        let mut sorted = newest_first.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(newest_first, sorted);
    }

    #[tokio::test]
    async fn test_oversized_store_is_truncated_on_load() {
        let existing: Vec<_> = (0..150).rev().map(record).collect();
        let store = Arc::new(MemoryStore::with_records(existing));
        let history = History::load(store).await.unwrap();
        assert_eq!(history.len(), HISTORY_CAPACITY);
        assert_eq!(history.records()[0], record(149));
    }

    #[tokio::test]
    async fn test_save_failure_propagates() {
        let store = Arc::new(MemoryStore::default());
        store.fail_saves(true);
        let mut history = History::load(store).await.unwrap();

        let result = history.record(record(1)).await;
        assert!(matches!(result, Err(CoreError::Storage(_))));
    }

    #[tokio::test]
    async fn test_json_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::in_dir(dir.path());
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_json_store_persists_versioned_blob() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::in_dir(dir.path().join("nested"));

        store.save(&[record(2), record(1)]).await.unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["key"], STORAGE_KEY);
        assert_eq!(value["data"].as_array().unwrap().len(), 2);

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, vec![record(2), record(1)]);
    }

    #[tokio::test]
    async fn test_json_store_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::in_dir(dir.path());

        store.save(&[record(1)]).await.unwrap();
        store.save(&[record(3), record(2)]).await.unwrap();

        assert_eq!(store.load().await.unwrap(), vec![record(3), record(2)]);
    }

    #[tokio::test]
    async fn test_json_store_rejects_newer_version() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::in_dir(dir.path());
        std::fs::write(
            store.path(),
            r#"{"version": 2, "key": "smart_updater_history", "data": []}"#,
        )
        .unwrap();

        assert!(matches!(store.load().await, Err(CoreError::Storage(_))));
    }
}
