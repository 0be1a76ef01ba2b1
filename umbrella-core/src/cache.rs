//! Per-coordinate forecast cache on top of a best-effort key-value store.
//!
//! The cache never enforces expiry: [`is_fresh`] is a separate pure check and
//! callers decide whether a stale entry is acceptable. Store failures are
//! absorbed here and only logged; a broken store reads as a cache miss and a
//! failed write is forgotten.

use std::{
    collections::HashMap,
    fmt::Debug,
    fs,
    path::PathBuf,
    sync::Mutex,
    time::Duration,
};

use chrono::Utc;

use crate::error::PersistenceError;
use crate::model::{CacheEntry, DailyForecast};

const KEY_PREFIX: &str = "wx:";

/// String-keyed, string-valued persistent storage.
pub trait KeyValueStore: Send + Sync + Debug {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;
    fn set(&self, key: &str, value: String) -> Result<(), PersistenceError>;
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let entries = self.entries.lock().map_err(|_| PersistenceError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> Result<(), PersistenceError> {
        let mut entries = self.entries.lock().map_err(|_| PersistenceError::Poisoned)?;
        entries.insert(key.to_string(), value);
        Ok(())
    }
}

/// All keys in one JSON object file.
///
/// Writes go to a sibling temp file that is then renamed over the original,
/// so a reader sees either the old map or the new one.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    fn read_map(&self) -> Result<HashMap<String, String>, PersistenceError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let raw = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let _guard = self.lock.lock().map_err(|_| PersistenceError::Poisoned)?;
        Ok(self.read_map()?.remove(key))
    }

    fn set(&self, key: &str, value: String) -> Result<(), PersistenceError> {
        let _guard = self.lock.lock().map_err(|_| PersistenceError::Poisoned)?;

        // A corrupt file is replaced rather than blocking every future write.
        // Any other read failure drops this write and leaves the file alone.
        let mut map = match self.read_map() {
            Ok(map) => map,
            Err(PersistenceError::Serialize(err)) => {
                tracing::debug!(
                    path = %self.path.display(),
                    error = %err,
                    "replacing corrupt store"
                );
                HashMap::new()
            }
            Err(err) => return Err(err),
        };
        map.insert(key.to_string(), value);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string(&map)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Freshness check: `now - fetched_at < window`, strictly.
pub fn is_fresh(entry: &CacheEntry, now_ms: i64, window: Duration) -> bool {
    let window_ms = i64::try_from(window.as_millis()).unwrap_or(i64::MAX);
    now_ms.saturating_sub(entry.fetched_at_ms) < window_ms
}

#[derive(Debug)]
pub struct ForecastCache {
    store: Box<dyn KeyValueStore>,
}

impl ForecastCache {
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStore::new()))
    }

    /// Last stored entry for `coordinate_key`, or `None` on a miss or any
    /// storage/decoding failure.
    pub fn read(&self, coordinate_key: &str) -> Option<CacheEntry> {
        let raw = match self.store.get(&store_key(coordinate_key)) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                tracing::debug!(key = coordinate_key, error = %err, "cache read failed");
                return None;
            }
        };

        match serde_json::from_str::<CacheEntry>(&raw) {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::debug!(key = coordinate_key, error = %err, "discarding corrupt entry");
                None
            }
        }
    }

    /// Store `forecast` stamped with the current time.
    pub fn write(&self, coordinate_key: &str, forecast: DailyForecast) {
        self.write_at(coordinate_key, forecast, Utc::now().timestamp_millis());
    }

    /// Store `forecast` stamped with `fetched_at_ms`, replacing any prior entry.
    pub fn write_at(&self, coordinate_key: &str, forecast: DailyForecast, fetched_at_ms: i64) {
        let entry = CacheEntry {
            coordinate_key: coordinate_key.to_string(),
            forecast,
            fetched_at_ms,
        };

        let result = serde_json::to_string(&entry)
            .map_err(PersistenceError::from)
            .and_then(|raw| self.store.set(&store_key(coordinate_key), raw));

        if let Err(err) = result {
            tracing::debug!(key = coordinate_key, error = %err, "cache write dropped");
        }
    }
}

fn store_key(coordinate_key: &str) -> String {
    format!("{KEY_PREFIX}{coordinate_key}")
}
