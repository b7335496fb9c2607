//! DurableStore - best-effort file persistence for store snapshots.
//!
//! The whole dataset round-trips as one JSON value per well-known key. A
//! missing or unwritable file degrades silently to memory-only retention;
//! only a present-but-unparseable snapshot surfaces an error.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing::warn;

use super::Document;
use crate::error::StoreError;

/// The full dataset: collection name → document id → fields.
///
/// Documents are keyed in id order, which is also the tie-break order for
/// query results.
pub type Collections = BTreeMap<String, BTreeMap<String, Document>>;

/// Well-known key for the collections snapshot.
pub const COLLECTIONS_KEY: &str = "collections";

/// Well-known key for the current session record.
pub const SESSION_KEY: &str = "session";

struct DurableInner {
    dir: Option<PathBuf>,
    retained: Mutex<HashMap<String, Value>>,
}

/// Best-effort persistence for named snapshot values.
///
/// Clone-friendly via `Arc`; a `Database` and a `SessionStore` typically
/// share one instance.
#[derive(Clone)]
pub struct DurableStore {
    inner: Arc<DurableInner>,
}

impl DurableStore {
    /// File-backed store rooted at a directory. Each key persists as
    /// `<dir>/<key>.json`.
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        DurableStore {
            inner: Arc::new(DurableInner {
                dir: Some(dir.into()),
                retained: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Store with no persistence medium; snapshots live for the process only.
    pub fn in_memory() -> Self {
        DurableStore {
            inner: Arc::new(DurableInner {
                dir: None,
                retained: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Whether this store writes snapshots to disk.
    pub fn is_persistent(&self) -> bool {
        self.inner.dir.is_some()
    }

    /// Load the snapshot under `key`.
    ///
    /// The retained in-memory copy wins when present (it is the latest
    /// snapshot this process has seen). A missing or unreadable file yields
    /// `Ok(None)`; an unparseable file yields `StoreError::Unavailable`.
    pub fn load(&self, key: &str) -> Result<Option<Value>, StoreError> {
        {
            let retained = self.retained()?;
            if let Some(value) = retained.get(key) {
                return Ok(Some(value.clone()));
            }
        }
        let Some(dir) = &self.inner.dir else {
            return Ok(None);
        };
        let path = Self::file_path(dir, key);
        match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| StoreError::Unavailable(format!("{}: {}", path.display(), e))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "snapshot unreadable, treating as absent");
                Ok(None)
            }
        }
    }

    /// Persist the snapshot under `key`.
    ///
    /// The value is always retained in memory; a failed file write is logged
    /// and otherwise swallowed, so a same-process `load` still sees it.
    pub fn save(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        self.retained()?.insert(key.to_string(), value.clone());
        if let Some(dir) = &self.inner.dir {
            if let Err(e) = Self::write_file(dir, key, value) {
                warn!(key, error = %e, "snapshot not persisted, retained in memory only");
            }
        }
        Ok(())
    }

    fn retained(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Value>>, StoreError> {
        self.inner
            .retained
            .lock()
            .map_err(|_| StoreError::Storage("durable store retained map poisoned".into()))
    }

    fn file_path(dir: &Path, key: &str) -> PathBuf {
        dir.join(format!("{}.json", key))
    }

    fn write_file(dir: &Path, key: &str, value: &Value) -> io::Result<()> {
        fs::create_dir_all(dir)?;
        let bytes = serde_json::to_vec(value).map_err(|e| io::Error::new(ErrorKind::InvalidData, e))?;
        fs::write(Self::file_path(dir, key), bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn file_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = DurableStore::at(dir.path());
        store
            .save(COLLECTIONS_KEY, &json!({"offerings": {"o1": {"price": 50}}}))
            .unwrap();

        // a fresh store over the same directory reads it back from disk
        let reopened = DurableStore::at(dir.path());
        let loaded = reopened.load(COLLECTIONS_KEY).unwrap().unwrap();
        assert_eq!(loaded["offerings"]["o1"]["price"], json!(50));
    }

    #[test]
    fn missing_file_is_silent() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = DurableStore::at(dir.path());
        assert_eq!(store.load(COLLECTIONS_KEY).unwrap(), None);
    }

    #[test]
    fn corrupt_file_is_unavailable() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(dir.path().join("collections.json"), b"{not json").unwrap();
        let store = DurableStore::at(dir.path());
        assert!(matches!(
            store.load(COLLECTIONS_KEY),
            Err(StoreError::Unavailable(_))
        ));
    }

    #[test]
    fn memory_only_retains_within_process() {
        let store = DurableStore::in_memory();
        assert!(!store.is_persistent());
        assert_eq!(store.load(SESSION_KEY).unwrap(), None);

        store.save(SESSION_KEY, &json!({"uid": "u1"})).unwrap();
        assert_eq!(
            store.load(SESSION_KEY).unwrap(),
            Some(json!({"uid": "u1"}))
        );
    }

    #[test]
    fn retained_copy_wins_over_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = DurableStore::at(dir.path());
        store.save(COLLECTIONS_KEY, &json!({"a": {}})).unwrap();

        // clobber the file behind the store's back; the retained copy still wins
        fs::write(dir.path().join("collections.json"), b"{}").unwrap();
        assert_eq!(store.load(COLLECTIONS_KEY).unwrap(), Some(json!({"a": {}})));
    }
}
