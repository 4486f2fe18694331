//! Local offline storage
//!
//! Key-value persistence of whole store snapshots. Each value is a
//! [`PersistedTopic`] envelope carrying the schema version, so old snapshots
//! can be migrated before they reach the store.

use crate::error::StorageError;
use crate::migration::CURRENT_SCHEMA_VERSION;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use topic_graph::TopicState;

/// Key-value storage of encoded snapshots
pub trait LocalStorage: Send + Sync {
    /// Stored value for `key`, if any
    ///
    /// # Errors
    /// Backend failure.
    fn load(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing what was there
    ///
    /// # Errors
    /// Backend failure.
    fn save(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Forget `key`; missing keys are fine
    ///
    /// # Errors
    /// Backend failure.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Versioned snapshot envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedTopic {
    /// Schema version of `state`
    #[serde(default)]
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
    /// Raw state; its shape depends on `version`
    pub state: serde_json::Value,
}

impl PersistedTopic {
    /// Envelope for a current-version state
    ///
    /// # Errors
    /// State could not be encoded.
    pub fn current(state: &TopicState) -> Result<Self, StorageError> {
        Ok(Self {
            version: CURRENT_SCHEMA_VERSION,
            saved_at: Some(Utc::now()),
            state: serde_json::to_value(state)?,
        })
    }

    /// Write to `storage` under `key`
    ///
    /// # Errors
    /// Encoding or backend failure.
    pub fn save(&self, storage: &dyn LocalStorage, key: &str) -> Result<(), StorageError> {
        storage.save(key, &serde_json::to_string(self)?)
    }

    /// Read from `storage`; `Ok(None)` when nothing is stored
    ///
    /// # Errors
    /// Backend failure or a value that is not an envelope.
    pub fn load(storage: &dyn LocalStorage, key: &str) -> Result<Option<Self>, StorageError> {
        storage
            .load(key)?
            .map(|raw| serde_json::from_str(&raw).map_err(StorageError::from))
            .transpose()
    }
}

/// In-process storage
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStorage for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.values.lock().remove(key);
        Ok(())
    }
}

/// One JSON file per key under a directory
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Storage rooted at `dir` (created on first save)
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'))
            && !key.starts_with('.');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl LocalStorage for FileStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.path(key)?) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path(key)?;
        std::fs::create_dir_all(&self.dir)?;
        // write-then-rename so a crash never leaves half a snapshot
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        tracing::debug!(path = %path.display(), bytes = value.len(), "saved snapshot");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.path(key)?) {
            Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use topic_graph::NodeType;

    fn state() -> TopicState {
        let mut state = TopicState::new();
        state.create_node(NodeType::Problem, "p").unwrap();
        state
    }

    #[test]
    fn memory_storage_round_trips_envelope() {
        let storage = MemoryStorage::new();
        PersistedTopic::current(&state())
            .unwrap()
            .save(&storage, "topic")
            .unwrap();

        let loaded = PersistedTopic::load(&storage, "topic").unwrap().unwrap();
        assert_eq!(loaded.version, CURRENT_SCHEMA_VERSION);
        assert!(loaded.saved_at.is_some());
        assert!(PersistedTopic::load(&storage, "other").unwrap().is_none());
    }

    #[test]
    fn file_storage_writes_one_file_per_key() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("topics"));

        storage.save("a", "{}").unwrap();
        assert!(dir.path().join("topics/a.json").exists());
        assert_eq!(storage.load("a").unwrap().as_deref(), Some("{}"));

        storage.remove("a").unwrap();
        storage.remove("a").unwrap();
        assert_eq!(storage.load("a").unwrap(), None);
    }

    #[test]
    fn file_storage_rejects_path_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        assert!(matches!(
            storage.save("../escape", "{}"),
            Err(StorageError::InvalidKey(_))
        ));
    }
}
