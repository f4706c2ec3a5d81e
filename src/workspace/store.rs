//! Storage backend for workspace records.
//!
//! The engine persists three kinds of string records: the context registry,
//! one serialized state per context, and the last-active context pointer.
//! [`StateStore`] abstracts the backing medium; [`FileStore`] keeps every
//! record in a single JSON document on disk, [`MemoryStore`] keeps them in
//! process for tests and ephemeral runs.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use thiserror::Error;
use tracing::{debug, warn};

/// Registry of all contexts, keyed by context id.
pub const REGISTRY_KEY: &str = "contexts";

/// Pointer to the last-active context id.
pub const CURRENT_CONTEXT_KEY: &str = "current-context";

/// Record key for one context's serialized [`WorkspaceState`](super::WorkspaceState).
pub fn state_key(context_id: &str) -> String {
    format!("workspace:{context_id}")
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to write store: {0}")]
    Write(String),
    #[error("Failed to encode store: {0}")]
    Encode(String),
}

/// String key/value records with last-writer-wins semantics. Reads never
/// fail; missing keys are `None`.
pub trait StateStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Disk-backed store: all records in one JSON file, rewritten atomically
/// (temp file + rename) on every mutation. A missing or corrupt backing
/// file degrades to an empty store.
pub struct FileStore {
    path: PathBuf,
    records: RwLock<HashMap<String, String>>,
}

impl FileStore {
    /// Open the store at `path`, loading any existing records.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<HashMap<String, String>>(&content) {
                Ok(records) => records,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Discarding corrupt store file");
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read store file, starting empty");
                HashMap::new()
            }
        };
        debug!(path = %path.display(), records = records.len(), "Opened file store");
        Self {
            path,
            records: RwLock::new(records),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StoreError> {
        let content = {
            let records = self
                .records
                .read()
                .map_err(|e| StoreError::Write(e.to_string()))?;
            serde_json::to_string_pretty(&*records).map_err(|e| StoreError::Encode(e.to_string()))?
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::Write(e.to_string()))?;
        }

        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, content).map_err(|e| StoreError::Write(e.to_string()))?;
        fs::rename(&temp_path, &self.path).map_err(|e| StoreError::Write(e.to_string()))
    }
}

impl StateStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.records.read().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        {
            let mut records = self
                .records
                .write()
                .map_err(|e| StoreError::Write(e.to_string()))?;
            records.insert(key.to_string(), value.to_string());
        }
        self.flush()
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let removed = {
            let mut records = self
                .records
                .write()
                .map_err(|e| StoreError::Write(e.to_string()))?;
            records.remove(key).is_some()
        };
        if removed {
            self.flush()
        } else {
            Ok(())
        }
    }
}

/// In-process store. Shares records between clones of the same instance
/// only through `Arc`.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.records.read().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if let Ok(mut records) = self.records.write() {
            records.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        if let Ok(mut records) = self.records.write() {
            records.remove(key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_store_roundtrip_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("packbench.json");

        {
            let store = FileStore::open(&path);
            store.set("contexts", r#"{"default":{}}"#).unwrap();
            store.set(&state_key("default"), "{}").unwrap();
        }

        let store = FileStore::open(&path);
        assert_eq!(store.get("contexts").as_deref(), Some(r#"{"default":{}}"#));
        assert_eq!(store.get(&state_key("default")).as_deref(), Some("{}"));
        assert_eq!(store.get("missing"), None);
    }

    #[test]
    fn test_file_store_remove() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("packbench.json");

        let store = FileStore::open(&path);
        store.set("a", "1").unwrap();
        store.remove("a").unwrap();
        store.remove("never-existed").unwrap();

        let store = FileStore::open(&path);
        assert_eq!(store.get("a"), None);
    }

    #[test]
    fn test_file_store_corrupt_file_starts_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("packbench.json");
        fs::write(&path, "definitely not json").unwrap();

        let store = FileStore::open(&path);
        assert_eq!(store.get("contexts"), None);
        store.set("contexts", "{}").unwrap();
        assert_eq!(store.get("contexts").as_deref(), Some("{}"));
    }

    #[test]
    fn test_file_store_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested/dir/packbench.json");

        let store = FileStore::open(&path);
        store.set("a", "1").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_memory_store_basics() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k"), None);
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").as_deref(), Some("v"));
        store.remove("k").unwrap();
        assert_eq!(store.get("k"), None);
    }
}
