//! Storage media the cache persists entries to
//!
//! The cache only needs an async string-keyed, string-valued store. Two
//! implementations are provided: `FileStore`, which keeps one JSON file per key
//! in an XDG-compliant cache directory, and `MemoryStore`, a process-local map
//! used by tests and short-lived tools.

use std::collections::HashMap;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use directories::ProjectDirs;
use tempfile::Builder;
use thiserror::Error;
use tokio::fs;
use tokio::sync::RwLock;

/// Errors raised at the storage boundary
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the underlying medium failed
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A value could not be encoded or decoded
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The store is not usable (e.g. no cache directory)
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Result type used for every storage call
pub type StoreResult<T> = Result<T, StoreError>;

/// Async key-value store holding serialized cache entries
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns the stored string for `key`, or `None` if nothing is stored.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: String) -> StoreResult<()>;

    /// Removes `key`. Removing a missing key succeeds.
    async fn delete(&self, key: &str) -> StoreResult<()>;
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys currently held, sorted
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> StoreResult<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// File-backed store, one `<key>.json` file per key
///
/// Uses `~/.cache/slotcache/` on Linux, or the equivalent XDG path on other
/// platforms. Each write goes to its own temporary file that is renamed into
/// place, so a reader sees either the old value or a complete new one, and
/// concurrent writers to one key never share a temporary file.
#[derive(Debug, Clone)]
pub struct FileStore {
    /// Directory where entry files are stored
    dir: PathBuf,
}

impl FileStore {
    /// Creates a store in the XDG-compliant cache directory
    ///
    /// Returns `None` if the cache directory cannot be determined (e.g., no home directory).
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "slotcache")?;
        Some(Self::with_dir(project_dirs.cache_dir().to_path_buf()))
    }

    /// Creates a store rooted at a specific directory
    pub fn with_dir(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the path to the file holding `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        match fs::read_to_string(self.path_for(key)).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: String) -> StoreResult<()> {
        fs::create_dir_all(&self.dir).await?;

        let dir = self.dir.clone();
        let path = self.path_for(key);
        let prefix = format!(".{}.", key);
        tokio::task::spawn_blocking(move || -> StoreResult<()> {
            let mut tmp = Builder::new().prefix(&prefix).suffix(".tmp").tempfile_in(&dir)?;
            tmp.write_all(value.as_bytes())?;
            tmp.persist(&path).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("write task failed: {}", e)))?
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
