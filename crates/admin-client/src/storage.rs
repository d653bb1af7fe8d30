//! Key/value persistence tiers.
//!
//! Two tiers exist: a durable one that survives restarts and an ephemeral,
//! session-scoped one. Both sit behind [`KeyValueStore`] so callers select a
//! tier with [`StorageTier`] instead of branching on a flag.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use dashmap::DashMap;

use crate::error::StorageError;

/// Well-known storage keys.
pub mod keys {
    pub const ACCESS_TOKEN: &str = "access_token";
    pub const REFRESH_TOKEN: &str = "refresh_token";
    /// Only ever written to the durable tier.
    pub const REMEMBER_ME: &str = "remember_me";
    pub const DICT_CACHE: &str = "dict_cache";
    pub const SESSION_SNAPSHOT: &str = "auth_session";
}

/// String key/value storage.
///
/// Writes never fail from the caller's point of view; implementations that
/// persist to disk log persistence failures and keep their in-memory view.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    fn remove(&self, key: &str);
    fn keys(&self) -> Vec<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageTier {
    Durable,
    Ephemeral,
}

impl StorageTier {
    pub fn for_remember_me(remember_me: bool) -> Self {
        if remember_me { Self::Durable } else { Self::Ephemeral }
    }

    pub fn other(self) -> Self {
        match self {
            Self::Durable => Self::Ephemeral,
            Self::Ephemeral => Self::Durable,
        }
    }
}

/// Both storage tiers.
#[derive(Clone)]
pub struct Storage {
    durable: Arc<dyn KeyValueStore>,
    ephemeral: Arc<dyn KeyValueStore>,
}

impl Storage {
    pub fn new(durable: Arc<dyn KeyValueStore>, ephemeral: Arc<dyn KeyValueStore>) -> Self {
        Self { durable, ephemeral }
    }

    /// Both tiers in memory. Nothing outlives the process.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), Arc::new(MemoryStore::new()))
    }

    /// No storage context at all: reads are empty, writes are ignored.
    pub fn detached() -> Self {
        Self::new(Arc::new(NullStore), Arc::new(NullStore))
    }

    /// Durable tier backed by a JSON file, ephemeral tier in memory.
    pub fn with_durable_file(path: impl Into<PathBuf>) -> Self {
        Self::new(
            Arc::new(FileStore::open(path)),
            Arc::new(MemoryStore::new()),
        )
    }

    pub fn tier(&self, tier: StorageTier) -> &dyn KeyValueStore {
        match tier {
            StorageTier::Durable => self.durable.as_ref(),
            StorageTier::Ephemeral => self.ephemeral.as_ref(),
        }
    }

    pub fn durable(&self) -> &dyn KeyValueStore {
        self.durable.as_ref()
    }

    pub fn ephemeral(&self) -> &dyn KeyValueStore {
        self.ephemeral.as_ref()
    }

    /// Removes `key` from both tiers.
    pub fn remove_everywhere(&self, key: &str) {
        self.durable.remove(key);
        self.ephemeral.remove(key);
    }
}

/// In-memory tier.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.value().clone())
    }

    fn set(&self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.entries.remove(key);
    }

    fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }
}

/// Storage that does not exist.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStore;

impl KeyValueStore for NullStore {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }

    fn set(&self, _key: &str, _value: String) {}

    fn remove(&self, _key: &str) {}

    fn keys(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Durable tier persisted as a single JSON object file, written through on
/// every mutation.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileStore {
    /// Opens the store at `path`. A missing or unreadable file yields an
    /// empty store.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match read_entries(&path) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Discarding unreadable storage file");
                BTreeMap::new()
            }
        };
        Self {
            path,
            entries: RwLock::new(entries),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the current contents to disk.
    pub fn flush(&self) -> Result<(), StorageError> {
        let entries = self.entries.read().map_err(|_| StorageError::Poisoned)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&*entries)?;
        fs::write(&self.path, content)?;
        Ok(())
    }

    fn mutate(&self, f: impl FnOnce(&mut BTreeMap<String, String>)) {
        match self.entries.write() {
            Ok(mut entries) => f(&mut entries),
            Err(_) => {
                tracing::error!(path = %self.path.display(), "Storage lock poisoned");
                return;
            }
        }
        if let Err(e) = self.flush() {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to persist storage file");
        }
    }
}

fn read_entries(path: &Path) -> Result<BTreeMap<String, String>, StorageError> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    Ok(serde_json::from_str(&content)?)
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        self.mutate(|entries| {
            entries.insert(key.to_string(), value);
        });
    }

    fn remove(&self, key: &str) {
        let present = self
            .entries
            .read()
            .map(|entries| entries.contains_key(key))
            .unwrap_or(false);
        if present {
            self.mutate(|entries| {
                entries.remove(key);
            });
        }
    }

    fn keys(&self) -> Vec<String> {
        self.entries
            .read()
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default()
    }
}
