//! Session Identity
//!
//! Each install chats under a single anonymous identifier. It is generated
//! on first start, written to a durable key-value store, and read back on
//! every later start. The app never rotates or deletes it.
//!
//! The store is an explicit [`KeyValueStore`] handed to the controller at
//! initialisation rather than ambient global state:
//!
//! - [`FileStore`]: JSON object on disk (`$XDG_DATA_HOME/anon-chat/storage.json`)
//! - [`MemoryStore`]: in-process map, for tests and throwaway sessions

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use thiserror::Error;

use crate::message::UserId;

/// Storage key holding the session's user identifier
pub const USER_ID_KEY: &str = "chatUserId";

/// Errors from the key-value store
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backing file could not be read or written
    #[error("storage I/O failed at {path}: {source}")]
    Io {
        /// File that was accessed
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The backing file is not a JSON object of strings
    #[error("storage file {path} is malformed: {source}")]
    Malformed {
        /// File that was parsed
        path: PathBuf,
        /// Underlying parse error
        source: serde_json::Error,
    },
}

/// Durable string key-value storage
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `None` when the key is absent
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Read the session identity, creating and persisting one if absent
///
/// A stored value is returned unchanged. A missing or blank value is
/// replaced by a freshly generated identifier, which is written back before
/// it is returned.
///
/// # Errors
///
/// Returns an error if the store cannot be read or the new identifier cannot
/// be persisted.
pub fn get_or_create_user_id(store: &dyn KeyValueStore) -> Result<UserId, StorageError> {
    if let Some(existing) = store.get(USER_ID_KEY)? {
        if !existing.trim().is_empty() {
            tracing::debug!(user_id = %existing, "Loaded stored user id");
            return Ok(UserId::new(existing));
        }
    }

    let user_id = UserId::generate();
    store.set(USER_ID_KEY, user_id.as_str())?;
    tracing::info!(user_id = %user_id, "Created new user id");
    Ok(user_id)
}

// =============================================================================
// File-backed store
// =============================================================================

/// Key-value store persisted as a JSON object file
///
/// The whole file is re-read on every access so that values written by
/// another process are picked up. Parent directories are created on first
/// write.
#[derive(Clone, Debug)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Open a store at `path` (the file need not exist yet)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Open the store at the default location, if a data directory is known
    #[must_use]
    pub fn open_default() -> Option<Self> {
        default_storage_path().map(Self::new)
    }

    /// Path of the backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(StorageError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&raw).map_err(|source| StorageError::Malformed {
            path: self.path.clone(),
            source,
        })
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let io_err = |source| StorageError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        let json = serde_json::to_string_pretty(entries).map_err(|source| {
            StorageError::Malformed {
                path: self.path.clone(),
                source,
            }
        })?;
        std::fs::write(&self.path, json).map_err(io_err)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }
}

/// Default storage file: `$XDG_DATA_HOME/anon-chat/storage.json`
#[must_use]
pub fn default_storage_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("anon-chat").join("storage.json"))
}

// =============================================================================
// In-memory store
// =============================================================================

/// Non-persistent store backed by a map
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with one entry
    pub fn with_entry(key: impl Into<String>, value: impl Into<String>) -> Self {
        let store = Self::new();
        store.entries.lock().insert(key.into(), value.into());
        store
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}
