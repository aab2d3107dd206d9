//! Durable key-value slots for client-side state.
//!
//! The cart (in local mode) and the customer session each keep their state
//! in named slots. A slot holds one UTF-8 string, normally JSON.
//!
//! - [`FileStore`] - one file per slot in a data directory
//! - [`MemoryStore`] - process-local map, used in tests and dry runs

use std::collections::HashMap;
use std::fmt::Debug;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur when reading or writing a slot.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Slot keys may only contain ASCII letters, digits, `-`, `_`, and `.`.
    #[error("invalid slot key: {0:?}")]
    InvalidKey(String),

    /// Underlying I/O failed.
    #[error("storage I/O error on {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },

    /// Stored bytes are not valid UTF-8.
    #[error("slot {0} does not contain UTF-8 text")]
    NotText(String),

    /// The in-memory map lock was poisoned.
    #[error("storage lock poisoned")]
    Poisoned,
}

/// A durable string-valued key-value store.
///
/// All methods take `&self`; implementations use interior mutability.
pub trait KeyValueStore: Send + Sync + Debug {
    /// Read a slot. Returns `Ok(None)` if it does not exist.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Create or replace a slot.
    fn put(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a slot. Removing a missing slot is not an error.
    fn delete(&self, key: &str) -> Result<(), StorageError>;
}

// =============================================================================
// FileStore
// =============================================================================

/// Stores each slot as `<dir>/<key>.json`.
///
/// Writes go to a uniquely named temporary file in the same directory and
/// are renamed into place, so a crash mid-write leaves the previous value
/// intact and concurrent writers never share a temporary file.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `dir`. The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory holding the slot files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match std::fs::read(&path) {
            Ok(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|_| StorageError::NotText(key.to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let io_err = |source| StorageError::Io {
            key: key.to_string(),
            source,
        };

        std::fs::create_dir_all(&self.dir).map_err(io_err)?;
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(io_err)?;
        tmp.write_all(value.as_bytes()).map_err(io_err)?;
        tmp.persist(&path).map_err(|e| io_err(e.error))?;

        debug!(key, bytes = value.len(), "Slot written");
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}

// =============================================================================
// MemoryStore
// =============================================================================

/// Keeps slots in memory for the life of the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let slots = self.slots.read().map_err(|_| StorageError::Poisoned)?;
        Ok(slots.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut slots = self.slots.write().map_err(|_| StorageError::Poisoned)?;
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        let mut slots = self.slots.write().map_err(|_| StorageError::Poisoned)?;
        slots.remove(key);
        Ok(())
    }
}
