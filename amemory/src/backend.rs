//! Key-value backend trait, backend selection, and the in-memory backend.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use acommon::BoxFuture;

use crate::backends::sqlite::default_sqlite_path;
use crate::error::MemoryError;

pub use crate::backends::filesystem::FilesystemKeyValueBackend;
pub use crate::backends::sqlite::SqliteKeyValueBackend;

/// String documents stored under string keys.
pub trait KeyValueBackend: Send + Sync {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, MemoryError>>;

    fn put<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, Result<(), MemoryError>>;

    /// Returns whether a value was removed.
    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<bool, MemoryError>>;
}

pub(crate) fn check_key(key: &str) -> Result<(), MemoryError> {
    if key.trim().is_empty() {
        return Err(MemoryError::invalid_request("key must not be empty"));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryBackendConfig {
    Sqlite { path: PathBuf },
    Filesystem { root: PathBuf },
    InMemory,
}

impl Default for MemoryBackendConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: default_sqlite_path(),
        }
    }
}

pub fn create_memory_backend(
    config: MemoryBackendConfig,
) -> Result<Arc<dyn KeyValueBackend>, MemoryError> {
    match config {
        MemoryBackendConfig::Sqlite { path } => Ok(Arc::new(SqliteKeyValueBackend::new(path)?)),
        MemoryBackendConfig::Filesystem { root } => {
            Ok(Arc::new(FilesystemKeyValueBackend::new(root)?))
        }
        MemoryBackendConfig::InMemory => Ok(Arc::new(InMemoryKeyValueBackend::new())),
    }
}

pub fn create_default_memory_backend() -> Result<Arc<dyn KeyValueBackend>, MemoryError> {
    create_memory_backend(MemoryBackendConfig::default())
}

#[derive(Debug, Default)]
pub struct InMemoryKeyValueBackend {
    entries: Mutex<HashMap<String, String>>,
}

impl InMemoryKeyValueBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, MemoryError> {
        self.entries
            .lock()
            .map_err(|_| MemoryError::storage("in-memory backend lock poisoned"))
    }
}

impl KeyValueBackend for InMemoryKeyValueBackend {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, MemoryError>> {
        Box::pin(async move {
            check_key(key)?;
            Ok(self.entries()?.get(key).cloned())
        })
    }

    fn put<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, Result<(), MemoryError>> {
        Box::pin(async move {
            check_key(key)?;
            self.entries()?.insert(key.to_string(), value);
            Ok(())
        })
    }

    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<bool, MemoryError>> {
        Box::pin(async move {
            check_key(key)?;
            Ok(self.entries()?.remove(key).is_some())
        })
    }
}
