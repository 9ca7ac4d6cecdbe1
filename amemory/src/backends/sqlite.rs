use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use acommon::BoxFuture;
use rusqlite::{Connection, OptionalExtension, params};

use crate::backend::{KeyValueBackend, check_key};
use crate::error::MemoryError;

#[derive(Debug)]
pub struct SqliteKeyValueBackend {
    connection: Mutex<Connection>,
}

impl SqliteKeyValueBackend {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, MemoryError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|error| {
                MemoryError::storage_context("failed to create sqlite parent directory", error)
            })?;
        }

        let connection = Connection::open(path)
            .map_err(|error| MemoryError::storage_context("failed to open sqlite database", error))?;
        Self::from_connection(connection)
    }

    pub fn new_in_memory() -> Result<Self, MemoryError> {
        let connection = Connection::open_in_memory().map_err(|error| {
            MemoryError::storage_context("failed to open in-memory sqlite database", error)
        })?;
        Self::from_connection(connection)
    }

    fn from_connection(connection: Connection) -> Result<Self, MemoryError> {
        connection
            .busy_timeout(Duration::from_secs(5))
            .map_err(|error| {
                MemoryError::storage_context("failed to configure sqlite busy timeout", error)
            })?;
        connection
            .execute_batch(
                "
                PRAGMA journal_mode = WAL;
                PRAGMA synchronous = NORMAL;

                CREATE TABLE IF NOT EXISTS kv_entries (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL,
                    updated_at_secs INTEGER NOT NULL
                );
                ",
            )
            .map_err(|error| {
                MemoryError::storage_context("failed to initialize sqlite schema", error)
            })?;

        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn connection(&self) -> Result<std::sync::MutexGuard<'_, Connection>, MemoryError> {
        self.connection
            .lock()
            .map_err(|_| MemoryError::storage("sqlite backend lock poisoned"))
    }
}

impl KeyValueBackend for SqliteKeyValueBackend {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, MemoryError>> {
        Box::pin(async move {
            check_key(key)?;
            let conn = self.connection()?;
            conn.query_row(
                "SELECT value FROM kv_entries WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(|error| MemoryError::storage_context("failed to read entry", error))
        })
    }

    fn put<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, Result<(), MemoryError>> {
        Box::pin(async move {
            check_key(key)?;
            let conn = self.connection()?;
            conn.execute(
                "
                INSERT INTO kv_entries (key, value, updated_at_secs)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    updated_at_secs = excluded.updated_at_secs
                ",
                params![key, value, now_epoch_secs()],
            )
            .map_err(|error| MemoryError::storage_context("failed to write entry", error))?;
            Ok(())
        })
    }

    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<bool, MemoryError>> {
        Box::pin(async move {
            check_key(key)?;
            let conn = self.connection()?;
            let removed = conn
                .execute("DELETE FROM kv_entries WHERE key = ?1", params![key])
                .map_err(|error| MemoryError::storage_context("failed to remove entry", error))?;
            Ok(removed > 0)
        })
    }
}

fn now_epoch_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_secs() as i64)
        .unwrap_or_default()
}

/// `ANGLER_STORAGE_PATH`, then `~/.angler/amemory.sqlite3`.
pub(crate) fn default_sqlite_path() -> PathBuf {
    if let Some(explicit) = std::env::var_os("ANGLER_STORAGE_PATH") {
        return PathBuf::from(explicit);
    }

    if let Some(home) = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
        return PathBuf::from(home).join(".angler").join("amemory.sqlite3");
    }

    PathBuf::from("amemory.sqlite3")
}

#[cfg(test)]
mod tests {
    use super::SqliteKeyValueBackend;
    use crate::backend::KeyValueBackend;
    use crate::error::MemoryErrorKind;

    #[tokio::test]
    async fn sqlite_backend_upserts_and_removes() {
        let backend = SqliteKeyValueBackend::new_in_memory().expect("sqlite");

        backend.put("history", "a".to_string()).await.expect("put");
        backend.put("history", "b".to_string()).await.expect("upsert");
        assert_eq!(
            backend.get("history").await.expect("get").as_deref(),
            Some("b")
        );

        assert!(backend.remove("history").await.expect("remove"));
        assert_eq!(backend.get("history").await.expect("get"), None);
    }

    #[tokio::test]
    async fn sqlite_backend_rejects_blank_keys() {
        let backend = SqliteKeyValueBackend::new_in_memory().expect("sqlite");
        let error = backend
            .put("  ", "value".to_string())
            .await
            .expect_err("blank key should fail");
        assert_eq!(error.kind, MemoryErrorKind::InvalidRequest);
    }
}
