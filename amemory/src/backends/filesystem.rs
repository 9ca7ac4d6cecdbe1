use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use acommon::BoxFuture;

use crate::backend::{KeyValueBackend, check_key};
use crate::error::MemoryError;

/// One file per key under `<root>/entries`, named by the hex-encoded key.
#[derive(Debug)]
pub struct FilesystemKeyValueBackend {
    root: PathBuf,
    lock: Mutex<()>,
}

impl FilesystemKeyValueBackend {
    pub fn new(root: impl AsRef<Path>) -> Result<Self, MemoryError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join("entries")).map_err(|error| {
            MemoryError::storage_context("failed to create filesystem backend root", error)
        })?;
        Ok(Self {
            root,
            lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.root
            .join("entries")
            .join(format!("{}.json", hex_encode(key.as_bytes())))
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, ()>, MemoryError> {
        self.lock
            .lock()
            .map_err(|_| MemoryError::storage("filesystem backend lock poisoned"))
    }
}

impl KeyValueBackend for FilesystemKeyValueBackend {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, MemoryError>> {
        Box::pin(async move {
            check_key(key)?;
            let _guard = self.guard()?;
            match fs::read_to_string(self.entry_path(key)) {
                Ok(value) => Ok(Some(value)),
                Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
                Err(error) => Err(MemoryError::storage_context(
                    "failed to read entry file",
                    error,
                )),
            }
        })
    }

    fn put<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, Result<(), MemoryError>> {
        Box::pin(async move {
            check_key(key)?;
            let _guard = self.guard()?;
            write_atomic(&self.entry_path(key), value.as_bytes())
        })
    }

    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<bool, MemoryError>> {
        Box::pin(async move {
            check_key(key)?;
            let _guard = self.guard()?;
            match fs::remove_file(self.entry_path(key)) {
                Ok(()) => Ok(true),
                Err(error) if error.kind() == ErrorKind::NotFound => Ok(false),
                Err(error) => Err(MemoryError::storage_context(
                    "failed to remove entry file",
                    error,
                )),
            }
        })
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), MemoryError> {
    let Some(parent) = path.parent() else {
        return Err(MemoryError::storage("entry file missing parent directory"));
    };
    fs::create_dir_all(parent)
        .map_err(|error| MemoryError::storage_context("failed to create parent directory", error))?;

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes)
        .map_err(|error| MemoryError::storage_context("failed to write temporary entry file", error))?;

    fs::rename(&tmp, path)
        .map_err(|error| MemoryError::storage_context("failed to move entry file into place", error))
}

fn hex_encode(input: &[u8]) -> String {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";
    let mut output = String::with_capacity(input.len() * 2);
    for byte in input {
        output.push(DIGITS[usize::from(byte >> 4)] as char);
        output.push(DIGITS[usize::from(byte & 0x0f)] as char);
    }
    output
}
