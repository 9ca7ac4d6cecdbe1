//! Memory-layer errors for key-value and conversation persistence.
//!
//! ```rust
//! use amemory::{MemoryError, MemoryErrorKind};
//!
//! let error = MemoryError::storage_context("failed to open sqlite database", "disk I/O error");
//! assert_eq!(error.kind, MemoryErrorKind::Storage);
//! assert_eq!(error.message, "failed to open sqlite database: disk I/O error");
//! ```

use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryErrorKind {
    /// The underlying store could not be read or written.
    Storage,
    /// A stored document exists but cannot be decoded.
    Corrupt,
    InvalidRequest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryError {
    pub kind: MemoryErrorKind,
    pub message: String,
}

impl MemoryError {
    pub fn new(kind: MemoryErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(MemoryErrorKind::Storage, message)
    }

    pub fn storage_context(context: &str, error: impl Display) -> Self {
        Self::storage(format!("{context}: {error}"))
    }

    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::new(MemoryErrorKind::Corrupt, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(MemoryErrorKind::InvalidRequest, message)
    }
}

impl Display for MemoryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for MemoryError {}

impl From<MemoryError> for achat::ChatError {
    fn from(value: MemoryError) -> Self {
        achat::ChatError::store(value.to_string())
    }
}
