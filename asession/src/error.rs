//! Session registry error kinds.
//!
//! ```rust
//! use asession::{SessionError, SessionErrorKind};
//!
//! let error = SessionError::load_failure("weights corrupted");
//! assert_eq!(error.kind, SessionErrorKind::LoadFailure);
//! assert!(error.is_retriable());
//! ```

use std::error::Error;
use std::fmt::{Display, Formatter};

use abackend::{BackendError, BackendErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionErrorKind {
    UnsupportedEnvironment,
    LoadFailure,
    HandleReleased,
    Busy,
    Internal,
}

/// Initialization outcome shared by every waiter of one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionError {
    pub kind: SessionErrorKind,
    pub message: String,
}

impl SessionError {
    pub fn new(kind: SessionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unsupported_environment(message: impl Into<String>) -> Self {
        Self::new(SessionErrorKind::UnsupportedEnvironment, message)
    }

    pub fn load_failure(message: impl Into<String>) -> Self {
        Self::new(SessionErrorKind::LoadFailure, message)
    }

    pub fn handle_released(message: impl Into<String>) -> Self {
        Self::new(SessionErrorKind::HandleReleased, message)
    }

    pub fn busy(message: impl Into<String>) -> Self {
        Self::new(SessionErrorKind::Busy, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(SessionErrorKind::Internal, message)
    }

    pub fn is_retriable(&self) -> bool {
        matches!(self.kind, SessionErrorKind::LoadFailure | SessionErrorKind::Busy)
    }
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for SessionError {}

impl From<BackendError> for SessionError {
    fn from(value: BackendError) -> Self {
        let kind = match value.kind {
            BackendErrorKind::UnsupportedEnvironment => SessionErrorKind::UnsupportedEnvironment,
            BackendErrorKind::HandleReleased => SessionErrorKind::HandleReleased,
            _ => SessionErrorKind::LoadFailure,
        };

        Self::new(kind, value.message)
    }
}
