//! Shared backend error kinds and error value helpers.
//!
//! ```rust
//! use abackend::{BackendError, BackendErrorKind};
//!
//! let load = BackendError::load_failure("weights missing");
//! assert_eq!(load.kind, BackendErrorKind::LoadFailure);
//! assert!(load.retryable);
//!
//! let released = BackendError::handle_released("model was unloaded");
//! assert!(!released.retryable);
//! ```

use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    UnsupportedEnvironment,
    LoadFailure,
    Generation,
    HandleReleased,
    InvalidRequest,
    Transport,
    Timeout,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendError {
    pub kind: BackendErrorKind,
    pub message: String,
    pub retryable: bool,
}

impl BackendError {
    pub fn new(kind: BackendErrorKind, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable,
        }
    }

    pub fn unsupported_environment(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::UnsupportedEnvironment, message, false)
    }

    pub fn load_failure(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::LoadFailure, message, true)
    }

    pub fn generation(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Generation, message, true)
    }

    pub fn handle_released(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::HandleReleased, message, false)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::InvalidRequest, message, false)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Transport, message, true)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Timeout, message, true)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Other, message, false)
    }

    /// Re-labels a transport-level failure as a failure of the given phase, keeping the detail.
    pub fn during(self, kind: BackendErrorKind) -> Self {
        if self.kind == kind {
            return self;
        }

        Self::new(kind, format!("{}: {}", self.kind_label(), self.message), self.retryable)
    }

    fn kind_label(&self) -> &'static str {
        match self.kind {
            BackendErrorKind::UnsupportedEnvironment => "unsupported environment",
            BackendErrorKind::LoadFailure => "load failure",
            BackendErrorKind::Generation => "generation",
            BackendErrorKind::HandleReleased => "handle released",
            BackendErrorKind::InvalidRequest => "invalid request",
            BackendErrorKind::Transport => "transport",
            BackendErrorKind::Timeout => "timeout",
            BackendErrorKind::Other => "other",
        }
    }
}

impl Display for BackendError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for BackendError {}
