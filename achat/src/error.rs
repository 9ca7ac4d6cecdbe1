//! Chat-layer errors and classification.

use std::error::Error;
use std::fmt::{Display, Formatter};

use abackend::BackendError;
use asession::{SessionError, SessionErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatErrorKind {
    InvalidRequest,
    NotReady,
    TurnInProgress,
    UnsupportedEnvironment,
    LoadFailure,
    HandleReleased,
    Generation,
    Store,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatError {
    pub kind: ChatErrorKind,
    pub message: String,
}

impl ChatError {
    pub fn new(kind: ChatErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::InvalidRequest, message)
    }

    pub fn not_ready(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::NotReady, message)
    }

    pub fn turn_in_progress(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::TurnInProgress, message)
    }

    pub fn generation(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Generation, message)
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Store, message)
    }

    /// Failures the user can retry from the same surface.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self.kind,
            ChatErrorKind::NotReady
                | ChatErrorKind::TurnInProgress
                | ChatErrorKind::LoadFailure
                | ChatErrorKind::Generation
        )
    }
}

impl Display for ChatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for ChatError {}

impl From<SessionError> for ChatError {
    fn from(value: SessionError) -> Self {
        let kind = match value.kind {
            SessionErrorKind::UnsupportedEnvironment => ChatErrorKind::UnsupportedEnvironment,
            SessionErrorKind::LoadFailure => ChatErrorKind::LoadFailure,
            SessionErrorKind::HandleReleased => ChatErrorKind::HandleReleased,
            SessionErrorKind::Busy => ChatErrorKind::NotReady,
            SessionErrorKind::Internal => ChatErrorKind::Store,
        };

        Self::new(kind, value.message)
    }
}

impl From<BackendError> for ChatError {
    fn from(value: BackendError) -> Self {
        match value.kind {
            abackend::BackendErrorKind::HandleReleased => {
                Self::new(ChatErrorKind::HandleReleased, value.message)
            }
            _ => ChatError::generation(value.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use abackend::BackendError;
    use asession::SessionError;

    use super::{ChatError, ChatErrorKind};

    #[test]
    fn session_errors_keep_their_distinguishable_kind() {
        let unsupported: ChatError = SessionError::unsupported_environment("no runtime").into();
        assert_eq!(unsupported.kind, ChatErrorKind::UnsupportedEnvironment);
        assert!(!unsupported.is_retriable());

        let load: ChatError = SessionError::load_failure("corrupt").into();
        assert_eq!(load.kind, ChatErrorKind::LoadFailure);
        assert!(load.is_retriable());
    }

    #[test]
    fn backend_errors_become_generation_failures() {
        let error: ChatError = BackendError::transport("reset").into();
        assert_eq!(error.kind, ChatErrorKind::Generation);
        assert_eq!(error.message, "Transport: reset");

        let released: ChatError = BackendError::handle_released("gone").into();
        assert_eq!(released.kind, ChatErrorKind::HandleReleased);
    }
}
