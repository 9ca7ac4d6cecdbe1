use std::fmt::{Display, Formatter};

/// Lifecycle status of the shared backend.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Uninitialized,
    Probing,
    Loading {
        progress: String,
    },
    Ready,
    Failed {
        reason: String,
    },
}

impl SessionState {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// True while an initialization attempt is running.
    pub fn is_initializing(&self) -> bool {
        matches!(self, Self::Probing | Self::Loading { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Probing => "probing",
            Self::Loading { .. } => "loading",
            Self::Ready => "ready",
            Self::Failed { .. } => "failed",
        }
    }
}

impl Display for SessionState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loading { progress } if !progress.is_empty() => write!(f, "loading: {progress}"),
            Self::Failed { reason } => write!(f, "failed: {reason}"),
            other => f.write_str(other.label()),
        }
    }
}
