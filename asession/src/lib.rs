//! Shared lifecycle management for one expensive inference backend.
//!
//! ```rust
//! use asession::{SessionError, SessionErrorKind, SessionState};
//!
//! let state = SessionState::Loading { progress: "pulling manifest".into() };
//! assert!(state.is_initializing());
//!
//! let error = SessionError::unsupported_environment("no runtime");
//! assert_eq!(error.kind, SessionErrorKind::UnsupportedEnvironment);
//! ```

mod error;
mod hooks;
mod registry;
mod state;

pub use error::{SessionError, SessionErrorKind};
pub use hooks::{NoopRegistryHooks, RegistryHooks};
pub use registry::{
    LOAD_COMPLETE_MESSAGE, ProgressCallback, SessionRegistry, SessionRegistryBuilder,
    StateListener, Subscription,
};
pub use state::SessionState;

pub mod prelude {
    pub use crate::{
        NoopRegistryHooks, ProgressCallback, RegistryHooks, SessionError, SessionErrorKind,
        SessionRegistry, SessionRegistryBuilder, SessionState, Subscription,
    };
    pub use abackend::BackendHandle;
}
