use std::time::Duration;

use crate::{SessionError, SessionState};

/// Lifecycle callbacks for observability integrations.
///
/// Hooks run synchronously on the task that drives the registry; keep them cheap.
pub trait RegistryHooks: Send + Sync {
    fn on_attempt_start(&self, _attempt: u64, _model_id: &str) {}

    fn on_attempt_joined(&self, _attempt: u64) {}

    fn on_state_change(&self, _previous: &SessionState, _current: &SessionState) {}

    fn on_attempt_success(&self, _attempt: u64, _model_id: &str, _elapsed: Duration) {}

    fn on_attempt_failure(&self, _attempt: u64, _error: &SessionError, _elapsed: Duration) {}

    fn on_unload(&self, _model_id: &str) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRegistryHooks;

impl RegistryHooks for NoopRegistryHooks {}
