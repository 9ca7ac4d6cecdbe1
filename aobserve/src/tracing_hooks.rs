//! Tracing-based observability hooks for model loading and chat turns.
//!
//! ```rust
//! use aobserve::TracingObservabilityHooks;
//! use asession::RegistryHooks;
//!
//! fn accepts_registry_hooks(_hooks: &dyn RegistryHooks) {}
//!
//! let hooks = TracingObservabilityHooks;
//! accepts_registry_hooks(&hooks);
//! ```

use std::time::Duration;

use achat::{ChatError, ChatHooks};
use asession::{RegistryHooks, SessionError, SessionState};

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObservabilityHooks;

impl RegistryHooks for TracingObservabilityHooks {
    fn on_attempt_start(&self, attempt: u64, model_id: &str) {
        tracing::info!(phase = "session", event = "attempt_start", attempt, model_id);
    }

    fn on_attempt_joined(&self, attempt: u64) {
        tracing::debug!(phase = "session", event = "attempt_joined", attempt);
    }

    fn on_state_change(&self, previous: &SessionState, current: &SessionState) {
        match current {
            SessionState::Loading { progress } => tracing::debug!(
                phase = "session",
                event = "state_change",
                from = previous.label(),
                to = current.label(),
                progress = progress.as_str()
            ),
            SessionState::Failed { reason } => tracing::warn!(
                phase = "session",
                event = "state_change",
                from = previous.label(),
                to = current.label(),
                reason = reason.as_str()
            ),
            _ => tracing::info!(
                phase = "session",
                event = "state_change",
                from = previous.label(),
                to = current.label()
            ),
        }
    }

    fn on_attempt_success(&self, attempt: u64, model_id: &str, elapsed: Duration) {
        tracing::info!(
            phase = "session",
            event = "attempt_success",
            attempt,
            model_id,
            elapsed_ms = elapsed.as_millis() as u64
        );
    }

    fn on_attempt_failure(&self, attempt: u64, error: &SessionError, elapsed: Duration) {
        tracing::error!(
            phase = "session",
            event = "attempt_failure",
            attempt,
            elapsed_ms = elapsed.as_millis() as u64,
            error_kind = ?error.kind,
            retriable = error.is_retriable(),
            error = %error
        );
    }

    fn on_unload(&self, model_id: &str) {
        tracing::info!(phase = "session", event = "unload", model_id);
    }
}

impl ChatHooks for TracingObservabilityHooks {
    fn on_turn_start(&self, namespace: &str, streaming: bool) {
        tracing::info!(phase = "chat", event = "turn_start", namespace, streaming);
    }

    fn on_turn_success(&self, namespace: &str, elapsed: Duration, reply_chars: usize) {
        tracing::info!(
            phase = "chat",
            event = "turn_success",
            namespace,
            elapsed_ms = elapsed.as_millis() as u64,
            reply_chars
        );
    }

    fn on_turn_failure(&self, namespace: &str, elapsed: Duration, error: &ChatError) {
        tracing::error!(
            phase = "chat",
            event = "turn_failure",
            namespace,
            elapsed_ms = elapsed.as_millis() as u64,
            error_kind = ?error.kind,
            error = %error
        );
    }

    fn on_persistence_failure(&self, namespace: &str, error: &ChatError) {
        tracing::warn!(
            phase = "chat",
            event = "persistence_failure",
            namespace,
            error_kind = ?error.kind,
            error = %error
        );
    }
}
