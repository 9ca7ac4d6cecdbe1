//! Metrics-based observability hooks for model loading and chat turns.
//!
//! ```rust
//! use achat::ChatHooks;
//! use aobserve::MetricsObservabilityHooks;
//!
//! fn accepts_chat_hooks(_hooks: &dyn ChatHooks) {}
//!
//! let hooks = MetricsObservabilityHooks;
//! accepts_chat_hooks(&hooks);
//! ```

use std::time::Duration;

use achat::{ChatError, ChatHooks};
use asession::{RegistryHooks, SessionError, SessionState};

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsObservabilityHooks;

impl RegistryHooks for MetricsObservabilityHooks {
    fn on_attempt_start(&self, _attempt: u64, model_id: &str) {
        metrics::counter!(
            "angler_session_attempt_start_total",
            "model" => model_id.to_string()
        )
        .increment(1);
    }

    fn on_attempt_joined(&self, _attempt: u64) {
        metrics::counter!("angler_session_attempt_joined_total").increment(1);
    }

    fn on_state_change(&self, _previous: &SessionState, current: &SessionState) {
        if matches!(current, SessionState::Loading { .. }) {
            return;
        }
        metrics::counter!(
            "angler_session_state_change_total",
            "state" => current.label()
        )
        .increment(1);
    }

    fn on_attempt_success(&self, _attempt: u64, model_id: &str, elapsed: Duration) {
        metrics::counter!(
            "angler_session_load_success_total",
            "model" => model_id.to_string()
        )
        .increment(1);
        metrics::histogram!(
            "angler_session_load_duration_seconds",
            "model" => model_id.to_string()
        )
        .record(elapsed.as_secs_f64());
    }

    fn on_attempt_failure(&self, _attempt: u64, error: &SessionError, elapsed: Duration) {
        metrics::counter!(
            "angler_session_load_failure_total",
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
        metrics::histogram!("angler_session_load_failure_duration_seconds")
            .record(elapsed.as_secs_f64());
    }

    fn on_unload(&self, model_id: &str) {
        metrics::counter!(
            "angler_session_unload_total",
            "model" => model_id.to_string()
        )
        .increment(1);
    }
}

impl ChatHooks for MetricsObservabilityHooks {
    fn on_turn_start(&self, namespace: &str, streaming: bool) {
        metrics::counter!(
            "angler_chat_turn_start_total",
            "namespace" => namespace.to_string(),
            "mode" => if streaming { "stream" } else { "complete" }
        )
        .increment(1);
    }

    fn on_turn_success(&self, namespace: &str, elapsed: Duration, reply_chars: usize) {
        metrics::counter!(
            "angler_chat_turn_success_total",
            "namespace" => namespace.to_string()
        )
        .increment(1);
        metrics::histogram!(
            "angler_chat_turn_duration_seconds",
            "namespace" => namespace.to_string()
        )
        .record(elapsed.as_secs_f64());
        metrics::histogram!(
            "angler_chat_reply_chars",
            "namespace" => namespace.to_string()
        )
        .record(reply_chars as f64);
    }

    fn on_turn_failure(&self, namespace: &str, elapsed: Duration, error: &ChatError) {
        metrics::counter!(
            "angler_chat_turn_failure_total",
            "namespace" => namespace.to_string(),
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
        metrics::histogram!(
            "angler_chat_turn_failure_duration_seconds",
            "namespace" => namespace.to_string()
        )
        .record(elapsed.as_secs_f64());
    }

    fn on_persistence_failure(&self, namespace: &str, error: &ChatError) {
        metrics::counter!(
            "angler_chat_persistence_failure_total",
            "namespace" => namespace.to_string(),
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
    }
}
