use std::time::Duration;

use achat::{ChatError, ChatHooks};
use asession::{RegistryHooks, SessionError, SessionState};

use crate::{MetricsObservabilityHooks, TracingObservabilityHooks};

/// Tracing and metrics together, with either side switchable.
#[derive(Debug, Clone, Copy)]
pub struct ObservabilityHooks {
    tracing: bool,
    metrics: bool,
}

impl ObservabilityHooks {
    pub fn new() -> Self {
        Self {
            tracing: true,
            metrics: true,
        }
    }

    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.tracing = enabled;
        self
    }

    pub fn with_metrics(mut self, enabled: bool) -> Self {
        self.metrics = enabled;
        self
    }

    pub fn tracing_enabled(&self) -> bool {
        self.tracing
    }

    pub fn metrics_enabled(&self) -> bool {
        self.metrics
    }

    fn registry_sinks(&self) -> impl Iterator<Item = &'static dyn RegistryHooks> {
        let tracing: Option<&'static dyn RegistryHooks> =
            self.tracing.then_some(&TracingObservabilityHooks as &'static dyn RegistryHooks);
        let metrics: Option<&'static dyn RegistryHooks> =
            self.metrics.then_some(&MetricsObservabilityHooks as &'static dyn RegistryHooks);
        tracing.into_iter().chain(metrics)
    }

    fn chat_sinks(&self) -> impl Iterator<Item = &'static dyn ChatHooks> {
        let tracing: Option<&'static dyn ChatHooks> =
            self.tracing.then_some(&TracingObservabilityHooks as &'static dyn ChatHooks);
        let metrics: Option<&'static dyn ChatHooks> =
            self.metrics.then_some(&MetricsObservabilityHooks as &'static dyn ChatHooks);
        tracing.into_iter().chain(metrics)
    }
}

impl Default for ObservabilityHooks {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryHooks for ObservabilityHooks {
    fn on_attempt_start(&self, attempt: u64, model_id: &str) {
        self.registry_sinks()
            .for_each(|sink| sink.on_attempt_start(attempt, model_id));
    }

    fn on_attempt_joined(&self, attempt: u64) {
        self.registry_sinks()
            .for_each(|sink| sink.on_attempt_joined(attempt));
    }

    fn on_state_change(&self, previous: &SessionState, current: &SessionState) {
        self.registry_sinks()
            .for_each(|sink| sink.on_state_change(previous, current));
    }

    fn on_attempt_success(&self, attempt: u64, model_id: &str, elapsed: Duration) {
        self.registry_sinks()
            .for_each(|sink| sink.on_attempt_success(attempt, model_id, elapsed));
    }

    fn on_attempt_failure(&self, attempt: u64, error: &SessionError, elapsed: Duration) {
        self.registry_sinks()
            .for_each(|sink| sink.on_attempt_failure(attempt, error, elapsed));
    }

    fn on_unload(&self, model_id: &str) {
        self.registry_sinks()
            .for_each(|sink| sink.on_unload(model_id));
    }
}

impl ChatHooks for ObservabilityHooks {
    fn on_turn_start(&self, namespace: &str, streaming: bool) {
        self.chat_sinks()
            .for_each(|sink| sink.on_turn_start(namespace, streaming));
    }

    fn on_turn_success(&self, namespace: &str, elapsed: Duration, reply_chars: usize) {
        self.chat_sinks()
            .for_each(|sink| sink.on_turn_success(namespace, elapsed, reply_chars));
    }

    fn on_turn_failure(&self, namespace: &str, elapsed: Duration, error: &ChatError) {
        self.chat_sinks()
            .for_each(|sink| sink.on_turn_failure(namespace, elapsed, error));
    }

    fn on_persistence_failure(&self, namespace: &str, error: &ChatError) {
        self.chat_sinks()
            .for_each(|sink| sink.on_persistence_failure(namespace, error));
    }
}
