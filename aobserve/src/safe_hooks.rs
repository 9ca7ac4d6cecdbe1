use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use achat::{ChatError, ChatHooks};
use asession::{RegistryHooks, SessionError, SessionState};

/// Swallows panics raised by the wrapped registry hooks.
pub struct SafeRegistryHooks<H> {
    inner: H,
}

impl<H> SafeRegistryHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> RegistryHooks for SafeRegistryHooks<H>
where
    H: RegistryHooks,
{
    fn on_attempt_start(&self, attempt: u64, model_id: &str) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_attempt_start(attempt, model_id)
        }));
    }

    fn on_attempt_joined(&self, attempt: u64) {
        let _ = catch_unwind(AssertUnwindSafe(|| self.inner.on_attempt_joined(attempt)));
    }

    fn on_state_change(&self, previous: &SessionState, current: &SessionState) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_state_change(previous, current)
        }));
    }

    fn on_attempt_success(&self, attempt: u64, model_id: &str, elapsed: Duration) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_attempt_success(attempt, model_id, elapsed)
        }));
    }

    fn on_attempt_failure(&self, attempt: u64, error: &SessionError, elapsed: Duration) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_attempt_failure(attempt, error, elapsed)
        }));
    }

    fn on_unload(&self, model_id: &str) {
        let _ = catch_unwind(AssertUnwindSafe(|| self.inner.on_unload(model_id)));
    }
}

pub struct SafeChatHooks<H> {
    inner: H,
}

impl<H> SafeChatHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> ChatHooks for SafeChatHooks<H>
where
    H: ChatHooks,
{
    fn on_turn_start(&self, namespace: &str, streaming: bool) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_turn_start(namespace, streaming)
        }));
    }

    fn on_turn_success(&self, namespace: &str, elapsed: Duration, reply_chars: usize) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_turn_success(namespace, elapsed, reply_chars)
        }));
    }

    fn on_turn_failure(&self, namespace: &str, elapsed: Duration, error: &ChatError) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_turn_failure(namespace, elapsed, error)
        }));
    }

    fn on_persistence_failure(&self, namespace: &str, error: &ChatError) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_persistence_failure(namespace, error)
        }));
    }
}
