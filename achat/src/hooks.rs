use std::time::Duration;

use crate::ChatError;

/// Turn lifecycle callbacks for observability integrations.
pub trait ChatHooks: Send + Sync {
    fn on_turn_start(&self, _namespace: &str, _streaming: bool) {}

    fn on_turn_success(&self, _namespace: &str, _elapsed: Duration, _reply_chars: usize) {}

    fn on_turn_failure(&self, _namespace: &str, _elapsed: Duration, _error: &ChatError) {}

    fn on_persistence_failure(&self, _namespace: &str, _error: &ChatError) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopChatHooks;

impl ChatHooks for NoopChatHooks {}
