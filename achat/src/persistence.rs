//! Conversation persistence contracts and a basic in-memory implementation.

use std::collections::HashMap;
use std::sync::Mutex;

use acommon::BoxFuture;

use crate::{ChatError, Message};

/// Stores whole conversation snapshots under a namespace key.
pub trait ConversationPersistence: Send + Sync {
    /// Returns `None` when nothing was stored under `namespace`.
    fn load<'a>(
        &'a self,
        namespace: &'a str,
    ) -> BoxFuture<'a, Result<Option<Vec<Message>>, ChatError>>;

    fn save<'a>(
        &'a self,
        namespace: &'a str,
        messages: Vec<Message>,
    ) -> BoxFuture<'a, Result<(), ChatError>>;

    fn clear<'a>(&'a self, namespace: &'a str) -> BoxFuture<'a, Result<(), ChatError>>;
}

#[derive(Debug, Default)]
pub struct InMemoryConversationPersistence {
    snapshots: Mutex<HashMap<String, Vec<Message>>>,
}

impl InMemoryConversationPersistence {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConversationPersistence for InMemoryConversationPersistence {
    fn load<'a>(
        &'a self,
        namespace: &'a str,
    ) -> BoxFuture<'a, Result<Option<Vec<Message>>, ChatError>> {
        Box::pin(async move {
            let snapshots = self
                .snapshots
                .lock()
                .map_err(|_| ChatError::store("conversation persistence lock poisoned"))?;

            Ok(snapshots.get(namespace).cloned())
        })
    }

    fn save<'a>(
        &'a self,
        namespace: &'a str,
        messages: Vec<Message>,
    ) -> BoxFuture<'a, Result<(), ChatError>> {
        Box::pin(async move {
            let mut snapshots = self
                .snapshots
                .lock()
                .map_err(|_| ChatError::store("conversation persistence lock poisoned"))?;

            snapshots.insert(namespace.to_string(), messages);
            Ok(())
        })
    }

    fn clear<'a>(&'a self, namespace: &'a str) -> BoxFuture<'a, Result<(), ChatError>> {
        Box::pin(async move {
            let mut snapshots = self
                .snapshots
                .lock()
                .map_err(|_| ChatError::store("conversation persistence lock poisoned"))?;

            snapshots.remove(namespace);
            Ok(())
        })
    }
}
