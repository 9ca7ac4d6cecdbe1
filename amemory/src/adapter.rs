//! Adapter that exposes a key-value backend as achat conversation persistence.

use std::sync::Arc;

use achat::{ChatError, ConversationPersistence, Message};
use acommon::BoxFuture;

use crate::backend::{KeyValueBackend, MemoryBackendConfig, create_memory_backend};
use crate::error::MemoryError;
use crate::records::{decode_snapshot, encode_snapshot};

#[derive(Clone)]
pub struct MemoryConversationPersistence {
    backend: Arc<dyn KeyValueBackend>,
}

impl MemoryConversationPersistence {
    pub fn new(backend: Arc<dyn KeyValueBackend>) -> Self {
        Self { backend }
    }

    pub fn from_config(config: MemoryBackendConfig) -> Result<Self, MemoryError> {
        Ok(Self::new(create_memory_backend(config)?))
    }

    pub fn backend(&self) -> Arc<dyn KeyValueBackend> {
        Arc::clone(&self.backend)
    }

    pub async fn load_snapshot(&self, namespace: &str) -> Result<Option<Vec<Message>>, MemoryError> {
        match self.backend.get(namespace).await? {
            Some(document) => decode_snapshot(&document).map(Some),
            None => Ok(None),
        }
    }

    pub async fn save_snapshot(
        &self,
        namespace: &str,
        messages: &[Message],
    ) -> Result<(), MemoryError> {
        let document = encode_snapshot(messages)?;
        self.backend.put(namespace, document).await
    }
}

impl std::fmt::Debug for MemoryConversationPersistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryConversationPersistence")
            .finish_non_exhaustive()
    }
}

impl ConversationPersistence for MemoryConversationPersistence {
    fn load<'a>(
        &'a self,
        namespace: &'a str,
    ) -> BoxFuture<'a, Result<Option<Vec<Message>>, ChatError>> {
        Box::pin(async move { Ok(self.load_snapshot(namespace).await?) })
    }

    fn save<'a>(
        &'a self,
        namespace: &'a str,
        messages: Vec<Message>,
    ) -> BoxFuture<'a, Result<(), ChatError>> {
        Box::pin(async move { Ok(self.save_snapshot(namespace, &messages).await?) })
    }

    fn clear<'a>(&'a self, namespace: &'a str) -> BoxFuture<'a, Result<(), ChatError>> {
        Box::pin(async move {
            self.backend.remove(namespace).await?;
            Ok(())
        })
    }
}
