//! Conversation persistence for the angler assistant.
//!
//! Snapshots are JSON documents stored in a [`KeyValueBackend`] under the
//! conversation namespace.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use achat::{ConversationPersistence, Message};
//! use amemory::{InMemoryKeyValueBackend, MemoryConversationPersistence};
//!
//! # async fn demo() -> Result<(), achat::ChatError> {
//! let persistence = MemoryConversationPersistence::new(Arc::new(InMemoryKeyValueBackend::new()));
//! persistence
//!     .save("ai_chat_history", vec![Message::user("Any walleye near the dam?")])
//!     .await?;
//! let restored = persistence.load("ai_chat_history").await?.unwrap_or_default();
//! assert_eq!(restored.len(), 1);
//! # Ok(())
//! # }
//! ```

mod adapter;
mod backend;
mod backends;
mod error;
mod records;

pub mod prelude {
    pub use crate::{
        FilesystemKeyValueBackend, InMemoryKeyValueBackend, KeyValueBackend,
        MemoryBackendConfig, MemoryConversationPersistence, MemoryError, MemoryErrorKind,
        SqliteKeyValueBackend, create_default_memory_backend, create_memory_backend,
    };
}

pub use adapter::MemoryConversationPersistence;
pub use backend::{
    FilesystemKeyValueBackend, InMemoryKeyValueBackend, KeyValueBackend, MemoryBackendConfig,
    SqliteKeyValueBackend, create_default_memory_backend, create_memory_backend,
};
pub use error::{MemoryError, MemoryErrorKind};
