//! Conversation history and per-surface session clients.
//!
//! Every chat surface owns one [`SessionClient`] with a private [`Conversation`]. All clients
//! share the backend through one [`asession::SessionRegistry`].
//!
//! ```rust
//! use achat::{Conversation, Message};
//! use abackend::Role;
//!
//! let mut conversation = Conversation::new();
//! conversation.append(Message::user("Where do walleye feed at dusk?"));
//! conversation.append(Message::placeholder());
//! conversation.rollback_last(Role::Assistant);
//!
//! assert_eq!(conversation.len(), 1);
//! assert!(!conversation.has_streaming());
//! ```

mod client;
mod conversation;
mod error;
mod hooks;
mod message;
mod persistence;
pub mod text;

pub use client::{
    DEFAULT_MAX_TOKENS, DEFAULT_NAMESPACE, DEFAULT_TEMPERATURE, SessionClient,
    SessionClientBuilder, default_generation_options,
};
pub use conversation::Conversation;
pub use error::{ChatError, ChatErrorKind};
pub use hooks::{ChatHooks, NoopChatHooks};
pub use message::{Message, MessageKind};
pub use persistence::{ConversationPersistence, InMemoryConversationPersistence};

pub mod prelude {
    pub use crate::{
        ChatError, ChatErrorKind, ChatHooks, Conversation, ConversationPersistence,
        InMemoryConversationPersistence, Message, MessageKind, NoopChatHooks, SessionClient,
        SessionClientBuilder,
    };
    pub use abackend::Role;
    pub use acommon::{GenerationOptions, MessageId};
}
