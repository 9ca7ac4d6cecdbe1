//! Conversation message values.
//!
//! ```rust
//! use achat::{Message, MessageKind};
//!
//! let question = Message::user("What line weight for bass?");
//! let greeting = Message::greeting("Hello!");
//!
//! assert!(question.is_replayable());
//! assert_eq!(greeting.kind, MessageKind::Greeting);
//! assert!(!greeting.is_replayable());
//! ```

use std::time::SystemTime;

use abackend::{ChatMessage, Role};
use acommon::MessageId;

/// How a message participates in the thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MessageKind {
    /// A user turn or assistant reply; replayed to the backend.
    #[default]
    Exchange,
    /// Seeded welcome text; shown, never replayed.
    Greeting,
    /// Failure notice appended in place of a missing reply; shown, never replayed.
    Notice,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exchange => "exchange",
            Self::Greeting => "greeting",
            Self::Notice => "notice",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "exchange" => Some(Self::Exchange),
            "greeting" => Some(Self::Greeting),
            "notice" => Some(Self::Notice),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    pub created_at: SystemTime,
    pub is_streaming: bool,
    pub kind: MessageKind,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::generate(),
            role,
            content: content.into(),
            created_at: SystemTime::now(),
            is_streaming: false,
            kind: MessageKind::Exchange,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Empty streaming assistant message that a turn fills in.
    pub fn placeholder() -> Self {
        Self {
            is_streaming: true,
            ..Self::assistant(String::new())
        }
    }

    pub fn greeting(content: impl Into<String>) -> Self {
        Self::assistant(content).with_kind(MessageKind::Greeting)
    }

    pub fn notice(content: impl Into<String>) -> Self {
        Self::assistant(content).with_kind(MessageKind::Notice)
    }

    pub fn with_id(mut self, id: impl Into<MessageId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_created_at(mut self, created_at: SystemTime) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn with_kind(mut self, kind: MessageKind) -> Self {
        self.kind = kind;
        self
    }

    /// Whether this message belongs in the context sent to the backend.
    pub fn is_replayable(&self) -> bool {
        self.kind == MessageKind::Exchange && !(self.is_streaming && self.content.is_empty())
    }

    pub fn to_chat_message(&self) -> ChatMessage {
        ChatMessage::new(self.role, self.content.clone())
    }
}
