//! Ordered message history for one chat surface.
//!
//! ```rust
//! use achat::{Conversation, Message};
//!
//! let mut conversation = Conversation::new();
//! conversation.append(Message::user("Any tips for pike?"));
//! let reply = conversation.append(Message::placeholder());
//!
//! assert!(conversation.update_content(&reply, "Use a wire leader", true));
//! assert!(conversation.update_content(&reply, "Use a wire leader.", false));
//! assert!(!conversation.update_content(&reply, "changed", false));
//! assert_eq!(conversation.context().len(), 2);
//! ```

use std::collections::HashSet;

use abackend::{ChatMessage, Role};
use acommon::MessageId;

use crate::Message;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_messages(messages: Vec<Message>) -> Self {
        let mut conversation = Self::new();
        conversation.replace_all(messages);
        conversation
    }

    /// Adds `message` at the end and returns its id.
    ///
    /// A blank or already-used id is replaced with a fresh one.
    pub fn append(&mut self, mut message: Message) -> MessageId {
        if message.id.as_str().trim().is_empty() || self.contains(&message.id) {
            message.id = MessageId::generate();
        }

        let id = message.id.clone();
        self.messages.push(message);
        id
    }

    /// Replaces the content of a streaming message.
    ///
    /// Returns `false` without changing anything when the id is unknown, the message is
    /// already finalized, or a still-streaming update would shorten the content.
    pub fn update_content(
        &mut self,
        id: &MessageId,
        content: impl Into<String>,
        still_streaming: bool,
    ) -> bool {
        let Some(message) = self.messages.iter_mut().find(|message| &message.id == id) else {
            return false;
        };

        if !message.is_streaming {
            return false;
        }

        let content = content.into();
        if still_streaming && content.len() < message.content.len() {
            return false;
        }

        message.content = content;
        message.is_streaming = still_streaming;
        true
    }

    /// Removes the last message if it has `role`.
    pub fn rollback_last(&mut self, role: Role) -> Option<Message> {
        if self.messages.last().is_some_and(|message| message.role == role) {
            return self.messages.pop();
        }
        None
    }

    /// Replaces the history, finalizing every message and de-duplicating ids.
    pub fn replace_all(&mut self, messages: Vec<Message>) {
        let mut seen = HashSet::with_capacity(messages.len());
        self.messages = messages
            .into_iter()
            .map(|mut message| {
                message.is_streaming = false;
                if message.id.as_str().trim().is_empty() || !seen.insert(message.id.clone()) {
                    message.id = MessageId::generate();
                    seen.insert(message.id.clone());
                }
                message
            })
            .collect();
    }

    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    /// Messages replayed to the backend, in order.
    pub fn context(&self) -> Vec<ChatMessage> {
        self.messages
            .iter()
            .filter(|message| message.is_replayable())
            .map(Message::to_chat_message)
            .collect()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|message| &message.id == id)
    }

    pub fn contains(&self, id: &MessageId) -> bool {
        self.get(id).is_some()
    }

    pub fn has_streaming(&self) -> bool {
        self.messages.iter().any(|message| message.is_streaming)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }
}

#[cfg(test)]
mod tests {
    use abackend::Role;
    use acommon::MessageId;

    use super::Conversation;
    use crate::{Message, MessageKind};

    #[test]
    fn append_keeps_order_and_regenerates_duplicate_ids() {
        let mut conversation = Conversation::new();
        let first = conversation.append(Message::user("one").with_id("same"));
        let second = conversation.append(Message::assistant("two").with_id("same"));

        assert_eq!(first.as_str(), "same");
        assert_ne!(second, first);
        let contents = conversation
            .iter()
            .map(|message| message.content.as_str())
            .collect::<Vec<_>>();
        assert_eq!(contents, vec!["one", "two"]);
    }

    #[test]
    fn update_content_is_a_no_op_for_unknown_or_finalized_messages() {
        let mut conversation = Conversation::new();
        let finalized = conversation.append(Message::assistant("done"));

        assert!(!conversation.update_content(&MessageId::new("missing"), "x", true));
        assert!(!conversation.update_content(&finalized, "rewritten", false));
        assert_eq!(
            conversation.get(&finalized).map(|m| m.content.as_str()),
            Some("done")
        );
    }

    #[test]
    fn streaming_updates_never_shrink_content() {
        let mut conversation = Conversation::new();
        let id = conversation.append(Message::placeholder());

        assert!(conversation.update_content(&id, "Mackerel school", true));
        assert!(!conversation.update_content(&id, "Mack", true));
        assert!(conversation.update_content(&id, "Mackerel school near the surface.", false));

        let message = conversation.get(&id).expect("message");
        assert!(!message.is_streaming);
        assert_eq!(message.content, "Mackerel school near the surface.");
    }

    #[test]
    fn rollback_last_only_removes_matching_role() {
        let mut conversation = Conversation::new();
        conversation.append(Message::user("question"));
        conversation.append(Message::placeholder());

        assert!(conversation.rollback_last(Role::User).is_none());
        let removed = conversation.rollback_last(Role::Assistant).expect("placeholder");
        assert!(removed.is_streaming);
        assert!(!conversation.has_streaming());
        assert_eq!(conversation.len(), 1);
    }

    #[test]
    fn replace_all_of_snapshot_round_trips_and_clears_streaming() {
        let mut conversation = Conversation::new();
        conversation.append(Message::greeting("Hello!"));
        conversation.append(Message::user("Where are the trout?"));
        let reply = conversation.append(Message::placeholder());
        conversation.update_content(&reply, "Deep pools", true);

        let snapshot = conversation.snapshot();
        let mut restored = Conversation::new();
        restored.replace_all(snapshot.clone());

        assert_eq!(restored.len(), snapshot.len());
        for (left, right) in restored.iter().zip(snapshot.iter()) {
            assert_eq!(left.id, right.id);
            assert_eq!(left.role, right.role);
            assert_eq!(left.content, right.content);
            assert_eq!(left.kind, right.kind);
        }
        assert!(!restored.has_streaming());
    }

    #[test]
    fn replace_all_deduplicates_ids() {
        let mut conversation = Conversation::new();
        conversation.replace_all(vec![
            Message::user("a").with_id("x"),
            Message::assistant("b").with_id("x"),
        ]);

        let ids = conversation.iter().map(|m| m.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
    }

    #[test]
    fn context_skips_greeting_notices_and_empty_placeholder() {
        let mut conversation = Conversation::new();
        conversation.append(Message::greeting("Hello!"));
        conversation.append(Message::user("Best bait?"));
        conversation.append(Message::notice("Sorry, try again."));
        conversation.append(Message::user("Best bait for carp?"));
        conversation.append(Message::placeholder());

        let context = conversation.context();
        assert_eq!(context.len(), 2);
        assert!(context.iter().all(|message| message.role == Role::User));
        assert_eq!(context[1].content, "Best bait for carp?");

        let kinds = conversation.iter().map(|m| m.kind).collect::<Vec<_>>();
        assert_eq!(kinds[0], MessageKind::Greeting);
        assert_eq!(kinds[2], MessageKind::Notice);
    }
}
