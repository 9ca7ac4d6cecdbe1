//! Localizable texts shown in the chat thread.

use acommon::TextKey;

/// Id of the seeded greeting message.
pub const GREETING_ID: &str = "welcome";

pub const WELCOME: TextKey = TextKey::new(
    "chat.welcome",
    "Hello! I'm your AI fishing assistant. I can help you with fishing tips, species information, techniques, and answer any questions you have about fishing. What would you like to know?",
);

pub const TURN_FAILED: TextKey = TextKey::new(
    "chat.turn_failed",
    "Sorry, I encountered an error. Please try again.",
);

pub const EMPTY_REPLY: TextKey = TextKey::new(
    "chat.empty_reply",
    "Sorry, I could not generate a response.",
);
