//! Small convenience constructors for common types.

use crate::{GenerationOptions, Message, Role, default_generation_options};

pub fn user_message(content: impl Into<String>) -> Message {
    Message::user(content)
}

pub fn assistant_message(content: impl Into<String>) -> Message {
    Message::assistant(content)
}

/// Generation settings on top of the assistant defaults.
pub fn generation(temperature: f32, max_tokens: u32) -> GenerationOptions {
    default_generation_options()
        .with_temperature(temperature)
        .with_max_tokens(max_tokens)
}

pub fn parse_role(value: &str) -> Option<Role> {
    match value.trim().to_ascii_lowercase().as_str() {
        "user" | "human" | "me" => Some(Role::User),
        "assistant" | "ai" | "bot" => Some(Role::Assistant),
        "system" => Some(Role::System),
        _ => None,
    }
}
