//! Serialized conversation snapshot format.
//!
//! A snapshot is a JSON array of `{id, role, content, createdAt}` records, with
//! `createdAt` in Unix milliseconds. `kind` is only present for greeting and
//! notice entries.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use abackend::Role;
use achat::{Message, MessageKind};
use serde::{Deserialize, Serialize};

use crate::error::MemoryError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MessageRecord {
    pub id: String,
    pub role: String,
    pub content: String,
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl MessageRecord {
    pub fn from_message(message: &Message) -> Self {
        let kind = match message.kind {
            MessageKind::Exchange => None,
            other => Some(other.as_str().to_string()),
        };

        Self {
            id: message.id.as_str().to_string(),
            role: message.role.as_str().to_string(),
            content: message.content.clone(),
            created_at: to_unix_millis(message.created_at),
            kind,
        }
    }

    pub fn into_message(self) -> Result<Message, MemoryError> {
        let role = match Role::parse(&self.role) {
            Some(role @ (Role::User | Role::Assistant)) => role,
            _ => {
                return Err(MemoryError::corrupt(format!(
                    "unknown message role '{}'",
                    self.role
                )));
            }
        };
        let kind = match self.kind.as_deref() {
            None => MessageKind::Exchange,
            Some(value) => MessageKind::parse(value).ok_or_else(|| {
                MemoryError::corrupt(format!("unknown message kind '{value}'"))
            })?,
        };

        Ok(Message::new(role, self.content)
            .with_id(self.id)
            .with_created_at(from_unix_millis(self.created_at))
            .with_kind(kind))
    }
}

pub(crate) fn encode_snapshot(messages: &[Message]) -> Result<String, MemoryError> {
    let records = messages
        .iter()
        .map(MessageRecord::from_message)
        .collect::<Vec<_>>();
    serde_json::to_string(&records)
        .map_err(|error| MemoryError::storage_context("failed to encode conversation", error))
}

/// Decoded messages always come back finalized.
pub(crate) fn decode_snapshot(document: &str) -> Result<Vec<Message>, MemoryError> {
    let records: Vec<MessageRecord> = serde_json::from_str(document).map_err(|error| {
        MemoryError::corrupt(format!("failed to decode conversation: {error}"))
    })?;
    records
        .into_iter()
        .map(MessageRecord::into_message)
        .collect()
}

fn to_unix_millis(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => i64::try_from(after.as_millis()).unwrap_or(i64::MAX),
        Err(before) => -i64::try_from(before.duration().as_millis()).unwrap_or(i64::MAX),
    }
}

fn from_unix_millis(millis: i64) -> SystemTime {
    let offset = Duration::from_millis(millis.unsigned_abs());
    if millis >= 0 {
        UNIX_EPOCH + offset
    } else {
        UNIX_EPOCH - offset
    }
}
