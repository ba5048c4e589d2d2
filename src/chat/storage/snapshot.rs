//! Encoding and lenient decoding of the persisted conversation list.
//!
//! The blob is a JSON array of conversations with nested messages. Restoring
//! never fails: a blob that is not an array yields an empty list, and each
//! record that does not fit the data model is dropped on its own so one bad
//! entry cannot take the rest of the history with it.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::chat::core::conversation::Conversation;
use crate::chat::core::errors::{ChatError, ChatResult};
use crate::chat::core::ids::ConversationId;
use crate::chat::core::message::Message;
use crate::chat::core::time::iso_millis;
use crate::chat::storage::blob_store::BlobStore;

/// A conversation whose messages have not been validated yet.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConversation {
    id: ConversationId,
    title: String,
    messages: Vec<Value>,
    #[serde(with = "iso_millis")]
    created_at: DateTime<Utc>,
    #[serde(with = "iso_millis")]
    updated_at: DateTime<Utc>,
}

/// Serialize the conversation list to the blob format.
///
/// # Errors
/// Returns an error if serialization fails.
pub fn encode(conversations: &[Conversation]) -> ChatResult<String> {
    Ok(serde_json::to_string(conversations)?)
}

/// Rebuild the conversation list from a blob, dropping malformed records.
#[must_use]
pub fn decode(raw: &str) -> Vec<Conversation> {
    let records = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(records)) => records,
        Ok(other) => {
            warn!(kind = json_kind(&other), "Stored conversations are not a list; starting empty");
            return Vec::new();
        }
        Err(err) => {
            warn!(%err, "Failed to parse stored conversations; starting empty");
            return Vec::new();
        }
    };

    let mut seen = HashSet::with_capacity(records.len());
    let mut conversations = Vec::with_capacity(records.len());
    for (index, record) in records.into_iter().enumerate() {
        match decode_conversation(record) {
            Ok(conversation) if seen.insert(conversation.id) => conversations.push(conversation),
            Ok(conversation) => {
                warn!(index, id = %conversation.id, "Dropping duplicate conversation record");
            }
            Err(err) => warn!(index, %err, "Dropping malformed conversation record"),
        }
    }
    conversations
}

fn decode_conversation(record: Value) -> ChatResult<Conversation> {
    let raw: RawConversation = serde_json::from_value(record)
        .map_err(|err| ChatError::InvalidRecord(format!("conversation: {err}")))?;

    let mut messages = Vec::with_capacity(raw.messages.len());
    for (index, value) in raw.messages.into_iter().enumerate() {
        match serde_json::from_value::<Message>(value) {
            Ok(message) => messages.push(message),
            Err(err) => warn!(conversation = %raw.id, index, %err, "Dropping malformed message"),
        }
    }

    Ok(Conversation {
        id: raw.id,
        title: raw.title,
        messages,
        created_at: raw.created_at,
        updated_at: raw.updated_at,
    })
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Write the conversation list under `key`.
///
/// # Errors
/// Returns an error if serialization or the storage write fails.
pub fn persist(store: &dyn BlobStore, key: &str, conversations: &[Conversation]) -> ChatResult<()> {
    let blob = encode(conversations)?;
    store.save(key, &blob)?;
    debug!(key, conversations = conversations.len(), bytes = blob.len(), "Persisted conversations");
    Ok(())
}

/// Read the conversation list stored under `key`.
///
/// Storage and parse failures are logged and yield an empty list.
#[must_use]
pub fn restore(store: &dyn BlobStore, key: &str) -> Vec<Conversation> {
    match store.load(key) {
        Ok(Some(raw)) => {
            let conversations = decode(&raw);
            debug!(key, conversations = conversations.len(), "Restored conversations");
            conversations
        }
        Ok(None) => Vec::new(),
        Err(err) => {
            warn!(key, %err, "Failed to load conversations; starting empty");
            Vec::new()
        }
    }
}
