//! Chat message type and its mapping to log entry fields.
//!
//! The log store only sees an opaque map of named string values; this
//! module owns the field names and the conversions in both directions.

use std::collections::HashMap;

use crate::store::{EntryId, LogEntry, StoreError};

pub const AUTHOR_FIELD: &str = "author";
pub const CREATED_AT_FIELD: &str = "created-at";
pub const CONTENT_FIELD: &str = "content";

/// A chat message. Immutable once written; `id` and `created_at_ms` are
/// assigned by the writer at append time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: EntryId,
    pub author: String,
    /// Milliseconds since the UNIX epoch (UTC).
    pub created_at_ms: u64,
    pub content: String,
}

impl Message {
    /// Rebuild a message from a stored log entry. Missing or unparseable
    /// fields fall back to defaults; unknown fields are ignored.
    pub fn from_entry(entry: LogEntry) -> Self {
        let mut fields = entry.fields;
        let created_at_ms = fields
            .get(CREATED_AT_FIELD)
            .and_then(|s| s.parse().ok())
            .unwrap_or_default();
        Message {
            id: entry.id,
            author: fields.remove(AUTHOR_FIELD).unwrap_or_default(),
            created_at_ms,
            content: fields.remove(CONTENT_FIELD).unwrap_or_default(),
        }
    }

    /// Field map for appending a new message to the log.
    pub fn to_fields(author: &str, created_at_ms: u64, content: &str) -> HashMap<String, String> {
        let mut fields = HashMap::with_capacity(3);
        fields.insert(AUTHOR_FIELD.to_string(), author.to_string());
        fields.insert(CREATED_AT_FIELD.to_string(), created_at_ms.to_string());
        fields.insert(CONTENT_FIELD.to_string(), content.to_string());
        fields
    }
}

/// Error type for chat operations
#[derive(Debug)]
pub enum ChatError {
    /// Request rejected before reaching the log store
    Validation(String),
    /// Log store failure, propagated unchanged and never retried
    Store(StoreError),
}

impl std::fmt::Display for ChatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatError::Validation(msg) => write!(f, "validation: {}", msg),
            ChatError::Store(e) => write!(f, "store: {}", e),
        }
    }
}

impl std::error::Error for ChatError {}

impl From<StoreError> for ChatError {
    fn from(e: StoreError) -> Self {
        ChatError::Store(e)
    }
}
