//! Appending new messages to the log.

use std::sync::Arc;

use crate::store::LogStore;

use super::clock::{Clock, SystemClock};
use super::message::{ChatError, Message};

/// Validates and appends messages. The append is a single store call;
/// a failure propagates to the caller unretried, and no partial write
/// is ever observable.
#[derive(Clone)]
pub struct MessageWriter {
    store: Arc<dyn LogStore>,
    clock: Arc<dyn Clock>,
}

impl MessageWriter {
    pub fn new(store: Arc<dyn LogStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn LogStore>, clock: Arc<dyn Clock>) -> Self {
        MessageWriter { store, clock }
    }

    /// Append a new message and return it fully populated with the
    /// store-assigned id and the write-time UTC timestamp.
    pub fn send(&self, author: &str, content: &str) -> Result<Message, ChatError> {
        if author.trim().is_empty() {
            return Err(ChatError::Validation("author must not be empty".to_string()));
        }
        if content.trim().is_empty() {
            return Err(ChatError::Validation("content must not be empty".to_string()));
        }

        let created_at_ms = self.clock.now_unix_ms();
        let fields = Message::to_fields(author, created_at_ms, content);
        let id = self.store.append(fields)?;

        Ok(Message {
            id,
            author: author.to_string(),
            created_at_ms,
            content: content.to_string(),
        })
    }
}
