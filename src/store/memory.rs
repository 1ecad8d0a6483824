//! In-memory log store for unit tests and the default server backend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::entry::{EntryId, LogEntry, LogStore, StoreError};

struct LogInner {
    /// Next sequence number to assign. Starts at 1.
    next_seq: u64,
    /// Entries in append (= ascending id) order.
    entries: Vec<LogEntry>,
}

/// In-memory append log. Cheap to clone; clones share the same log.
#[derive(Clone)]
pub struct InMemoryLogStore {
    inner: Arc<Mutex<LogInner>>,
}

impl InMemoryLogStore {
    pub fn new() -> Self {
        InMemoryLogStore {
            inner: Arc::new(Mutex::new(LogInner {
                next_seq: 1,
                entries: Vec::new(),
            })),
        }
    }

    /// Number of entries currently in the log.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("log store mutex poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryLogStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LogStore for InMemoryLogStore {
    fn append(&self, fields: HashMap<String, String>) -> Result<EntryId, StoreError> {
        let mut inner = self.inner.lock().expect("log store mutex poisoned");
        let id = EntryId::from_seq(inner.next_seq);
        inner.next_seq = inner
            .next_seq
            .checked_add(1)
            .expect("entry id overflow unreachable");
        inner.entries.push(LogEntry { id, fields });

        debug_assert!(
            inner.entries.windows(2).all(|w| w[0].id < w[1].id),
            "Postcondition: entries must stay in ascending id order"
        );

        Ok(id)
    }

    fn range_from(&self, min_id: EntryId) -> Result<Vec<LogEntry>, StoreError> {
        let inner = self.inner.lock().expect("log store mutex poisoned");
        // Entries are sorted by id, so the matching suffix starts at the
        // first entry >= min_id.
        let start = inner.entries.partition_point(|e| e.id < min_id);
        Ok(inner.entries[start..].to_vec())
    }

    fn range_latest(&self, count: usize) -> Result<Vec<LogEntry>, StoreError> {
        let inner = self.inner.lock().expect("log store mutex poisoned");
        let start = inner.entries.len().saturating_sub(count);
        Ok(inner.entries[start..].to_vec())
    }
}
