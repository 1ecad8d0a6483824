//! Bounded reads of the message history.

use std::sync::Arc;

use crate::store::{EntryId, LogStore};

use super::message::{ChatError, Message};

/// A bounded historical query. The two modes are mutually exclusive;
/// the wire layer maps "id present" to `After` and "count present" to
/// `Latest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryQuery {
    /// All messages with id strictly greater than the given id.
    After(EntryId),
    /// The most recent N messages, ascending in the result.
    Latest(usize),
}

/// Read-only view over the log store. No side effects; a query returns
/// either the full matching set or the store's failure.
#[derive(Clone)]
pub struct HistoryReader {
    store: Arc<dyn LogStore>,
}

impl HistoryReader {
    pub fn new(store: Arc<dyn LogStore>) -> Self {
        HistoryReader { store }
    }

    pub fn read(&self, query: HistoryQuery) -> Result<Vec<Message>, ChatError> {
        let entries = match query {
            HistoryQuery::After(id) => {
                // The store range is inclusive of the boundary entry;
                // this query mode is strictly-after.
                let mut entries = self.store.range_from(id)?;
                entries.retain(|e| e.id > id);
                entries
            }
            HistoryQuery::Latest(count) => self.store.range_latest(count)?,
        };

        Ok(entries.into_iter().map(Message::from_entry).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryLogStore;

    fn seeded_store() -> Arc<InMemoryLogStore> {
        let store = Arc::new(InMemoryLogStore::new());
        for (author, content) in [("u1", "first"), ("u2", "second"), ("u3", "third")] {
            store.append(Message::to_fields(author, 1_000, content)).unwrap();
        }
        store
    }

    #[test]
    fn test_latest_two_of_three_ascending() {
        let reader = HistoryReader::new(seeded_store());
        let messages = reader.read(HistoryQuery::Latest(2)).unwrap();
        let ids: Vec<String> = messages.iter().map(|m| m.id.to_string()).collect();
        assert_eq!(ids, vec!["2", "3"]);
    }

    #[test]
    fn test_after_is_strictly_greater() {
        let reader = HistoryReader::new(seeded_store());
        let messages = reader.read(HistoryQuery::After(EntryId::from_seq(1))).unwrap();
        let ids: Vec<String> = messages.iter().map(|m| m.id.to_string()).collect();
        assert_eq!(ids, vec!["2", "3"]);
    }

    #[test]
    fn test_after_last_entry_is_empty() {
        let reader = HistoryReader::new(seeded_store());
        let messages = reader.read(HistoryQuery::After(EntryId::from_seq(3))).unwrap();
        assert!(messages.is_empty());
    }

    #[test]
    fn test_empty_log_yields_empty_results() {
        let reader = HistoryReader::new(Arc::new(InMemoryLogStore::new()));
        assert!(reader.read(HistoryQuery::Latest(5)).unwrap().is_empty());
        assert!(reader
            .read(HistoryQuery::After(EntryId::from_seq(1)))
            .unwrap()
            .is_empty());
    }
}
