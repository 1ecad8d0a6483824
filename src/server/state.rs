//! Shared per-server state handed to every connection handler.

use std::sync::Arc;

use crate::chat::{Directory, HistoryReader, MessageWriter, TailerConfig};
use crate::store::LogStore;

/// Cheap-to-clone bundle of the service components. The store is the
/// only shared resource; it is read-safe across all tailer instances
/// and the history reader, and appends are atomic inside the store.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn LogStore>,
    pub directory: Arc<dyn Directory>,
    pub history: HistoryReader,
    pub writer: MessageWriter,
    pub tailer: TailerConfig,
}

impl AppState {
    pub fn new(
        store: Arc<dyn LogStore>,
        directory: Arc<dyn Directory>,
        tailer: TailerConfig,
    ) -> Self {
        AppState {
            history: HistoryReader::new(store.clone()),
            writer: MessageWriter::new(store.clone()),
            store,
            directory,
            tailer,
        }
    }
}
