//! Append-log storage.
//!
//! The service treats its message history as an ordered append-only log
//! keyed by monotonically increasing entry ids. `LogStore` is the
//! backend seam; `InMemoryLogStore` backs tests and ephemeral servers,
//! `FileLogStore` persists across restarts.

mod entry;
mod file;
mod memory;

pub use entry::{EntryId, LogEntry, LogStore, ParseEntryIdError, StoreError};
pub use file::FileLogStore;
pub use memory::InMemoryLogStore;
