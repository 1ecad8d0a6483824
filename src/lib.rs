pub mod chat;
pub mod server;
pub mod store;

pub use chat::{
    spawn_tailer, ChatError, Directory, HistoryQuery, HistoryReader, Message, MessageWriter,
    StaticDirectory, Subscription, TailerConfig,
};
pub use store::{EntryId, FileLogStore, InMemoryLogStore, LogEntry, LogStore, StoreError};
