//! Chat domain: messages, bounded history reads, appends, the live
//! stream tailer, and the author directory.

mod clock;
mod directory;
mod history;
mod message;
mod tailer;
mod writer;

pub use clock::{Clock, FixedClock, SystemClock};
pub use directory::{Directory, StaticDirectory};
pub use history::{HistoryQuery, HistoryReader};
pub use message::{ChatError, Message, AUTHOR_FIELD, CONTENT_FIELD, CREATED_AT_FIELD};
pub use tailer::{
    spawn_tailer, Subscription, TailerConfig, DEFAULT_CATCHUP_WINDOW, DEFAULT_POLL_INTERVAL,
};
pub use writer::MessageWriter;
