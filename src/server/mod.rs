//! RPC facade: line-framed JSON over TCP.
//!
//! Exposes the chat components as unary operations (`list_history`,
//! `send_message`, `list_users`) and one server-streaming operation
//! (`tail_messages`). Each streaming call runs its own tailer instance,
//! torn down when the call ends or the client disconnects.

mod config;
mod connection;
mod listener;
mod state;
pub mod wire;

pub use config::{ServerConfig, StoreBackend};
pub use connection::ConnectionHandler;
pub use listener::{ChatServer, ServerError};
pub use state::AppState;
