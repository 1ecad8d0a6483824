//! TCP accept loop and server lifecycle.

use std::io::Error as IoError;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::chat::StaticDirectory;
use crate::store::{FileLogStore, InMemoryLogStore, LogStore, StoreError};

use super::config::{ServerConfig, StoreBackend};
use super::connection::ConnectionHandler;
use super::state::AppState;

/// Error type for server startup
#[derive(Debug)]
pub enum ServerError {
    Io(IoError),
    Store(StoreError),
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerError::Io(e) => write!(f, "server I/O error: {}", e),
            ServerError::Store(e) => write!(f, "server store error: {}", e),
        }
    }
}

impl std::error::Error for ServerError {}

impl From<IoError> for ServerError {
    fn from(e: IoError) -> Self {
        ServerError::Io(e)
    }
}

impl From<StoreError> for ServerError {
    fn from(e: StoreError) -> Self {
        ServerError::Store(e)
    }
}

/// The chat service: one listener, one shared log store, one connection
/// handler task per client. Cancelling the shutdown token stops the
/// accept loop and tears down every in-flight tail.
pub struct ChatServer {
    listener: TcpListener,
    state: AppState,
    shutdown: CancellationToken,
}

impl ChatServer {
    /// Build the store from config and bind the listen address.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let store = build_store(&config)?;
        let directory = Arc::new(StaticDirectory::new(config.known_authors.clone()));
        let state = AppState::new(store, directory, config.tailer_config());

        let listener = TcpListener::bind(&config.listen_addr).await?;
        info!("chat server listening on {}", listener.local_addr()?);

        Ok(ChatServer {
            listener,
            state,
            shutdown: CancellationToken::new(),
        })
    }

    /// The address actually bound (useful when configured with port 0).
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Token that stops the server when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Accept connections until the shutdown token fires.
    pub async fn run(self) {
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("server shutting down");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        let handler = ConnectionHandler::new(
                            stream,
                            self.state.clone(),
                            addr.to_string(),
                            self.shutdown.child_token(),
                        );
                        tokio::spawn(handler.run());
                    }
                    Err(e) => {
                        error!("failed to accept connection: {}", e);
                    }
                },
            }
        }
    }
}

fn build_store(config: &ServerConfig) -> Result<Arc<dyn LogStore>, ServerError> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(InMemoryLogStore::new())),
        StoreBackend::File => {
            std::fs::create_dir_all(&config.data_dir)?;
            let store = FileLogStore::open(config.data_dir.join("chat.log"))?;
            info!("opened log store at {}", store.path().display());
            Ok(Arc::new(store))
        }
    }
}
