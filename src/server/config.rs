//! Server configuration, loaded from environment variables:
//!
//! - `CHAT_LISTEN_ADDR`: listen address (default: 127.0.0.1:7400)
//! - `CHAT_STORE`: log store backend, `memory` or `file` (default: memory)
//! - `CHAT_DATA_DIR`: directory for the file backend (default: ./data)
//! - `CHAT_POLL_INTERVAL_MS`: tailer poll interval (default: 500)
//! - `CHAT_CATCHUP_WINDOW`: entries fetched by a fresh tail (default: 10)
//! - `CHAT_KNOWN_AUTHORS`: comma-separated directory names (default: empty)

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::chat::{TailerConfig, DEFAULT_CATCHUP_WINDOW, DEFAULT_POLL_INTERVAL};

/// Which log store backs the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    #[default]
    Memory,
    File,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub backend: StoreBackend,
    pub data_dir: PathBuf,
    pub poll_interval: Duration,
    pub catchup_window: usize,
    pub known_authors: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            listen_addr: "127.0.0.1:7400".to_string(),
            backend: StoreBackend::Memory,
            data_dir: PathBuf::from("./data"),
            poll_interval: DEFAULT_POLL_INTERVAL,
            catchup_window: DEFAULT_CATCHUP_WINDOW,
            known_authors: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = ServerConfig::default();

        ServerConfig {
            listen_addr: std::env::var("CHAT_LISTEN_ADDR")
                .unwrap_or(defaults.listen_addr),
            backend: match std::env::var("CHAT_STORE") {
                Ok(value) => Self::parse_backend(&value),
                Err(_) => defaults.backend,
            },
            data_dir: std::env::var("CHAT_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            poll_interval: std::env::var("CHAT_POLL_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            catchup_window: std::env::var("CHAT_CATCHUP_WINDOW")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&w| w > 0)
                .unwrap_or(defaults.catchup_window),
            known_authors: Self::parse_known_authors(),
        }
    }

    /// Parse CHAT_STORE, accepting any casing of "memory" or "file".
    fn parse_backend(value: &str) -> StoreBackend {
        match value.to_ascii_lowercase().as_str() {
            "file" => StoreBackend::File,
            "memory" | "" => StoreBackend::Memory,
            other => {
                warn!(
                    "unrecognized CHAT_STORE value {:?}, using memory backend",
                    other
                );
                StoreBackend::Memory
            }
        }
    }

    /// Parse CHAT_KNOWN_AUTHORS (format: "alice,bob,carol")
    fn parse_known_authors() -> Vec<String> {
        std::env::var("CHAT_KNOWN_AUTHORS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn tailer_config(&self) -> TailerConfig {
        TailerConfig {
            poll_interval: self.poll_interval,
            catchup_window: self.catchup_window,
        }
    }
}
