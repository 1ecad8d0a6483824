//! Per-connection handler for the line-framed JSON protocol.

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::chat::spawn_tailer;

use super::state::AppState;
use super::wire::{history_query, ErrorCode, Request, Response};

/// Longest request line accepted before the connection is dropped.
/// Bounds the read buffer against misbehaving clients.
const MAX_LINE_LENGTH: usize = 64 * 1024;

pub struct ConnectionHandler {
    framed: Framed<TcpStream, LinesCodec>,
    state: AppState,
    peer: String,
    shutdown: CancellationToken,
}

impl ConnectionHandler {
    pub fn new(
        stream: TcpStream,
        state: AppState,
        peer: String,
        shutdown: CancellationToken,
    ) -> Self {
        ConnectionHandler {
            framed: Framed::new(stream, LinesCodec::new_with_max_length(MAX_LINE_LENGTH)),
            state,
            peer,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        info!("client connected: {}", self.peer);

        loop {
            let line = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                line = self.framed.next() => line,
            };

            let line = match line {
                Some(Ok(line)) => line,
                Some(Err(e)) => {
                    warn!("read error from {}: {}", self.peer, e);
                    break;
                }
                None => break, // client closed the connection
            };

            let request = match serde_json::from_str::<Request>(&line) {
                Ok(request) => request,
                Err(e) => {
                    let resp = Response::invalid(format!("bad request: {}", e));
                    if self.send(&resp).await.is_err() {
                        break;
                    }
                    continue;
                }
            };

            let response = match request {
                Request::TailMessages => {
                    if self.handle_tail().await.is_err() {
                        break;
                    }
                    continue;
                }
                Request::ListHistory { after_id, count } => {
                    self.handle_list_history(after_id.as_deref(), count)
                }
                Request::SendMessage { author, content } => {
                    self.handle_send(&author, &content)
                }
                Request::ListUsers => self.handle_list_users(),
            };

            if self.send(&response).await.is_err() {
                break;
            }
        }

        info!("client disconnected: {}", self.peer);
    }

    fn handle_list_history(&self, after_id: Option<&str>, count: Option<usize>) -> Response {
        let query = match history_query(after_id, count) {
            Ok(query) => query,
            Err(msg) => return Response::invalid(msg),
        };
        match self.state.history.read(query) {
            Ok(messages) => Response::History {
                messages: messages.into_iter().map(Into::into).collect(),
            },
            Err(e) => Response::from_chat_error(&e),
        }
    }

    fn handle_send(&self, author: &str, content: &str) -> Response {
        match self.state.writer.send(author, content) {
            Ok(message) => Response::Sent {
                message: message.into(),
            },
            Err(e) => Response::from_chat_error(&e),
        }
    }

    fn handle_list_users(&self) -> Response {
        Response::Users {
            names: self.state.directory.known_authors().into_iter().collect(),
        }
    }

    /// Streaming mode: push messages until the client disconnects,
    /// sends any line (the in-band cancel), or the server shuts down.
    async fn handle_tail(&mut self) -> Result<(), LinesCodecError> {
        let cancel = self.shutdown.child_token();
        let mut sub = spawn_tailer(self.state.store.clone(), self.state.tailer, cancel.clone());
        info!("tail started for {}", self.peer);

        let result = loop {
            tokio::select! {
                item = sub.next() => match item {
                    Some(Ok(message)) => {
                        if let Err(e) = self.send(&Response::Message { message: message.into() }).await {
                            break Err(e);
                        }
                    }
                    Some(Err(e)) => {
                        warn!("tail for {} failed: {}", self.peer, e);
                        // Store failure is fatal for the subscription;
                        // the connection itself survives.
                        break self
                            .send(&Response::Error {
                                code: ErrorCode::Store,
                                message: e.to_string(),
                            })
                            .await;
                    }
                    // Server shutdown cancelled the tailer.
                    None => break self.send(&Response::EndOfStream).await,
                },
                frame = self.framed.next() => match frame {
                    // Any client line during a tail cancels it.
                    Some(Ok(_)) => break self.send(&Response::EndOfStream).await,
                    Some(Err(e)) => break Err(e),
                    None => break Err(LinesCodecError::Io(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "client disconnected during tail",
                    ))),
                },
            }
        };

        cancel.cancel();
        info!("tail ended for {}", self.peer);
        result
    }

    async fn send(&mut self, response: &Response) -> Result<(), LinesCodecError> {
        let json = serde_json::to_string(response).map_err(|e| {
            LinesCodecError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;
        self.framed.send(json).await
    }
}
