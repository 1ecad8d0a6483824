//! Wire protocol for the RPC facade.
//!
//! Requests and responses are single JSON objects, one per line, over a
//! plain TCP connection. Unary operations get exactly one response
//! line. `tail_messages` switches the connection into streaming mode:
//! the server pushes `message` events until the client disconnects or
//! sends any further line (the in-band cancel), at which point the
//! server emits `end_of_stream` and returns to request mode.

use serde::{Deserialize, Serialize};

use crate::chat::{ChatError, HistoryQuery, Message};

/// Client request, tagged by operation name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    /// Bounded history read. Exactly one of `after_id`/`count` selects
    /// the mode; a present `after_id` wins.
    ListHistory {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        after_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        count: Option<usize>,
    },
    SendMessage {
        author: String,
        content: String,
    },
    TailMessages,
    ListUsers,
}

/// Server response, tagged by kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Response {
    History { messages: Vec<WireMessage> },
    Sent { message: WireMessage },
    Users { names: Vec<String> },
    /// One streamed message while a tail is active.
    Message { message: WireMessage },
    /// Clean end of a tail (cancellation is not an error).
    EndOfStream,
    Error { code: ErrorCode, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Malformed request JSON or inconsistent parameters
    InvalidRequest,
    /// Rejected before reaching the log store
    Validation,
    /// Log store failure, fatal for the operation
    Store,
}

/// Message shape exposed to clients. Ids travel as opaque strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub id: String,
    pub author: String,
    pub created_at_ms: u64,
    pub content: String,
}

impl From<Message> for WireMessage {
    fn from(msg: Message) -> Self {
        WireMessage {
            id: msg.id.to_string(),
            author: msg.author,
            created_at_ms: msg.created_at_ms,
            content: msg.content,
        }
    }
}

impl Response {
    pub fn invalid(message: impl Into<String>) -> Self {
        Response::Error {
            code: ErrorCode::InvalidRequest,
            message: message.into(),
        }
    }

    pub fn from_chat_error(e: &ChatError) -> Self {
        let code = match e {
            ChatError::Validation(_) => ErrorCode::Validation,
            ChatError::Store(_) => ErrorCode::Store,
        };
        Response::Error {
            code,
            message: e.to_string(),
        }
    }
}

/// Translate `list_history` parameters into a query.
pub fn history_query(
    after_id: Option<&str>,
    count: Option<usize>,
) -> Result<HistoryQuery, String> {
    if let Some(raw) = after_id {
        let id = raw.parse().map_err(|e| format!("{}", e))?;
        return Ok(HistoryQuery::After(id));
    }
    match count {
        Some(0) => Err("count must be at least 1".to_string()),
        Some(n) => Ok(HistoryQuery::Latest(n)),
        None => Err("one of after_id or count is required".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::EntryId;

    #[test]
    fn test_request_json_shapes() {
        let req: Request =
            serde_json::from_str(r#"{"op":"list_history","count":2}"#).unwrap();
        assert_eq!(
            req,
            Request::ListHistory {
                after_id: None,
                count: Some(2)
            }
        );

        let req: Request =
            serde_json::from_str(r#"{"op":"send_message","author":"alice","content":"hi"}"#)
                .unwrap();
        assert_eq!(
            req,
            Request::SendMessage {
                author: "alice".to_string(),
                content: "hi".to_string()
            }
        );

        let req: Request = serde_json::from_str(r#"{"op":"tail_messages"}"#).unwrap();
        assert_eq!(req, Request::TailMessages);
    }

    #[test]
    fn test_response_json_shapes() {
        let json = serde_json::to_string(&Response::EndOfStream).unwrap();
        assert_eq!(json, r#"{"kind":"end_of_stream"}"#);

        let json = serde_json::to_string(&Response::Error {
            code: ErrorCode::Validation,
            message: "bad".to_string(),
        })
        .unwrap();
        assert_eq!(json, r#"{"kind":"error","code":"validation","message":"bad"}"#);
    }

    #[test]
    fn test_history_query_modes() {
        assert_eq!(
            history_query(Some("3"), None).unwrap(),
            HistoryQuery::After(EntryId::from_seq(3))
        );
        assert_eq!(
            history_query(None, Some(5)).unwrap(),
            HistoryQuery::Latest(5)
        );
        // A present id wins over count.
        assert_eq!(
            history_query(Some("3"), Some(5)).unwrap(),
            HistoryQuery::After(EntryId::from_seq(3))
        );
    }

    #[test]
    fn test_history_query_rejects_bad_parameters() {
        assert!(history_query(None, None).is_err());
        assert!(history_query(None, Some(0)).is_err());
        assert!(history_query(Some("not-an-id"), None).is_err());
    }
}
