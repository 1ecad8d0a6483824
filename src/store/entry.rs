//! Log entry types shared by all store backends.
//!
//! An `EntryId` is assigned by the store at append time. Ids are totally
//! ordered, monotonically increasing and never reused, which is what lets
//! the tailer and the history reader express "everything after X" as a
//! range query.

use std::collections::HashMap;
use std::io::Error as IoError;
use std::str::FromStr;

/// Identifier assigned to a log entry at append time.
///
/// Rendered as a decimal string on the wire (the first entry of an empty
/// log is `"1"`). Callers treat it as an opaque token; only stores mint
/// new ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryId(u64);

impl EntryId {
    /// Reconstruct an id from its raw sequence number.
    /// Only store implementations and tests should need this.
    pub fn from_seq(seq: u64) -> Self {
        EntryId(seq)
    }

    pub fn as_seq(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error for ids that did not come from a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEntryIdError(pub String);

impl std::fmt::Display for ParseEntryIdError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid entry id: {:?}", self.0)
    }
}

impl std::error::Error for ParseEntryIdError {}

impl FromStr for EntryId {
    type Err = ParseEntryIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let seq: u64 = s.parse().map_err(|_| ParseEntryIdError(s.to_string()))?;
        if seq == 0 {
            // Ids start at 1; 0 is reserved as "before the log".
            return Err(ParseEntryIdError(s.to_string()));
        }
        Ok(EntryId(seq))
    }
}

/// A single entry in the append log: an id plus an opaque map of named
/// string fields. The store never interprets the fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub id: EntryId,
    pub fields: HashMap<String, String>,
}

/// Error type for log store operations
#[derive(Debug)]
pub enum StoreError {
    /// I/O error from a file-backed store
    Io(IoError),
    /// Corruption detected (CRC mismatch, bad header)
    Corruption(String),
    /// Store cannot serve requests (closed, poisoned, simulated outage)
    Unavailable(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "log store I/O error: {}", e),
            StoreError::Corruption(msg) => write!(f, "log store corruption: {}", msg),
            StoreError::Unavailable(msg) => write!(f, "log store unavailable: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<IoError> for StoreError {
    fn from(e: IoError) -> Self {
        StoreError::Io(e)
    }
}

/// Trait for append-log backends.
///
/// Contract shared by all implementations:
/// - `append` assigns the next id in a strictly increasing sequence.
/// - `range_from` is inclusive of `min_id` when that entry still exists,
///   matching stream-range semantics; callers that need "strictly after"
///   filter the boundary entry themselves.
/// - Both range reads return entries in ascending id order.
pub trait LogStore: Send + Sync + 'static {
    /// Append an entry and return the id the store assigned to it.
    fn append(&self, fields: HashMap<String, String>) -> Result<EntryId, StoreError>;

    /// All entries with id >= `min_id`, ascending.
    fn range_from(&self, min_id: EntryId) -> Result<Vec<LogEntry>, StoreError>;

    /// The most recent `count` entries, ascending. Fewer if the log is
    /// shorter; empty if `count` is zero.
    fn range_latest(&self, count: usize) -> Result<Vec<LogEntry>, StoreError>;
}
