//! File-backed append log.
//!
//! ## File Layout
//!
//! ```text
//! ┌──────────────────────────────────┐
//! │ Header (8 bytes)                 │
//! │ - magic: "CLOG" (4 bytes)        │
//! │ - version: u8                    │
//! │ - flags: u8                      │
//! │ - reserved: 2 bytes              │
//! ├──────────────────────────────────┤
//! │ Record 0                         │
//! │ - data_length: u32 LE            │
//! │ - sequence: u64 LE               │
//! │ - checksum: u32 LE (CRC32)       │
//! │ - data: [u8; data_length]        │
//! ├──────────────────────────────────┤
//! │ Record 1 ...                     │
//! └──────────────────────────────────┘
//! ```
//!
//! `data` is the bincode encoding of the entry's field map. Each record
//! is individually CRC32-checksummed; on open, replay stops at the first
//! truncated or corrupted record and the file is truncated back to the
//! last valid record, recovering every fully-written entry before a
//! crash point. A sequence number repeated by a retried append
//! supersedes the earlier record.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::entry::{EntryId, LogEntry, LogStore, StoreError};

/// Log file magic number
pub const LOG_MAGIC: [u8; 4] = *b"CLOG";
/// Current log format version
pub const LOG_VERSION: u8 = 1;
/// Header size in bytes
pub const LOG_HEADER_SIZE: usize = 8;
/// Record overhead: data_length(4) + sequence(8) + checksum(4) = 16 bytes
pub const RECORD_OVERHEAD: usize = 16;

fn encode_record(seq: u64, fields: &HashMap<String, String>) -> Result<Vec<u8>, StoreError> {
    let data = bincode::serialize(fields)
        .map_err(|e| StoreError::Corruption(format!("serialize: {}", e)))?;
    let checksum = crc32fast::hash(&data);

    let mut buf = Vec::with_capacity(RECORD_OVERHEAD + data.len());
    buf.extend_from_slice(&(data.len() as u32).to_le_bytes());
    buf.extend_from_slice(&seq.to_le_bytes());
    buf.extend_from_slice(&checksum.to_le_bytes());
    buf.extend_from_slice(&data);
    Ok(buf)
}

/// Decode one record. Returns None if the slice holds a truncated or
/// corrupted record (the replay stop condition, not an error).
fn decode_record(data: &[u8]) -> Option<(u64, HashMap<String, String>, usize)> {
    if data.len() < RECORD_OVERHEAD {
        return None;
    }

    let data_len = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
    let seq = u64::from_le_bytes([
        data[4], data[5], data[6], data[7], data[8], data[9], data[10], data[11],
    ]);
    let checksum = u32::from_le_bytes([data[12], data[13], data[14], data[15]]);

    let total_size = RECORD_OVERHEAD.checked_add(data_len)?;
    if data.len() < total_size {
        return None; // Truncated record
    }

    let payload = &data[RECORD_OVERHEAD..total_size];
    if crc32fast::hash(payload) != checksum {
        return None; // Corrupted record
    }

    let fields: HashMap<String, String> = bincode::deserialize(payload).ok()?;
    Some((seq, fields, total_size))
}

fn write_record(file: &mut File, record: &[u8]) -> std::io::Result<()> {
    file.write_all(record)?;
    file.sync_data()
}

struct FileInner {
    file: File,
    /// Next sequence number to assign.
    next_seq: u64,
    /// Full log contents, kept resident for range queries.
    entries: Vec<LogEntry>,
}

/// Append log persisted to a single file, with the full entry set kept
/// in memory for range reads. Suitable for chat-history volumes.
pub struct FileLogStore {
    path: PathBuf,
    inner: Mutex<FileInner>,
}

impl FileLogStore {
    /// Open an existing log file, or create a new one.
    ///
    /// A trailing partial record (torn write from a crash) is dropped and
    /// the file truncated back to the last valid record.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;

        let mut raw = Vec::new();
        file.read_to_end(&mut raw)?;

        let (entries, next_seq, valid_len) = if raw.is_empty() {
            file.write_all(&Self::header())?;
            (Vec::new(), 1, LOG_HEADER_SIZE as u64)
        } else {
            Self::replay(&raw)?
        };

        if (raw.len() as u64) > valid_len {
            tracing::warn!(
                "log file {} has {} trailing bytes past the last valid record, truncating",
                path.display(),
                raw.len() as u64 - valid_len
            );
            file.set_len(valid_len)?;
        }
        file.seek(SeekFrom::End(0))?;

        Ok(FileLogStore {
            path,
            inner: Mutex::new(FileInner {
                file,
                next_seq,
                entries,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn header() -> [u8; LOG_HEADER_SIZE] {
        let mut header = [0u8; LOG_HEADER_SIZE];
        header[..4].copy_from_slice(&LOG_MAGIC);
        header[4] = LOG_VERSION;
        header
    }

    /// Replay a raw file image into entries. Returns (entries, next_seq,
    /// length of the valid prefix in bytes).
    fn replay(raw: &[u8]) -> Result<(Vec<LogEntry>, u64, u64), StoreError> {
        if raw.len() < LOG_HEADER_SIZE || raw[..4] != LOG_MAGIC {
            return Err(StoreError::Corruption("bad log file header".to_string()));
        }
        if raw[4] != LOG_VERSION {
            return Err(StoreError::Corruption(format!(
                "unsupported log version {}",
                raw[4]
            )));
        }

        let mut entries: Vec<LogEntry> = Vec::new();
        let mut offset = LOG_HEADER_SIZE;
        let mut next_seq = 1u64;

        while let Some((seq, fields, consumed)) = decode_record(&raw[offset..]) {
            let record_offset = offset;
            offset += consumed;

            if let Some(last) = entries.last_mut() {
                if seq == last.id.as_seq() {
                    // A retried append after a failed sync can leave the
                    // same sequence twice in a row; the later record is
                    // the one the writer acknowledged.
                    last.fields = fields;
                    continue;
                }
            }
            if seq < next_seq {
                return Err(StoreError::Corruption(format!(
                    "non-increasing sequence {} at offset {}",
                    seq, record_offset
                )));
            }
            entries.push(LogEntry {
                id: EntryId::from_seq(seq),
                fields,
            });
            next_seq = seq + 1;
        }

        Ok((entries, next_seq, offset as u64))
    }
}

impl LogStore for FileLogStore {
    fn append(&self, fields: HashMap<String, String>) -> Result<EntryId, StoreError> {
        let mut inner = self.inner.lock().expect("log store mutex poisoned");
        let seq = inner.next_seq;
        let record = encode_record(seq, &fields)?;

        let start_len = inner.file.metadata()?.len();
        if let Err(e) = write_record(&mut inner.file, &record) {
            // A failed write or sync may still have landed bytes for
            // this sequence number. Roll the file back so a retried
            // append cannot leave two records claiming the sequence.
            let _ = inner.file.set_len(start_len);
            let _ = inner.file.seek(SeekFrom::End(0));
            return Err(e.into());
        }

        let id = EntryId::from_seq(seq);
        inner.entries.push(LogEntry { id, fields });
        inner.next_seq = seq.checked_add(1).expect("entry id overflow unreachable");
        Ok(id)
    }

    fn range_from(&self, min_id: EntryId) -> Result<Vec<LogEntry>, StoreError> {
        let inner = self.inner.lock().expect("log store mutex poisoned");
        let start = inner.entries.partition_point(|e| e.id < min_id);
        Ok(inner.entries[start..].to_vec())
    }

    fn range_latest(&self, count: usize) -> Result<Vec<LogEntry>, StoreError> {
        let inner = self.inner.lock().expect("log store mutex poisoned");
        let start = inner.entries.len().saturating_sub(count);
        Ok(inner.entries[start..].to_vec())
    }
}
