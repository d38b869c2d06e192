//! Append-only mutation journal.
//!
//! Every store mutation is written as one frame:
//!
//! ```text
//! magic (4) | version (2) | length (4) | CBOR batch (length) | crc32 (4)
//! ```
//!
//! The CBOR payload is a `Vec<JournalEntry>`. All entries of one store
//! operation share a frame, so a record write and its queue write land or
//! vanish together. A frame that is cut short at the end of the journal is
//! a torn write and is truncated away on replay; a damaged frame anywhere
//! else is reported as corruption.

use crate::error::{StoreError, StoreResult};
use crate::model::{OfflineExpense, SyncQueueItem};
use serde::{Deserialize, Serialize};
use tapserve_storage::StorageBackend;

/// Magic bytes identifying a journal frame.
pub const JOURNAL_MAGIC: [u8; 4] = *b"TSJR";

/// Current journal format version.
pub const JOURNAL_VERSION: u16 = 1;

/// magic (4) + version (2) + length (4)
const HEADER_SIZE: usize = 10;

const CRC_SIZE: usize = 4;

/// One logical change to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JournalEntry {
    /// Insert or replace an expense.
    PutExpense(OfflineExpense),
    /// Remove an expense.
    RemoveExpense(String),
    /// Insert or replace a queue item.
    PutQueueItem(SyncQueueItem),
    /// Remove a queue item.
    RemoveQueueItem(String),
    /// Insert or replace an evicted item.
    PutFailed(SyncQueueItem),
    /// Remove an evicted item.
    RemoveFailed(String),
    /// Set a metadata value.
    SetMeta(String, String),
    /// Drop everything.
    Clear,
}

/// Writes and replays journal frames over a [`StorageBackend`].
pub struct Journal {
    backend: Box<dyn StorageBackend>,
    sync_on_write: bool,
}

impl Journal {
    /// Creates a journal over `backend`.
    pub fn new(backend: Box<dyn StorageBackend>, sync_on_write: bool) -> Self {
        Self {
            backend,
            sync_on_write,
        }
    }

    /// Appends one batch as a single frame and returns its offset.
    pub fn append(&mut self, batch: &[JournalEntry]) -> StoreResult<u64> {
        let frame = encode_frame(batch)?;
        let offset = self.backend.append(&frame)?;
        if self.sync_on_write {
            self.backend.sync()?;
        } else {
            self.backend.flush()?;
        }
        Ok(offset)
    }

    /// Replaces the whole journal with a single frame holding `batch`.
    pub fn rewrite(&mut self, batch: &[JournalEntry]) -> StoreResult<()> {
        let frame = encode_frame(batch)?;
        self.backend.replace(&frame)?;
        Ok(())
    }

    /// Current journal size in bytes.
    pub fn size(&self) -> StoreResult<u64> {
        Ok(self.backend.size()?)
    }

    /// Reads every intact batch in order.
    ///
    /// A torn final frame is truncated from the backend before returning.
    pub fn replay(&mut self) -> StoreResult<Vec<Vec<JournalEntry>>> {
        let bytes = self.backend.read_all()?;
        let mut batches = Vec::new();
        let mut pos = 0usize;

        while pos < bytes.len() {
            match decode_frame(&bytes[pos..]) {
                Frame::Complete { batch, len } => {
                    batches.push(batch);
                    pos += len;
                }
                Frame::Torn => {
                    tracing::warn!(
                        offset = pos,
                        dropped = bytes.len() - pos,
                        "truncating torn journal tail"
                    );
                    self.backend.truncate(pos as u64)?;
                    break;
                }
                Frame::Damaged { reason, len } => {
                    if pos + len >= bytes.len() {
                        tracing::warn!(offset = pos, %reason, "dropping damaged final frame");
                        self.backend.truncate(pos as u64)?;
                        break;
                    }
                    return Err(StoreError::corrupted(pos as u64, reason));
                }
            }
        }

        Ok(batches)
    }
}

impl std::fmt::Debug for Journal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Journal")
            .field("sync_on_write", &self.sync_on_write)
            .finish_non_exhaustive()
    }
}

enum Frame {
    Complete { batch: Vec<JournalEntry>, len: usize },
    Torn,
    Damaged { reason: String, len: usize },
}

fn encode_frame(batch: &[JournalEntry]) -> StoreResult<Vec<u8>> {
    let mut payload = Vec::new();
    ciborium::into_writer(batch, &mut payload).map_err(|e| StoreError::Codec(e.to_string()))?;
    let len = u32::try_from(payload.len())
        .map_err(|_| StoreError::Codec("journal batch too large".into()))?;

    let mut data = Vec::with_capacity(HEADER_SIZE + payload.len() + CRC_SIZE);
    data.extend_from_slice(&JOURNAL_MAGIC);
    data.extend_from_slice(&JOURNAL_VERSION.to_le_bytes());
    data.extend_from_slice(&len.to_le_bytes());
    data.extend_from_slice(&payload);

    let crc = compute_crc32(&data);
    data.extend_from_slice(&crc.to_le_bytes());
    Ok(data)
}

fn decode_frame(bytes: &[u8]) -> Frame {
    if bytes.len() < HEADER_SIZE {
        return Frame::Torn;
    }
    if bytes[0..4] != JOURNAL_MAGIC {
        return Frame::Damaged {
            reason: "bad magic".into(),
            len: 0,
        };
    }
    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    let len = u32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]) as usize;
    let total = HEADER_SIZE + len + CRC_SIZE;
    if bytes.len() < total {
        return Frame::Torn;
    }
    if version != JOURNAL_VERSION {
        return Frame::Damaged {
            reason: format!("unsupported journal version {version}"),
            len: total,
        };
    }

    let body_end = HEADER_SIZE + len;
    let stored = u32::from_le_bytes([
        bytes[body_end],
        bytes[body_end + 1],
        bytes[body_end + 2],
        bytes[body_end + 3],
    ]);
    if compute_crc32(&bytes[..body_end]) != stored {
        return Frame::Damaged {
            reason: "checksum mismatch".into(),
            len: total,
        };
    }

    match ciborium::from_reader::<Vec<JournalEntry>, _>(&bytes[HEADER_SIZE..body_end]) {
        Ok(batch) => Frame::Complete { batch, len: total },
        Err(e) => Frame::Damaged {
            reason: format!("undecodable batch: {e}"),
            len: total,
        },
    }
}

/// CRC-32 (IEEE) of `data`.
pub fn compute_crc32(data: &[u8]) -> u32 {
    const CRC32_TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut j = 0;
            while j < 8 {
                if crc & 1 != 0 {
                    crc = (crc >> 1) ^ 0xEDB8_8320;
                } else {
                    crc >>= 1;
                }
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFF_FFFF_u32;
    for &byte in data {
        let index = ((crc ^ u32::from(byte)) & 0xFF) as usize;
        crc = (crc >> 8) ^ CRC32_TABLE[index];
    }
    !crc
}
