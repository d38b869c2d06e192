//! Storage backend trait definition.

use crate::error::StorageResult;

/// A byte store holding one append-only journal.
///
/// The offline store appends one framed record per mutation and, during
/// compaction, swaps the whole journal for a rewritten one.
///
/// # Invariants
///
/// - `append` returns the offset where data was written
/// - `read_at` returns exactly the bytes previously written at that offset
/// - `replace` is all-or-nothing: after a crash either the old or the new
///   contents are visible, never a mix
/// - Backends must be `Send + Sync` so one store can be shared by the UI
///   facing API and the sync engine
pub trait StorageBackend: Send + Sync {
    /// Reads `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if the range extends beyond the current size or an
    /// I/O error occurs.
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Appends data to the end of the storage and returns its offset.
    fn append(&mut self, data: &[u8]) -> StorageResult<u64>;

    /// Atomically replaces the entire contents with `data`.
    fn replace(&mut self, data: &[u8]) -> StorageResult<()>;

    /// Flushes buffered writes to the OS.
    fn flush(&mut self) -> StorageResult<()>;

    /// Forces data and metadata to durable storage.
    fn sync(&mut self) -> StorageResult<()>;

    /// Returns the current size in bytes (the offset of the next append).
    fn size(&self) -> StorageResult<u64>;

    /// Truncates the storage to `new_size` bytes.
    ///
    /// Used to cut off a torn trailing record found during replay.
    fn truncate(&mut self, new_size: u64) -> StorageResult<()>;

    /// Reads the whole contents.
    fn read_all(&self) -> StorageResult<Vec<u8>> {
        let size = self.size()?;
        self.read_at(0, size as usize)
    }
}
