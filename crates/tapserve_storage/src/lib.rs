//! # Tapserve Storage
//!
//! Byte-store backends underneath the offline expense store.
//!
//! Backends are **opaque byte stores**: they append, read back and
//! atomically replace a single blob of bytes. The journal format that
//! lives inside that blob belongs to `tapserve_offline`.
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For tests and for execution contexts without
//!   a writable filesystem
//! - [`FileBackend`] - Persistent storage guarded by an exclusive
//!   advisory lock so that two processes never write the same journal
//!
//! ## Example
//!
//! ```rust
//! use tapserve_storage::{StorageBackend, InMemoryBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! let offset = backend.append(b"record").unwrap();
//! assert_eq!(offset, 0);
//! assert_eq!(backend.read_all().unwrap(), b"record");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
