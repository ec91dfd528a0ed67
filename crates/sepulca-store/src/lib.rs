//! File-backed record storage for the Sepulca object store.
//!
//! A storage is a directory of record files plus one lock file. Every record
//! holds a unique [`RecordId`](sepulca_types::RecordId) and an open-ended set
//! of string attributes, serialized in a line-oriented text format. All
//! operations against one directory are serialized by a single advisory
//! cross-process file lock.
//!
//! # Lifecycle
//!
//! [`FileStorage::open`] binds an engine to a directory (creating it if
//! missing) and opens the lock file. [`Storage::create`] assigns a fresh id,
//! writes the initial encoding and returns a [`Record`] handle bound to the
//! storage. Attribute edits on a handle are in-memory only until
//! [`Record::commit`] re-serializes the full state. [`Record::erase`] removes
//! the backing file; the handle stays valid and may be recommitted, which
//! recreates the file under the same id.
//!
//! # Design Rules
//!
//! 1. One coarse lock per directory; every operation is a single lock-guarded
//!    critical section. There is no per-record locking.
//! 2. At most one record file exists per identifier; the file name is a
//!    reversible function of the id.
//! 3. Commit overwrites unconditionally. No merge, no optimistic checks.
//! 4. Corrupt files are skipped (and logged) during enumeration, and read as
//!    not-found during direct lookup.
//! 5. Expected-outcome errors (`RecordNotFound`, `AttributeNotFound`) are
//!    returned, never logged.

pub mod encoding;
pub mod error;
pub mod file;
pub mod lock;
pub mod record;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use error::{StoreError, StoreResult};
pub use file::{FileStorage, LOCK_FILE_NAME};
pub use lock::{LockGuard, ProcessLock};
pub use record::{Attributes, Record};
pub use traits::Storage;
