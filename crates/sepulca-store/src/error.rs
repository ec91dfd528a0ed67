use std::io;
use std::path::PathBuf;

use sepulca_types::RecordId;

/// Errors from storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested record has no backing file.
    #[error("record not found: {0}")]
    RecordNotFound(RecordId),

    /// The record has no attribute with the given name.
    #[error("attribute '{0}' not found")]
    AttributeNotFound(String),

    /// The storage path exists but is not a directory.
    #[error("storage path '{0}' is not a directory")]
    NotADirectory(PathBuf),

    /// A record file does not conform to the on-disk format.
    #[error("invalid record encoding in '{path}': {reason}")]
    InvalidEncoding { path: PathBuf, reason: String },

    /// An attribute cannot be represented in the line-oriented format.
    #[error("attribute {name:?} cannot be encoded: {reason}")]
    InvalidAttribute { name: String, reason: String },

    /// OS-level failure to open, lock or unlock the lock file.
    #[error("lock file '{path}': {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// No free identifier was found within the retry cap.
    #[error("identifier space exhausted after {0} attempts")]
    IdSpaceExhausted(usize),

    /// I/O error from the underlying filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result alias for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;
