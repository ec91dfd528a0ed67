use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use fs2::FileExt;
use tracing::warn;

use crate::error::{StoreError, StoreResult};

/// Cross-process mutual exclusion backed by an advisory file lock.
///
/// The lock file is opened (created if absent) once at construction and held
/// open for the lock's lifetime; its contents are irrelevant. [`acquire`]
/// blocks until the exclusive OS-level lock is held. An internal mutex
/// serializes intra-process callers so concurrent threads sharing one
/// `ProcessLock` do not race on the lock/unlock syscalls.
///
/// Acquiring a lock this process already holds is an idempotent no-op: the
/// OS-level lock is per file descriptor, so a second `flock` on the same
/// descriptor returns immediately.
///
/// [`acquire`]: ProcessLock::acquire
pub struct ProcessLock {
    path: PathBuf,
    file: File,
    serial: Mutex<()>,
}

impl ProcessLock {
    /// Open (creating if absent) the lock file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)
            .map_err(|source| StoreError::Lock {
                path: path.clone(),
                source,
            })?;
        Ok(Self {
            path,
            file,
            serial: Mutex::new(()),
        })
    }

    /// Block until the exclusive lock is held.
    ///
    /// OS-level failures indicate an unrecoverable environment problem and
    /// are surfaced as [`StoreError::Lock`], never retried.
    pub fn acquire(&self) -> StoreResult<()> {
        let _serial = self.serial.lock().expect("lock poisoned");
        self.file.lock_exclusive().map_err(|source| StoreError::Lock {
            path: self.path.clone(),
            source,
        })
    }

    /// Release the lock.
    pub fn release(&self) -> StoreResult<()> {
        let _serial = self.serial.lock().expect("lock poisoned");
        self.file.unlock().map_err(|source| StoreError::Lock {
            path: self.path.clone(),
            source,
        })
    }

    /// Acquire the lock for the lifetime of the returned guard.
    pub fn guard(&self) -> StoreResult<LockGuard<'_>> {
        self.acquire()?;
        Ok(LockGuard { lock: self })
    }

    /// Path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for ProcessLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessLock")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Scoped acquisition of a [`ProcessLock`]; releases on drop.
pub struct LockGuard<'a> {
    lock: &'a ProcessLock,
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        // A release failure on the drop path cannot be propagated.
        if let Err(err) = self.lock.release() {
            warn!("failed to release process lock: {err}");
        }
    }
}
