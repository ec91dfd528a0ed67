use sepulca_types::RecordId;

use crate::error::StoreResult;
use crate::record::{Attributes, Record};

/// Record storage engine.
///
/// All implementations must satisfy these invariants:
/// - At most one persisted record exists per identifier at any time.
/// - Every operation is atomic with respect to other storage operations on
///   the same backing namespace (here, via one coarse cross-process lock).
/// - `create` never returns an identifier that already exists.
/// - Returned [`Record`] handles borrow the storage that produced them; the
///   storage outlives every handle.
pub trait Storage {
    /// Create a record with the given initial attributes, assigning a fresh
    /// unique identifier and persisting it immediately.
    fn create(&self, attrs: Attributes) -> StoreResult<Record<'_>>;

    /// Load the record with the given identifier.
    ///
    /// Returns [`StoreError::RecordNotFound`] if no valid record is persisted
    /// under `id`; an unreadable or corrupt file is treated as not found.
    ///
    /// [`StoreError::RecordNotFound`]: crate::error::StoreError::RecordNotFound
    fn get(&self, id: &RecordId) -> StoreResult<Record<'_>>;

    /// Check whether a record with the given identifier is persisted.
    ///
    /// Never mutates storage and never validates the record's encoding.
    fn exists(&self, id: &RecordId) -> StoreResult<bool>;

    /// Visit every valid persisted record, in implementation-defined order.
    ///
    /// Entries that fail validation are skipped with a logged warning, not
    /// an error. The visitor returns `false` to stop early.
    fn enumerate(&self, visit: &mut dyn FnMut(Record<'_>) -> bool) -> StoreResult<()>;

    /// Persist the given state under `id`, overwriting unconditionally.
    ///
    /// Storage half of [`Record::commit`]; call it through the handle.
    fn commit(&self, id: &RecordId, attrs: &Attributes) -> StoreResult<()>;

    /// Remove the record persisted under `id`.
    ///
    /// Storage half of [`Record::erase`]; call it through the handle.
    /// Returns [`StoreError::RecordNotFound`] if the record is already gone,
    /// which signals a double erase.
    ///
    /// [`StoreError::RecordNotFound`]: crate::error::StoreError::RecordNotFound
    fn erase(&self, id: &RecordId) -> StoreResult<()>;
}
