use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

use sepulca_types::RecordId;

use crate::error::{StoreError, StoreResult};
use crate::traits::Storage;

/// Attribute mapping of a record: name to value, ordered by name.
pub type Attributes = BTreeMap<String, String>;

/// In-memory handle to one stored record.
///
/// A `Record` is minted only by the [`Storage`] that created or loaded it and
/// borrows that storage for delegation, so a handle can never outlive its
/// engine. Handles are not cloneable: each persisted record has one singular
/// in-memory identity.
///
/// Attribute edits are purely in-memory until [`commit`] re-serializes the
/// full state. After [`erase`] the handle remains valid and a later `commit`
/// recreates the backing file under the same identifier.
///
/// [`commit`]: Record::commit
/// [`erase`]: Record::erase
pub struct Record<'s> {
    storage: &'s dyn Storage,
    id: RecordId,
    attrs: Attributes,
    transient: Option<Box<dyn Any>>,
}

impl<'s> Record<'s> {
    /// Mint a handle bound to `storage`. Crate-private: only storage
    /// implementations create records.
    pub(crate) fn new(storage: &'s dyn Storage, id: RecordId, attrs: Attributes) -> Self {
        Self {
            storage,
            id,
            attrs,
            transient: None,
        }
    }

    /// The record's unique identifier, stable for the handle's lifetime.
    pub fn id(&self) -> &RecordId {
        &self.id
    }

    /// Whether the record has an attribute with the given name.
    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.contains_key(name)
    }

    /// Value of the given attribute.
    pub fn attr(&self, name: &str) -> StoreResult<&str> {
        self.attrs
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| StoreError::AttributeNotFound(name.to_string()))
    }

    /// Insert or overwrite an attribute. In-memory only until [`commit`].
    ///
    /// [`commit`]: Record::commit
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attrs.insert(name.into(), value.into());
    }

    /// Delete an attribute. In-memory only until [`commit`].
    ///
    /// [`commit`]: Record::commit
    pub fn delete_attr(&mut self, name: &str) -> StoreResult<()> {
        self.attrs
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StoreError::AttributeNotFound(name.to_string()))
    }

    /// Read-only view of all attributes.
    pub fn attrs(&self) -> &Attributes {
        &self.attrs
    }

    /// Persist the current in-memory state, overwriting any prior on-disk
    /// state unconditionally.
    pub fn commit(&self) -> StoreResult<()> {
        self.storage.commit(&self.id, &self.attrs)
    }

    /// Remove the record from its storage.
    ///
    /// The handle stays valid; a subsequent [`commit`] recreates the record.
    /// Erasing a record whose file is already gone is an error.
    ///
    /// [`commit`]: Record::commit
    pub fn erase(&self) -> StoreResult<()> {
        self.storage.erase(&self.id)
    }

    /// Caller-defined payload attached to this handle only; never persisted.
    pub fn transient(&self) -> Option<&dyn Any> {
        self.transient.as_deref()
    }

    /// Replace the transient payload, returning the previous one.
    pub fn set_transient(&mut self, data: Option<Box<dyn Any>>) -> Option<Box<dyn Any>> {
        std::mem::replace(&mut self.transient, data)
    }
}

impl fmt::Debug for Record<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("id", &self.id)
            .field("attrs", &self.attrs)
            .finish_non_exhaustive()
    }
}
