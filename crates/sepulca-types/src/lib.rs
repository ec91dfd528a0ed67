//! Identifier types for the Sepulca object store.
//!
//! A [`RecordId`] names one record within a storage directory and doubles as
//! the stem of the record's backing file. Identifiers are random tokens, not
//! content hashes: the generator draws fresh entropy and callers verify
//! non-existence against their target storage before committing to an id.
//!
//! # Grammar
//!
//! Eight random bytes rendered as lowercase hex pairs, with a `-` inserted
//! before every even-indexed byte except the first, framed by braces:
//!
//! ```text
//! {aabb-ccdd-eeff-0011}
//! ```
//!
//! The grammar avoids characters that are illegal in file names, so an id can
//! be used verbatim as a file stem.

pub mod error;
pub mod id;

pub use error::IdError;
pub use id::{IdGenerator, RecordId};
