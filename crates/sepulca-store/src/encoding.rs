//! Line-oriented on-disk record format.
//!
//! One file per record:
//!
//! ```text
//! Sepulca v1              <- format signature
//! {aabb-ccdd-eeff-0011}   <- record identifier
//! name                    <- attribute name (empty line terminates)
//! value                   <- attribute value
//! ...
//! ```
//!
//! An empty attribute-name line marks the end of the attribute list, so the
//! empty string is reserved as a terminator and is not a representable
//! attribute name. The format is line-oriented with no escaping: names and
//! values must not contain newlines, which is enforced at write time.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use sepulca_types::RecordId;

use crate::error::{StoreError, StoreResult};
use crate::record::Attributes;

/// Format signature expected on the first line of every record file.
pub const SIGNATURE: &str = "Sepulca v1";

/// Check that an attribute fits the line-oriented format.
fn validate_attr(name: &str, value: &str) -> StoreResult<()> {
    if name.is_empty() {
        return Err(StoreError::InvalidAttribute {
            name: name.to_string(),
            reason: "attribute name must not be empty".into(),
        });
    }
    if name.contains('\n') || value.contains('\n') {
        return Err(StoreError::InvalidAttribute {
            name: name.to_string(),
            reason: "attribute names and values must not contain newlines".into(),
        });
    }
    Ok(())
}

/// Serialize a record to `path`, truncating any existing file.
pub fn write_record(path: &Path, id: &RecordId, attrs: &Attributes) -> StoreResult<()> {
    for (name, value) in attrs {
        validate_attr(name, value)?;
    }

    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "{SIGNATURE}")?;
    writeln!(writer, "{id}")?;
    for (name, value) in attrs {
        writeln!(writer, "{name}")?;
        writeln!(writer, "{value}")?;
    }
    writer.flush()?;
    Ok(())
}

/// Deserialize the record at `path`.
///
/// A missing file surfaces as [`StoreError::Io`] with `NotFound`; anything
/// readable that fails validation surfaces as [`StoreError::InvalidEncoding`].
pub fn read_record(path: &Path) -> StoreResult<(RecordId, Attributes)> {
    let invalid = |reason: &str| StoreError::InvalidEncoding {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    let reader = BufReader::new(File::open(path)?);
    let mut lines = reader.lines();

    match lines.next().transpose()? {
        Some(sig) if sig == SIGNATURE => {}
        Some(_) => return Err(invalid("wrong format signature")),
        None => return Err(invalid("empty file")),
    }

    let id_line = lines.next().transpose()?.ok_or_else(|| invalid("missing identifier line"))?;
    let id = RecordId::parse(&id_line)
        .map_err(|err| invalid(&format!("bad identifier line: {err}")))?;

    let mut attrs = Attributes::new();
    while let Some(name) = lines.next().transpose()? {
        if name.is_empty() {
            break;
        }
        let value = lines
            .next()
            .transpose()?
            .ok_or_else(|| invalid("attribute name without a value line"))?;
        attrs.insert(name, value);
    }

    Ok((id, attrs))
}
