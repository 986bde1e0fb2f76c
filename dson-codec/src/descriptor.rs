//! Field-descriptor (meta2 entry) construction

use dson_format::{name_hash, DsonError, FieldInfo, Meta2Entry, Result};

use crate::field::EncodingField;

/// Build the meta2 entry of one encoded field.
///
/// `current_offset` is the field's byte offset in the data block and
/// `current_num_objects` the number of object fields encoded before it.
pub fn create_meta2_entry(
    current_offset: usize,
    current_num_objects: usize,
    field: &EncodingField,
) -> Result<Meta2Entry> {
    if field.key.is_empty() || field.key.contains('\0') {
        return Err(DsonError::InvalidTree(format!(
            "invalid field name {:?}",
            field.key
        )));
    }

    let info = FieldInfo {
        is_object: field.is_object,
        name_len: to_u32(field.key.len() + 1, "field name length")?,
        object_index: to_u32(current_num_objects, "object count")?,
    };
    let field_info = info.pack().map_err(|e| match e {
        DsonError::LimitExceeded(msg) => {
            DsonError::LimitExceeded(format!("field \"{}\": {}", field.key, msg))
        }
        other => other,
    })?;

    Ok(Meta2Entry {
        name_hash: name_hash(&field.key),
        offset: to_u32(current_offset, "data offset")?,
        field_info,
    })
}

fn to_u32(value: usize, what: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| DsonError::LimitExceeded(format!("{} {} does not fit 32 bits", what, value)))
}
