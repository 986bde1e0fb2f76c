//! Layout assembly: header, metadata blocks and the data block
//!
//! Every function here takes the full field list, revision marker first,
//! with values already encoded. The revision marker only feeds the header;
//! the metadata and data blocks cover the remaining fields in order.
//!
//! Data block layout per field:
//!
//! ```text
//! [name bytes][0x00][zero padding to a 4-byte boundary, only if payload >= 4 bytes][payload]
//! ```

use dson_format::constants::{
    DATA_ALIGNMENT, HEADER_LENGTH, META1_ENTRY_SIZE, META2_ENTRY_SIZE, NO_PARENT,
};
use dson_format::{nearest_divisible_by, DsonError, Header, Meta1Entry, Meta2Entry, Result};
use tracing::debug;

use crate::descriptor::create_meta2_entry;
use crate::field::EncodingField;
use crate::value::Value;

/// Check the revision marker and return the fields that follow it
pub fn remove_revision_field(fields: &[EncodingField]) -> Result<&[EncodingField]> {
    split_revision(fields).map(|(_, body)| body)
}

fn split_revision(fields: &[EncodingField]) -> Result<(&EncodingField, &[EncodingField])> {
    let (first, body) = fields.split_first().ok_or(DsonError::EmptyDocument)?;
    if !first.is_revision() {
        return Err(DsonError::RevisionNotFound {
            actual: first.key.clone(),
        });
    }
    Ok((first, body))
}

fn revision_value(field: &EncodingField) -> Result<i32> {
    let mismatch = || DsonError::ShapeMismatch {
        key: field.key.clone(),
        expected: "32-bit integer revision",
        actual: field.value.kind().to_string(),
    };
    match &field.value {
        Value::Int(i) => i32::try_from(*i).map_err(|_| mismatch()),
        Value::Number(n) => Ok(*n as i32),
        _ => Err(mismatch()),
    }
}

fn payload(field: &EncodingField) -> Result<&[u8]> {
    field
        .bytes
        .as_deref()
        .ok_or_else(|| DsonError::NotEncoded(field.key.clone()))
}

/// Offset of every field's name in the data block, and the block length.
///
/// Payloads of at least 4 bytes start on a 4-byte boundary; shorter
/// payloads follow their name directly.
fn data_offsets(body: &[EncodingField]) -> Result<(Vec<usize>, usize)> {
    let mut offsets = Vec::with_capacity(body.len());
    let mut r = 0;
    for field in body {
        offsets.push(r);
        let len = field
            .encoded_len()
            .ok_or_else(|| DsonError::NotEncoded(field.key.clone()))?;
        r = if len >= DATA_ALIGNMENT {
            nearest_divisible_by(r + field.key.len() + 1, DATA_ALIGNMENT) + len
        } else {
            r + field.key.len() + 1 + len
        };
    }
    Ok((offsets, r))
}

/// Compute the document header from the encoded field list
pub fn create_header(fields: &[EncodingField]) -> Result<Header> {
    let (revision_field, body) = split_revision(fields)?;
    let revision = revision_value(revision_field)?;

    let header_length = HEADER_LENGTH;
    let num_meta1_entries = body.iter().filter(|f| f.is_object).count();
    let meta1_size = num_meta1_entries * META1_ENTRY_SIZE;
    let meta1_offset = header_length;

    let num_meta2_entries = body.len();
    let meta2_offset = meta1_offset + meta1_size;
    let meta2_size = num_meta2_entries * META2_ENTRY_SIZE;

    let data_offset = header_length + meta1_size + meta2_size;
    let (_, data_length) = data_offsets(body)?;

    debug!(
        revision,
        num_meta1_entries, num_meta2_entries, data_length, data_offset, "computed header"
    );

    Ok(Header {
        revision,
        header_length,
        meta1_size,
        num_meta1_entries,
        meta1_offset,
        num_meta2_entries,
        meta2_offset,
        data_length,
        data_offset,
    })
}

/// Build the meta2 block: one descriptor per field after the revision marker
pub fn create_meta2_block(fields: &[EncodingField]) -> Result<Vec<Meta2Entry>> {
    let body = remove_revision_field(fields)?;
    let (offsets, _) = data_offsets(body)?;

    let mut num_objects = 0;
    let mut entries = Vec::with_capacity(body.len());
    for (field, offset) in body.iter().zip(offsets) {
        entries.push(create_meta2_entry(offset, num_objects, field)?);
        if field.is_object {
            num_objects += 1;
        }
    }
    Ok(entries)
}

struct OpenObject<'a> {
    key: &'a str,
    meta1_index: usize,
    /// Position of the object's last descendant
    end: usize,
    num_direct_children: usize,
    seen_direct_children: usize,
}

impl OpenObject<'_> {
    fn close(&self) -> Result<()> {
        if self.seen_direct_children != self.num_direct_children {
            return Err(DsonError::InvalidTree(format!(
                "object \"{}\" has {} direct children but is annotated with {}",
                self.key, self.seen_direct_children, self.num_direct_children
            )));
        }
        Ok(())
    }
}

/// Build the meta1 block: one entry per object field.
///
/// Parents are recovered from the child-count annotations: an object at
/// position `i` owns the `num_all_children` fields that follow it.
pub fn create_meta1_block(fields: &[EncodingField]) -> Result<Vec<Meta1Entry>> {
    let body = remove_revision_field(fields)?;

    let mut entries = Vec::new();
    let mut open: Vec<OpenObject<'_>> = Vec::new();

    for (pos, field) in body.iter().enumerate() {
        while let Some(top) = open.last() {
            if pos <= top.end {
                break;
            }
            top.close()?;
            open.pop();
        }

        let parent_index = match open.last_mut() {
            Some(parent) => {
                parent.seen_direct_children += 1;
                to_i32(parent.meta1_index)?
            }
            None => NO_PARENT,
        };

        if !field.is_object {
            if field.num_direct_children != 0 || field.num_all_children != 0 {
                return Err(DsonError::InvalidTree(format!(
                    "non-object field \"{}\" is annotated with children",
                    field.key
                )));
            }
            continue;
        }

        let end = pos + field.num_all_children;
        if end >= body.len() {
            return Err(DsonError::InvalidTree(format!(
                "object \"{}\" claims {} descendants but only {} fields follow",
                field.key,
                field.num_all_children,
                body.len() - pos - 1
            )));
        }
        if let Some(parent) = open.last() {
            if end > parent.end {
                return Err(DsonError::InvalidTree(format!(
                    "object \"{}\" extends past its parent \"{}\"",
                    field.key, parent.key
                )));
            }
        }
        if field.num_direct_children > field.num_all_children {
            return Err(DsonError::InvalidTree(format!(
                "object \"{}\" has more direct children than descendants",
                field.key
            )));
        }

        entries.push(Meta1Entry {
            parent_index,
            meta2_index: to_i32(pos)?,
            num_direct_children: to_i32(field.num_direct_children)?,
            num_all_children: to_i32(field.num_all_children)?,
        });
        open.push(OpenObject {
            key: &field.key,
            meta1_index: entries.len() - 1,
            end,
            num_direct_children: field.num_direct_children,
            seen_direct_children: 0,
        });
    }

    for object in open.iter().rev() {
        object.close()?;
    }
    Ok(entries)
}

/// Write the data block: every field's terminated name and padded payload
pub fn write_data_block(fields: &[EncodingField]) -> Result<Vec<u8>> {
    let body = remove_revision_field(fields)?;
    let (_, data_length) = data_offsets(body)?;

    let mut out = Vec::with_capacity(data_length);
    for field in body {
        out.extend_from_slice(field.key.as_bytes());
        out.push(0);
        let bytes = payload(field)?;
        if bytes.len() >= DATA_ALIGNMENT {
            out.resize(nearest_divisible_by(out.len(), DATA_ALIGNMENT), 0);
        }
        out.extend_from_slice(bytes);
    }

    debug_assert_eq!(out.len(), data_length);
    Ok(out)
}

fn to_i32(value: usize) -> Result<i32> {
    i32::try_from(value)
        .map_err(|_| DsonError::LimitExceeded(format!("{} does not fit a 32-bit entry", value)))
}
