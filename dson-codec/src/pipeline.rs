//! Pipeline driving a field list to a complete document

use std::io::Write;

use dson_format::meta::{encode_meta1_block, encode_meta2_block};
use dson_format::constants::HASHED_STRING_PREFIX;
use dson_format::{DataType, DsonError, Header, Limits, Meta1Entry, Meta2Entry, Result};
use rayon::prelude::*;
use tracing::{debug, trace};

use crate::encode::encode_value;
use crate::field::EncodingField;
use crate::layout::{create_header, create_meta1_block, create_meta2_block, write_data_block};
use crate::tree::{flatten, FieldNode};
use crate::value::{Scalar, Value};

/// Encoding options
#[derive(Debug, Clone)]
pub struct EncodeOptions {
    /// Encode values on the rayon pool once a document has this many fields
    pub parallel_threshold: usize,
    /// Size limits the produced document must respect
    pub limits: Limits,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            parallel_threshold: 4_096,
            limits: Limits::default(),
        }
    }
}

fn encode_field(mut field: EncodingField) -> Result<EncodingField> {
    let bytes = encode_value(&field.key, field.value_type, &field.value)?;
    trace!(key = %field.key, value_type = %field.value_type, len = bytes.len(), "encoded value");
    field.bytes = Some(bytes);
    field.is_object = field.value_type == DataType::Object;
    Ok(field)
}

/// Encode every field's value and mark object fields
pub fn encode_values(fields: Vec<EncodingField>) -> Result<Vec<EncodingField>> {
    fields.into_iter().map(encode_field).collect()
}

fn encode_values_parallel(fields: Vec<EncodingField>) -> Result<Vec<EncodingField>> {
    fields.into_par_iter().map(encode_field).collect()
}

/// Stored length of a string element, terminator included; hashed names
/// are stored as integers
fn stored_string_len(s: &str) -> Option<usize> {
    if s.starts_with(HASHED_STRING_PREFIX) {
        None
    } else {
        Some(s.len() + 1)
    }
}

/// Reject values a reader with the same limits would refuse
fn check_value_limits(field: &EncodingField, limits: &Limits) -> Result<()> {
    let exceeded = |what: &str, len: usize, max: usize| {
        DsonError::LimitExceeded(format!(
            "field \"{}\": {} {} exceeds limit {}",
            field.key, what, len, max
        ))
    };

    let vector_len = match &field.value {
        Value::Numbers(v) => Some(v.len()),
        Value::Texts(v) => Some(v.len()),
        Value::Bools(v) => Some(v.len()),
        Value::Mixed(v) => Some(v.len()),
        _ => None,
    };
    if let Some(len) = vector_len {
        if len > limits.max_vector_len {
            return Err(exceeded("vector length", len, limits.max_vector_len));
        }
    }

    if field.value_type == DataType::Char {
        return Ok(());
    }
    let longest = match &field.value {
        Value::Text(s) => stored_string_len(s),
        Value::Texts(ts) => ts.iter().filter_map(|t| stored_string_len(t)).max(),
        Value::Mixed(items) => items
            .iter()
            .filter_map(|item| match item {
                Scalar::Text(t) => stored_string_len(t),
                _ => None,
            })
            .max(),
        _ => None,
    };
    match longest {
        Some(len) if len > limits.max_string_len => {
            Err(exceeded("string length", len, limits.max_string_len))
        }
        _ => Ok(()),
    }
}

/// Attach direct child counts to fields by position
pub fn set_num_direct_children(
    fields: Vec<EncodingField>,
    nums_direct_children: &[usize],
) -> Result<Vec<EncodingField>> {
    zip_counts(fields, nums_direct_children, |field, n| {
        field.num_direct_children = n
    })
}

/// Attach descendant counts to fields by position
pub fn set_num_all_children(
    fields: Vec<EncodingField>,
    nums_all_children: &[usize],
) -> Result<Vec<EncodingField>> {
    zip_counts(fields, nums_all_children, |field, n| field.num_all_children = n)
}

fn zip_counts(
    mut fields: Vec<EncodingField>,
    counts: &[usize],
    set: impl Fn(&mut EncodingField, usize),
) -> Result<Vec<EncodingField>> {
    if fields.len() != counts.len() {
        return Err(DsonError::ChildCountMismatch {
            fields: fields.len(),
            counts: counts.len(),
        });
    }
    for (field, &n) in fields.iter_mut().zip(counts) {
        set(field, n);
    }
    Ok(fields)
}

/// A fully assembled document
#[derive(Debug, Clone)]
pub struct EncodedDocument {
    /// Document header
    pub header: Header,
    /// Meta1 block entries
    pub meta1: Vec<Meta1Entry>,
    /// Meta2 block entries
    pub meta2: Vec<Meta2Entry>,
    /// Data block bytes
    pub data: Vec<u8>,
    /// Encoded fields, revision marker first
    pub fields: Vec<EncodingField>,
}

impl EncodedDocument {
    /// Serialize the complete document
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = self.header.encode()?;
        bytes.reserve(self.header.document_length().saturating_sub(bytes.len()));
        bytes.extend_from_slice(&encode_meta1_block(&self.meta1));
        bytes.extend_from_slice(&encode_meta2_block(&self.meta2));
        bytes.extend_from_slice(&self.data);
        Ok(bytes)
    }

    /// Write the complete document to `writer`
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(&self.to_bytes()?)?;
        writer.flush()?;
        Ok(())
    }
}

/// Drives value encoding, layout and metadata construction
#[derive(Debug, Clone, Default)]
pub struct DocumentEncoder {
    opts: EncodeOptions,
}

impl DocumentEncoder {
    /// Create new document encoder
    pub fn new(opts: EncodeOptions) -> Self {
        Self { opts }
    }

    /// Encode a flattened field list whose child counts are already set.
    ///
    /// The first field must be the revision marker.
    pub fn encode(&self, fields: Vec<EncodingField>) -> Result<EncodedDocument> {
        let num_fields = fields.len().saturating_sub(1);
        if num_fields > self.opts.limits.max_fields {
            return Err(DsonError::LimitExceeded(format!(
                "{} fields exceeds limit {}",
                num_fields, self.opts.limits.max_fields
            )));
        }

        for field in &fields {
            check_value_limits(field, &self.opts.limits)?;
        }

        let fields = if fields.len() >= self.opts.parallel_threshold {
            encode_values_parallel(fields)?
        } else {
            encode_values(fields)?
        };

        let header = create_header(&fields)?;
        if header.data_length > self.opts.limits.max_data_len {
            return Err(DsonError::LimitExceeded(format!(
                "data length {} exceeds limit {}",
                header.data_length, self.opts.limits.max_data_len
            )));
        }
        let meta1 = create_meta1_block(&fields)?;
        let meta2 = create_meta2_block(&fields)?;
        let data = write_data_block(&fields)?;

        debug!(
            fields = num_fields,
            objects = meta1.len(),
            document_length = header.document_length(),
            "encoded document"
        );

        Ok(EncodedDocument {
            header,
            meta1,
            meta2,
            data,
            fields,
        })
    }

    /// Encode a flattened field list with externally computed child counts
    pub fn encode_with_counts(
        &self,
        fields: Vec<EncodingField>,
        nums_direct_children: &[usize],
        nums_all_children: &[usize],
    ) -> Result<EncodedDocument> {
        let fields = set_num_direct_children(fields, nums_direct_children)?;
        let fields = set_num_all_children(fields, nums_all_children)?;
        self.encode(fields)
    }

    /// Flatten a field tree and encode it; the first root must be the
    /// revision marker
    pub fn encode_tree(&self, roots: &[FieldNode]) -> Result<EncodedDocument> {
        self.encode(flatten(roots)?)
    }
}
