//! Document reader and value decoders
//!
//! Type tags are not stored on disk, so decoding a payload requires the
//! caller to name its [`DataType`]. [`infer_data_type`] offers a best-effort
//! guess from the payload shape for display purposes.

use std::collections::HashSet;

use dson_format::constants::DATA_ALIGNMENT;
use dson_format::meta::{decode_meta1_block, decode_meta2_block};
use dson_format::{
    name_hash, nearest_divisible_by, DataType, DsonError, FieldInfo, Header, Limits, Meta1Entry,
    Meta2Entry, Result,
};
use tracing::debug;

use crate::field::EncodingField;
use crate::tree::{unflatten, FieldNode};
use crate::value::{Scalar, Value};

/// Decoding options
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// Security limits
    pub limits: Limits,
    /// Check each name against its meta2 hash (recommended)
    pub verify_name_hashes: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            verify_name_hashes: true,
        }
    }
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(DsonError::UnexpectedEof);
        }
        let out = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn read_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_count(&mut self, limits: &Limits) -> Result<usize> {
        let count = self.read_u32()? as usize;
        if count > limits.max_vector_len {
            return Err(DsonError::LimitExceeded(format!(
                "vector length {} exceeds limit {}",
                count, limits.max_vector_len
            )));
        }
        Ok(count)
    }

    fn read_string(&mut self, limits: &Limits) -> Result<String> {
        let len = self.read_u32()? as usize;
        if len == 0 {
            return Err(DsonError::CorruptData("string length excludes terminator".to_string()));
        }
        if len > limits.max_string_len {
            return Err(DsonError::LimitExceeded(format!(
                "string length {} exceeds limit {}",
                len, limits.max_string_len
            )));
        }
        let raw = self.take(len)?;
        let (text, terminator) = raw.split_at(len - 1);
        if terminator != [0] {
            return Err(DsonError::CorruptData("string is not NUL-terminated".to_string()));
        }
        String::from_utf8(text.to_vec())
            .map_err(|_| DsonError::CorruptData("string is not valid UTF-8".to_string()))
    }

    fn finish(&self, value_type: DataType) -> Result<()> {
        if self.remaining() != 0 {
            return Err(DsonError::CorruptData(format!(
                "{} trailing bytes after {} value",
                self.remaining(),
                value_type
            )));
        }
        Ok(())
    }
}

/// Decode a payload produced by the encoder for `value_type`
pub fn decode_value(value_type: DataType, bytes: &[u8]) -> Result<Value> {
    decode_value_with_limits(value_type, bytes, &Limits::default())
}

/// Decode a payload, enforcing `limits` on vector and string lengths
pub fn decode_value_with_limits(
    value_type: DataType,
    bytes: &[u8],
    limits: &Limits,
) -> Result<Value> {
    if value_type.has_no_payload() {
        return Ok(Value::Null);
    }

    let mut cur = Cursor::new(bytes);
    let value = match value_type {
        DataType::Bool => match cur.take(1)?[0] {
            0 => Value::Bool(false),
            1 => Value::Bool(true),
            b => return Err(DsonError::CorruptData(format!("invalid bool byte {:#04x}", b))),
        },
        DataType::Char => Value::Text(char::from(cur.take(1)?[0]).to_string()),
        DataType::Int => Value::Int(cur.read_u32()? as i32 as i64),
        DataType::Float => Value::Number(f32::from_bits(cur.read_u32()?) as f64),
        DataType::String if bytes.len() == 4 => {
            // Hashed name reference; the original text is not recoverable.
            Value::Int(cur.read_u32()? as i32 as i64)
        }
        DataType::String => Value::Text(cur.read_string(limits)?),
        DataType::IntVector => {
            let count = cur.read_count(limits)?;
            if cur.remaining() == count * 4 {
                let mut ns = Vec::with_capacity(count);
                for _ in 0..count {
                    ns.push(cur.read_u32()? as i32 as f64);
                }
                Value::Numbers(ns)
            } else {
                sequence_value(read_hybrid_elements(&mut cur, count, limits)?)
            }
        }
        DataType::FloatVector => {
            let count = cur.read_count(limits)?;
            let mut ns = Vec::with_capacity(count.min(cur.remaining() / 4));
            for _ in 0..count {
                ns.push(f32::from_bits(cur.read_u32()?) as f64);
            }
            Value::Numbers(ns)
        }
        DataType::StringVector => {
            let count = cur.read_count(limits)?;
            sequence_value(read_hybrid_elements(&mut cur, count, limits)?)
        }
        DataType::HybridVector => {
            let count = cur.read_count(limits)?;
            Value::Mixed(read_hybrid_elements(&mut cur, count, limits)?)
        }
        DataType::TwoBool => {
            let slots = cur.take(8)?;
            Value::Bools(vec![slots[0] != 0, slots[4] != 0])
        }
        DataType::TwoInt => {
            let a = cur.read_u32()? as i32 as f64;
            let b = cur.read_u32()? as i32 as f64;
            Value::Numbers(vec![a, b])
        }
        DataType::Unknown
        | DataType::FileRaw
        | DataType::FileDecoded
        | DataType::FileJson
        | DataType::Object => Value::Null,
    };
    cur.finish(value_type)?;
    Ok(value)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Element {
    Text,
    Int,
}

/// Byte length of a string element at `pos` (prefix and terminator
/// included), if a well-formed one fits there
fn string_element_len(bytes: &[u8], pos: usize, limits: &Limits) -> Option<usize> {
    let prefix = bytes.get(pos..pos + 4)?;
    let len = u32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
    if len == 0 || len > limits.max_string_len {
        return None;
    }
    let raw = bytes.get(pos + 4..(pos + 4).checked_add(len)?)?;
    let (text, terminator) = raw.split_at(len - 1);
    (terminator == [0] && std::str::from_utf8(text).is_ok()).then_some(4 + len)
}

/// Choose text or integer for each of `count` elements so that together
/// they span `bytes` exactly.
///
/// Elements carry no tag, so this is a depth-first search that tries text
/// before integer at every element. States `(offset, elements left)` that
/// cannot complete are remembered, which bounds the search by the payload
/// length times the element count.
fn plan_elements(bytes: &[u8], count: usize, limits: &Limits) -> Option<Vec<Element>> {
    let end = bytes.len();
    if count.checked_mul(4)? > end {
        return None;
    }

    let mut path: Vec<(usize, Element)> = Vec::with_capacity(count);
    let mut dead: HashSet<(usize, usize)> = HashSet::new();
    let mut pos = 0;
    loop {
        let left = count - path.len();
        if left == 0 && pos == end {
            return Some(path.into_iter().map(|(_, e)| e).collect());
        }
        if left > 0 && end - pos >= 4 * left && !dead.contains(&(pos, left)) {
            match string_element_len(bytes, pos, limits) {
                Some(n) => {
                    path.push((pos, Element::Text));
                    pos += n;
                }
                None => {
                    path.push((pos, Element::Int));
                    pos += 4;
                }
            }
            continue;
        }

        // Retry the most recent text choice as an integer.
        loop {
            let (start, choice) = path.pop()?;
            match choice {
                Element::Text => {
                    path.push((start, Element::Int));
                    pos = start + 4;
                    break;
                }
                Element::Int => {
                    dead.insert((start, count - path.len()));
                }
            }
        }
    }
}

fn read_hybrid_elements(cur: &mut Cursor<'_>, count: usize, limits: &Limits) -> Result<Vec<Scalar>> {
    let bytes = cur.bytes;
    let rest = &bytes[cur.pos..];
    let plan = plan_elements(rest, count, limits).ok_or_else(|| {
        DsonError::CorruptData(format!(
            "{} vector elements cannot span {} bytes",
            count,
            rest.len()
        ))
    })?;
    plan.into_iter()
        .map(|element| match element {
            Element::Text => cur.read_string(limits).map(Scalar::Text),
            Element::Int => cur.read_u32().map(|v| Scalar::Int(v as i32 as i64)),
        })
        .collect()
}

/// Collapse all-text element lists into [`Value::Texts`]
fn sequence_value(items: Vec<Scalar>) -> Value {
    if items.iter().all(|s| matches!(s, Scalar::Text(_))) {
        Value::Texts(
            items
                .into_iter()
                .filter_map(|s| match s {
                    Scalar::Text(t) => Some(t),
                    _ => None,
                })
                .collect(),
        )
    } else {
        Value::Mixed(items)
    }
}

/// Guess a field's data type from its payload shape.
///
/// Several types share byte shapes (a 4-byte payload may be an int, a float
/// or a hashed string), so the guess favours integers.
pub fn infer_data_type(field: &DecodedField) -> DataType {
    if field.is_object() {
        return DataType::Object;
    }
    let p = &field.payload;
    match p.len() {
        0 => DataType::Unknown,
        1 if p[0] <= 1 => DataType::Bool,
        1 => DataType::Char,
        2 | 3 => DataType::Unknown,
        4 => DataType::Int,
        len => {
            let count = u32::from_le_bytes([p[0], p[1], p[2], p[3]]) as usize;
            if count == len - 4
                && p[len - 1] == 0
                && decode_value_with_limits(DataType::String, p, &field.limits).is_ok()
            {
                return DataType::String;
            }
            if len == 8 && p[0] <= 1 && p[4] <= 1 && p[1..4] == [0; 3] && p[5..8] == [0; 3] {
                return DataType::TwoBool;
            }
            if count.checked_mul(4) == Some(len - 4) {
                return DataType::IntVector;
            }
            match decode_value_with_limits(DataType::HybridVector, p, &field.limits) {
                Ok(Value::Mixed(items)) if items.iter().all(|s| matches!(s, Scalar::Text(_))) => {
                    DataType::StringVector
                }
                Ok(_) => DataType::HybridVector,
                Err(_) if len == 8 => DataType::TwoInt,
                Err(_) => DataType::Unknown,
            }
        }
    }
}

/// One field as read from a document
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedField {
    /// Field name
    pub name: String,
    /// Payload bytes with alignment padding removed
    pub payload: Vec<u8>,
    /// Meta2 descriptor
    pub meta2: Meta2Entry,
    /// Meta1 entry, present for objects
    pub meta1: Option<Meta1Entry>,
    limits: Limits,
}

impl DecodedField {
    /// Unpacked field info
    pub fn info(&self) -> FieldInfo {
        self.meta2.info()
    }

    /// Whether the field is an object
    pub fn is_object(&self) -> bool {
        self.info().is_object
    }

    /// Number of fields directly inside this one
    pub fn num_direct_children(&self) -> usize {
        self.meta1
            .map_or(0, |m| m.num_direct_children.max(0) as usize)
    }

    /// Number of fields anywhere below this one
    pub fn num_all_children(&self) -> usize {
        self.meta1.map_or(0, |m| m.num_all_children.max(0) as usize)
    }

    /// Limits inherited from the reader that produced this field
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Decode the payload as `value_type` under the reader's limits
    pub fn decode(&self, value_type: DataType) -> Result<Value> {
        decode_value_with_limits(value_type, &self.payload, &self.limits).map_err(|e| match e {
            DsonError::CorruptData(msg) => {
                DsonError::CorruptData(format!("field \"{}\": {}", self.name, msg))
            }
            other => other,
        })
    }
}

/// A parsed document
#[derive(Debug, Clone)]
pub struct DecodedDocument {
    /// Document header
    pub header: Header,
    /// Meta1 block entries
    pub meta1: Vec<Meta1Entry>,
    /// Meta2 block entries
    pub meta2: Vec<Meta2Entry>,
    /// Fields in meta2 order, revision marker excluded
    pub fields: Vec<DecodedField>,
}

impl DecodedDocument {
    /// Revision stored in the header
    pub fn revision(&self) -> i32 {
        self.header.revision
    }

    /// Decode every field into an encoding field list, revision marker
    /// first, with types chosen by `resolve`
    pub fn to_encoding_fields<F>(&self, resolve: F) -> Result<Vec<EncodingField>>
    where
        F: Fn(&DecodedField) -> DataType,
    {
        let mut out = Vec::with_capacity(self.fields.len() + 1);
        out.push(EncodingField::revision(self.revision()));
        for field in &self.fields {
            let value_type = if field.is_object() {
                DataType::Object
            } else {
                resolve(field)
            };
            let value = field.decode(value_type)?;
            let mut encoding = EncodingField::new(field.name.clone(), value_type, value);
            encoding.bytes = Some(field.payload.clone());
            encoding.num_direct_children = field.num_direct_children();
            encoding.num_all_children = field.num_all_children();
            out.push(encoding);
        }
        Ok(out)
    }

    /// Rebuild the field tree, revision marker first
    pub fn to_tree<F>(&self, resolve: F) -> Result<Vec<FieldNode>>
    where
        F: Fn(&DecodedField) -> DataType,
    {
        unflatten(self.to_encoding_fields(resolve)?)
    }
}

/// Reads documents produced by the encoder
#[derive(Debug, Clone, Default)]
pub struct DocumentReader {
    opts: DecodeOptions,
}

impl DocumentReader {
    /// Create new document reader
    pub fn new(opts: DecodeOptions) -> Self {
        Self { opts }
    }

    /// Parse a complete document
    pub fn read(&self, bytes: &[u8]) -> Result<DecodedDocument> {
        let header = Header::decode(bytes)?;
        let limits = &self.opts.limits;

        if header.num_meta2_entries > limits.max_fields {
            return Err(DsonError::LimitExceeded(format!(
                "{} fields exceeds limit {}",
                header.num_meta2_entries, limits.max_fields
            )));
        }
        if header.data_length > limits.max_data_len {
            return Err(DsonError::LimitExceeded(format!(
                "data length {} exceeds limit {}",
                header.data_length, limits.max_data_len
            )));
        }
        if header.document_length() > bytes.len() {
            return Err(DsonError::UnexpectedEof);
        }

        let meta1 = decode_meta1_block(
            &bytes[header.meta1_offset..header.meta2_offset],
            header.num_meta1_entries,
        )?;
        let meta2 = decode_meta2_block(
            &bytes[header.meta2_offset..header.data_offset],
            header.num_meta2_entries,
        )?;
        let data = &bytes[header.data_offset..header.document_length()];

        let num_objects = meta2.iter().filter(|e| e.info().is_object).count();
        if num_objects != meta1.len() {
            return Err(DsonError::CorruptMeta(format!(
                "{} object descriptors but {} meta1 entries",
                num_objects,
                meta1.len()
            )));
        }

        let mut fields = Vec::with_capacity(meta2.len());
        for (i, entry) in meta2.iter().enumerate() {
            let end = match meta2.get(i + 1) {
                Some(next) => next.offset as usize,
                None => data.len(),
            };
            fields.push(self.read_field(data, i, entry, end, &meta1)?);
        }

        debug!(
            revision = header.revision,
            fields = fields.len(),
            objects = meta1.len(),
            "read document"
        );

        Ok(DecodedDocument {
            header,
            meta1,
            meta2,
            fields,
        })
    }

    fn read_field(
        &self,
        data: &[u8],
        index: usize,
        entry: &Meta2Entry,
        end: usize,
        meta1: &[Meta1Entry],
    ) -> Result<DecodedField> {
        let info = entry.info();
        let offset = entry.offset as usize;
        let name_end = offset + info.name_len as usize;

        if info.name_len == 0 || end > data.len() || name_end > end {
            return Err(DsonError::CorruptMeta(format!(
                "field {} spans {}..{} outside its slot ending at {}",
                index, offset, name_end, end
            )));
        }
        if data[name_end - 1] != 0 {
            return Err(DsonError::CorruptData(format!(
                "name of field {} is not NUL-terminated",
                index
            )));
        }
        let name = std::str::from_utf8(&data[offset..name_end - 1])
            .map_err(|_| DsonError::CorruptData(format!("name of field {} is not UTF-8", index)))?
            .to_string();

        if self.opts.verify_name_hashes && name_hash(&name) != entry.name_hash {
            return Err(DsonError::CorruptMeta(format!(
                "name hash mismatch for field \"{}\"",
                name
            )));
        }

        let region = &data[name_end..end];
        let payload = if region.len() >= DATA_ALIGNMENT {
            &data[nearest_divisible_by(name_end, DATA_ALIGNMENT)..end]
        } else {
            region
        };

        let meta1_entry = if info.is_object {
            if !payload.is_empty() {
                return Err(DsonError::CorruptData(format!(
                    "object \"{}\" has an inline payload",
                    name
                )));
            }
            let m = meta1.get(info.object_index as usize).copied().ok_or_else(|| {
                DsonError::CorruptMeta(format!(
                    "object \"{}\" refers to missing meta1 entry {}",
                    name, info.object_index
                ))
            })?;
            if m.meta2_index as usize != index {
                return Err(DsonError::CorruptMeta(format!(
                    "meta1 entry {} points at field {}, expected {}",
                    info.object_index, m.meta2_index, index
                )));
            }
            Some(m)
        } else {
            None
        };

        Ok(DecodedField {
            name,
            payload: payload.to_vec(),
            meta2: *entry,
            meta1: meta1_entry,
            limits: self.opts.limits.clone(),
        })
    }
}
