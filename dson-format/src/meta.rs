//! Meta1 and meta2 block entries

use crate::constants::{META1_ENTRY_SIZE, META2_ENTRY_SIZE};
use crate::error::{DsonError, Result};
use crate::field_info::FieldInfo;
use crate::header::read_u32;

/// Meta1 entry, one per object field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Meta1Entry {
    /// Meta1 index of the enclosing object, or -1 at top level
    pub parent_index: i32,
    /// Position of the object's descriptor in the meta2 block
    pub meta2_index: i32,
    /// Number of fields directly inside the object
    pub num_direct_children: i32,
    /// Number of fields anywhere below the object
    pub num_all_children: i32,
}

impl Meta1Entry {
    /// Append the 16-byte encoding to `out`
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.parent_index.to_le_bytes());
        out.extend_from_slice(&self.meta2_index.to_le_bytes());
        out.extend_from_slice(&self.num_direct_children.to_le_bytes());
        out.extend_from_slice(&self.num_all_children.to_le_bytes());
    }

    /// Decode one entry from the start of `bytes`
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < META1_ENTRY_SIZE {
            return Err(DsonError::UnexpectedEof);
        }
        Ok(Self {
            parent_index: read_u32(bytes, 0) as i32,
            meta2_index: read_u32(bytes, 4) as i32,
            num_direct_children: read_u32(bytes, 8) as i32,
            num_all_children: read_u32(bytes, 12) as i32,
        })
    }
}

/// Meta2 entry, one per field except the revision marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Meta2Entry {
    /// Hash of the field name including its terminator
    pub name_hash: u32,
    /// Offset of the field name from the start of the data block
    pub offset: u32,
    /// Packed field info word
    pub field_info: u32,
}

impl Meta2Entry {
    /// Unpacked view of [`Meta2Entry::field_info`]
    pub fn info(&self) -> FieldInfo {
        FieldInfo::unpack(self.field_info)
    }

    /// Append the 12-byte encoding to `out`
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.name_hash.to_le_bytes());
        out.extend_from_slice(&self.offset.to_le_bytes());
        out.extend_from_slice(&self.field_info.to_le_bytes());
    }

    /// Decode one entry from the start of `bytes`
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < META2_ENTRY_SIZE {
            return Err(DsonError::UnexpectedEof);
        }
        Ok(Self {
            name_hash: read_u32(bytes, 0),
            offset: read_u32(bytes, 4),
            field_info: read_u32(bytes, 8),
        })
    }
}

/// Encode a whole meta1 block
pub fn encode_meta1_block(entries: &[Meta1Entry]) -> Vec<u8> {
    let mut out = Vec::with_capacity(entries.len() * META1_ENTRY_SIZE);
    for entry in entries {
        entry.encode_into(&mut out);
    }
    out
}

/// Encode a whole meta2 block
pub fn encode_meta2_block(entries: &[Meta2Entry]) -> Vec<u8> {
    let mut out = Vec::with_capacity(entries.len() * META2_ENTRY_SIZE);
    for entry in entries {
        entry.encode_into(&mut out);
    }
    out
}

/// Decode `count` meta1 entries from `bytes`
pub fn decode_meta1_block(bytes: &[u8], count: usize) -> Result<Vec<Meta1Entry>> {
    if bytes.len() < count * META1_ENTRY_SIZE {
        return Err(DsonError::UnexpectedEof);
    }
    bytes
        .chunks_exact(META1_ENTRY_SIZE)
        .take(count)
        .map(Meta1Entry::decode)
        .collect()
}

/// Decode `count` meta2 entries from `bytes`
pub fn decode_meta2_block(bytes: &[u8], count: usize) -> Result<Vec<Meta2Entry>> {
    if bytes.len() < count * META2_ENTRY_SIZE {
        return Err(DsonError::UnexpectedEof);
    }
    bytes
        .chunks_exact(META2_ENTRY_SIZE)
        .take(count)
        .map(Meta2Entry::decode)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta1_layout() {
        let entry = Meta1Entry {
            parent_index: -1,
            meta2_index: 2,
            num_direct_children: 3,
            num_all_children: 7,
        };
        let mut out = Vec::new();
        entry.encode_into(&mut out);
        assert_eq!(out.len(), META1_ENTRY_SIZE);
        assert_eq!(&out[0..4], &[0xFF; 4]);
        assert_eq!(&out[4..8], &2u32.to_le_bytes());
        assert_eq!(Meta1Entry::decode(&out).unwrap(), entry);
    }

    #[test]
    fn test_meta2_layout() {
        let entry = Meta2Entry {
            name_hash: 0xDEAD_BEEF,
            offset: 12,
            field_info: 16,
        };
        let mut out = Vec::new();
        entry.encode_into(&mut out);
        assert_eq!(out.len(), META2_ENTRY_SIZE);
        assert_eq!(&out[0..4], &[0xEF, 0xBE, 0xAD, 0xDE]);
        assert_eq!(Meta2Entry::decode(&out).unwrap(), entry);
        assert_eq!(entry.info().name_len, 4);
    }

    #[test]
    fn test_block_roundtrip() {
        let entries = vec![
            Meta2Entry {
                name_hash: 1,
                offset: 0,
                field_info: 16,
            },
            Meta2Entry {
                name_hash: 2,
                offset: 8,
                field_info: 1 | (8 << 2),
            },
        ];
        let bytes = encode_meta2_block(&entries);
        assert_eq!(decode_meta2_block(&bytes, 2).unwrap(), entries);
    }

    #[test]
    fn test_block_truncated() {
        let bytes = vec![0u8; META1_ENTRY_SIZE + 4];
        assert!(matches!(
            decode_meta1_block(&bytes, 2),
            Err(DsonError::UnexpectedEof)
        ));
    }
}
