//! Document header structure

use crate::constants::{HEADER_LENGTH, MAGIC_NUMBER, META1_ENTRY_SIZE, META2_ENTRY_SIZE};
use crate::error::{DsonError, Result};

/// Fixed 64-byte document header.
///
/// Magic number and the reserved zero regions are not stored; they are
/// written as constants by [`Header::encode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Document revision taken from the revision marker field
    pub revision: i32,
    /// Header length in bytes (always 64)
    pub header_length: usize,
    /// Meta1 block size in bytes
    pub meta1_size: usize,
    /// Number of meta1 entries
    pub num_meta1_entries: usize,
    /// Meta1 block offset from the start of the document
    pub meta1_offset: usize,
    /// Number of meta2 entries
    pub num_meta2_entries: usize,
    /// Meta2 block offset from the start of the document
    pub meta2_offset: usize,
    /// Data block length in bytes
    pub data_length: usize,
    /// Data block offset from the start of the document
    pub data_offset: usize,
}

impl Header {
    /// Meta2 block size in bytes
    pub fn meta2_size(&self) -> usize {
        self.num_meta2_entries * META2_ENTRY_SIZE
    }

    /// Total document length described by this header
    pub fn document_length(&self) -> usize {
        self.data_offset + self.data_length
    }

    /// Encode header to bytes
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut result = Vec::with_capacity(HEADER_LENGTH);

        result.extend_from_slice(&MAGIC_NUMBER);
        result.extend_from_slice(&self.revision.to_le_bytes());
        put_u32(&mut result, self.header_length, "header length")?;
        result.extend_from_slice(&[0u8; 4]);
        put_u32(&mut result, self.meta1_size, "meta1 size")?;
        put_u32(&mut result, self.num_meta1_entries, "meta1 entry count")?;
        put_u32(&mut result, self.meta1_offset, "meta1 offset")?;
        result.extend_from_slice(&[0u8; 8]);
        result.extend_from_slice(&[0u8; 8]);
        put_u32(&mut result, self.num_meta2_entries, "meta2 entry count")?;
        put_u32(&mut result, self.meta2_offset, "meta2 offset")?;
        result.extend_from_slice(&[0u8; 4]);
        put_u32(&mut result, self.data_length, "data length")?;
        put_u32(&mut result, self.data_offset, "data offset")?;

        debug_assert_eq!(result.len(), HEADER_LENGTH);
        Ok(result)
    }

    /// Decode header from bytes
    ///
    /// Checks the magic number and that block offsets and sizes are
    /// consistent with each other. Bounds against the actual document
    /// length are left to the caller.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LENGTH {
            return Err(DsonError::UnexpectedEof);
        }
        if bytes[0..4] != MAGIC_NUMBER {
            return Err(DsonError::InvalidMagic);
        }

        let header = Self {
            revision: read_u32(bytes, 4) as i32,
            header_length: read_u32(bytes, 8) as usize,
            meta1_size: read_u32(bytes, 16) as usize,
            num_meta1_entries: read_u32(bytes, 20) as usize,
            meta1_offset: read_u32(bytes, 24) as usize,
            num_meta2_entries: read_u32(bytes, 44) as usize,
            meta2_offset: read_u32(bytes, 48) as usize,
            data_length: read_u32(bytes, 56) as usize,
            data_offset: read_u32(bytes, 60) as usize,
        };
        header.validate()?;
        Ok(header)
    }

    fn validate(&self) -> Result<()> {
        if self.header_length != HEADER_LENGTH {
            return Err(DsonError::CorruptHeader(format!(
                "header length {} (expected {})",
                self.header_length, HEADER_LENGTH
            )));
        }
        if self.meta1_size != self.num_meta1_entries * META1_ENTRY_SIZE {
            return Err(DsonError::CorruptHeader(format!(
                "meta1 size {} does not hold {} entries",
                self.meta1_size, self.num_meta1_entries
            )));
        }
        if self.meta1_offset != self.header_length {
            return Err(DsonError::CorruptHeader(format!(
                "meta1 offset {} does not follow the header",
                self.meta1_offset
            )));
        }
        if self.meta2_offset != self.meta1_offset + self.meta1_size {
            return Err(DsonError::CorruptHeader(format!(
                "meta2 offset {} does not follow meta1",
                self.meta2_offset
            )));
        }
        if self.data_offset != self.meta2_offset + self.meta2_size() {
            return Err(DsonError::CorruptHeader(format!(
                "data offset {} does not follow meta2",
                self.data_offset
            )));
        }
        Ok(())
    }
}

fn put_u32(out: &mut Vec<u8>, value: usize, what: &str) -> Result<()> {
    let value = u32::try_from(value)
        .map_err(|_| DsonError::LimitExceeded(format!("{} {} does not fit 32 bits", what, value)))?;
    out.extend_from_slice(&value.to_le_bytes());
    Ok(())
}

/// Read a little-endian u32 at `pos`; the caller guarantees bounds.
pub(crate) fn read_u32(bytes: &[u8], pos: usize) -> u32 {
    u32::from_le_bytes([bytes[pos], bytes[pos + 1], bytes[pos + 2], bytes[pos + 3]])
}
