//! Bit packing for the meta2 field-info word
//!
//! The on-disk word is 32 bits wide and holds three independent facts:
//!
//! ```text
//! bit  0        is-object flag
//! bit  1        unused (zero)
//! bits 2..11    name length, terminator included
//! bits 11..32   running object count at encode time
//! ```

use bitvec::prelude::*;

use crate::constants::{
    FIELD_INFO_NAME_LEN_BITS, FIELD_INFO_NAME_LEN_SHIFT, FIELD_INFO_OBJECT_BIT,
    FIELD_INFO_OBJECT_INDEX_BITS, FIELD_INFO_OBJECT_INDEX_SHIFT, MAX_NAME_LEN, MAX_OBJECT_INDEX,
};
use crate::error::{DsonError, Result};

const NAME_LEN_BITS: std::ops::Range<usize> =
    FIELD_INFO_NAME_LEN_SHIFT..FIELD_INFO_NAME_LEN_SHIFT + FIELD_INFO_NAME_LEN_BITS;
const OBJECT_INDEX_BITS: std::ops::Range<usize> =
    FIELD_INFO_OBJECT_INDEX_SHIFT..FIELD_INFO_OBJECT_INDEX_SHIFT + FIELD_INFO_OBJECT_INDEX_BITS;

/// Unpacked form of the meta2 field-info word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldInfo {
    /// Field is an object
    pub is_object: bool,
    /// Length of the field name including its terminating NUL
    pub name_len: u32,
    /// Number of object fields encoded before this one
    pub object_index: u32,
}

impl FieldInfo {
    /// Pack into the on-disk word.
    ///
    /// Fails if the name length or object index does not fit its bit range.
    pub fn pack(&self) -> Result<u32> {
        if self.name_len > MAX_NAME_LEN {
            return Err(DsonError::LimitExceeded(format!(
                "field name length {} exceeds {}",
                self.name_len, MAX_NAME_LEN
            )));
        }
        if self.object_index > MAX_OBJECT_INDEX {
            return Err(DsonError::LimitExceeded(format!(
                "object count {} exceeds {}",
                self.object_index, MAX_OBJECT_INDEX
            )));
        }

        let mut raw = 0u32;
        let bits = raw.view_bits_mut::<Lsb0>();
        bits.set(FIELD_INFO_OBJECT_BIT, self.is_object);
        bits[NAME_LEN_BITS].store_le(self.name_len);
        bits[OBJECT_INDEX_BITS].store_le(self.object_index);
        Ok(raw)
    }

    /// Unpack from the on-disk word.
    pub fn unpack(raw: u32) -> Self {
        let bits = raw.view_bits::<Lsb0>();
        Self {
            is_object: bits[FIELD_INFO_OBJECT_BIT],
            name_len: bits[NAME_LEN_BITS].load_le::<u32>(),
            object_index: bits[OBJECT_INDEX_BITS].load_le::<u32>(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_plain_field() {
        let info = FieldInfo {
            is_object: false,
            name_len: 4,
            object_index: 0,
        };
        assert_eq!(info.pack().unwrap(), 4 << 2);
    }

    #[test]
    fn test_pack_object_field() {
        let info = FieldInfo {
            is_object: true,
            name_len: 10,
            object_index: 3,
        };
        assert_eq!(info.pack().unwrap(), 1 | (10 << 2) | (3 << 11));
    }

    #[test]
    fn test_unpack_matches_pack() {
        let info = FieldInfo {
            is_object: true,
            name_len: MAX_NAME_LEN,
            object_index: MAX_OBJECT_INDEX,
        };
        let raw = info.pack().unwrap();
        assert_eq!(FieldInfo::unpack(raw), info);
    }

    #[test]
    fn test_bit_one_unused() {
        let info = FieldInfo {
            is_object: true,
            name_len: MAX_NAME_LEN,
            object_index: MAX_OBJECT_INDEX,
        };
        assert_eq!(info.pack().unwrap() & 0b10, 0);
    }

    #[test]
    fn test_name_len_overflow() {
        let info = FieldInfo {
            is_object: false,
            name_len: MAX_NAME_LEN + 1,
            object_index: 0,
        };
        assert!(matches!(info.pack(), Err(DsonError::LimitExceeded(_))));
    }

    #[test]
    fn test_object_index_overflow() {
        let info = FieldInfo {
            is_object: false,
            name_len: 1,
            object_index: MAX_OBJECT_INDEX + 1,
        };
        assert!(matches!(info.pack(), Err(DsonError::LimitExceeded(_))));
    }
}
