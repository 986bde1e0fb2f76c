//! Constants and magic numbers for the DSON format

/// File magic bytes, stored at offset 0 of every document.
pub const MAGIC_NUMBER: [u8; 4] = [0x01, 0xB1, 0x00, 0x00];

/// Size of the fixed header in bytes.
pub const HEADER_LENGTH: usize = 64;

/// Size of one meta1 block entry in bytes.
pub const META1_ENTRY_SIZE: usize = 16;

/// Size of one meta2 block entry in bytes.
pub const META2_ENTRY_SIZE: usize = 12;

/// Payloads at least this long start on an aligned offset in the data block.
pub const DATA_ALIGNMENT: usize = 4;

/// Name of the mandatory first field carrying the document revision.
pub const FIELD_NAME_REVISION: &str = "__revision_dont_touch";

/// Prefix marking a string value as a hashed name reference.
pub const HASHED_STRING_PREFIX: &str = "###";

/// Parent index stored in meta1 for objects at the top level.
pub const NO_PARENT: i32 = -1;

/// Bit holding the is-object flag inside the field info.
pub const FIELD_INFO_OBJECT_BIT: usize = 0;
/// First bit of the name length inside the field info.
pub const FIELD_INFO_NAME_LEN_SHIFT: usize = 2;
/// Width in bits of the name length inside the field info.
pub const FIELD_INFO_NAME_LEN_BITS: usize = 9;
/// First bit of the running object count inside the field info.
pub const FIELD_INFO_OBJECT_INDEX_SHIFT: usize = 11;
/// Width in bits of the running object count inside the field info.
pub const FIELD_INFO_OBJECT_INDEX_BITS: usize = 21;

/// Largest name length (terminator included) the field info can hold.
pub const MAX_NAME_LEN: u32 = (1 << FIELD_INFO_NAME_LEN_BITS) - 1;
/// Largest running object count the field info can hold.
pub const MAX_OBJECT_INDEX: u32 = (1 << FIELD_INFO_OBJECT_INDEX_BITS) - 1;
