//! Name hashing for metadata lookups and hashed string references

/// Hash a byte sequence: `h = h * 53 + byte`, wrapping at 32 bits.
pub fn hash_bytes(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .fold(0u32, |h, &b| h.wrapping_mul(53).wrapping_add(b as u32))
}

/// Hash a string as stored in hashed string references (`###name`).
pub fn hash_string(s: &str) -> u32 {
    hash_bytes(s.as_bytes())
}

/// Hash of a field name as stored in the meta2 block.
///
/// Covers the terminating NUL written after the name in the data block.
pub fn name_hash(key: &str) -> u32 {
    hash_string(key).wrapping_mul(53)
}
