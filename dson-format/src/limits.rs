//! Decoding limits

/// Limits applied while reading untrusted documents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum number of meta2 entries (default: 1,048,576)
    pub max_fields: usize,
    /// Maximum data block length (default: 256 MiB)
    pub max_data_len: usize,
    /// Maximum element count of a single vector value (default: 1,048,576)
    pub max_vector_len: usize,
    /// Maximum length of a single string value (default: 16 MiB)
    pub max_string_len: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_fields: 1 << 20,
            max_data_len: 256 * 1024 * 1024,
            max_vector_len: 1 << 20,
            max_string_len: 16 * 1024 * 1024,
        }
    }
}
