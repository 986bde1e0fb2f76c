//! Error types for DSON format

use crate::constants::FIELD_NAME_REVISION;
use thiserror::Error;

/// DSON error types
#[derive(Debug, Error)]
pub enum DsonError {
    /// The first field of a document is not the revision marker.
    #[error("expected \"{}\" as the first field; got \"{actual}\"", FIELD_NAME_REVISION)]
    RevisionNotFound {
        /// Key of the field found in first position.
        actual: String,
    },
    /// No encode function is registered for the requested type.
    #[error("no bytes encode function for key \"{key}\", value type \"{value_type}\", and value \"{value}\"")]
    NoEncoder {
        /// Key of the offending field.
        key: String,
        /// Type name that failed to resolve.
        value_type: String,
        /// Rendered value of the offending field.
        value: String,
    },
    /// A value does not have the shape its type tag requires.
    #[error("value of field \"{key}\" does not match its type: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Key of the offending field.
        key: String,
        /// Description of the accepted shape.
        expected: &'static str,
        /// Description of the received value.
        actual: String,
    },
    /// Layout was requested for a field whose value has not been encoded.
    #[error("field \"{0}\" has not been encoded")]
    NotEncoded(String),
    /// Child-count annotations do not line up with the field list.
    #[error("child count mismatch: {fields} fields but {counts} counts")]
    ChildCountMismatch {
        /// Number of fields.
        fields: usize,
        /// Number of child counts supplied.
        counts: usize,
    },
    /// Field tree annotations or structure are inconsistent.
    #[error("Invalid field tree: {0}")]
    InvalidTree(String),
    /// Document has no fields at all.
    #[error("Empty document")]
    EmptyDocument,
    /// Type name is not one of the known data types.
    #[error("Unknown data type: {0}")]
    UnknownDataType(String),
    /// Input does not start with the expected magic bytes.
    #[error("Invalid magic bytes")]
    InvalidMagic,
    /// Header contents are inconsistent or corrupt.
    #[error("Corrupt header: {0}")]
    CorruptHeader(String),
    /// A metadata block is inconsistent or corrupt.
    #[error("Corrupt metadata: {0}")]
    CorruptMeta(String),
    /// The data block is inconsistent or corrupt.
    #[error("Corrupt data: {0}")]
    CorruptData(String),
    /// Encountered unexpected end of input.
    #[error("Unexpected end of file")]
    UnexpectedEof,
    /// A format or configured limit was exceeded.
    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),
    /// I/O operation failed while reading or writing data.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON parsing or serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, DsonError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revision_not_found_message() {
        let err = DsonError::RevisionNotFound {
            actual: "base_root".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "expected \"__revision_dont_touch\" as the first field; got \"base_root\""
        );
    }

    #[test]
    fn test_no_encoder_message() {
        let err = DsonError::NoEncoder {
            key: "hp".to_string(),
            value_type: "quaternion".to_string(),
            value: "1".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("\"hp\""));
        assert!(msg.contains("\"quaternion\""));
    }
}
