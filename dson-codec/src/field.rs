//! Flattened document fields

use dson_format::constants::FIELD_NAME_REVISION;
use dson_format::DataType;

use crate::value::Value;

/// One node of a flattened document, in encode order.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodingField {
    /// Field name, unique among siblings
    pub key: String,
    /// Declared type tag
    pub value_type: DataType,
    /// Logical value
    pub value: Value,
    /// Encoded payload; `None` until the value encoder has run
    pub bytes: Option<Vec<u8>>,
    /// Field is an object
    pub is_object: bool,
    /// Number of fields directly inside this one
    pub num_direct_children: usize,
    /// Number of fields anywhere below this one
    pub num_all_children: usize,
}

impl EncodingField {
    /// Create an unencoded field
    pub fn new(key: impl Into<String>, value_type: DataType, value: Value) -> Self {
        Self {
            key: key.into(),
            value_type,
            value,
            bytes: None,
            is_object: value_type == DataType::Object,
            num_direct_children: 0,
            num_all_children: 0,
        }
    }

    /// Create the revision marker field
    pub fn revision(revision: i32) -> Self {
        Self::new(FIELD_NAME_REVISION, DataType::Int, Value::Int(revision as i64))
    }

    /// Create an object field with its child-count annotations
    pub fn object(key: impl Into<String>, num_direct_children: usize, num_all_children: usize) -> Self {
        Self {
            num_direct_children,
            num_all_children,
            ..Self::new(key, DataType::Object, Value::Null)
        }
    }

    /// Whether this is the revision marker field
    pub fn is_revision(&self) -> bool {
        self.key == FIELD_NAME_REVISION
    }

    /// Length of the encoded payload, if encoded
    pub fn encoded_len(&self) -> Option<usize> {
        self.bytes.as_ref().map(Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoded_len() {
        let mut field = EncodingField::new("hp", DataType::Int, Value::Int(4));
        assert_eq!(field.encoded_len(), None);
        field.bytes = Some(vec![4, 0, 0, 0]);
        assert_eq!(field.encoded_len(), Some(4));
    }

    #[test]
    fn test_revision_field() {
        let field = EncodingField::revision(3);
        assert!(field.is_revision());
        assert!(!field.is_object);
        assert_eq!(field.value, Value::Int(3));
    }
}
