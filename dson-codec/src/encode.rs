//! Value encoders and the type tag registry
//!
//! Every encoder maps a [`Value`] to the exact payload bytes its tag
//! requires. The tag, not the value's shape, selects the encoding: a
//! numeric sequence is written as 4-byte integers under `IntVector` and as
//! 4-byte floats under `FloatVector`.

use dson_format::constants::HASHED_STRING_PREFIX;
use dson_format::{hash_string, DataType, DsonError, Result};
use tracing::warn;

use crate::value::{Scalar, Value};

/// Value does not have a shape the encoder accepts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeError {
    /// Accepted shape
    pub expected: &'static str,
    /// Shape that was received
    pub actual: String,
}

impl ShapeError {
    fn new(expected: &'static str, value: &Value) -> Self {
        Self {
            expected,
            actual: value.kind().to_string(),
        }
    }

    fn length(expected: &'static str, len: usize) -> Self {
        Self {
            expected,
            actual: format!("{} elements", len),
        }
    }
}

type ShapeResult = std::result::Result<Vec<u8>, ShapeError>;

/// Encode function registered for a data type
pub type EncodeFn = fn(&Value) -> ShapeResult;

/// Look up the encoder for a data type.
///
/// Types without an inline payload map to an encoder returning no bytes.
pub fn encoder_for(value_type: DataType) -> EncodeFn {
    match value_type {
        DataType::Unknown => encode_nothing,
        DataType::Bool => encode_value_bool,
        DataType::Char => encode_value_char,
        DataType::Int => encode_value_int,
        DataType::Float => encode_value_float,
        DataType::String => encode_value_string,
        DataType::IntVector => encode_value_int_vector,
        DataType::FloatVector => encode_value_float_vector,
        DataType::StringVector => encode_value_string_vector,
        DataType::HybridVector => encode_value_hybrid_vector,
        DataType::TwoBool => encode_value_two_bool,
        DataType::TwoInt => encode_value_two_int,
        DataType::FileRaw => encode_nothing,
        DataType::FileDecoded => encode_nothing,
        DataType::FileJson => encode_nothing,
        DataType::Object => encode_nothing,
    }
}

/// Encode the value of field `key` under `value_type`
pub fn encode_value(key: &str, value_type: DataType, value: &Value) -> Result<Vec<u8>> {
    encoder_for(value_type)(value).map_err(|e| DsonError::ShapeMismatch {
        key: key.to_string(),
        expected: e.expected,
        actual: e.actual,
    })
}

/// Encode a value whose type is given by name, as front ends supply it.
///
/// A name with no registered encoder is a [`DsonError::NoEncoder`].
pub fn encode_value_by_name(key: &str, type_name: &str, value: &Value) -> Result<Vec<u8>> {
    let value_type: DataType = type_name.parse().map_err(|_| DsonError::NoEncoder {
        key: key.to_string(),
        value_type: type_name.to_string(),
        value: value.to_string(),
    })?;
    encode_value(key, value_type, value)
}

fn encode_nothing(_value: &Value) -> ShapeResult {
    Ok(Vec::new())
}

/// `Bool`: one byte, 1 or 0
pub fn encode_value_bool(value: &Value) -> ShapeResult {
    match value {
        Value::Bool(b) => Ok(vec![*b as u8]),
        other => Err(ShapeError::new("bool", other)),
    }
}

/// `Char`: the first byte of the text
pub fn encode_value_char(value: &Value) -> ShapeResult {
    match value {
        Value::Text(s) => match s.as_bytes().first() {
            Some(&b) => Ok(vec![b]),
            None => Err(ShapeError {
                expected: "non-empty text",
                actual: "empty text".to_string(),
            }),
        },
        other => Err(ShapeError::new("text", other)),
    }
}

/// `Int`: 4 bytes little-endian, coerced through `u32`
pub fn encode_value_int(value: &Value) -> ShapeResult {
    match value {
        Value::Int(i) => Ok(int_bytes(*i as u32).to_vec()),
        Value::Number(n) => Ok(int_bytes(number_to_u32(*n)).to_vec()),
        other => Err(ShapeError::new("int or number", other)),
    }
}

/// `Float`: narrowed to `f32`, 4 bytes little-endian
pub fn encode_value_float(value: &Value) -> ShapeResult {
    match value {
        Value::Number(n) => Ok(float_bytes(*n).to_vec()),
        Value::Int(i) => Ok(float_bytes(*i as f64).to_vec()),
        other => Err(ShapeError::new("number or int", other)),
    }
}

/// `String`: length-prefixed and NUL-terminated, or a hashed reference
/// for text starting with `###`
pub fn encode_value_string(value: &Value) -> ShapeResult {
    match value {
        Value::Text(s) => string_bytes(s),
        other => Err(ShapeError::new("text", other)),
    }
}

/// `IntVector`: count, then 4-byte integers.
///
/// Text sequences defer to string-vector encoding and mixed sequences to
/// hybrid-vector encoding.
pub fn encode_value_int_vector(value: &Value) -> ShapeResult {
    match value {
        Value::Numbers(ns) => {
            let mut bs = count_bytes(ns.len())?;
            for n in ns {
                bs.extend_from_slice(&int_bytes(number_to_u32(*n)));
            }
            Ok(bs)
        }
        Value::Texts(_) => encode_value_string_vector(value),
        Value::Mixed(_) => encode_value_hybrid_vector(value),
        other => Err(ShapeError::new("number sequence", other)),
    }
}

/// `FloatVector`: count, then 4-byte floats
pub fn encode_value_float_vector(value: &Value) -> ShapeResult {
    match value {
        Value::Numbers(ns) => {
            let mut bs = count_bytes(ns.len())?;
            for n in ns {
                bs.extend_from_slice(&float_bytes(*n));
            }
            Ok(bs)
        }
        other => Err(ShapeError::new("number sequence", other)),
    }
}

/// `StringVector`: count, then string-encoded elements.
///
/// Sequences that are not homogeneously text defer to hybrid-vector
/// encoding.
pub fn encode_value_string_vector(value: &Value) -> ShapeResult {
    match value {
        Value::Texts(ts) => {
            let mut bs = count_bytes(ts.len())?;
            for t in ts {
                bs.extend_from_slice(&string_bytes(t)?);
            }
            Ok(bs)
        }
        Value::Numbers(_) | Value::Mixed(_) => encode_value_hybrid_vector(value),
        other => Err(ShapeError::new("text sequence", other)),
    }
}

/// `HybridVector`: count, then each element as `Int` when numeric or as
/// `String` when text. Boolean elements encode to nothing.
pub fn encode_value_hybrid_vector(value: &Value) -> ShapeResult {
    match value {
        Value::Mixed(items) => {
            let mut bs = count_bytes(items.len())?;
            for item in items {
                match item {
                    Scalar::Int(i) => bs.extend_from_slice(&int_bytes(*i as u32)),
                    Scalar::Number(n) => bs.extend_from_slice(&int_bytes(number_to_u32(*n))),
                    Scalar::Text(s) => bs.extend_from_slice(&string_bytes(s)?),
                    Scalar::Bool(b) => {
                        warn!(element = b, "boolean element in hybrid vector encodes to nothing");
                    }
                }
            }
            Ok(bs)
        }
        Value::Numbers(ns) => {
            let mut bs = count_bytes(ns.len())?;
            for n in ns {
                bs.extend_from_slice(&int_bytes(number_to_u32(*n)));
            }
            Ok(bs)
        }
        Value::Texts(ts) => {
            let mut bs = count_bytes(ts.len())?;
            for t in ts {
                bs.extend_from_slice(&string_bytes(t)?);
            }
            Ok(bs)
        }
        other => Err(ShapeError::new("sequence", other)),
    }
}

/// `TwoBool`: exactly two booleans, each in a 4-byte slot
pub fn encode_value_two_bool(value: &Value) -> ShapeResult {
    const EXPECTED: &str = "two booleans";
    let (b0, b1) = match value {
        Value::Bools(bs) if bs.len() == 2 => (bs[0], bs[1]),
        Value::Bools(bs) => return Err(ShapeError::length(EXPECTED, bs.len())),
        Value::Mixed(items) if items.len() == 2 => match (&items[0], &items[1]) {
            (Scalar::Bool(b0), Scalar::Bool(b1)) => (*b0, *b1),
            _ => return Err(ShapeError::new(EXPECTED, value)),
        },
        Value::Mixed(items) => return Err(ShapeError::length(EXPECTED, items.len())),
        other => return Err(ShapeError::new(EXPECTED, other)),
    };
    Ok(vec![b0 as u8, 0, 0, 0, b1 as u8, 0, 0, 0])
}

/// `TwoInt`: exactly two integers
pub fn encode_value_two_int(value: &Value) -> ShapeResult {
    const EXPECTED: &str = "two integers";
    let (i0, i1) = match value {
        Value::Numbers(ns) if ns.len() == 2 => (number_to_u32(ns[0]), number_to_u32(ns[1])),
        Value::Numbers(ns) => return Err(ShapeError::length(EXPECTED, ns.len())),
        Value::Mixed(items) if items.len() == 2 => {
            match (scalar_to_u32(&items[0]), scalar_to_u32(&items[1])) {
                (Some(i0), Some(i1)) => (i0, i1),
                _ => return Err(ShapeError::new(EXPECTED, value)),
            }
        }
        Value::Mixed(items) => return Err(ShapeError::length(EXPECTED, items.len())),
        other => return Err(ShapeError::new(EXPECTED, other)),
    };
    let mut bs = int_bytes(i0).to_vec();
    bs.extend_from_slice(&int_bytes(i1));
    Ok(bs)
}

fn int_bytes(value: u32) -> [u8; 4] {
    value.to_le_bytes()
}

fn float_bytes(value: f64) -> [u8; 4] {
    (value as f32).to_bits().to_le_bytes()
}

fn count_bytes(len: usize) -> ShapeResult {
    let len = u32::try_from(len).map_err(|_| ShapeError {
        expected: "length fitting 32 bits",
        actual: format!("length {}", len),
    })?;
    Ok(int_bytes(len).to_vec())
}

/// Floats truncate toward zero; negatives wrap like their two's complement.
fn number_to_u32(n: f64) -> u32 {
    (n as i64) as u32
}

fn scalar_to_u32(scalar: &Scalar) -> Option<u32> {
    match scalar {
        Scalar::Int(i) => Some(*i as u32),
        Scalar::Number(n) => Some(number_to_u32(*n)),
        _ => None,
    }
}

fn string_bytes(s: &str) -> ShapeResult {
    if let Some(name) = s.strip_prefix(HASHED_STRING_PREFIX) {
        return Ok(int_bytes(hash_string(name)).to_vec());
    }
    // +1 for the terminating zero byte
    let mut bs = count_bytes(s.len() + 1)?;
    bs.extend_from_slice(s.as_bytes());
    bs.push(0);
    Ok(bs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(items: &[&str]) -> Value {
        Value::Texts(items.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_bool() {
        assert_eq!(encode_value_bool(&Value::Bool(true)).unwrap(), vec![1]);
        assert_eq!(encode_value_bool(&Value::Bool(false)).unwrap(), vec![0]);
        assert!(encode_value_bool(&Value::Int(1)).is_err());
    }

    #[test]
    fn test_char() {
        assert_eq!(
            encode_value_char(&Value::Text("xyz".to_string())).unwrap(),
            vec![b'x']
        );
        let err = encode_value_char(&Value::Text(String::new())).unwrap_err();
        assert_eq!(err.expected, "non-empty text");
    }

    #[test]
    fn test_int() {
        assert_eq!(encode_value_int(&Value::Int(1)).unwrap(), vec![1, 0, 0, 0]);
        assert_eq!(encode_value_int(&Value::Int(-1)).unwrap(), vec![0xFF; 4]);
        assert_eq!(
            encode_value_int(&Value::Number(258.9)).unwrap(),
            vec![2, 1, 0, 0]
        );
        assert_eq!(encode_value_int(&Value::Number(-2.0)).unwrap(), (-2i32).to_le_bytes());
        assert_eq!(
            encode_value_int(&Value::Int(u32::MAX as i64)).unwrap(),
            vec![0xFF; 4]
        );
    }

    #[test]
    fn test_float() {
        assert_eq!(
            encode_value_float(&Value::Number(1.5)).unwrap(),
            1.5f32.to_le_bytes()
        );
        assert_eq!(
            encode_value_float(&Value::Number(0.1)).unwrap(),
            0.1f32.to_le_bytes()
        );
        assert_eq!(encode_value_float(&Value::Int(2)).unwrap(), 2.0f32.to_le_bytes());
    }

    #[test]
    fn test_string_literal() {
        let bs = encode_value_string(&Value::Text("hero".to_string())).unwrap();
        assert_eq!(bs.len(), 4 + 4 + 1);
        assert_eq!(&bs[0..4], &5u32.to_le_bytes());
        assert_eq!(&bs[4..8], b"hero");
        assert_eq!(bs[8], 0);
    }

    #[test]
    fn test_string_empty() {
        let bs = encode_value_string(&Value::Text(String::new())).unwrap();
        assert_eq!(bs, vec![1, 0, 0, 0, 0]);
    }

    #[test]
    fn test_string_hashed_reference() {
        let bs = encode_value_string(&Value::Text("###jester".to_string())).unwrap();
        assert_eq!(bs, hash_string("jester").to_le_bytes().to_vec());
    }

    #[test]
    fn test_int_vector() {
        let bs = encode_value_int_vector(&Value::Numbers(vec![1.0, -1.0])).unwrap();
        assert_eq!(bs, vec![2, 0, 0, 0, 1, 0, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn test_int_vector_defers_to_string_vector() {
        let value = texts(&["a", "b"]);
        assert_eq!(
            encode_value_int_vector(&value).unwrap(),
            encode_value_string_vector(&value).unwrap()
        );
    }

    #[test]
    fn test_int_vector_defers_to_hybrid_vector() {
        let value = Value::Mixed(vec![Scalar::Int(7), Scalar::Text("a".to_string())]);
        assert_eq!(
            encode_value_int_vector(&value).unwrap(),
            encode_value_hybrid_vector(&value).unwrap()
        );
    }

    #[test]
    fn test_float_vector() {
        let bs = encode_value_float_vector(&Value::Numbers(vec![0.5, 2.0])).unwrap();
        let mut expected = 2u32.to_le_bytes().to_vec();
        expected.extend_from_slice(&0.5f32.to_le_bytes());
        expected.extend_from_slice(&2.0f32.to_le_bytes());
        assert_eq!(bs, expected);
        assert!(encode_value_float_vector(&texts(&["a"])).is_err());
    }

    #[test]
    fn test_string_vector() {
        let bs = encode_value_string_vector(&texts(&["ab", "###x"])).unwrap();
        let mut expected = 2u32.to_le_bytes().to_vec();
        expected.extend_from_slice(&[3, 0, 0, 0, b'a', b'b', 0]);
        expected.extend_from_slice(&hash_string("x").to_le_bytes());
        assert_eq!(bs, expected);
    }

    #[test]
    fn test_string_vector_non_text_defers_to_hybrid() {
        let value = Value::Mixed(vec![Scalar::Text("a".to_string()), Scalar::Int(1)]);
        assert_eq!(
            encode_value_string_vector(&value).unwrap(),
            encode_value_hybrid_vector(&value).unwrap()
        );
    }

    #[test]
    fn test_hybrid_vector() {
        let value = Value::Mixed(vec![
            Scalar::Int(3),
            Scalar::Text("a".to_string()),
            Scalar::Number(4.0),
        ]);
        let bs = encode_value_hybrid_vector(&value).unwrap();
        assert_eq!(
            bs,
            vec![3, 0, 0, 0, 3, 0, 0, 0, 2, 0, 0, 0, b'a', 0, 4, 0, 0, 0]
        );
    }

    #[test]
    fn test_hybrid_vector_bool_encodes_nothing() {
        let value = Value::Mixed(vec![Scalar::Bool(true), Scalar::Int(1)]);
        let bs = encode_value_hybrid_vector(&value).unwrap();
        // Count still reflects both elements.
        assert_eq!(bs, vec![2, 0, 0, 0, 1, 0, 0, 0]);
    }

    #[test]
    fn test_two_bool() {
        assert_eq!(
            encode_value_two_bool(&Value::Bools(vec![true, false])).unwrap(),
            vec![1, 0, 0, 0, 0, 0, 0, 0]
        );
        let mixed = Value::Mixed(vec![Scalar::Bool(false), Scalar::Bool(true)]);
        assert_eq!(
            encode_value_two_bool(&mixed).unwrap(),
            vec![0, 0, 0, 0, 1, 0, 0, 0]
        );
    }

    #[test]
    fn test_two_bool_wrong_length() {
        let err = encode_value_two_bool(&Value::Bools(vec![true])).unwrap_err();
        assert_eq!(err.expected, "two booleans");
        assert_eq!(err.actual, "1 elements");
    }

    #[test]
    fn test_two_int() {
        assert_eq!(
            encode_value_two_int(&Value::Numbers(vec![1.0, 2.0])).unwrap(),
            vec![1, 0, 0, 0, 2, 0, 0, 0]
        );
        assert!(encode_value_two_int(&Value::Numbers(vec![1.0, 2.0, 3.0])).is_err());
    }

    #[test]
    fn test_no_payload_types() {
        for tag in [
            DataType::Unknown,
            DataType::FileRaw,
            DataType::FileDecoded,
            DataType::FileJson,
            DataType::Object,
        ] {
            assert!(encode_value("k", tag, &Value::Int(5)).unwrap().is_empty());
        }
    }

    #[test]
    fn test_shape_mismatch_carries_key() {
        match encode_value("hp", DataType::Bool, &Value::Text("yes".to_string())) {
            Err(DsonError::ShapeMismatch {
                key,
                expected,
                actual,
            }) => {
                assert_eq!(key, "hp");
                assert_eq!(expected, "bool");
                assert_eq!(actual, "text");
            }
            other => panic!("expected ShapeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_encode_by_unregistered_name() {
        match encode_value_by_name("hp", "quaternion", &Value::Int(1)) {
            Err(DsonError::NoEncoder {
                key,
                value_type,
                value,
            }) => {
                assert_eq!(key, "hp");
                assert_eq!(value_type, "quaternion");
                assert_eq!(value, "1");
            }
            other => panic!("expected NoEncoder, got {other:?}"),
        }
    }

    #[test]
    fn test_count_bytes() {
        assert_eq!(count_bytes(3).unwrap(), vec![3, 0, 0, 0]);
        assert_eq!(count_bytes(u32::MAX as usize).unwrap(), vec![0xFF; 4]);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_count_bytes_overflow() {
        let err = count_bytes(u32::MAX as usize + 1).unwrap_err();
        assert_eq!(err.expected, "length fitting 32 bits");
        assert_eq!(err.actual, format!("length {}", u32::MAX as usize + 1));
    }

    #[test]
    fn test_encode_by_name() {
        assert_eq!(
            encode_value_by_name("hp", "int", &Value::Int(9)).unwrap(),
            vec![9, 0, 0, 0]
        );
    }
}
