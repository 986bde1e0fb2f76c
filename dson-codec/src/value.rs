//! Runtime values carried by fields

use std::fmt;

use serde_json::{Number, Value as JsonValue};

/// Element of a mixed sequence
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// Boolean element
    Bool(bool),
    /// Integer element
    Int(i64),
    /// Floating point element
    Number(f64),
    /// Text element
    Text(String),
}

/// Logical value of a field before encoding.
///
/// The declared [`DataType`](dson_format::DataType) decides how a value is
/// written; the same shape can serialize differently under different tags.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// No value (objects and embedded files)
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// 64-bit float
    Number(f64),
    /// Text
    Text(String),
    /// Homogeneous numeric sequence
    Numbers(Vec<f64>),
    /// Homogeneous text sequence
    Texts(Vec<String>),
    /// Homogeneous boolean sequence
    Bools(Vec<bool>),
    /// Sequence of mixed scalars
    Mixed(Vec<Scalar>),
}

impl Value {
    /// Short name of the value's shape, used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Number(_) => "number",
            Value::Text(_) => "text",
            Value::Numbers(_) => "number sequence",
            Value::Texts(_) => "text sequence",
            Value::Bools(_) => "bool sequence",
            Value::Mixed(_) => "mixed sequence",
        }
    }

    /// Build a value from JSON.
    ///
    /// Arrays become the most specific homogeneous sequence; arrays mixing
    /// scalar kinds become [`Value::Mixed`]. Objects and nested arrays have
    /// no field value representation and yield `None`.
    pub fn from_json(json: &JsonValue) -> Option<Self> {
        match json {
            JsonValue::Null => Some(Value::Null),
            JsonValue::Bool(b) => Some(Value::Bool(*b)),
            JsonValue::Number(n) => Some(number_value(n)),
            JsonValue::String(s) => Some(Value::Text(s.clone())),
            JsonValue::Array(items) => array_value(items),
            JsonValue::Object(_) => None,
        }
    }

    /// Render as JSON
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Int(i) => JsonValue::from(*i),
            Value::Number(n) => float_json(*n),
            Value::Text(s) => JsonValue::String(s.clone()),
            Value::Numbers(ns) => JsonValue::Array(ns.iter().map(|n| float_json(*n)).collect()),
            Value::Texts(ts) => JsonValue::Array(ts.iter().cloned().map(JsonValue::String).collect()),
            Value::Bools(bs) => JsonValue::Array(bs.iter().map(|b| JsonValue::Bool(*b)).collect()),
            Value::Mixed(items) => JsonValue::Array(items.iter().map(Scalar::to_json).collect()),
        }
    }
}

impl Scalar {
    /// Render as JSON
    pub fn to_json(&self) -> JsonValue {
        match self {
            Scalar::Bool(b) => JsonValue::Bool(*b),
            Scalar::Int(i) => JsonValue::from(*i),
            Scalar::Number(n) => float_json(*n),
            Scalar::Text(s) => JsonValue::String(s.clone()),
        }
    }

    fn from_json(json: &JsonValue) -> Option<Self> {
        match json {
            JsonValue::Bool(b) => Some(Scalar::Bool(*b)),
            JsonValue::Number(n) => Some(match number_value(n) {
                Value::Int(i) => Scalar::Int(i),
                Value::Number(f) => Scalar::Number(f),
                _ => return None,
            }),
            JsonValue::String(s) => Some(Scalar::Text(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

fn number_value(n: &Number) -> Value {
    match n.as_i64() {
        Some(i) => Value::Int(i),
        None => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
    }
}

fn float_json(n: f64) -> JsonValue {
    Number::from_f64(n).map_or(JsonValue::Null, JsonValue::Number)
}

fn array_value(items: &[JsonValue]) -> Option<Value> {
    if items.iter().all(JsonValue::is_number) {
        return Some(Value::Numbers(
            items.iter().filter_map(JsonValue::as_f64).collect(),
        ));
    }
    if items.iter().all(JsonValue::is_string) {
        return Some(Value::Texts(
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
        ));
    }
    if items.iter().all(JsonValue::is_boolean) {
        return Some(Value::Bools(
            items.iter().filter_map(JsonValue::as_bool).collect(),
        ));
    }
    items
        .iter()
        .map(Scalar::from_json)
        .collect::<Option<Vec<_>>>()
        .map(Value::Mixed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_scalars() {
        assert_eq!(Value::from_json(&json!(true)), Some(Value::Bool(true)));
        assert_eq!(Value::from_json(&json!(-7)), Some(Value::Int(-7)));
        assert_eq!(Value::from_json(&json!(1.5)), Some(Value::Number(1.5)));
        assert_eq!(
            Value::from_json(&json!("hero")),
            Some(Value::Text("hero".to_string()))
        );
        assert_eq!(Value::from_json(&json!(null)), Some(Value::Null));
    }

    #[test]
    fn test_from_json_homogeneous_arrays() {
        assert_eq!(
            Value::from_json(&json!([1, 2.5])),
            Some(Value::Numbers(vec![1.0, 2.5]))
        );
        assert_eq!(
            Value::from_json(&json!(["a", "b"])),
            Some(Value::Texts(vec!["a".to_string(), "b".to_string()]))
        );
        assert_eq!(
            Value::from_json(&json!([true, false])),
            Some(Value::Bools(vec![true, false]))
        );
        // Empty arrays are numeric; every vector tag encodes them identically.
        assert_eq!(Value::from_json(&json!([])), Some(Value::Numbers(vec![])));
    }

    #[test]
    fn test_from_json_mixed_array() {
        assert_eq!(
            Value::from_json(&json!([3, "crusader", true])),
            Some(Value::Mixed(vec![
                Scalar::Int(3),
                Scalar::Text("crusader".to_string()),
                Scalar::Bool(true),
            ]))
        );
    }

    #[test]
    fn test_from_json_rejects_nesting() {
        assert_eq!(Value::from_json(&json!({"a": 1})), None);
        assert_eq!(Value::from_json(&json!([[1], 2])), None);
    }

    #[test]
    fn test_to_json_and_display() {
        let value = Value::Mixed(vec![Scalar::Int(1), Scalar::Text("x".to_string())]);
        assert_eq!(value.to_json(), json!([1, "x"]));
        assert_eq!(value.to_string(), "[1,\"x\"]");
        assert_eq!(Value::Number(f64::NAN).to_json(), JsonValue::Null);
    }
}
