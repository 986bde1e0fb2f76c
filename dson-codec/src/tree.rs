//! Field trees and their flattened encode order

use std::collections::HashSet;

use dson_format::{DataType, DsonError, Result};
use serde::{Deserialize, Serialize};

use crate::field::EncodingField;
use crate::value::Value;

/// A field together with its nested fields
#[derive(Debug, Clone, PartialEq)]
pub struct FieldNode {
    /// Field name
    pub key: String,
    /// Declared type tag
    pub value_type: DataType,
    /// Logical value
    pub value: Value,
    /// Nested fields; only objects may have any
    pub children: Vec<FieldNode>,
}

/// JSON form of a [`FieldNode`]
///
/// ```json
/// {"key": "base_root", "type": "object", "fields": [
///     {"key": "hp", "type": "int", "value": 12}
/// ]}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldNodeSpec {
    /// Field name
    pub key: String,
    /// Data type name, e.g. `"int_vector"`
    #[serde(rename = "type")]
    pub type_name: String,
    /// Value; omitted for objects and embedded files
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub value: serde_json::Value,
    /// Nested fields
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldNodeSpec>,
}

impl FieldNode {
    /// Create a leaf node
    pub fn leaf(key: impl Into<String>, value_type: DataType, value: Value) -> Self {
        Self {
            key: key.into(),
            value_type,
            value,
            children: Vec::new(),
        }
    }

    /// Create an object node
    pub fn object(key: impl Into<String>, children: Vec<FieldNode>) -> Self {
        Self {
            key: key.into(),
            value_type: DataType::Object,
            value: Value::Null,
            children,
        }
    }

    /// Number of fields anywhere below this node
    pub fn num_all_children(&self) -> usize {
        self.children
            .iter()
            .map(|c| 1 + c.num_all_children())
            .sum()
    }

    /// Build from the JSON form.
    ///
    /// Unknown type names fail with [`DsonError::NoEncoder`].
    pub fn from_spec(spec: &FieldNodeSpec) -> Result<Self> {
        let value_type: DataType = spec.type_name.parse().map_err(|_| DsonError::NoEncoder {
            key: spec.key.clone(),
            value_type: spec.type_name.clone(),
            value: spec.value.to_string(),
        })?;
        let value = Value::from_json(&spec.value).ok_or_else(|| DsonError::ShapeMismatch {
            key: spec.key.clone(),
            expected: "scalar or flat array",
            actual: spec.value.to_string(),
        })?;
        let children = spec
            .fields
            .iter()
            .map(FieldNode::from_spec)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            key: spec.key.clone(),
            value_type,
            value,
            children,
        })
    }

    /// Convert to the JSON form
    pub fn to_spec(&self) -> FieldNodeSpec {
        FieldNodeSpec {
            key: self.key.clone(),
            type_name: self.value_type.name().to_string(),
            value: self.value.to_json(),
            fields: self.children.iter().map(FieldNode::to_spec).collect(),
        }
    }

    /// Parse a JSON array of root field specs
    pub fn parse_json(json: &str) -> Result<Vec<FieldNode>> {
        let specs: Vec<FieldNodeSpec> = serde_json::from_str(json)?;
        specs.iter().map(FieldNode::from_spec).collect()
    }
}

/// Flatten trees into encode order (pre-order), annotating child counts.
///
/// Sibling keys must be unique and only objects may have children.
pub fn flatten(roots: &[FieldNode]) -> Result<Vec<EncodingField>> {
    let mut out = Vec::new();
    flatten_siblings(roots, &mut out)?;
    Ok(out)
}

fn flatten_siblings(nodes: &[FieldNode], out: &mut Vec<EncodingField>) -> Result<()> {
    let mut seen = HashSet::with_capacity(nodes.len());
    for node in nodes {
        if !seen.insert(node.key.as_str()) {
            return Err(DsonError::InvalidTree(format!(
                "duplicate sibling key \"{}\"",
                node.key
            )));
        }
        if node.value_type != DataType::Object && !node.children.is_empty() {
            return Err(DsonError::InvalidTree(format!(
                "non-object field \"{}\" has children",
                node.key
            )));
        }

        let mut field = EncodingField::new(node.key.clone(), node.value_type, node.value.clone());
        field.num_direct_children = node.children.len();
        field.num_all_children = node.num_all_children();
        out.push(field);

        flatten_siblings(&node.children, out)?;
    }
    Ok(())
}

/// Rebuild trees from a flattened list using its descendant counts
pub fn unflatten(fields: Vec<EncodingField>) -> Result<Vec<FieldNode>> {
    let mut iter = fields.into_iter();
    let mut roots = Vec::new();
    while let Some(field) = iter.next() {
        roots.push(build_node(field, &mut iter)?);
    }
    Ok(roots)
}

fn build_node(
    field: EncodingField,
    rest: &mut impl Iterator<Item = EncodingField>,
) -> Result<FieldNode> {
    let mut remaining = field.num_all_children;
    let mut children = Vec::new();
    while remaining > 0 {
        let child = rest.next().ok_or_else(|| {
            DsonError::InvalidTree(format!(
                "object \"{}\" is missing {} descendants",
                field.key, remaining
            ))
        })?;
        let consumed = 1 + child.num_all_children;
        if consumed > remaining {
            return Err(DsonError::InvalidTree(format!(
                "field \"{}\" extends past its parent \"{}\"",
                child.key, field.key
            )));
        }
        remaining -= consumed;
        children.push(build_node(child, rest)?);
    }
    Ok(FieldNode {
        key: field.key,
        value_type: field.value_type,
        value: field.value,
        children,
    })
}
