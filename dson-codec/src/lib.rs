//! DSON Codec - Encoder/decoder engines
//!
//! This crate provides the encoding engine for DSON documents and its
//! decoding mirror:
//!
//! - Per-type value encoders and the type tag registry
//! - Field-descriptor (meta2 entry) construction
//! - Layout assembly: header, meta1/meta2 blocks and the padded data block
//! - The pipeline driving a field list to a complete document
//! - Tree flattening of nested fields
//! - Document reading and value decoding

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod decode;
pub mod descriptor;
pub mod encode;
pub mod field;
pub mod layout;
pub mod pipeline;
pub mod tree;
pub mod value;

// Re-export commonly used types
pub use dson_format::{
    DataType, DsonError, FieldInfo, Header, Limits, Meta1Entry, Meta2Entry, Result,
};

// Re-export our own types
pub use decode::{
    decode_value, infer_data_type, DecodeOptions, DecodedDocument, DecodedField, DocumentReader,
};
pub use descriptor::create_meta2_entry;
pub use encode::{encode_value, encode_value_by_name, encoder_for, EncodeFn, ShapeError};
pub use field::EncodingField;
pub use layout::{
    create_header, create_meta1_block, create_meta2_block, remove_revision_field, write_data_block,
};
pub use pipeline::{
    encode_values, set_num_all_children, set_num_direct_children, DocumentEncoder,
    EncodeOptions, EncodedDocument,
};
pub use tree::{flatten, unflatten, FieldNode, FieldNodeSpec};
pub use value::{Scalar, Value};
