//! DSON Format - Core primitives for the DSON binary document format
//!
//! This crate provides the fixed wire structures of a DSON file with no I/O
//! dependencies. It includes:
//!
//! - Magic number, header length and entry size constants
//! - The data type tag enumeration
//! - The name hash used by metadata lookups
//! - Field-info bit packing
//! - Header and metadata entry codecs
//! - Error types
//! - Decoding limits

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod constants;
pub mod error;
pub mod field_info;
pub mod hash;
pub mod header;
pub mod limits;
pub mod meta;
pub mod types;

// Re-export commonly used types
pub use error::{DsonError, Result};
pub use field_info::FieldInfo;
pub use hash::{hash_string, name_hash};
pub use header::Header;
pub use limits::Limits;
pub use meta::{Meta1Entry, Meta2Entry};
pub use types::DataType;

/// Round `value` up to the next multiple of `m`.
///
/// Values already divisible by `m` are returned unchanged.
pub fn nearest_divisible_by(value: usize, m: usize) -> usize {
    match value % m {
        0 => value,
        rem => value + (m - rem),
    }
}
