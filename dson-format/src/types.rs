//! Data type enumeration

use std::fmt;
use std::str::FromStr;

use crate::error::DsonError;

/// Value kinds a DSON field can carry.
///
/// The tag is never written to disk; it only selects how a value is
/// encoded into (and decoded out of) the data block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DataType {
    /// Unclassified value, carries no payload
    Unknown = 0,
    /// Single byte boolean
    Bool = 1,
    /// Single byte character
    Char = 2,
    /// 32-bit integer
    Int = 3,
    /// 32-bit float
    Float = 4,
    /// Length-prefixed, NUL-terminated string
    String = 5,
    /// Counted vector of 32-bit integers
    IntVector = 6,
    /// Counted vector of 32-bit floats
    FloatVector = 7,
    /// Counted vector of strings
    StringVector = 8,
    /// Counted vector of mixed integers and strings
    HybridVector = 9,
    /// Pair of booleans in 4-byte slots
    TwoBool = 10,
    /// Pair of 32-bit integers
    TwoInt = 11,
    /// Embedded file, raw bytes stored elsewhere
    FileRaw = 12,
    /// Embedded file, decoded form stored elsewhere
    FileDecoded = 13,
    /// Embedded file, JSON form stored elsewhere
    FileJson = 14,
    /// Object grouping child fields
    Object = 15,
}

impl DataType {
    /// Every data type, in tag order.
    pub const ALL: [DataType; 16] = [
        DataType::Unknown,
        DataType::Bool,
        DataType::Char,
        DataType::Int,
        DataType::Float,
        DataType::String,
        DataType::IntVector,
        DataType::FloatVector,
        DataType::StringVector,
        DataType::HybridVector,
        DataType::TwoBool,
        DataType::TwoInt,
        DataType::FileRaw,
        DataType::FileDecoded,
        DataType::FileJson,
        DataType::Object,
    ];

    /// Stable snake_case name used by front ends.
    pub fn name(self) -> &'static str {
        match self {
            DataType::Unknown => "unknown",
            DataType::Bool => "bool",
            DataType::Char => "char",
            DataType::Int => "int",
            DataType::Float => "float",
            DataType::String => "string",
            DataType::IntVector => "int_vector",
            DataType::FloatVector => "float_vector",
            DataType::StringVector => "string_vector",
            DataType::HybridVector => "hybrid_vector",
            DataType::TwoBool => "two_bool",
            DataType::TwoInt => "two_int",
            DataType::FileRaw => "file_raw",
            DataType::FileDecoded => "file_decoded",
            DataType::FileJson => "file_json",
            DataType::Object => "object",
        }
    }

    /// Convert from u8
    pub fn from_u8(val: u8) -> Result<Self, DsonError> {
        Self::ALL
            .get(val as usize)
            .copied()
            .ok_or_else(|| DsonError::UnknownDataType(format!("tag {}", val)))
    }

    /// Whether values of this type have no inline payload in the data block.
    pub fn has_no_payload(self) -> bool {
        matches!(
            self,
            DataType::Unknown
                | DataType::FileRaw
                | DataType::FileDecoded
                | DataType::FileJson
                | DataType::Object
        )
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = DsonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.name() == s)
            .ok_or_else(|| DsonError::UnknownDataType(s.to_string()))
    }
}
