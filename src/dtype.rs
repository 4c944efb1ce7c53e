//! Element types of numeric arrays.
//!
//! [`DType`] is the closed set of element types the array and sparse codecs
//! understand. Its label (`"float32"`, `"int64"`, ...) is what the tag
//! convention writes into the `dtype` field of a tagged mapping.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Element type of a dense array or sparse matrix.
///
/// # Examples
///
/// ```rust
/// use ndserial::DType;
///
/// assert_eq!(DType::Float32.as_str(), "float32");
/// assert_eq!("uint8".parse::<DType>().unwrap(), DType::UInt8);
/// assert!("complex128".parse::<DType>().is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    #[default]
    Float64,
}

impl DType {
    pub const ALL: [DType; 11] = [
        DType::Bool,
        DType::Int8,
        DType::Int16,
        DType::Int32,
        DType::Int64,
        DType::UInt8,
        DType::UInt16,
        DType::UInt32,
        DType::UInt64,
        DType::Float32,
        DType::Float64,
    ];

    /// Returns the label written into tagged mappings.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            DType::Bool => "bool",
            DType::Int8 => "int8",
            DType::Int16 => "int16",
            DType::Int32 => "int32",
            DType::Int64 => "int64",
            DType::UInt8 => "uint8",
            DType::UInt16 => "uint16",
            DType::UInt32 => "uint32",
            DType::UInt64 => "uint64",
            DType::Float32 => "float32",
            DType::Float64 => "float64",
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_float(&self) -> bool {
        matches!(self, DType::Float32 | DType::Float64)
    }

    #[inline]
    #[must_use]
    pub const fn is_integer(&self) -> bool {
        !self.is_float() && !matches!(self, DType::Bool)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DType {
    type Err = Error;

    /// Parses a label. Besides the canonical names, the common aliases
    /// `float`/`double` (float64), `int` (int64) and `bool_` are accepted.
    fn from_str(s: &str) -> Result<Self> {
        let dtype = match s {
            "float" | "double" => DType::Float64,
            "int" => DType::Int64,
            "bool_" => DType::Bool,
            other => DType::ALL
                .iter()
                .copied()
                .find(|d| d.as_str() == other)
                .ok_or_else(|| Error::malformed(format!("unsupported element type `{}`", s)))?,
        };
        Ok(dtype)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_roundtrip() {
        for dtype in DType::ALL {
            assert_eq!(dtype.as_str().parse::<DType>().unwrap(), dtype);
        }
    }

    #[test]
    fn test_serde_label_matches_as_str() {
        let json = serde_json::to_string(&DType::UInt16).unwrap();
        assert_eq!(json, "\"uint16\"");
    }

    #[test]
    fn test_aliases() {
        assert_eq!("float".parse::<DType>().unwrap(), DType::Float64);
        assert_eq!("int".parse::<DType>().unwrap(), DType::Int64);
    }

    #[test]
    fn test_kinds() {
        assert!(DType::Float32.is_float());
        assert!(DType::UInt8.is_integer());
        assert!(!DType::Bool.is_integer());
        assert_eq!(DType::default(), DType::Float64);
    }
}
