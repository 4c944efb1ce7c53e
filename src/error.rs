//! Error types for encoding, decoding and format I/O.
//!
//! One [`Error`] enum covers every failure the crate can report. Codecs that
//! simply do not apply to a value never produce an error; they answer
//! [`Outcome::NoMatch`](crate::codec::Outcome::NoMatch) instead.
//!
//! ## Error Categories
//!
//! - **Parse / I/O**: the underlying format or stream failed
//! - **Malformed**: a tagged payload is structurally invalid (ragged arrays,
//!   mismatched triplets, unknown element type)
//! - **Missing dependency**: a tag was recognised but the crate was built
//!   without the feature that reconstructs it
//! - **Safety**: a safe-mode call met a non-primitive type
//!
//! ## Examples
//!
//! ```rust
//! use ndserial::{json, DecodeOptions, Error};
//!
//! let doc = r#"{"__ndarray__": [[1, 2], [3]], "dtype": "int32"}"#;
//! let err = json::loads(doc, &DecodeOptions::default()).unwrap_err();
//! assert!(matches!(err, Error::Malformed(_)));
//! ```

use std::fmt;
use thiserror::Error;

/// Represents all possible errors raised by this crate.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// IO error during reading or writing
    #[error("IO error: {0}")]
    Io(String),

    /// The underlying format parser or emitter rejected the input
    #[error("{format} error: {msg}")]
    Parse { format: &'static str, msg: String },

    /// A value has no representation in the target format
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// A tag was recognised but the crate was built without the capability to rebuild it
    #[error("cannot decode {capability} value: crate built without the `{feature}` feature")]
    MissingDependency {
        capability: &'static str,
        feature: &'static str,
    },

    /// Safe mode refused to construct or represent a non-primitive type
    #[error("serialization safety error: {0}")]
    SerializationSafety(String),

    /// A tagged payload is structurally invalid
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// A registered constructor failed to build a tagged node
    #[error("cannot construct `!{tag}`: {msg}")]
    Construct { tag: String, msg: String },

    /// Custom error
    #[error("Error: {0}")]
    Custom(String),
}

impl Error {
    /// Creates an I/O error for file reading/writing failures.
    pub fn io(msg: &str) -> Self {
        Error::Io(msg.to_string())
    }

    /// Creates a parse/emit error attributed to `format`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ndserial::Error;
    ///
    /// let err = Error::parse("json", "expected value at line 1 column 1");
    /// assert!(err.to_string().starts_with("json error"));
    /// ```
    pub fn parse<T: fmt::Display>(format: &'static str, msg: T) -> Self {
        Error::Parse {
            format,
            msg: msg.to_string(),
        }
    }

    /// Creates an unsupported type error for values a format cannot represent.
    pub fn unsupported_type(msg: &str) -> Self {
        Error::UnsupportedType(msg.to_string())
    }

    pub fn missing_dependency(capability: &'static str, feature: &'static str) -> Self {
        Error::MissingDependency {
            capability,
            feature,
        }
    }

    /// Creates the unified safety error, hiding whichever step refused the value.
    pub fn safety<T: fmt::Display>(msg: T) -> Self {
        Error::SerializationSafety(msg.to_string())
    }

    /// Creates a malformed-payload error.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ndserial::Error;
    ///
    /// let err = Error::malformed("row and col differ in length");
    /// assert!(err.to_string().contains("row and col"));
    /// ```
    pub fn malformed<T: fmt::Display>(msg: T) -> Self {
        Error::Malformed(msg.to_string())
    }

    pub fn construct<T: fmt::Display>(tag: &str, msg: T) -> Self {
        Error::Construct {
            tag: tag.to_string(),
            msg: msg.to_string(),
        }
    }

    /// Creates a custom error with a display message.
    pub fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }

    /// Returns `true` for [`Error::SerializationSafety`].
    #[must_use]
    pub fn is_safety_violation(&self) -> bool {
        matches!(self, Error::SerializationSafety(_))
    }
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_dependency_names_capability() {
        let err = Error::missing_dependency("sparse matrix", "sparse");
        let msg = err.to_string();
        assert!(msg.contains("sparse matrix"));
        assert!(msg.contains("`sparse`"));
    }

    #[test]
    fn test_safety_flag() {
        assert!(Error::safety("!Widget").is_safety_violation());
        assert!(!Error::malformed("x").is_safety_violation());
    }
}
