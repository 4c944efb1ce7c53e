//! JSON documents.
//!
//! Arrays and sparse matrices are written as tagged mappings and rebuilt on
//! load; everything else is plain JSON. JSON has no literal for NaN or
//! infinities, so those are written as `null` (and `null` inside a float
//! array payload reads back as NaN).
//!
//! ```rust
//! use ndserial::{json, value, DecodeOptions, EncodeOptions};
//!
//! let text = json::dumps(&value!({"c": 0, "b": 0, "a": 0}), &EncodeOptions::new().sort_keys()).unwrap();
//! assert_eq!(text, r#"{"a":0,"b":0,"c":0}"#);
//!
//! let doc = json::loads(r#"["foo", {"bar": ["baz", null, 1.0, 2]}]"#, &DecodeOptions::new()).unwrap();
//! assert_eq!(doc, value!(["foo", {"bar": ["baz", null, 1.0, 2]}]));
//! ```

use crate::io::{self, Input, Output};
use crate::options::{DecodeOptions, EncodeOptions};
use crate::{Error, Result, Value};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub const EXTENSION: &str = ".json";

/// Encodes `value` and formats it as JSON text.
///
/// # Errors
///
/// Returns [`Error::UnsupportedType`] if a value remains that no codec could
/// encode, or an encoder error.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn dumps(value: &Value, options: &EncodeOptions) -> Result<String> {
    let mut encoded = options.codecs.encode(value, options)?;
    if let Some(node) = encoded.find_non_native() {
        return Err(Error::unsupported_type(&format!(
            "{} cannot be written as JSON",
            node.kind()
        )));
    }
    if options.sort_keys {
        encoded.sort_keys_recursive();
    }
    match options.indent {
        None => serde_json::to_string(&encoded).map_err(|e| Error::parse("json", e)),
        Some(width) => {
            let indent = vec![b' '; width];
            let formatter = serde_json::ser::PrettyFormatter::with_indent(&indent);
            let mut out = Vec::new();
            let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
            encoded
                .serialize(&mut serializer)
                .map_err(|e| Error::parse("json", e))?;
            String::from_utf8(out).map_err(|e| Error::parse("json", e))
        }
    }
}

/// Parses JSON text and decodes tagged mappings.
///
/// # Errors
///
/// Returns [`Error::Parse`] for invalid JSON, or a decoder error for
/// malformed tagged mappings.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn loads(text: &str, options: &DecodeOptions) -> Result<Value> {
    let value: Value = serde_json::from_str(text).map_err(|e| Error::parse("json", e))?;
    options.codecs.decode(value, options)
}

/// Writes `value` as JSON to a path or stream.
///
/// # Errors
///
/// As [`dumps`], plus I/O errors.
pub fn dump<'a>(value: &Value, output: impl Into<Output<'a>>, options: &EncodeOptions) -> Result<()> {
    let text = dumps(value, options)?;
    io::with_writer(output.into(), |w| io::write_all(w, text.as_bytes()))
}

/// Reads a JSON document from a path or stream.
///
/// # Errors
///
/// As [`loads`], plus I/O errors.
pub fn load<'a>(input: impl Into<Input<'a>>, options: &DecodeOptions) -> Result<Value> {
    io::with_reader(input.into(), |r| loads(&io::read_string(r)?, options))
}

/// Serializes any `T: Serialize` to JSON text.
///
/// # Examples
///
/// ```rust
/// use ndserial::{json, EncodeOptions};
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Point { x: i32, y: i32 }
///
/// let text = json::to_string(&Point { x: 1, y: 2 }, &EncodeOptions::new()).unwrap();
/// assert_eq!(text, r#"{"x":1,"y":2}"#);
/// ```
///
/// # Errors
///
/// As [`dumps`].
pub fn to_string<T>(value: &T, options: &EncodeOptions) -> Result<String>
where
    T: ?Sized + Serialize,
{
    dumps(&crate::to_value(value)?, options)
}

/// Deserializes a `T` from JSON text.
///
/// # Errors
///
/// As [`loads`], or if the document does not match `T`.
pub fn from_str<T>(text: &str, options: &DecodeOptions) -> Result<T>
where
    T: DeserializeOwned,
{
    crate::from_value(loads(text, options)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value;

    #[test]
    fn test_escapes() {
        let opts = EncodeOptions::new();
        assert_eq!(dumps(&value!("\"foo\u{8}ar"), &opts).unwrap(), r#""\"foo\bar""#);
        assert_eq!(dumps(&value!("\\"), &opts).unwrap(), r#""\\""#);
        assert_eq!(
            loads(r#""\"foo\bar""#, &DecodeOptions::new()).unwrap(),
            value!("\"foo\u{8}ar")
        );
    }

    #[test]
    fn test_indent_and_sort() {
        let opts = EncodeOptions::new().sort_keys().with_indent(4);
        let text = dumps(&value!({"6": 7, "4": 5}), &opts).unwrap();
        assert_eq!(text, "{\n    \"4\": 5,\n    \"6\": 7\n}");
    }

    #[test]
    fn test_specials_become_null() {
        let text = dumps(&value!([(f64::NAN), (f64::INFINITY)]), &EncodeOptions::new()).unwrap();
        assert_eq!(text, "[null,null]");
    }

    #[test]
    fn test_tagged_is_unsupported() {
        let err = dumps(&Value::tagged("Widget", Value::Null), &EncodeOptions::new()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedType(_)));
    }

    #[test]
    fn test_invalid_json() {
        let err = loads("[1, 2", &DecodeOptions::new()).unwrap_err();
        assert!(matches!(err, Error::Parse { format: "json", .. }));
    }

    #[test]
    fn test_key_order_preserved() {
        let text = r#"{"z":1,"a":2,"m":3}"#;
        let doc = loads(text, &DecodeOptions::new()).unwrap();
        assert_eq!(dumps(&doc, &EncodeOptions::new()).unwrap(), text);
    }
}
