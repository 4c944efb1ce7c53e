//! # ndserial
//!
//! Format-pluggable serialization for scientific data: JSON, YAML, CSV and a
//! lossless binary format, with dense numeric arrays and sparse matrices
//! carried through the text formats as tagged mappings.
//!
//! ## Key Features
//!
//! - **Codec chain**: encoders and decoders tried in order, first match wins.
//!   The built-ins tag arrays (`__ndarray__`) and sparse matrices
//!   (`__sparse__`); callers register their own ahead of or behind them
//! - **Lossless arrays**: element type and shape survive a JSON or YAML round
//!   trip, including zero-length axes
//! - **Sparse matrices**: `coo`, `csr`, `csc`, `dia`, `lil` and `dok` layouts,
//!   stored as canonical triplets
//! - **Safe YAML**: an explicit safe mode refuses `!tag` nodes before anything
//!   is constructed
//! - **Serde compatible**: typed structs go through [`to_value`] and
//!   [`from_value`], and `NdArray` fields serialize as tagged mappings
//!
//! ## Quick Start
//!
//! ```rust
//! use ndarray::array;
//! use ndserial::{json, value, DecodeOptions, EncodeOptions, NdArray, Value};
//!
//! let points = NdArray::from(array![[859.0f32, 859.0], [217.0, 106.0], [302.0, 140.0]].into_dyn());
//! let doc = value!({"points": (points.clone())});
//!
//! let text = json::dumps(&doc, &EncodeOptions::new()).unwrap();
//! assert!(text.contains(r#""dtype":"float32""#));
//!
//! let back = json::loads(&text, &DecodeOptions::new()).unwrap();
//! assert_eq!(back.get("points"), Some(&Value::NdArray(points)));
//! ```
//!
//! ### Lossy primitive output
//!
//! ```rust
//! use ndserial::{json, EncodeOptions, NdArray, Value};
//!
//! let arr = NdArray::from_shape_vec(&[2, 2], vec![1i32, 2, 3, 4]).unwrap();
//! let text = json::dumps(&Value::NdArray(arr), &EncodeOptions::new().primitive()).unwrap();
//! assert_eq!(text, "[[1,2],[3,4]]");
//! ```
//!
//! ## Formats
//!
//! | module     | backed by    | arrays              | `!tag` nodes            |
//! |------------|--------------|---------------------|-------------------------|
//! | [`json`]   | `serde_json` | tagged mappings     | rejected                |
//! | [`yaml`]   | `serde_yaml` | tagged mappings     | per [`SafeMode`]        |
//! | [`csv`]    | `csv`        | rank-2 as rows      | rejected                |
//! | [`binary`] | `bincode`    | typed, flat         | kept, constructors run  |
//!
//! Every format has `dumps`/`loads` on in-memory data and `dump`/`load` on a
//! path or stream (see [`io`]). [`Format`] picks one by file extension.
//!
//! ## Safety Guarantees
//!
//! - No `unsafe` code blocks
//! - No global state: codecs, safety mode and warning sinks travel in the
//!   options passed to each call
//! - Encoding depth is bounded by [`codec::MAX_ENCODE_DEPTH`]

#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(feature = "ndarray")]
pub mod array;
pub mod binary;
pub mod codec;
pub mod csv;
pub mod de;
pub mod dtype;
pub mod error;
pub mod format;
pub mod io;
pub mod json;
pub mod macros;
pub mod map;
pub mod options;
mod safety;
pub mod ser;
#[cfg(feature = "sparse")]
pub mod sparse;
pub mod value;
pub mod yaml;

#[cfg(feature = "ndarray")]
pub use array::{Element, NdArray};
pub use codec::{Codecs, Decoder, Encoder, Outcome};
pub use de::{from_value, ValueDeserializer};
pub use dtype::DType;
pub use error::{Error, Result};
pub use format::Format;
pub use io::{Input, Output};
pub use map::Map;
pub use options::{Constructors, DecodeOptions, EncodeOptions, SafeMode, WarningSink};
pub use ser::{to_value, ValueSerializer};
#[cfg(feature = "sparse")]
pub use sparse::{Compressed, Diagonals, SparseFormat, SparseMatrix};
pub use value::{Number, Tagged, Value};

/// Runs the encoder chain over `value`, leaving only native kinds where a
/// codec matched.
///
/// # Examples
///
/// ```rust
/// use ndserial::{encode, value, EncodeOptions, NdArray, Value};
///
/// let arr = NdArray::from_vec(vec![1u8, 2]);
/// let tagged = encode(&Value::NdArray(arr), &EncodeOptions::new()).unwrap();
/// assert_eq!(
///     tagged,
///     value!({"__ndarray__": [1, 2], "dtype": "uint8", "shape": [2]})
/// );
/// ```
///
/// # Errors
///
/// Returns an error if a codec recognises a value but cannot encode it, or
/// the value nests too deeply.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn encode(value: &Value, options: &EncodeOptions) -> Result<Value> {
    options.codecs.encode(value, options)
}

/// Runs the decoder chain over `value`, bottom-up.
///
/// Mappings no decoder recognises are returned unchanged.
///
/// # Errors
///
/// Returns [`Error::Malformed`] for recognised but invalid tagged mappings,
/// or [`Error::MissingDependency`] when a tag needs a disabled feature.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn decode(value: Value, options: &DecodeOptions) -> Result<Value> {
    options.codecs.decode(value, options)
}
