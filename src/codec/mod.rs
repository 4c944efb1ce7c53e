//! The codec chain.
//!
//! A codec turns a value a format cannot represent natively into a *tagged
//! mapping* (encode), or recognises such a mapping and rebuilds the richer
//! value (decode). Codecs are tried in registration order; the first one that
//! answers [`Outcome::Matched`] wins. When none match, encode leaves the value
//! for the formatter to reject and decode passes the mapping through as is.
//!
//! The built-in codecs handle dense arrays (`__ndarray__`) and sparse
//! matrices (`__sparse__`). Callers can add their own, ahead of or behind the
//! built-ins:
//!
//! ```rust
//! use ndserial::codec::{Codecs, Outcome};
//! use ndserial::{encode, value, EncodeOptions, Value};
//!
//! let mut codecs = Codecs::default();
//! codecs.register_encoder_at(0, |v: &Value, _: &EncodeOptions| -> ndserial::Result<Outcome<Value>> {
//!     Ok(match v.as_tagged() {
//!         Some(t) if t.tag == "Celsius" => Outcome::Matched(value!({"celsius": (t.value.clone())})),
//!         _ => Outcome::NoMatch,
//!     })
//! });
//!
//! let options = EncodeOptions::new().with_codecs(codecs);
//! let encoded = encode(&Value::tagged("Celsius", Value::from(21.5)), &options).unwrap();
//! assert_eq!(encoded, value!({"celsius": 21.5}));
//! ```

pub mod array;
pub mod sparse;

use crate::options::{DecodeOptions, EncodeOptions};
use crate::{Error, Map, Result, Tagged, Value};
use std::fmt;
use std::sync::Arc;

/// Marker key of a tagged dense array; its value is the nested payload.
pub const ARRAY_TAG: &str = "__ndarray__";
/// Marker key of a tagged sparse matrix; its value must be `true`.
pub const SPARSE_TAG: &str = "__sparse__";

pub const DTYPE_FIELD: &str = "dtype";
pub const SHAPE_FIELD: &str = "shape";
pub const FORMAT_FIELD: &str = "format";
pub const DATA_FIELD: &str = "data";
pub const ROW_FIELD: &str = "row";
pub const COL_FIELD: &str = "col";

/// Maximum nesting the encoder walks before giving up.
pub const MAX_ENCODE_DEPTH: usize = 128;

/// Result of offering a value to a codec.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome<T> {
    Matched(T),
    /// The codec does not apply; the next one is tried.
    NoMatch,
}

impl<T> Outcome<T> {
    #[must_use]
    pub fn is_matched(&self) -> bool {
        matches!(self, Outcome::Matched(_))
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Outcome::Matched(v) => Some(v),
            Outcome::NoMatch => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Outcome::Matched(v) => Outcome::Matched(f(v)),
            Outcome::NoMatch => Outcome::NoMatch,
        }
    }
}

impl<T> From<Option<T>> for Outcome<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Outcome::NoMatch, Outcome::Matched)
    }
}

/// Turns a non-native value into something the formatter can write.
pub trait Encoder: Send + Sync {
    /// # Errors
    ///
    /// Only for values the codec recognises but cannot encode.
    fn try_encode(&self, value: &Value, options: &EncodeOptions) -> Result<Outcome<Value>>;
}

impl<F> Encoder for F
where
    F: Fn(&Value, &EncodeOptions) -> Result<Outcome<Value>> + Send + Sync,
{
    fn try_encode(&self, value: &Value, options: &EncodeOptions) -> Result<Outcome<Value>> {
        self(value, options)
    }
}

/// Recognises a tagged mapping and rebuilds the value it stands for.
pub trait Decoder: Send + Sync {
    /// # Errors
    ///
    /// Only for mappings the codec recognises whose payload is invalid.
    fn try_decode(&self, map: &Map, options: &DecodeOptions) -> Result<Outcome<Value>>;
}

impl<F> Decoder for F
where
    F: Fn(&Map, &DecodeOptions) -> Result<Outcome<Value>> + Send + Sync,
{
    fn try_decode(&self, map: &Map, options: &DecodeOptions) -> Result<Outcome<Value>> {
        self(map, options)
    }
}

/// An ordered list of codecs.
pub struct CodecChain<C: ?Sized> {
    links: Vec<Arc<C>>,
}

impl<C: ?Sized> CodecChain<C> {
    #[must_use]
    pub fn new() -> Self {
        CodecChain { links: Vec::new() }
    }

    /// Appends a codec; it is tried after every codec already present.
    pub fn push(&mut self, codec: Arc<C>) {
        self.links.push(codec);
    }

    /// Inserts a codec at `index`, clamped to the chain length.
    pub fn insert(&mut self, index: usize, codec: Arc<C>) {
        let index = index.min(self.links.len());
        self.links.insert(index, codec);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<C>> {
        self.links.iter()
    }
}

impl<C: ?Sized> Default for CodecChain<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ?Sized> Clone for CodecChain<C> {
    fn clone(&self) -> Self {
        CodecChain {
            links: self.links.clone(),
        }
    }
}

impl CodecChain<dyn Encoder> {
    /// Offers `value` to each encoder in order.
    ///
    /// # Errors
    ///
    /// Propagates the first encoder error.
    pub fn dispatch(&self, value: &Value, options: &EncodeOptions) -> Result<Outcome<Value>> {
        for (position, encoder) in self.links.iter().enumerate() {
            if let Outcome::Matched(encoded) = encoder.try_encode(value, options)? {
                tracing::trace!(position, kind = value.kind(), "encoder matched");
                return Ok(Outcome::Matched(encoded));
            }
        }
        Ok(Outcome::NoMatch)
    }
}

impl CodecChain<dyn Decoder> {
    /// Offers `map` to each decoder in order.
    ///
    /// # Errors
    ///
    /// Propagates the first decoder error.
    pub fn dispatch(&self, map: &Map, options: &DecodeOptions) -> Result<Outcome<Value>> {
        for (position, decoder) in self.links.iter().enumerate() {
            if let Outcome::Matched(decoded) = decoder.try_decode(map, options)? {
                tracing::trace!(position, kind = decoded.kind(), "decoder matched");
                return Ok(Outcome::Matched(decoded));
            }
        }
        Ok(Outcome::NoMatch)
    }
}

/// The encoder and decoder chains used by one family of calls.
///
/// Registration needs `&mut self`; once the registry sits behind the `Arc`
/// in an options struct it is read-only.
#[derive(Clone)]
pub struct Codecs {
    encoders: CodecChain<dyn Encoder>,
    decoders: CodecChain<dyn Decoder>,
}

impl Default for Codecs {
    /// The built-in array and sparse codecs.
    fn default() -> Self {
        let mut codecs = Codecs::empty();
        codecs.register_encoder(array::ArrayCodec);
        codecs.register_encoder(sparse::SparseCodec);
        codecs.register_decoder(array::ArrayCodec);
        codecs.register_decoder(sparse::SparseCodec);
        codecs
    }
}

impl fmt::Debug for Codecs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codecs")
            .field("encoders", &self.encoders.len())
            .field("decoders", &self.decoders.len())
            .finish()
    }
}

impl Codecs {
    /// A registry with no codecs at all.
    #[must_use]
    pub fn empty() -> Self {
        Codecs {
            encoders: CodecChain::new(),
            decoders: CodecChain::new(),
        }
    }

    pub fn register_encoder<E: Encoder + 'static>(&mut self, encoder: E) -> &mut Self {
        self.encoders.push(Arc::new(encoder));
        self
    }

    /// Registers `encoder` at `index` (clamped), ahead of later entries.
    pub fn register_encoder_at<E: Encoder + 'static>(&mut self, index: usize, encoder: E) -> &mut Self {
        self.encoders.insert(index, Arc::new(encoder));
        self
    }

    pub fn register_decoder<D: Decoder + 'static>(&mut self, decoder: D) -> &mut Self {
        self.decoders.push(Arc::new(decoder));
        self
    }

    pub fn register_decoder_at<D: Decoder + 'static>(&mut self, index: usize, decoder: D) -> &mut Self {
        self.decoders.insert(index, Arc::new(decoder));
        self
    }

    #[must_use]
    pub fn encoders(&self) -> &CodecChain<dyn Encoder> {
        &self.encoders
    }

    #[must_use]
    pub fn decoders(&self) -> &CodecChain<dyn Decoder> {
        &self.decoders
    }

    /// Rewrites every non-native node of `value` through the encoder chain.
    ///
    /// Encoder output is encoded again, so a codec may emit richer values for
    /// later codecs to handle. Values no encoder accepts are left in place.
    ///
    /// # Errors
    ///
    /// Propagates encoder errors, or fails if nesting exceeds
    /// [`MAX_ENCODE_DEPTH`].
    pub fn encode(&self, value: &Value, options: &EncodeOptions) -> Result<Value> {
        self.encode_node(value, options, 0)
    }

    fn encode_node(&self, value: &Value, options: &EncodeOptions, depth: usize) -> Result<Value> {
        if depth > MAX_ENCODE_DEPTH {
            return Err(Error::custom(format!(
                "encoding nests deeper than {} levels",
                MAX_ENCODE_DEPTH
            )));
        }
        match value {
            Value::Array(items) => items
                .iter()
                .map(|item| self.encode_node(item, options, depth + 1))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            Value::Object(map) => map
                .iter()
                .map(|(k, v)| Ok((k.clone(), self.encode_node(v, options, depth + 1)?)))
                .collect::<Result<Map>>()
                .map(Value::Object),
            v if v.is_native() => Ok(v.clone()),
            other => match self.encoders.dispatch(other, options)? {
                Outcome::Matched(encoded) => self.encode_node(&encoded, options, depth + 1),
                Outcome::NoMatch => match other {
                    Value::Tagged(t) => Ok(Value::Tagged(Box::new(Tagged {
                        tag: t.tag.clone(),
                        value: self.encode_node(&t.value, options, depth + 1)?,
                    }))),
                    _ => Ok(other.clone()),
                },
            },
        }
    }

    /// Rebuilds tagged mappings inside `value`, children before parents.
    ///
    /// The `element_type` override of `options` is applied once the walk is
    /// done, to the arrays and matrices left in the tree. Sparse index arrays
    /// are consumed by then and keep their integer type.
    ///
    /// # Errors
    ///
    /// Propagates decoder errors for recognised but invalid mappings.
    pub fn decode(&self, value: Value, options: &DecodeOptions) -> Result<Value> {
        let decoded = self.decode_node(value, options)?;
        Ok(match options.element_type {
            Some(dtype) => with_element_type(decoded, dtype),
            None => decoded,
        })
    }

    fn decode_node(&self, value: Value, options: &DecodeOptions) -> Result<Value> {
        match value {
            Value::Array(items) => items
                .into_iter()
                .map(|item| self.decode_node(item, options))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            Value::Object(map) => {
                let map = map
                    .into_iter()
                    .map(|(k, v)| Ok((k, self.decode_node(v, options)?)))
                    .collect::<Result<Map>>()?;
                match self.decoders.dispatch(&map, options)? {
                    Outcome::Matched(decoded) => Ok(decoded),
                    Outcome::NoMatch => Ok(Value::Object(map)),
                }
            }
            Value::Tagged(t) => {
                let Tagged { tag, value } = *t;
                Ok(Value::Tagged(Box::new(Tagged {
                    tag,
                    value: self.decode_node(value, options)?,
                })))
            }
            other => Ok(other),
        }
    }
}

/// Casts every decoded array and matrix in `value` to `dtype`.
fn with_element_type(value: Value, dtype: crate::DType) -> Value {
    match value {
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| with_element_type(item, dtype))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, with_element_type(v, dtype)))
                .collect(),
        ),
        Value::Tagged(t) => {
            let Tagged { tag, value } = *t;
            Value::Tagged(Box::new(Tagged {
                tag,
                value: with_element_type(value, dtype),
            }))
        }
        #[cfg(feature = "ndarray")]
        Value::NdArray(arr) if arr.dtype() != dtype => Value::NdArray(arr.cast(dtype)),
        #[cfg(feature = "sparse")]
        Value::Sparse(m) if m.dtype() != dtype => Value::Sparse(m.astype(dtype)),
        other => other,
    }
}

/// Reads the element-type label of a tagged mapping.
pub(crate) fn read_dtype(map: &Map) -> Result<Option<crate::DType>> {
    match map.get(DTYPE_FIELD) {
        None => Ok(None),
        Some(Value::String(label)) => label.parse().map(Some),
        Some(other) => Err(Error::malformed(format!(
            "`{}` must be a string label, found {}",
            DTYPE_FIELD,
            other.kind()
        ))),
    }
}

/// Reads a shape: a list of non-negative integers.
pub(crate) fn read_shape(value: &Value) -> Result<Vec<usize>> {
    let items = value
        .as_array()
        .ok_or_else(|| Error::malformed(format!("shape must be a list, found {}", value.kind())))?;
    items
        .iter()
        .map(|dim| {
            dim.as_u64()
                .and_then(|d| usize::try_from(d).ok())
                .ok_or_else(|| Error::malformed(format!("invalid shape dimension {}", dim)))
        })
        .collect()
}

pub(crate) fn shape_value(shape: &[usize]) -> Value {
    Value::Array(shape.iter().map(|&d| Value::from(d as u64)).collect())
}
