//! Dynamic value representation for documents.
//!
//! [`Value`] is the tree every format parses into and formats from. It holds
//! the six *native* kinds that JSON, YAML and friends can express directly
//! (null, bool, number, string, array, object) plus three richer kinds:
//!
//! - [`Value::NdArray`]: a dense numeric array (feature `ndarray`)
//! - [`Value::Sparse`]: a sparse matrix (feature `sparse`)
//! - [`Value::Tagged`]: a named type marker wrapping a value, the analogue of
//!   an arbitrary object in formats with native type tags
//!
//! The richer kinds reach text formats through the codec chain, see
//! [`crate::codec`].
//!
//! ## Creating Values
//!
//! ```rust
//! use ndserial::{value, Value};
//!
//! let scan = value!({
//!     "subject": "phantom-03",
//!     "voxels": [0.5, 0.25]
//! });
//! assert!(scan.is_object());
//! assert!(scan.is_native());
//! assert!(!Value::tagged("Probe", Value::Null).is_native());
//! ```

use crate::Map;
#[cfg(feature = "ndarray")]
use crate::NdArray;
#[cfg(feature = "sparse")]
use crate::SparseMatrix;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A dynamically-typed document value.
///
/// # Examples
///
/// ```rust
/// use ndserial::{Number, Value};
///
/// let spacing = Value::Number(Number::Float(0.75));
/// assert!(spacing.is_number());
/// assert_eq!(spacing.kind(), "number");
/// assert!(Value::default().is_null());
/// ```
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<Value>),
    Object(Map),
    #[cfg(feature = "ndarray")]
    NdArray(NdArray),
    #[cfg(feature = "sparse")]
    Sparse(SparseMatrix),
    Tagged(Box<Tagged>),
}

/// A value carrying an explicit type tag, written `!tag value` in YAML.
#[derive(Clone, Debug, PartialEq)]
pub struct Tagged {
    /// Tag name without the leading `!`.
    pub tag: String,
    pub value: Value,
}

impl Tagged {
    pub fn new(tag: impl Into<String>, value: Value) -> Self {
        let tag = tag.into();
        let tag = tag.strip_prefix('!').map(str::to_string).unwrap_or(tag);
        Tagged { tag, value }
    }
}

/// A numeric value: integer, float, or one of the IEEE special values.
///
/// `Unsigned` only carries integers above `i64::MAX`; everything that fits an
/// `i64` is an `Integer`.
///
/// # Examples
///
/// ```rust
/// use ndserial::Number;
///
/// assert_eq!(Number::from(u64::MAX).as_u64(), Some(u64::MAX));
/// assert_eq!(Number::from(7u64), Number::Integer(7));
/// assert!(Number::from(f64::NAN).is_special());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Number {
    Integer(i64),
    Unsigned(u64),
    Float(f64),
    Infinity,
    NegativeInfinity,
    NaN,
}

impl Number {
    #[inline]
    #[must_use]
    pub const fn is_integer(&self) -> bool {
        matches!(self, Number::Integer(_) | Number::Unsigned(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_float(&self) -> bool {
        matches!(self, Number::Float(_))
    }

    /// Returns `true` if this is a special value (Infinity, -Infinity, or NaN).
    #[inline]
    #[must_use]
    pub const fn is_special(&self) -> bool {
        matches!(
            self,
            Number::Infinity | Number::NegativeInfinity | Number::NaN
        )
    }

    /// Converts this number to an `i64` if it is integral and in range.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ndserial::Number;
    ///
    /// assert_eq!(Number::Integer(42).as_i64(), Some(42));
    /// assert_eq!(Number::Float(-8.0).as_i64(), Some(-8));
    /// assert_eq!(Number::Float(0.5).as_i64(), None);
    /// assert_eq!(Number::Unsigned(u64::MAX).as_i64(), None);
    /// ```
    #[inline]
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Number::Integer(i) => Some(*i),
            Number::Unsigned(u) => i64::try_from(*u).ok(),
            Number::Float(f) => {
                if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 {
                    Some(*f as i64)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Number::Integer(i) => u64::try_from(*i).ok(),
            Number::Unsigned(u) => Some(*u),
            Number::Float(f) => {
                if f.fract() == 0.0 && *f >= 0.0 && *f < u64::MAX as f64 {
                    Some(*f as u64)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Converts this number to an `f64`. Always succeeds.
    #[inline]
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        match self {
            Number::Integer(i) => *i as f64,
            Number::Unsigned(u) => *u as f64,
            Number::Float(f) => *f,
            Number::Infinity => f64::INFINITY,
            Number::NegativeInfinity => f64::NEG_INFINITY,
            Number::NaN => f64::NAN,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Integer(i) => write!(f, "{}", i),
            Number::Unsigned(u) => write!(f, "{}", u),
            Number::Float(fl) => write!(f, "{}", fl),
            Number::Infinity => write!(f, "Infinity"),
            Number::NegativeInfinity => write!(f, "-Infinity"),
            Number::NaN => write!(f, "NaN"),
        }
    }
}

macro_rules! number_from_small_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Number {
                fn from(value: $t) -> Self {
                    Number::Integer(value as i64)
                }
            }
        )*
    };
}

number_from_small_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for Number {
    fn from(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(i) => Number::Integer(i),
            Err(_) => Number::Unsigned(value),
        }
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        if value.is_nan() {
            Number::NaN
        } else if value == f64::INFINITY {
            Number::Infinity
        } else if value == f64::NEG_INFINITY {
            Number::NegativeInfinity
        } else {
            Number::Float(value)
        }
    }
}

impl From<f32> for Number {
    /// Widens through the shortest decimal form so `0.1f32` becomes `0.1`, not
    /// `0.10000000149011612`. Parsing that decimal back as `f32` is exact.
    fn from(value: f32) -> Self {
        if !value.is_finite() {
            return Number::from(value as f64);
        }
        let widened = value.to_string().parse::<f64>().unwrap_or(value as f64);
        Number::Float(widened)
    }
}

impl Value {
    /// Returns `true` if the value is null.
    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    #[inline]
    #[must_use]
    pub const fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_number(&self) -> bool {
        matches!(self, Value::Number(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    /// Returns `true` for the kinds every format can represent without a codec.
    ///
    /// Only the node itself is inspected, not its children.
    #[inline]
    #[must_use]
    pub const fn is_native(&self) -> bool {
        matches!(
            self,
            Value::Null
                | Value::Bool(_)
                | Value::Number(_)
                | Value::String(_)
                | Value::Array(_)
                | Value::Object(_)
        )
    }

    /// Short name of the value's kind, used in error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            #[cfg(feature = "ndarray")]
            Value::NdArray(_) => "ndarray",
            #[cfg(feature = "sparse")]
            Value::Sparse(_) => "sparse matrix",
            Value::Tagged(_) => "tagged value",
        }
    }

    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// If the value is an integer (or a whole-number float) fitting `i64`, returns it.
    #[inline]
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Number(n) => n.as_u64(),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(n.as_f64()),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(arr) => Some(arr),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    #[cfg(feature = "ndarray")]
    #[inline]
    #[must_use]
    pub fn as_ndarray(&self) -> Option<&NdArray> {
        match self {
            Value::NdArray(arr) => Some(arr),
            _ => None,
        }
    }

    #[cfg(feature = "sparse")]
    #[inline]
    #[must_use]
    pub fn as_sparse(&self) -> Option<&SparseMatrix> {
        match self {
            Value::Sparse(m) => Some(m),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_tagged(&self) -> Option<&Tagged> {
        match self {
            Value::Tagged(t) => Some(t),
            _ => None,
        }
    }

    /// Looks up `key` if the value is an object.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|obj| obj.get(key))
    }

    /// Wraps `value` in a [`Tagged`] node.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ndserial::Value;
    ///
    /// let widget = Value::tagged("Widget", Value::from(3));
    /// assert_eq!(widget.as_tagged().map(|t| t.tag.as_str()), Some("Widget"));
    /// ```
    pub fn tagged(tag: impl Into<String>, value: Value) -> Self {
        Value::Tagged(Box::new(Tagged::new(tag, value)))
    }

    /// First node, depth-first, whose kind is not native.
    pub(crate) fn find_non_native(&self) -> Option<&Value> {
        match self {
            Value::Array(items) => items.iter().find_map(Value::find_non_native),
            Value::Object(map) => map.values().find_map(Value::find_non_native),
            v if v.is_native() => None,
            other => Some(other),
        }
    }

    /// Sorts the keys of every object in the tree.
    pub(crate) fn sort_keys_recursive(&mut self) {
        match self {
            Value::Array(items) => items.iter_mut().for_each(Value::sort_keys_recursive),
            Value::Object(map) => {
                map.sort_keys();
                map.iter_mut().for_each(|(_, v)| v.sort_keys_recursive());
            }
            Value::Tagged(t) => t.value.sort_keys_recursive(),
            _ => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Array(arr) => {
                write!(
                    f,
                    "[{}]",
                    arr.iter()
                        .map(|v| v.to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            }
            Value::Object(obj) => {
                write!(
                    f,
                    "{{{}}}",
                    obj.iter()
                        .map(|(k, v)| format!("{:?}: {}", k, v))
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            }
            #[cfg(feature = "ndarray")]
            Value::NdArray(arr) => write!(f, "ndarray<{}>{:?}", arr.dtype(), arr.shape()),
            #[cfg(feature = "sparse")]
            Value::Sparse(m) => {
                let (rows, cols) = m.shape();
                write!(f, "{}<{}>[{}, {}]", m.format(), m.dtype(), rows, cols)
            }
            Value::Tagged(t) => write!(f, "!{} {}", t.tag, t.value),
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(Number::Integer(i)) => serializer.serialize_i64(*i),
            Value::Number(Number::Unsigned(u)) => serializer.serialize_u64(*u),
            Value::Number(Number::Float(f)) => serializer.serialize_f64(*f),
            Value::Number(Number::Infinity) => serializer.serialize_f64(f64::INFINITY),
            Value::Number(Number::NegativeInfinity) => {
                serializer.serialize_f64(f64::NEG_INFINITY)
            }
            Value::Number(Number::NaN) => serializer.serialize_f64(f64::NAN),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(arr) => {
                use serde::ser::SerializeSeq;
                let mut seq = serializer.serialize_seq(Some(arr.len()))?;
                for element in arr {
                    seq.serialize_element(element)?;
                }
                seq.end()
            }
            Value::Object(obj) => {
                use serde::ser::SerializeMap;
                let mut map = serializer.serialize_map(Some(obj.len()))?;
                for (k, v) in obj.iter() {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            #[cfg(feature = "ndarray")]
            Value::NdArray(arr) => arr.serialize(serializer),
            #[cfg(feature = "sparse")]
            Value::Sparse(m) => m.serialize(serializer),
            Value::Tagged(t) => Err(serde::ser::Error::custom(format!(
                "tagged value `!{}` has no generic representation",
                t.tag
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct ValueVisitor;

        impl<'de> Visitor<'de> for ValueVisitor {
            type Value = Value;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("any valid document value")
            }

            fn visit_bool<E>(self, value: bool) -> Result<Self::Value, E> {
                Ok(Value::Bool(value))
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E> {
                Ok(Value::Number(Number::Integer(value)))
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E> {
                Ok(Value::Number(Number::from(value)))
            }

            fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E> {
                Ok(Value::Number(Number::from(value)))
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E> {
                Ok(Value::String(value.to_string()))
            }

            fn visit_string<E>(self, value: String) -> Result<Self::Value, E> {
                Ok(Value::String(value))
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E> {
                Ok(Value::Null)
            }

            fn visit_none<E>(self) -> Result<Self::Value, E> {
                Ok(Value::Null)
            }

            fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
            where
                D: Deserializer<'de>,
            {
                Deserialize::deserialize(deserializer)
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: de::SeqAccess<'de>,
            {
                let mut vec = Vec::new();
                while let Some(elem) = seq.next_element()? {
                    vec.push(elem);
                }
                Ok(Value::Array(vec))
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: de::MapAccess<'de>,
            {
                let mut values = Map::new();
                while let Some((key, value)) = map.next_entry()? {
                    values.insert(key, value);
                }
                Ok(Value::Object(values))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

impl TryFrom<Value> for i64 {
    type Error = crate::Error;

    fn try_from(value: Value) -> crate::Result<Self> {
        value
            .as_i64()
            .ok_or_else(|| crate::Error::custom(format!("expected integer, found {}", value.kind())))
    }
}

impl TryFrom<Value> for f64 {
    type Error = crate::Error;

    fn try_from(value: Value) -> crate::Result<Self> {
        value
            .as_f64()
            .ok_or_else(|| crate::Error::custom(format!("expected number, found {}", value.kind())))
    }
}

impl TryFrom<Value> for bool {
    type Error = crate::Error;

    fn try_from(value: Value) -> crate::Result<Self> {
        value
            .as_bool()
            .ok_or_else(|| crate::Error::custom(format!("expected bool, found {}", value.kind())))
    }
}

impl TryFrom<Value> for String {
    type Error = crate::Error;

    fn try_from(value: Value) -> crate::Result<Self> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(crate::Error::custom(format!(
                "expected string, found {}",
                other.kind()
            ))),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

macro_rules! value_from_number {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(value: $t) -> Self {
                    Value::Number(Number::from(value))
                }
            }
        )*
    };
}

value_from_number!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

impl From<Number> for Value {
    fn from(value: Number) -> Self {
        Value::Number(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(value)
    }
}

impl From<Map> for Value {
    fn from(value: Map) -> Self {
        Value::Object(value)
    }
}

impl From<Tagged> for Value {
    fn from(value: Tagged) -> Self {
        Value::Tagged(Box::new(value))
    }
}

#[cfg(feature = "ndarray")]
impl From<NdArray> for Value {
    fn from(value: NdArray) -> Self {
        Value::NdArray(value)
    }
}

#[cfg(feature = "sparse")]
impl From<SparseMatrix> for Value {
    fn from(value: SparseMatrix) -> Self {
        Value::Sparse(value)
    }
}
