//! Dense numeric arrays.
//!
//! [`NdArray`] is a dynamically-typed wrapper over [`ndarray::ArrayD`], one
//! variant per [`DType`]. It is what the array codec reconstructs from a
//! tagged mapping and what it flattens back into a nested list.
//!
//! ```rust
//! use ndarray::array;
//! use ndserial::{DType, NdArray};
//!
//! let arr = NdArray::from(array![[1.0f32, 2.0], [3.0, 4.0]].into_dyn());
//! assert_eq!(arr.dtype(), DType::Float32);
//! assert_eq!(arr.shape(), &[2, 2]);
//!
//! let ints = arr.cast(DType::Int64);
//! assert_eq!(ints.dtype(), DType::Int64);
//! ```

use crate::{DType, Error, Number, Result, Value};
use ndarray::{Array1, ArrayD, ArrayViewD, Axis, IxDyn};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::Debug;

/// A dense, rectangular array of one of the supported element types.
#[derive(Clone, Debug, PartialEq)]
pub enum NdArray {
    Bool(ArrayD<bool>),
    Int8(ArrayD<i8>),
    Int16(ArrayD<i16>),
    Int32(ArrayD<i32>),
    Int64(ArrayD<i64>),
    UInt8(ArrayD<u8>),
    UInt16(ArrayD<u16>),
    UInt32(ArrayD<u32>),
    UInt64(ArrayD<u64>),
    Float32(ArrayD<f32>),
    Float64(ArrayD<f64>),
}

/// Runs `$body` with `$inner` bound to the typed array inside an [`NdArray`].
macro_rules! dispatch {
    ($array:expr, $inner:ident => $body:expr) => {
        match $array {
            NdArray::Bool($inner) => $body,
            NdArray::Int8($inner) => $body,
            NdArray::Int16($inner) => $body,
            NdArray::Int32($inner) => $body,
            NdArray::Int64($inner) => $body,
            NdArray::UInt8($inner) => $body,
            NdArray::UInt16($inner) => $body,
            NdArray::UInt32($inner) => $body,
            NdArray::UInt64($inner) => $body,
            NdArray::Float32($inner) => $body,
            NdArray::Float64($inner) => $body,
        }
    };
}

/// Runs `$body` with `$t` bound to the Rust element type of a [`DType`].
macro_rules! with_element {
    ($dtype:expr, $t:ident => $body:expr) => {
        match $dtype {
            DType::Bool => {
                type $t = bool;
                $body
            }
            DType::Int8 => {
                type $t = i8;
                $body
            }
            DType::Int16 => {
                type $t = i16;
                $body
            }
            DType::Int32 => {
                type $t = i32;
                $body
            }
            DType::Int64 => {
                type $t = i64;
                $body
            }
            DType::UInt8 => {
                type $t = u8;
                $body
            }
            DType::UInt16 => {
                type $t = u16;
                $body
            }
            DType::UInt32 => {
                type $t = u32;
                $body
            }
            DType::UInt64 => {
                type $t = u64;
                $body
            }
            DType::Float32 => {
                type $t = f32;
                $body
            }
            DType::Float64 => {
                type $t = f64;
                $body
            }
        }
    };
}

pub(crate) use dispatch;
pub(crate) use with_element;

/// A Rust scalar type that can live inside an [`NdArray`].
pub trait Element: Copy + PartialEq + Debug + Default + Send + Sync + 'static {
    const DTYPE: DType;

    /// Converts to a plain document scalar.
    fn into_value(self) -> Value;

    /// Reads a document scalar, returning `None` if it does not fit this type.
    fn from_value(value: &Value) -> Option<Self>;

    fn wrap(array: ArrayD<Self>) -> NdArray;

    fn peel(array: &NdArray) -> Option<&ArrayD<Self>>;

    /// Sum used when sparse duplicates collapse; logical or for `bool`.
    fn accumulate(self, other: Self) -> Self;

    fn to_f64(self) -> f64;

    fn to_i128(self) -> i128;

    /// `as`-cast semantics from a float source.
    fn cast_f64(value: f64) -> Self;

    /// `as`-cast semantics from an integer source.
    fn cast_i128(value: i128) -> Self;

    #[inline]
    fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

macro_rules! int_element {
    ($t:ty, $dtype:ident) => {
        impl Element for $t {
            const DTYPE: DType = DType::$dtype;

            fn into_value(self) -> Value {
                Value::Number(Number::from(self))
            }

            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::Number(Number::Integer(i)) => <$t>::try_from(*i).ok(),
                    Value::Number(Number::Unsigned(u)) => <$t>::try_from(*u).ok(),
                    Value::Number(Number::Float(f)) if f.fract() == 0.0 => {
                        let whole = *f as i128;
                        if whole as f64 == *f {
                            <$t>::try_from(whole).ok()
                        } else {
                            None
                        }
                    }
                    Value::Bool(b) => Some(<$t>::from(*b)),
                    _ => None,
                }
            }

            fn wrap(array: ArrayD<Self>) -> NdArray {
                NdArray::$dtype(array)
            }

            fn peel(array: &NdArray) -> Option<&ArrayD<Self>> {
                match array {
                    NdArray::$dtype(inner) => Some(inner),
                    _ => None,
                }
            }

            fn accumulate(self, other: Self) -> Self {
                self.wrapping_add(other)
            }

            fn to_f64(self) -> f64 {
                self as f64
            }

            fn to_i128(self) -> i128 {
                self as i128
            }

            fn cast_f64(value: f64) -> Self {
                value as $t
            }

            fn cast_i128(value: i128) -> Self {
                value as $t
            }
        }
    };
}

int_element!(i8, Int8);
int_element!(i16, Int16);
int_element!(i32, Int32);
int_element!(i64, Int64);
int_element!(u8, UInt8);
int_element!(u16, UInt16);
int_element!(u32, UInt32);
int_element!(u64, UInt64);

macro_rules! float_element {
    ($t:ty, $dtype:ident) => {
        impl Element for $t {
            const DTYPE: DType = DType::$dtype;

            fn into_value(self) -> Value {
                Value::Number(Number::from(self))
            }

            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::Number(n) => Some(n.as_f64() as $t),
                    Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
                    // JSON has no NaN literal; it is written as null.
                    Value::Null => Some(<$t>::NAN),
                    _ => None,
                }
            }

            fn wrap(array: ArrayD<Self>) -> NdArray {
                NdArray::$dtype(array)
            }

            fn peel(array: &NdArray) -> Option<&ArrayD<Self>> {
                match array {
                    NdArray::$dtype(inner) => Some(inner),
                    _ => None,
                }
            }

            fn accumulate(self, other: Self) -> Self {
                self + other
            }

            fn to_f64(self) -> f64 {
                self as f64
            }

            fn to_i128(self) -> i128 {
                self as i128
            }

            fn cast_f64(value: f64) -> Self {
                value as $t
            }

            fn cast_i128(value: i128) -> Self {
                value as $t
            }
        }
    };
}

float_element!(f32, Float32);
float_element!(f64, Float64);

impl Element for bool {
    const DTYPE: DType = DType::Bool;

    fn into_value(self) -> Value {
        Value::Bool(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => match n.as_i64() {
                Some(0) => Some(false),
                Some(1) => Some(true),
                _ => None,
            },
            _ => None,
        }
    }

    fn wrap(array: ArrayD<Self>) -> NdArray {
        NdArray::Bool(array)
    }

    fn peel(array: &NdArray) -> Option<&ArrayD<Self>> {
        match array {
            NdArray::Bool(inner) => Some(inner),
            _ => None,
        }
    }

    fn accumulate(self, other: Self) -> Self {
        self || other
    }

    fn to_f64(self) -> f64 {
        if self {
            1.0
        } else {
            0.0
        }
    }

    fn to_i128(self) -> i128 {
        i128::from(self)
    }

    fn cast_f64(value: f64) -> Self {
        value != 0.0
    }

    fn cast_i128(value: i128) -> Self {
        value != 0
    }
}

impl<T: Element> From<ArrayD<T>> for NdArray {
    fn from(array: ArrayD<T>) -> Self {
        T::wrap(array)
    }
}

impl NdArray {
    /// Creates an array of `shape` filled with zeros (`false` for `bool`).
    #[must_use]
    pub fn zeros(dtype: DType, shape: &[usize]) -> Self {
        with_element!(dtype, T => T::wrap(ArrayD::<T>::default(IxDyn(shape))))
    }

    /// Builds a one-dimensional array from a vector.
    pub fn from_vec<T: Element>(values: Vec<T>) -> Self {
        T::wrap(Array1::from(values).into_dyn())
    }

    /// Builds an array of `shape` from row-major `values`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] if `values.len()` differs from the shape's size.
    pub fn from_shape_vec<T: Element>(shape: &[usize], values: Vec<T>) -> Result<Self> {
        ArrayD::from_shape_vec(IxDyn(shape), values)
            .map(T::wrap)
            .map_err(|e| Error::malformed(format!("shape {:?}: {}", shape, e)))
    }

    #[must_use]
    pub fn dtype(&self) -> DType {
        dispatch!(self, a => element_dtype(a))
    }

    #[must_use]
    pub fn shape(&self) -> &[usize] {
        dispatch!(self, a => a.shape())
    }

    #[must_use]
    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    /// Total number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        dispatch!(self, a => a.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrows the typed array if the element type is `T`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ndserial::NdArray;
    ///
    /// let arr = NdArray::from_vec(vec![1i32, 2, 3]);
    /// assert!(arr.as_array::<i32>().is_some());
    /// assert!(arr.as_array::<f64>().is_none());
    /// ```
    #[must_use]
    pub fn as_array<T: Element>(&self) -> Option<&ArrayD<T>> {
        T::peel(self)
    }

    /// Elements in row-major order as `f64`.
    #[must_use]
    pub fn to_f64_vec(&self) -> Vec<f64> {
        dispatch!(self, a => a.iter().map(|v| v.to_f64()).collect())
    }

    /// Converts to another element type with `as`-cast semantics.
    #[must_use]
    pub fn cast(&self, dtype: DType) -> NdArray {
        if self.dtype() == dtype {
            return self.clone();
        }
        let from_float = self.dtype().is_float();
        with_element!(dtype, T => {
            let converted: ArrayD<T> = dispatch!(self, a => a.mapv(|v| {
                if from_float {
                    T::cast_f64(v.to_f64())
                } else {
                    T::cast_i128(v.to_i128())
                }
            }));
            T::wrap(converted)
        })
    }

    /// Converts to a nested list of plain scalars (a bare scalar for rank 0).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ndserial::{value, NdArray};
    ///
    /// let arr = NdArray::from_shape_vec(&[2, 2], vec![1i64, 2, 3, 4]).unwrap();
    /// assert_eq!(arr.to_nested(), value!([[1, 2], [3, 4]]));
    /// ```
    #[must_use]
    pub fn to_nested(&self) -> Value {
        dispatch!(self, a => nest(a.view()))
    }

    /// Rebuilds an array of `dtype` from a nested list.
    ///
    /// When `shape` is given it is authoritative (it is the only way to express
    /// zero-length axes); otherwise the shape is inferred from the nesting.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] for ragged payloads, payloads that disagree
    /// with `shape`, or elements that do not fit `dtype`.
    pub fn from_nested(payload: &Value, dtype: DType, shape: Option<&[usize]>) -> Result<Self> {
        let shape = match shape {
            Some(shape) => shape.to_vec(),
            None => infer_shape(payload),
        };
        element_count(&shape)?;
        let mut leaves = Vec::new();
        flatten(payload, &shape, 0, &mut leaves)?;
        with_element!(dtype, T => {
            let values = leaves
                .iter()
                .map(|leaf| {
                    T::from_value(leaf).ok_or_else(|| {
                        Error::malformed(format!("{} is not a valid {} element", leaf, dtype))
                    })
                })
                .collect::<Result<Vec<T>>>()?;
            NdArray::from_shape_vec(&shape, values)
        })
    }

    /// Indices (as `usize`) held by an integer array, or a float array of whole numbers.
    pub(crate) fn to_indices(&self, what: &str) -> Result<Vec<usize>> {
        if self.dtype() == DType::Bool {
            return Err(Error::malformed(format!("{} indices must be numeric", what)));
        }
        let from_float = self.dtype().is_float();
        dispatch!(self, a => a
            .iter()
            .map(|v| {
                if from_float && v.to_f64().fract() != 0.0 {
                    return Err(Error::malformed(format!("{} index {:?} is not whole", what, v)));
                }
                usize::try_from(v.to_i128())
                    .map_err(|_| Error::malformed(format!("negative {} index {}", what, v.to_i128())))
            })
            .collect())
    }
}

fn element_dtype<T: Element>(_: &ArrayD<T>) -> DType {
    T::DTYPE
}

fn nest<T: Element>(view: ArrayViewD<'_, T>) -> Value {
    if view.ndim() == 0 {
        return view.iter().next().map_or(Value::Null, |v| v.into_value());
    }
    Value::Array(view.axis_iter(Axis(0)).map(nest).collect())
}

/// Number of elements `shape` describes, or an error if it overflows `usize`.
fn element_count(shape: &[usize]) -> Result<usize> {
    shape
        .iter()
        .try_fold(1usize, |count, &dim| count.checked_mul(dim))
        .ok_or_else(|| Error::malformed(format!("shape {:?} overflows the element count", shape)))
}

fn infer_shape(payload: &Value) -> Vec<usize> {
    let mut shape = Vec::new();
    let mut cursor = payload;
    while let Value::Array(items) = cursor {
        shape.push(items.len());
        match items.first() {
            Some(first) => cursor = first,
            None => break,
        }
    }
    shape
}

fn flatten<'a>(
    node: &'a Value,
    shape: &[usize],
    depth: usize,
    out: &mut Vec<&'a Value>,
) -> Result<()> {
    if depth == shape.len() {
        if node.is_array() {
            return Err(Error::malformed(format!(
                "array payload nests deeper than its shape {:?}",
                shape
            )));
        }
        out.push(node);
        return Ok(());
    }
    match node {
        Value::Array(items) if items.len() == shape[depth] => {
            for item in items {
                flatten(item, shape, depth + 1, out)?;
            }
            Ok(())
        }
        Value::Array(items) => Err(Error::malformed(format!(
            "non-rectangular array payload: axis {} has length {}, expected {}",
            depth,
            items.len(),
            shape[depth]
        ))),
        other => Err(Error::malformed(format!(
            "expected a list at axis {} of shape {:?}, found {}",
            depth,
            shape,
            other.kind()
        ))),
    }
}

impl Serialize for NdArray {
    /// Serializes as the tagged mapping the array codec writes.
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        crate::codec::array::tag(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for NdArray {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        match value {
            Value::NdArray(arr) => Ok(arr),
            Value::Object(map) => {
                crate::codec::array::untag(&map, DType::Float64)
                    .map_err(serde::de::Error::custom)?
                    .into_option()
                    .ok_or_else(|| serde::de::Error::custom("expected a tagged ndarray mapping"))
            }
            other => Err(serde::de::Error::custom(format!(
                "expected a tagged ndarray mapping, found {}",
                other.kind()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_nested_roundtrip_preserves_dtype_and_shape() {
        let arr = NdArray::from(array![[859.0f32, 859.0], [217.0, 106.0], [302.0, 140.0]].into_dyn());
        let nested = arr.to_nested();
        let back = NdArray::from_nested(&nested, DType::Float32, None).unwrap();
        assert_eq!(back, arr);
        assert_eq!(back.shape(), &[3, 2]);
    }

    #[test]
    fn test_overflowing_shape_is_malformed() {
        let empty = Value::Array(Vec::new());
        let err = NdArray::from_nested(&empty, DType::Int8, Some(&[usize::MAX / 2, 8])).unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
        let err = NdArray::from_nested(&empty, DType::Int8, Some(&[usize::MAX, 2])).unwrap_err();
        assert!(err.to_string().contains("overflows"));
    }

    #[test]
    fn test_huge_declared_shape_does_not_allocate() {
        let payload = Value::Array(vec![Value::from(1), Value::from(2)]);
        let err = NdArray::from_nested(&payload, DType::Int64, Some(&[1_000_000_000_000])).unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
    }

    #[test]
    fn test_rank_zero() {
        let arr = NdArray::from_shape_vec(&[], vec![7i16]).unwrap();
        assert_eq!(arr.to_nested(), Value::from(7));
        let back = NdArray::from_nested(&Value::from(7), DType::Int16, Some(&[])).unwrap();
        assert_eq!(back, arr);
    }

    #[test]
    fn test_zero_length_axis_needs_declared_shape() {
        let arr = NdArray::zeros(DType::Int32, &[0, 3]);
        let nested = arr.to_nested();
        assert_eq!(nested, Value::Array(vec![]));
        let back = NdArray::from_nested(&nested, DType::Int32, Some(&[0, 3])).unwrap();
        assert_eq!(back.shape(), &[0, 3]);
    }

    #[test]
    fn test_ragged_payload_is_malformed() {
        let payload = crate::value!([[1, 2], [3]]);
        let err = NdArray::from_nested(&payload, DType::Int64, None).unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
    }

    #[test]
    fn test_shape_mismatch_is_malformed() {
        let payload = crate::value!([1, 2, 3]);
        assert!(NdArray::from_nested(&payload, DType::Int64, Some(&[2])).is_err());
        assert!(NdArray::from_nested(&payload, DType::Int64, Some(&[3, 1])).is_err());
    }

    #[test]
    fn test_out_of_range_element() {
        let payload = crate::value!([1, 300]);
        assert!(NdArray::from_nested(&payload, DType::UInt8, None).is_err());
        let fractional = crate::value!([1.5]);
        assert!(NdArray::from_nested(&fractional, DType::Int32, None).is_err());
    }

    #[test]
    fn test_cast_semantics() {
        let arr = NdArray::from_vec(vec![1.7f64, -2.2, 0.0]);
        let ints = arr.cast(DType::Int32);
        assert_eq!(ints, NdArray::from_vec(vec![1i32, -2, 0]));
        let flags = arr.cast(DType::Bool);
        assert_eq!(flags, NdArray::from_vec(vec![true, true, false]));
    }

    #[test]
    fn test_bool_array_nested() {
        let arr = NdArray::from_vec(vec![true, false]);
        assert_eq!(arr.to_nested(), crate::value!([true, false]));
    }

    #[test]
    fn test_uint64_extremes_survive() {
        let arr = NdArray::from_vec(vec![u64::MAX, 0]);
        let back = NdArray::from_nested(&arr.to_nested(), DType::UInt64, None).unwrap();
        assert_eq!(back, arr);
    }

    #[test]
    fn test_indices() {
        let arr = NdArray::from_vec(vec![10i64, 20, 30]);
        assert_eq!(arr.to_indices("row").unwrap(), vec![10, 20, 30]);
        assert!(NdArray::from_vec(vec![-1i64]).to_indices("row").is_err());
        assert_eq!(NdArray::from_vec(vec![1.0f64]).to_indices("row").unwrap(), vec![1]);
        assert!(NdArray::from_vec(vec![1.5f64]).to_indices("row").is_err());
        assert!(NdArray::from_vec(vec![true]).to_indices("row").is_err());
    }

    #[test]
    fn test_serde_through_tagged_mapping() {
        let arr = NdArray::from_vec(vec![1u8, 2, 3]);
        let json = serde_json::to_string(&arr).unwrap();
        assert!(json.contains("\"__ndarray__\""));
        let back: NdArray = serde_json::from_str(&json).unwrap();
        assert_eq!(back, arr);
    }
}
