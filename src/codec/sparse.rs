//! Sparse matrix codec.
//!
//! Writes a [`SparseMatrix`](crate::SparseMatrix) as
//!
//! ```text
//! {"__sparse__": true, "format": "csr", "dtype": "float64", "shape": [m, n],
//!  "data": <tagged array>, "row": <tagged array>, "col": <tagged array>}
//! ```
//!
//! The coordinate triplets are themselves tagged arrays. On decode they are
//! accepted as already-decoded arrays, tagged mappings, or plain lists.
//! A mapping with the marker but no `dtype` is left untouched: it may be an
//! intentionally untyped document.

use super::{Decoder, Encoder, Outcome, DTYPE_FIELD, SPARSE_TAG};
use crate::options::{DecodeOptions, EncodeOptions};
use crate::{Map, Result, Value};
#[cfg(feature = "sparse")]
use {
    super::{
        array, read_dtype, read_shape, shape_value, COL_FIELD, DATA_FIELD, FORMAT_FIELD,
        ROW_FIELD, SHAPE_FIELD,
    },
    crate::{DType, Error, NdArray, SparseFormat, SparseMatrix},
};

/// The built-in codec for `__sparse__` mappings.
#[derive(Clone, Copy, Debug, Default)]
pub struct SparseCodec;

impl Encoder for SparseCodec {
    fn try_encode(&self, value: &Value, options: &EncodeOptions) -> Result<Outcome<Value>> {
        match value {
            #[cfg(feature = "sparse")]
            Value::Sparse(m) => Ok(Outcome::Matched(encode_sparse(m, options))),
            _ => {
                let _ = options;
                Ok(Outcome::NoMatch)
            }
        }
    }
}

impl Decoder for SparseCodec {
    fn try_decode(&self, map: &Map, options: &DecodeOptions) -> Result<Outcome<Value>> {
        if map.get(SPARSE_TAG) != Some(&Value::Bool(true)) {
            return Ok(Outcome::NoMatch);
        }
        if !map.contains_key(DTYPE_FIELD) {
            tracing::debug!("sparse mapping without `dtype` left as is");
            return Ok(Outcome::NoMatch);
        }
        decode_sparse(map, options)
    }
}

#[cfg(feature = "sparse")]
fn decode_sparse(map: &Map, options: &DecodeOptions) -> Result<Outcome<Value>> {
    Ok(untag(map, options)?.map(Value::Sparse))
}

#[cfg(not(feature = "sparse"))]
fn decode_sparse(_map: &Map, _options: &DecodeOptions) -> Result<Outcome<Value>> {
    Err(crate::Error::missing_dependency("sparse matrix", "sparse"))
}

#[cfg(feature = "sparse")]
fn encode_sparse(m: &SparseMatrix, options: &EncodeOptions) -> Value {
    let cast;
    let m = match options.element_type {
        Some(dtype) if dtype != m.dtype() => {
            cast = m.astype(dtype);
            &cast
        }
        _ => m,
    };
    if options.primitive {
        m.to_dense().to_nested()
    } else {
        tag(m)
    }
}

/// The tagged mapping for `m`, triplets included as tagged arrays.
#[cfg(feature = "sparse")]
pub(crate) fn tag(m: &SparseMatrix) -> Value {
    let (rows, cols) = m.shape();
    let mut map = Map::with_capacity(7);
    map.insert(SPARSE_TAG.to_string(), Value::Bool(true));
    map.insert(FORMAT_FIELD.to_string(), Value::from(m.format().as_str()));
    map.insert(DTYPE_FIELD.to_string(), Value::from(m.dtype().as_str()));
    map.insert(SHAPE_FIELD.to_string(), shape_value(&[rows, cols]));
    map.insert(DATA_FIELD.to_string(), array::tag(m.data()));
    map.insert(ROW_FIELD.to_string(), array::tag(&index_array(m.row())));
    map.insert(COL_FIELD.to_string(), array::tag(&index_array(m.col())));
    Value::Object(map)
}

#[cfg(feature = "sparse")]
fn index_array(indices: &[usize]) -> NdArray {
    NdArray::from_vec(indices.iter().map(|&i| i as i64).collect())
}

/// Rebuilds a matrix from a tagged mapping, `NoMatch` if `map` is not one.
#[cfg(feature = "sparse")]
pub(crate) fn untag(map: &Map, options: &DecodeOptions) -> Result<Outcome<SparseMatrix>> {
    if map.get(SPARSE_TAG) != Some(&Value::Bool(true)) {
        return Ok(Outcome::NoMatch);
    }
    let Some(dtype) = read_dtype(map)? else {
        return Ok(Outcome::NoMatch);
    };
    let format: SparseFormat = match required(map, FORMAT_FIELD)? {
        Value::String(label) => label.parse()?,
        other => {
            return Err(Error::malformed(format!(
                "sparse `format` must be a string, found {}",
                other.kind()
            )))
        }
    };
    let shape = match read_shape(required(map, SHAPE_FIELD)?)?.as_slice() {
        [rows, cols] => (*rows, *cols),
        other => {
            return Err(Error::malformed(format!(
                "sparse shape must have two dimensions, got {:?}",
                other
            )))
        }
    };
    let data = triplet_array(required(map, DATA_FIELD)?, DATA_FIELD, dtype, options)?;
    let row = triplet_array(required(map, ROW_FIELD)?, ROW_FIELD, DType::Int64, options)?
        .to_indices(ROW_FIELD)?;
    let col = triplet_array(required(map, COL_FIELD)?, COL_FIELD, DType::Int64, options)?
        .to_indices(COL_FIELD)?;
    SparseMatrix::from_triplets(shape, row, col, data.cast(dtype), format).map(Outcome::Matched)
}

#[cfg(feature = "sparse")]
fn required<'a>(map: &'a Map, field: &str) -> Result<&'a Value> {
    map.get(field)
        .ok_or_else(|| Error::malformed(format!("sparse mapping is missing `{}`", field)))
}

#[cfg(feature = "sparse")]
fn triplet_array(
    value: &Value,
    field: &str,
    dtype: DType,
    options: &DecodeOptions,
) -> Result<NdArray> {
    match value {
        Value::NdArray(arr) => Ok(arr.clone()),
        Value::Object(inner) => array::untag(inner, options.default_element_type)?
            .into_option()
            .ok_or_else(|| Error::malformed(format!("sparse `{}` is not a tagged array", field))),
        Value::Array(_) => NdArray::from_nested(value, dtype, None),
        other => Err(Error::malformed(format!(
            "sparse `{}` must be an array, found {}",
            field,
            other.kind()
        ))),
    }
}
