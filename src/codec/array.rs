//! Dense array codec.
//!
//! Writes an [`NdArray`](crate::NdArray) as
//! `{"__ndarray__": <nested payload>, "dtype": <label>, "shape": [..]}` and
//! rebuilds it from that mapping. The declared shape is authoritative when
//! present; without it the shape is inferred from the nesting, which cannot
//! express zero-length axes.

use super::{Decoder, Encoder, Outcome, ARRAY_TAG};
use crate::options::{DecodeOptions, EncodeOptions};
use crate::{Map, Result, Value};
#[cfg(feature = "ndarray")]
use {
    super::{read_dtype, read_shape, shape_value, DTYPE_FIELD, SHAPE_FIELD},
    crate::{DType, NdArray},
};

/// The built-in codec for `__ndarray__` mappings.
#[derive(Clone, Copy, Debug, Default)]
pub struct ArrayCodec;

impl Encoder for ArrayCodec {
    fn try_encode(&self, value: &Value, options: &EncodeOptions) -> Result<Outcome<Value>> {
        match value {
            #[cfg(feature = "ndarray")]
            Value::NdArray(arr) => Ok(Outcome::Matched(encode_array(arr, options))),
            _ => {
                let _ = options;
                Ok(Outcome::NoMatch)
            }
        }
    }
}

impl Decoder for ArrayCodec {
    fn try_decode(&self, map: &Map, options: &DecodeOptions) -> Result<Outcome<Value>> {
        if !has_marker(map) {
            return Ok(Outcome::NoMatch);
        }
        decode_array(map, options)
    }
}

#[cfg(feature = "ndarray")]
fn decode_array(map: &Map, options: &DecodeOptions) -> Result<Outcome<Value>> {
    Ok(untag(map, options.default_element_type)?.map(Value::NdArray))
}

#[cfg(not(feature = "ndarray"))]
fn decode_array(_map: &Map, _options: &DecodeOptions) -> Result<Outcome<Value>> {
    Err(crate::Error::missing_dependency("ndarray", "ndarray"))
}

/// The marker must hold a payload: a list, or a scalar for rank 0.
fn has_marker(map: &Map) -> bool {
    matches!(
        map.get(ARRAY_TAG),
        Some(Value::Array(_) | Value::Number(_) | Value::Bool(_) | Value::Null)
    )
}

#[cfg(feature = "ndarray")]
fn encode_array(arr: &NdArray, options: &EncodeOptions) -> Value {
    let cast;
    let arr = match options.element_type {
        Some(dtype) if dtype != arr.dtype() => {
            cast = arr.cast(dtype);
            &cast
        }
        _ => arr,
    };
    if options.primitive {
        arr.to_nested()
    } else {
        tag(arr)
    }
}

/// The tagged mapping for `arr`.
#[cfg(feature = "ndarray")]
pub(crate) fn tag(arr: &NdArray) -> Value {
    let mut map = Map::with_capacity(3);
    map.insert(ARRAY_TAG.to_string(), arr.to_nested());
    map.insert(DTYPE_FIELD.to_string(), Value::from(arr.dtype().as_str()));
    map.insert(SHAPE_FIELD.to_string(), shape_value(arr.shape()));
    Value::Object(map)
}

/// Rebuilds an array from a tagged mapping, `NoMatch` if `map` is not one.
///
/// `default_dtype` applies when the mapping carries no `dtype` label.
#[cfg(feature = "ndarray")]
pub(crate) fn untag(map: &Map, default_dtype: DType) -> Result<Outcome<NdArray>> {
    if !has_marker(map) {
        return Ok(Outcome::NoMatch);
    }
    let payload = map.get(ARRAY_TAG).unwrap_or(&Value::Null);
    let dtype = read_dtype(map)?.unwrap_or(default_dtype);
    let shape = map.get(SHAPE_FIELD).map(read_shape).transpose()?;
    NdArray::from_nested(payload, dtype, shape.as_deref()).map(Outcome::Matched)
}

#[cfg(all(test, feature = "ndarray"))]
mod tests {
    use super::*;
    use crate::{value, Error};
    use ndarray::array;

    fn decode(map: &Value, options: &DecodeOptions) -> Result<Outcome<Value>> {
        ArrayCodec.try_decode(map.as_object().unwrap(), options)
    }

    #[test]
    fn test_float32_matrix_tags_dtype_and_shape() {
        let arr = NdArray::from(
            array![[859.0f32, 859.0], [217.0, 106.0], [302.0, 140.0]].into_dyn(),
        );
        let encoded = ArrayCodec
            .try_encode(&Value::NdArray(arr.clone()), &EncodeOptions::new())
            .unwrap()
            .into_option()
            .unwrap();
        assert_eq!(
            encoded,
            value!({
                "__ndarray__": [[859.0, 859.0], [217.0, 106.0], [302.0, 140.0]],
                "dtype": "float32",
                "shape": [3, 2]
            })
        );
        let decoded = decode(&encoded, &DecodeOptions::new()).unwrap();
        assert_eq!(decoded, Outcome::Matched(Value::NdArray(arr)));
    }

    #[test]
    fn test_primitive_mode_emits_bare_list() {
        let arr = NdArray::from_vec(vec![1i32, 2]);
        let options = EncodeOptions::new().primitive();
        let encoded = ArrayCodec.try_encode(&Value::NdArray(arr), &options).unwrap();
        assert_eq!(encoded, Outcome::Matched(value!([1, 2])));
    }

    #[test]
    fn test_encode_override_casts() {
        let arr = NdArray::from_vec(vec![1.0f64, 2.0]);
        let options = EncodeOptions::new().with_element_type(DType::Int16);
        let encoded = ArrayCodec
            .try_encode(&Value::NdArray(arr), &options)
            .unwrap()
            .into_option()
            .unwrap();
        assert_eq!(encoded.get("dtype"), Some(&Value::from("int16")));
        assert_eq!(encoded.get(ARRAY_TAG), Some(&value!([1, 2])));
    }

    #[test]
    fn test_missing_dtype_uses_default() {
        let doc = value!({"__ndarray__": [1, 2, 3]});
        let decoded = decode(&doc, &DecodeOptions::new()).unwrap().into_option().unwrap();
        assert_eq!(decoded.as_ndarray().unwrap().dtype(), DType::Float64);

        let options = DecodeOptions::new().with_default_element_type(DType::UInt8);
        let decoded = decode(&doc, &options).unwrap().into_option().unwrap();
        assert_eq!(decoded.as_ndarray().unwrap().dtype(), DType::UInt8);
    }

    #[test]
    fn test_override_is_left_to_the_chain() {
        let doc = value!({"__ndarray__": [1, 2], "dtype": "int64"});
        let options = DecodeOptions::new().with_element_type(DType::Float32);
        let decoded = decode(&doc, &options).unwrap().into_option().unwrap();
        assert_eq!(decoded.as_ndarray().unwrap().dtype(), DType::Int64);
    }

    #[test]
    fn test_marker_must_hold_payload() {
        let doc = value!({"__ndarray__": "not an array"});
        assert_eq!(decode(&doc, &DecodeOptions::new()).unwrap(), Outcome::NoMatch);
        let doc = value!({"dtype": "int64", "shape": [2]});
        assert_eq!(decode(&doc, &DecodeOptions::new()).unwrap(), Outcome::NoMatch);
    }

    #[test]
    fn test_unknown_dtype_is_malformed() {
        let doc = value!({"__ndarray__": [1], "dtype": "complex128"});
        let err = decode(&doc, &DecodeOptions::new()).unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
    }

    #[test]
    fn test_untrusted_shape_is_malformed() {
        let doc = value!({"__ndarray__": [], "dtype": "int8", "shape": [4611686018427387904u64, 8]});
        let err = decode(&doc, &DecodeOptions::new()).unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
    }

    #[test]
    fn test_declared_shape_keeps_empty_axes() {
        let doc = value!({"__ndarray__": [], "dtype": "int32", "shape": [0, 4]});
        let decoded = decode(&doc, &DecodeOptions::new()).unwrap().into_option().unwrap();
        assert_eq!(decoded.as_ndarray().unwrap().shape(), &[0, 4]);
    }
}
