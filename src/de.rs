//! Deserialization of Rust data out of [`Value`] trees.
//!
//! [`ValueDeserializer`] drives any `T: Deserialize` from a [`Value`]. Arrays
//! and sparse matrices are presented to the visitor as their tagged mappings,
//! which is exactly what the `Deserialize` impls of
//! [`NdArray`](crate::NdArray) and [`SparseMatrix`](crate::SparseMatrix)
//! expect. A [`Tagged`](crate::Tagged) node deserializes as an enum whose
//! variant is the tag.
//!
//! ```rust
//! use ndserial::{from_value, value};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize, Debug, PartialEq)]
//! struct Data { x: i32, y: Option<String> }
//!
//! let data: Data = from_value(value!({"x": 1, "y": null})).unwrap();
//! assert_eq!(data, Data { x: 1, y: None });
//! ```

use crate::{Error, Map, Number, Result, Value};
use serde::de::{self, DeserializeOwned, IntoDeserializer};
use serde::forward_to_deserialize_any;

/// A `serde::Deserializer` reading from an owned [`Value`].
pub struct ValueDeserializer {
    value: Value,
}

impl ValueDeserializer {
    #[must_use]
    pub fn new(value: Value) -> Self {
        ValueDeserializer { value }
    }
}

/// Rich values become the plain value a text format would carry.
fn lower(value: Value) -> Value {
    match value {
        #[cfg(feature = "ndarray")]
        Value::NdArray(arr) => crate::codec::array::tag(&arr),
        #[cfg(feature = "sparse")]
        Value::Sparse(m) => crate::codec::sparse::tag(&m),
        other => other,
    }
}

impl<'de> de::Deserializer<'de> for ValueDeserializer {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match lower(self.value) {
            Value::Null => visitor.visit_unit(),
            Value::Bool(b) => visitor.visit_bool(b),
            Value::Number(Number::Integer(i)) => visitor.visit_i64(i),
            Value::Number(Number::Unsigned(u)) => visitor.visit_u64(u),
            Value::Number(Number::Float(f)) => visitor.visit_f64(f),
            Value::Number(Number::Infinity) => visitor.visit_f64(f64::INFINITY),
            Value::Number(Number::NegativeInfinity) => visitor.visit_f64(f64::NEG_INFINITY),
            Value::Number(Number::NaN) => visitor.visit_f64(f64::NAN),
            Value::String(s) => visitor.visit_string(s),
            Value::Array(arr) => visitor.visit_seq(SeqDeserializer::new(arr)),
            Value::Object(obj) => visitor.visit_map(MapDeserializer::new(obj)),
            Value::Tagged(t) => Err(Error::custom(format!(
                "tagged value `!{}` can only deserialize as an enum",
                t.tag
            ))),
            #[allow(unreachable_patterns)]
            other => Err(Error::unsupported_type(other.kind())),
        }
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Null => visitor.visit_none(),
            other => visitor.visit_some(ValueDeserializer::new(other)),
        }
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::String(s) => visitor.visit_enum(s.into_deserializer()),
            Value::Object(obj) if obj.len() == 1 => {
                let mut entries = obj.into_iter();
                match entries.next() {
                    Some((variant, value)) => visitor.visit_enum(EnumDeserializer::new(variant, value)),
                    None => Err(Error::custom("expected enum variant")),
                }
            }
            Value::Tagged(t) => {
                let t = *t;
                visitor.visit_enum(EnumDeserializer::new(t.tag, t.value))
            }
            other => Err(Error::custom(format!(
                "expected enum as string or single-key object, found {}",
                other.kind()
            ))),
        }
    }

    fn deserialize_ignored_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        drop(self);
        visitor.visit_unit()
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple
        tuple_struct map struct identifier
    }
}

struct SeqDeserializer {
    iter: std::vec::IntoIter<Value>,
}

impl SeqDeserializer {
    fn new(vec: Vec<Value>) -> Self {
        SeqDeserializer {
            iter: vec.into_iter(),
        }
    }
}

impl<'de> de::SeqAccess<'de> for SeqDeserializer {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: de::DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some(value) => seed.deserialize(ValueDeserializer::new(value)).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        match self.iter.size_hint() {
            (lower, Some(upper)) if lower == upper => Some(upper),
            _ => None,
        }
    }
}

struct MapDeserializer {
    iter: indexmap::map::IntoIter<String, Value>,
    value: Option<Value>,
}

impl MapDeserializer {
    fn new(map: Map) -> Self {
        MapDeserializer {
            iter: map.into_iter(),
            value: None,
        }
    }
}

impl<'de> de::MapAccess<'de> for MapDeserializer {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: de::DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some((key, value)) => {
                self.value = Some(value);
                seed.deserialize(ValueDeserializer::new(Value::String(key)))
                    .map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: de::DeserializeSeed<'de>,
    {
        match self.value.take() {
            Some(value) => seed.deserialize(ValueDeserializer::new(value)),
            None => Err(Error::custom("next_value_seed called before next_key_seed")),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        match self.iter.size_hint() {
            (lower, Some(upper)) if lower == upper => Some(upper),
            _ => None,
        }
    }
}

struct EnumDeserializer {
    variant: String,
    value: Value,
}

impl EnumDeserializer {
    fn new(variant: String, value: Value) -> Self {
        EnumDeserializer { variant, value }
    }
}

impl<'de> de::EnumAccess<'de> for EnumDeserializer {
    type Error = Error;
    type Variant = VariantDeserializer;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant)>
    where
        V: de::DeserializeSeed<'de>,
    {
        let variant = seed.deserialize(ValueDeserializer::new(Value::String(self.variant)))?;
        Ok((variant, VariantDeserializer { value: self.value }))
    }
}

struct VariantDeserializer {
    value: Value,
}

impl<'de> de::VariantAccess<'de> for VariantDeserializer {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        match self.value {
            Value::Null => Ok(()),
            other => Err(Error::custom(format!(
                "expected unit variant, found {}",
                other.kind()
            ))),
        }
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value>
    where
        T: de::DeserializeSeed<'de>,
    {
        seed.deserialize(ValueDeserializer::new(self.value))
    }

    fn tuple_variant<V>(self, _len: usize, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Array(arr) => visitor.visit_seq(SeqDeserializer::new(arr)),
            other => Err(Error::custom(format!(
                "expected tuple variant, found {}",
                other.kind()
            ))),
        }
    }

    fn struct_variant<V>(self, _fields: &'static [&'static str], visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.value {
            Value::Object(obj) => visitor.visit_map(MapDeserializer::new(obj)),
            other => Err(Error::custom(format!(
                "expected struct variant, found {}",
                other.kind()
            ))),
        }
    }
}

/// Builds a `T` from a [`Value`].
///
/// # Errors
///
/// Returns an error if the value's structure does not match `T`.
pub fn from_value<T>(value: Value) -> Result<T>
where
    T: DeserializeOwned,
{
    T::deserialize(ValueDeserializer::new(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value;
    use serde::Deserialize;

    #[derive(Deserialize, Debug, PartialEq)]
    enum Unit {
        Meters,
        Scaled(f64),
        Pair(i32, i32),
    }

    #[test]
    fn test_enum_layouts() {
        assert_eq!(from_value::<Unit>(value!("Meters")).unwrap(), Unit::Meters);
        assert_eq!(
            from_value::<Unit>(value!({"Scaled": 2.5})).unwrap(),
            Unit::Scaled(2.5)
        );
        assert_eq!(
            from_value::<Unit>(value!({"Pair": [1, 2]})).unwrap(),
            Unit::Pair(1, 2)
        );
    }

    #[test]
    fn test_tagged_node_as_enum() {
        let tagged = Value::tagged("Scaled", Value::from(0.5));
        assert_eq!(from_value::<Unit>(tagged).unwrap(), Unit::Scaled(0.5));
    }

    #[test]
    fn test_tagged_node_rejected_elsewhere() {
        let tagged = Value::tagged("Widget", Value::Null);
        assert!(from_value::<i32>(tagged).is_err());
    }

    #[test]
    fn test_unsigned_number() {
        let n: u64 = from_value(Value::from(u64::MAX)).unwrap();
        assert_eq!(n, u64::MAX);
    }

    #[cfg(feature = "ndarray")]
    #[test]
    fn test_ndarray_field() {
        use crate::NdArray;

        #[derive(Deserialize)]
        struct Mesh {
            v: NdArray,
        }

        let arr = NdArray::from_shape_vec(&[2, 2], vec![1i32, 2, 3, 4]).unwrap();
        let doc = value!({"v": (Value::NdArray(arr.clone()))});
        let mesh: Mesh = from_value(doc).unwrap();
        assert_eq!(mesh.v, arr);
    }
}
