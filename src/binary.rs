//! Lossless binary snapshots of a whole [`Value`] graph.
//!
//! Unlike the text formats nothing is tagged or densified here: arrays are
//! stored flat with their element type, sparse matrices as triplets, and
//! [`Tagged`] nodes verbatim. On load, tagged nodes are offered to the
//! constructors registered in [`DecodeOptions`].
//!
//! The encoding is `bincode` behind a five byte magic header.
//!
//! ```rust
//! use ndserial::{binary, value, DecodeOptions, EncodeOptions, Value};
//!
//! let doc = value!({"id": 7, "w": (Value::tagged("Widget", Value::from(3)))});
//! let bytes = binary::dumps(&doc, &EncodeOptions::new()).unwrap();
//! assert!(bytes.starts_with(binary::MAGIC));
//!
//! let options = DecodeOptions::new().with_constructor("Widget", |v| Ok(Value::from(vec![v])));
//! let back = binary::loads(&bytes, &options).unwrap();
//! assert_eq!(back, value!({"id": 7, "w": [3]}));
//! ```

use crate::io::{self, Input, Output};
use crate::options::{DecodeOptions, EncodeOptions, SafeMode};
use crate::{safety, Error, Map, Number, Result, Tagged, Value};
use serde::{Deserialize, Serialize};

#[cfg(feature = "ndarray")]
use crate::NdArray;
#[cfg(feature = "sparse")]
use crate::{SparseFormat, SparseMatrix};

pub const EXTENSION: &str = ".bin";

/// Leading bytes of every binary document; the last byte is the layout version.
pub const MAGIC: &[u8] = b"NDSB\x01";

#[derive(Debug, Serialize, Deserialize)]
enum Node {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Array(Vec<Node>),
    Object(Vec<(String, Node)>),
    NdArray {
        shape: Vec<u64>,
        data: FlatData,
    },
    Sparse {
        format: String,
        shape: (u64, u64),
        row: Vec<u64>,
        col: Vec<u64>,
        data: FlatData,
    },
    Tagged {
        tag: String,
        value: Box<Node>,
    },
}

/// Row-major array elements.
#[derive(Debug, Serialize, Deserialize)]
enum FlatData {
    Bool(Vec<bool>),
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    UInt8(Vec<u8>),
    UInt16(Vec<u16>),
    UInt32(Vec<u32>),
    UInt64(Vec<u64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

macro_rules! flat_conversions {
    ($($variant:ident),*) => {
        #[cfg(feature = "ndarray")]
        impl FlatData {
            fn from_array(arr: &NdArray) -> Self {
                match arr {
                    $(NdArray::$variant(a) => FlatData::$variant(a.iter().copied().collect()),)*
                }
            }

            fn into_array(self, shape: &[usize]) -> Result<NdArray> {
                match self {
                    $(FlatData::$variant(values) => NdArray::from_shape_vec(shape, values),)*
                }
            }
        }
    };
}

flat_conversions!(Bool, Int8, Int16, Int32, Int64, UInt8, UInt16, UInt32, UInt64, Float32, Float64);

#[cfg(feature = "ndarray")]
fn to_u64(values: &[usize]) -> Vec<u64> {
    values.iter().map(|&v| v as u64).collect()
}

#[cfg(feature = "ndarray")]
fn to_usize(values: &[u64]) -> Result<Vec<usize>> {
    values
        .iter()
        .map(|&v| {
            usize::try_from(v).map_err(|_| Error::malformed(format!("index {} overflows usize", v)))
        })
        .collect()
}

fn to_node(value: &Value) -> Node {
    match value {
        Value::Null => Node::Null,
        Value::Bool(b) => Node::Bool(*b),
        Value::Number(Number::Integer(i)) => Node::Int(*i),
        Value::Number(Number::Unsigned(u)) => Node::UInt(*u),
        Value::Number(n) => Node::Float(n.as_f64()),
        Value::String(s) => Node::String(s.clone()),
        Value::Array(items) => Node::Array(items.iter().map(to_node).collect()),
        Value::Object(map) => Node::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), to_node(v)))
                .collect(),
        ),
        #[cfg(feature = "ndarray")]
        Value::NdArray(arr) => Node::NdArray {
            shape: to_u64(arr.shape()),
            data: FlatData::from_array(arr),
        },
        #[cfg(feature = "sparse")]
        Value::Sparse(m) => Node::Sparse {
            format: m.format().as_str().to_string(),
            shape: (m.shape().0 as u64, m.shape().1 as u64),
            row: to_u64(m.row()),
            col: to_u64(m.col()),
            data: FlatData::from_array(m.data()),
        },
        Value::Tagged(t) => Node::Tagged {
            tag: t.tag.clone(),
            value: Box::new(to_node(&t.value)),
        },
    }
}

fn from_node(node: Node) -> Result<Value> {
    Ok(match node {
        Node::Null => Value::Null,
        Node::Bool(b) => Value::Bool(b),
        Node::Int(i) => Value::Number(Number::Integer(i)),
        Node::UInt(u) => Value::Number(Number::from(u)),
        Node::Float(f) => Value::Number(Number::from(f)),
        Node::String(s) => Value::String(s),
        Node::Array(items) => Value::Array(
            items
                .into_iter()
                .map(from_node)
                .collect::<Result<Vec<_>>>()?,
        ),
        Node::Object(entries) => {
            let mut map = Map::with_capacity(entries.len());
            for (key, item) in entries {
                map.insert(key, from_node(item)?);
            }
            Value::Object(map)
        }
        Node::NdArray { shape, data } => array_node(&shape, data)?,
        Node::Sparse {
            format,
            shape,
            row,
            col,
            data,
        } => sparse_node(&format, shape, &row, &col, data)?,
        Node::Tagged { tag, value } => Value::Tagged(Box::new(Tagged::new(tag, from_node(*value)?))),
    })
}

#[cfg(feature = "ndarray")]
fn array_node(shape: &[u64], data: FlatData) -> Result<Value> {
    Ok(Value::NdArray(data.into_array(&to_usize(shape)?)?))
}

#[cfg(not(feature = "ndarray"))]
fn array_node(_shape: &[u64], _data: FlatData) -> Result<Value> {
    Err(Error::missing_dependency("ndarray", "ndarray"))
}

#[cfg(feature = "sparse")]
fn sparse_node(format: &str, shape: (u64, u64), row: &[u64], col: &[u64], data: FlatData) -> Result<Value> {
    let format: SparseFormat = format.parse()?;
    let dims = to_usize(&[shape.0, shape.1])?;
    let data = data.into_array(&[row.len()])?;
    let m = SparseMatrix::from_triplets((dims[0], dims[1]), to_usize(row)?, to_usize(col)?, data, format)?;
    Ok(Value::Sparse(m))
}

#[cfg(not(feature = "sparse"))]
fn sparse_node(_format: &str, _shape: (u64, u64), _row: &[u64], _col: &[u64], _data: FlatData) -> Result<Value> {
    Err(Error::missing_dependency("sparse matrix", "sparse"))
}

/// Snapshots `value` into bytes.
///
/// Codecs are not consulted. With an explicit [`SafeMode::Safe`], tagged
/// values are refused.
///
/// # Errors
///
/// Returns [`Error::SerializationSafety`] in safe mode for tagged values, or
/// [`Error::Parse`] if bincode fails.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn dumps(value: &Value, options: &EncodeOptions) -> Result<Vec<u8>> {
    if options.safe == SafeMode::Safe {
        if let Some(tag) = safety::first_tag(value) {
            return Err(safety::refuse(tag));
        }
    }
    let body = bincode::serialize(&to_node(value)).map_err(|e| Error::parse("binary", e))?;
    let mut bytes = Vec::with_capacity(MAGIC.len() + body.len());
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&body);
    Ok(bytes)
}

/// Restores a value snapshotted by [`dumps`].
///
/// Tagged mappings left by a text format are decoded as usual, then tagged
/// nodes are handed to the registered constructors.
///
/// # Errors
///
/// Returns [`Error::Parse`] for a missing magic header or corrupt body,
/// [`Error::MissingDependency`] for array nodes without the matching feature,
/// [`Error::SerializationSafety`] for tagged nodes under an explicit safe
/// mode, or a constructor error.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn loads(bytes: &[u8], options: &DecodeOptions) -> Result<Value> {
    let body = bytes
        .strip_prefix(MAGIC)
        .ok_or_else(|| Error::parse("binary", "missing NDSB header"))?;
    let node: Node = bincode::deserialize(body).map_err(|e| Error::parse("binary", e))?;
    let value = from_node(node)?;
    if options.safe == SafeMode::Safe {
        if let Some(tag) = safety::first_tag(&value) {
            return Err(safety::refuse(tag));
        }
    }
    let decoded = options.codecs.decode(value, options)?;
    safety::construct_tree(decoded, &options.constructors)
}

/// Writes a snapshot to a path or stream.
///
/// # Errors
///
/// As [`dumps`], plus I/O errors.
pub fn dump<'a>(value: &Value, output: impl Into<Output<'a>>, options: &EncodeOptions) -> Result<()> {
    let bytes = dumps(value, options)?;
    io::with_writer(output.into(), |w| io::write_all(w, &bytes))
}

/// Reads a snapshot from a path or stream.
///
/// # Errors
///
/// As [`loads`], plus I/O errors.
pub fn load<'a>(input: impl Into<Input<'a>>, options: &DecodeOptions) -> Result<Value> {
    io::with_reader(input.into(), |r| loads(&io::read_bytes(r)?, options))
}
