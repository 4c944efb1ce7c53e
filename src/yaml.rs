//! YAML documents with safety-mode handling of `!tag` nodes.
//!
//! YAML can name arbitrary types with local tags (`!Widget {...}`). Whether
//! such nodes are accepted depends on the call's [`SafeMode`]:
//!
//! - `Safe`: any tag fails with [`Error::SerializationSafety`] before anything
//!   is constructed (load) or written (dump).
//! - `Unsafe`: on load, tags with a registered constructor are built, the rest
//!   are kept as [`Value::Tagged`]. On dump, tagged values become `!tag` nodes.
//! - `Unset`: as `Unsafe`, after one warning through the options' sink.
//!
//! Array and sparse mappings are plain mappings and load in either mode.
//!
//! ```rust
//! use ndserial::{yaml, DecodeOptions, Value};
//!
//! let doc = "w: !Widget {size: 3}";
//! let err = yaml::loads(doc, &DecodeOptions::new().safe()).unwrap_err();
//! assert!(err.is_safety_violation());
//!
//! let loaded = yaml::loads(doc, &DecodeOptions::new().with_safe_mode(false)).unwrap();
//! assert_eq!(loaded.get("w").and_then(Value::as_tagged).map(|t| t.tag.as_str()), Some("Widget"));
//! ```
//!
//! [`SafeMode`]: crate::SafeMode

use crate::io::{self, Input, Output};
use crate::options::{DecodeOptions, EncodeOptions};
use crate::{safety, Error, Map, Number, Result, Tagged, Value};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_yaml::value::{Tag, TaggedValue};
use serde_yaml::{Mapping, Value as Yaml};

pub const EXTENSION: &str = ".yaml";

/// Encodes `value` and emits it as YAML.
///
/// # Errors
///
/// Returns [`Error::SerializationSafety`] for a tagged value in safe mode,
/// [`Error::UnsupportedType`] for a value no codec could encode, or an
/// emitter error.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn dumps(value: &Value, options: &EncodeOptions) -> Result<String> {
    let safe = safety::resolve(options.safe, &options.warnings, "yaml::dumps");
    let mut encoded = options.codecs.encode(value, options)?;
    if options.sort_keys {
        encoded.sort_keys_recursive();
    }
    let yaml = to_yaml(&encoded, safe)?;
    serde_yaml::to_string(&yaml).map_err(|e| Error::parse("yaml", e))
}

/// Parses YAML text, decodes tagged mappings and constructs tagged nodes.
///
/// # Errors
///
/// Returns [`Error::SerializationSafety`] if a tag is met in safe mode,
/// [`Error::Parse`] for invalid YAML, [`Error::Construct`] if a registered
/// constructor fails, or a decoder error.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn loads(text: &str, options: &DecodeOptions) -> Result<Value> {
    let safe = safety::resolve(options.safe, &options.warnings, "yaml::loads");
    let yaml: Yaml = serde_yaml::from_str(text).map_err(|e| Error::parse("yaml", e))?;
    if safe {
        if let Some(tag) = first_yaml_tag(&yaml) {
            return Err(safety::refuse(&tag));
        }
    }
    let value = from_yaml(yaml)?;
    let decoded = options.codecs.decode(value, options)?;
    safety::construct_tree(decoded, &options.constructors)
}

/// Writes `value` as YAML to a path or stream.
///
/// # Errors
///
/// As [`dumps`], plus I/O errors.
pub fn dump<'a>(value: &Value, output: impl Into<Output<'a>>, options: &EncodeOptions) -> Result<()> {
    let text = dumps(value, options)?;
    io::with_writer(output.into(), |w| io::write_all(w, text.as_bytes()))
}

/// Reads a YAML document from a path or stream.
///
/// # Errors
///
/// As [`loads`], plus I/O errors.
pub fn load<'a>(input: impl Into<Input<'a>>, options: &DecodeOptions) -> Result<Value> {
    io::with_reader(input.into(), |r| loads(&io::read_string(r)?, options))
}

/// Serializes any `T: Serialize` to YAML text.
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

/// Deserializes a `T` from YAML text. Tagged nodes map onto enum variants.
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

fn first_yaml_tag(yaml: &Yaml) -> Option<String> {
    match yaml {
        Yaml::Tagged(tagged) => Some(tagged.tag.to_string().trim_start_matches('!').to_string()),
        Yaml::Sequence(items) => items.iter().find_map(first_yaml_tag),
        Yaml::Mapping(mapping) => mapping
            .iter()
            .find_map(|(k, v)| first_yaml_tag(k).or_else(|| first_yaml_tag(v))),
        _ => None,
    }
}

fn from_yaml(yaml: Yaml) -> Result<Value> {
    Ok(match yaml {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => Value::Number(if let Some(i) = n.as_i64() {
            Number::Integer(i)
        } else if let Some(u) = n.as_u64() {
            Number::from(u)
        } else {
            Number::from(n.as_f64().unwrap_or(f64::NAN))
        }),
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(items) => Value::Array(
            items
                .into_iter()
                .map(from_yaml)
                .collect::<Result<Vec<_>>>()?,
        ),
        Yaml::Mapping(mapping) => {
            let mut map = Map::with_capacity(mapping.len());
            for (key, item) in mapping {
                map.insert(mapping_key(key)?, from_yaml(item)?);
            }
            Value::Object(map)
        }
        Yaml::Tagged(tagged) => {
            let TaggedValue { tag, value } = *tagged;
            Value::Tagged(Box::new(Tagged::new(tag.to_string(), from_yaml(value)?)))
        }
    })
}

fn mapping_key(key: Yaml) -> Result<String> {
    match key {
        Yaml::String(s) => Ok(s),
        Yaml::Number(n) => Ok(n.to_string()),
        Yaml::Bool(b) => Ok(b.to_string()),
        Yaml::Null => Ok("null".to_string()),
        other => Err(Error::malformed(format!(
            "mapping keys must be scalars, found {:?}",
            other
        ))),
    }
}

fn to_yaml(value: &Value, safe: bool) -> Result<Yaml> {
    Ok(match value {
        Value::Null => Yaml::Null,
        Value::Bool(b) => Yaml::Bool(*b),
        Value::Number(n) => Yaml::Number(match n {
            Number::Integer(i) => (*i).into(),
            Number::Unsigned(u) => (*u).into(),
            other => other.as_f64().into(),
        }),
        Value::String(s) => Yaml::String(s.clone()),
        Value::Array(items) => Yaml::Sequence(
            items
                .iter()
                .map(|item| to_yaml(item, safe))
                .collect::<Result<Vec<_>>>()?,
        ),
        Value::Object(map) => {
            let mut mapping = Mapping::with_capacity(map.len());
            for (key, item) in map.iter() {
                mapping.insert(Yaml::String(key.clone()), to_yaml(item, safe)?);
            }
            Yaml::Mapping(mapping)
        }
        Value::Tagged(tagged) => {
            if safe {
                return Err(safety::refuse(&tagged.tag));
            }
            if tagged.tag.is_empty() {
                return Err(Error::malformed("tagged value has an empty tag"));
            }
            Yaml::Tagged(Box::new(TaggedValue {
                tag: Tag::new(tagged.tag.as_str()),
                value: to_yaml(&tagged.value, safe)?,
            }))
        }
        #[allow(unreachable_patterns)]
        other => {
            return Err(Error::unsupported_type(&format!(
                "{} cannot be written as YAML",
                other.kind()
            )))
        }
    })
}
