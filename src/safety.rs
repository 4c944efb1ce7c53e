//! Safety-mode resolution and tagged-node construction.
//!
//! Formats that can carry arbitrary typed objects (YAML tags, binary
//! `Tagged` nodes) route through here so that the policy is applied the same
//! way everywhere.

use crate::options::{Constructors, SafeMode, WarningSink};
use crate::{Error, Map, Result, Tagged, Value};

const UNSET_WARNING: &str = "safe mode was not specified; falling back to unsafe mode. \
     Pass SafeMode::Safe or SafeMode::Unsafe explicitly to silence this warning";

/// Returns `true` when the call must run in safe mode.
///
/// `Unset` reports one warning through `sink` and resolves to unsafe.
pub(crate) fn resolve(mode: SafeMode, sink: &WarningSink, operation: &str) -> bool {
    match mode {
        SafeMode::Safe => true,
        SafeMode::Unsafe => false,
        SafeMode::Unset => {
            sink.warn(&format!("{}: {}", operation, UNSET_WARNING));
            false
        }
    }
}

/// Builds the value for a tagged node: a registered constructor wins,
/// otherwise the node is kept as [`Value::Tagged`].
pub(crate) fn construct(tagged: Tagged, constructors: &Constructors) -> Result<Value> {
    match constructors.get(&tagged.tag) {
        Some(constructor) => {
            tracing::trace!(tag = %tagged.tag, "constructing tagged node");
            constructor(tagged.value).map_err(|e| match e {
                Error::Construct { .. } => e,
                other => Error::construct(&tagged.tag, other),
            })
        }
        None => Ok(Value::Tagged(Box::new(tagged))),
    }
}

/// Replaces tagged nodes bottom-up with their constructed values.
pub(crate) fn construct_tree(value: Value, constructors: &Constructors) -> Result<Value> {
    if constructors.is_empty() {
        return Ok(value);
    }
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| construct_tree(item, constructors))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, item) in map {
                out.insert(key, construct_tree(item, constructors)?);
            }
            Ok(Value::Object(out))
        }
        Value::Tagged(tagged) => {
            let Tagged { tag, value } = *tagged;
            let value = construct_tree(value, constructors)?;
            construct(Tagged { tag, value }, constructors)
        }
        other => Ok(other),
    }
}

/// Tag of the first tagged node, depth-first.
pub(crate) fn first_tag(value: &Value) -> Option<&str> {
    match value {
        Value::Array(items) => items.iter().find_map(first_tag),
        Value::Object(map) => map.values().find_map(first_tag),
        Value::Tagged(tagged) => Some(&tagged.tag),
        _ => None,
    }
}

/// Safety error for a tagged node met in safe mode.
pub(crate) fn refuse(tag: &str) -> Error {
    Error::safety(format!("could not construct or represent `!{}` in safe mode", tag))
}
