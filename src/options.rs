//! Configuration options for encoding and decoding.
//!
//! This module provides the per-call configuration structs:
//!
//! - [`EncodeOptions`]: element-type override, primitive mode, safety mode and
//!   output layout
//! - [`DecodeOptions`]: element-type override, default element type, safety
//!   mode and tag constructors
//! - [`SafeMode`]: the YAML safety policy
//!
//! Both option structs carry the [`Codecs`] registry they dispatch through
//! and a [`WarningSink`], so nothing is read from process-wide state.
//!
//! ## Examples
//!
//! ```rust
//! use ndserial::{DType, DecodeOptions, EncodeOptions, SafeMode};
//!
//! let encode = EncodeOptions::new()
//!     .with_element_type(DType::Float32)
//!     .with_indent(2);
//! assert_eq!(encode.element_type, Some(DType::Float32));
//!
//! let decode = DecodeOptions::new().safe();
//! assert_eq!(decode.safe, SafeMode::Safe);
//! ```

use crate::codec::Codecs;
use crate::{DType, Result, Value};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Safety policy for formats that can represent arbitrary typed objects.
///
/// `Unset` behaves as `Unsafe` but reports a warning through the
/// [`WarningSink`] once per call, nudging callers to choose explicitly.
///
/// # Examples
///
/// ```rust
/// use ndserial::SafeMode;
///
/// assert_eq!(SafeMode::from(Some(true)), SafeMode::Safe);
/// assert_eq!(SafeMode::from(None), SafeMode::Unset);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SafeMode {
    #[default]
    Unset,
    Safe,
    Unsafe,
}

impl From<bool> for SafeMode {
    fn from(safe: bool) -> Self {
        if safe {
            SafeMode::Safe
        } else {
            SafeMode::Unsafe
        }
    }
}

impl From<Option<bool>> for SafeMode {
    fn from(safe: Option<bool>) -> Self {
        safe.map_or(SafeMode::Unset, SafeMode::from)
    }
}

/// Destination for non-fatal warnings.
///
/// The default sink logs with `tracing::warn!`; tests typically inject a
/// closure that records the messages.
#[derive(Clone)]
pub struct WarningSink(Arc<dyn Fn(&str) + Send + Sync>);

impl WarningSink {
    pub fn new<F>(sink: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        WarningSink(Arc::new(sink))
    }

    pub fn warn(&self, message: &str) {
        (self.0)(message)
    }
}

impl Default for WarningSink {
    fn default() -> Self {
        WarningSink::new(|message| tracing::warn!("{}", message))
    }
}

impl fmt::Debug for WarningSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WarningSink(..)")
    }
}

/// Builds a value from the payload of a tagged node.
pub type Constructor = Arc<dyn Fn(Value) -> Result<Value> + Send + Sync>;

/// Tag name to constructor table consulted when loading tagged nodes.
#[derive(Clone, Default)]
pub struct Constructors(IndexMap<String, Constructor>);

impl Constructors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `constructor` for `tag` (with or without the leading `!`).
    pub fn insert<F>(&mut self, tag: &str, constructor: F) -> Option<Constructor>
    where
        F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
    {
        let tag = tag.strip_prefix('!').unwrap_or(tag);
        self.0.insert(tag.to_string(), Arc::new(constructor))
    }

    #[must_use]
    pub fn get(&self, tag: &str) -> Option<&Constructor> {
        self.0.get(tag)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Constructors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.0.keys()).finish()
    }
}

/// Options for [`encode`](crate::encode) and every format's `dumps`/`dump`.
///
/// # Examples
///
/// ```rust
/// use ndserial::{EncodeOptions, SafeMode};
///
/// let options = EncodeOptions::new().primitive().with_safe_mode(SafeMode::Safe);
/// assert!(options.primitive);
/// assert!(!options.sort_keys);
/// ```
#[derive(Clone, Debug)]
pub struct EncodeOptions {
    /// Emit bare nested lists instead of tagged mappings. Lossy.
    pub primitive: bool,
    /// Cast arrays and sparse matrices to this element type before tagging.
    pub element_type: Option<DType>,
    pub safe: SafeMode,
    /// Pretty-print with this many spaces per level (JSON only).
    pub indent: Option<usize>,
    pub sort_keys: bool,
    pub warnings: WarningSink,
    pub codecs: Arc<Codecs>,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        EncodeOptions {
            primitive: false,
            element_type: None,
            safe: SafeMode::default(),
            indent: None,
            sort_keys: false,
            warnings: WarningSink::default(),
            codecs: Arc::new(Codecs::default()),
        }
    }
}

impl EncodeOptions {
    /// Creates default options: tagged output, no override, safety unset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Switches to primitive mode.
    #[must_use]
    pub fn primitive(mut self) -> Self {
        self.primitive = true;
        self
    }

    #[must_use]
    pub fn with_element_type(mut self, dtype: DType) -> Self {
        self.element_type = Some(dtype);
        self
    }

    #[must_use]
    pub fn with_safe_mode(mut self, safe: impl Into<SafeMode>) -> Self {
        self.safe = safe.into();
        self
    }

    /// Shorthand for `with_safe_mode(SafeMode::Safe)`.
    #[must_use]
    pub fn safe(self) -> Self {
        self.with_safe_mode(SafeMode::Safe)
    }

    #[must_use]
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = Some(indent);
        self
    }

    /// Writes object keys in sorted order.
    #[must_use]
    pub fn sort_keys(mut self) -> Self {
        self.sort_keys = true;
        self
    }

    #[must_use]
    pub fn with_warning_sink(mut self, sink: WarningSink) -> Self {
        self.warnings = sink;
        self
    }

    /// Dispatches through `codecs` instead of the built-in registry.
    #[must_use]
    pub fn with_codecs(mut self, codecs: impl Into<Arc<Codecs>>) -> Self {
        self.codecs = codecs.into();
        self
    }
}

/// Options for [`decode`](crate::decode) and every format's `loads`/`load`.
///
/// # Examples
///
/// ```rust
/// use ndserial::{DType, DecodeOptions, Value};
///
/// let options = DecodeOptions::new()
///     .with_default_element_type(DType::Float32)
///     .with_constructor("Point", |v: Value| Ok(v));
/// assert_eq!(options.default_element_type, DType::Float32);
/// assert_eq!(options.constructors.len(), 1);
/// ```
#[derive(Clone, Debug)]
pub struct DecodeOptions {
    /// Cast every array or matrix left after decoding to this element type.
    /// Sparse coordinate indices are never cast.
    pub element_type: Option<DType>,
    /// Element type assumed when a tagged array carries no `dtype` label.
    pub default_element_type: DType,
    pub safe: SafeMode,
    pub warnings: WarningSink,
    pub constructors: Constructors,
    pub codecs: Arc<Codecs>,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            element_type: None,
            default_element_type: DType::Float64,
            safe: SafeMode::default(),
            warnings: WarningSink::default(),
            constructors: Constructors::default(),
            codecs: Arc::new(Codecs::default()),
        }
    }
}

impl DecodeOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_element_type(mut self, dtype: DType) -> Self {
        self.element_type = Some(dtype);
        self
    }

    #[must_use]
    pub fn with_default_element_type(mut self, dtype: DType) -> Self {
        self.default_element_type = dtype;
        self
    }

    #[must_use]
    pub fn with_safe_mode(mut self, safe: impl Into<SafeMode>) -> Self {
        self.safe = safe.into();
        self
    }

    /// Shorthand for `with_safe_mode(SafeMode::Safe)`.
    #[must_use]
    pub fn safe(self) -> Self {
        self.with_safe_mode(SafeMode::Safe)
    }

    #[must_use]
    pub fn with_warning_sink(mut self, sink: WarningSink) -> Self {
        self.warnings = sink;
        self
    }

    /// Registers a constructor for nodes tagged `tag`.
    #[must_use]
    pub fn with_constructor<F>(mut self, tag: &str, constructor: F) -> Self
    where
        F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.constructors.insert(tag, constructor);
        self
    }

    #[must_use]
    pub fn with_codecs(mut self, codecs: impl Into<Arc<Codecs>>) -> Self {
        self.codecs = codecs.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_safe_mode_conversions() {
        assert_eq!(SafeMode::from(false), SafeMode::Unsafe);
        assert_eq!(SafeMode::from(Some(false)), SafeMode::Unsafe);
        assert_eq!(SafeMode::default(), SafeMode::Unset);
    }

    #[test]
    fn test_warning_sink_receives_messages() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let seen = Arc::clone(&seen);
            WarningSink::new(move |msg| seen.lock().unwrap().push(msg.to_string()))
        };
        sink.warn("first");
        assert_eq!(*seen.lock().unwrap(), vec!["first".to_string()]);
    }

    #[test]
    fn test_constructor_tag_normalised() {
        let mut table = Constructors::new();
        table.insert("!Point", Ok);
        assert!(table.get("Point").is_some());
        assert!(table.get("!Point").is_none());
    }

    #[test]
    fn test_decode_defaults() {
        let options = DecodeOptions::default();
        assert_eq!(options.default_element_type, DType::Float64);
        assert_eq!(options.element_type, None);
        assert!(options.constructors.is_empty());
    }
}
