//! Picking a format from a file name.

use crate::csv::{self, CsvOptions};
use crate::io::{Input, Output};
use crate::options::{DecodeOptions, EncodeOptions};
use crate::{binary, json, yaml, Error, Result, Value};
use std::fmt;
use std::path::Path;

/// The document formats this crate reads and writes.
///
/// # Examples
///
/// ```rust
/// use ndserial::Format;
///
/// assert_eq!(Format::from_path("scan.YML").unwrap(), Format::Yaml);
/// assert_eq!(Format::from_path("mesh.pkl").unwrap(), Format::Binary);
/// assert!(Format::from_path("notes.txt").is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Format {
    Json,
    Yaml,
    Csv,
    Binary,
}

impl Format {
    /// Chooses a format by file extension, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedType`] for unknown or missing extensions.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("json") => Ok(Format::Json),
            Some("yaml" | "yml") => Ok(Format::Yaml),
            Some("csv") => Ok(Format::Csv),
            Some("bin" | "pkl") => Ok(Format::Binary),
            _ => Err(Error::unsupported_type(&format!(
                "no format for {}",
                path.display()
            ))),
        }
    }

    /// Canonical extension, with the leading dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Format::Json => json::EXTENSION,
            Format::Yaml => yaml::EXTENSION,
            Format::Csv => csv::EXTENSION,
            Format::Binary => binary::EXTENSION,
        }
    }

    /// Loads a document. CSV tables come back as a list of mappings.
    ///
    /// # Errors
    ///
    /// Whatever the format's `load` returns.
    pub fn load<'a>(self, input: impl Into<Input<'a>>, options: &DecodeOptions) -> Result<Value> {
        match self {
            Format::Json => json::load(input, options),
            Format::Yaml => yaml::load(input, options),
            Format::Csv => {
                let rows = csv::load(input, &CsvOptions::default())?;
                Ok(Value::Array(rows.into_iter().map(Value::Object).collect()))
            }
            Format::Binary => binary::load(input, options),
        }
    }

    /// Dumps a document. CSV expects a list of rows and ignores `options`.
    ///
    /// # Errors
    ///
    /// Whatever the format's `dump` returns.
    pub fn dump<'a>(self, value: &Value, output: impl Into<Output<'a>>, options: &EncodeOptions) -> Result<()> {
        match self {
            Format::Json => json::dump(value, output, options),
            Format::Yaml => yaml::dump(value, output, options),
            Format::Csv => csv::dump(value, output),
            Format::Binary => binary::dump(value, output, options),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Format::Json => "json",
            Format::Yaml => "yaml",
            Format::Csv => "csv",
            Format::Binary => "binary",
        })
    }
}

/// Loads the document at `path` in the format its extension names.
///
/// # Errors
///
/// As [`Format::from_path`] and [`Format::load`].
pub fn load_path(path: impl AsRef<Path>, options: &DecodeOptions) -> Result<Value> {
    let path = path.as_ref();
    Format::from_path(path)?.load(path, options)
}

/// Dumps `value` to `path` in the format its extension names.
///
/// # Errors
///
/// As [`Format::from_path`] and [`Format::dump`].
pub fn dump_path(value: &Value, path: impl AsRef<Path>, options: &EncodeOptions) -> Result<()> {
    let path = path.as_ref();
    Format::from_path(path)?.dump(value, path, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value;

    #[test]
    fn test_extensions() {
        for format in [Format::Json, Format::Yaml, Format::Csv, Format::Binary] {
            let name = format!("doc{}", format.extension());
            assert_eq!(Format::from_path(&name).unwrap(), format);
        }
        assert!(Format::from_path("no_extension").is_err());
    }

    #[test]
    fn test_path_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        let doc = value!({"a": [1, 2]});
        for name in ["doc.json", "doc.yml", "doc.bin"] {
            let path = dir.path().join(name);
            dump_path(&doc, &path, &EncodeOptions::new().with_safe_mode(false)).unwrap();
            let back = load_path(&path, &DecodeOptions::new().with_safe_mode(false)).unwrap();
            assert_eq!(back, doc, "{}", name);
        }
    }

    #[test]
    fn test_csv_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        dump_path(&value!([["k"], ["v"]]), &path, &EncodeOptions::new()).unwrap();
        let back = load_path(&path, &DecodeOptions::new()).unwrap();
        assert_eq!(back, value!([{"k": "v"}]));
    }
}
