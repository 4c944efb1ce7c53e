//! CSV tables.
//!
//! Loading yields one [`Map`] per data row. Dumping takes a list of rows, each
//! a list of scalar cells, or a rank-2 [`NdArray`](crate::NdArray).
//! [`CsvCollectionSerializer`] turns a collection of uniform mappings into such
//! rows, with the sorted keys as the header.
//!
//! ```rust
//! use ndserial::csv::{self, CsvOptions};
//! use ndserial::value;
//!
//! let rows = csv::loads("name,size\nmesh,3\n", &CsvOptions::new()).unwrap();
//! assert_eq!(rows[0].get("size"), Some(&value!("3")));
//!
//! let text = csv::dumps(&value!([["name", "size"], ["mesh", 3]])).unwrap();
//! assert_eq!(text, "name,size\nmesh,3\n");
//! ```

use crate::io::{self, Input, Output};
use crate::{Error, Map, Number, Result, Value};
use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;

pub const EXTENSION: &str = ".csv";

/// Rewrites the header row before it is used as keys.
pub type HeaderTransformer = Arc<dyn Fn(Vec<String>) -> Vec<String> + Send + Sync>;

/// Options for [`load`].
#[derive(Clone)]
pub struct CsvOptions {
    /// Treat the first line as column names. Without it, cells are keyed by
    /// column index.
    pub header_row: bool,
    pub header_transformer: Option<HeaderTransformer>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        CsvOptions {
            header_row: true,
            header_transformer: None,
        }
    }
}

impl fmt::Debug for CsvOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsvOptions")
            .field("header_row", &self.header_row)
            .field("header_transformer", &self.header_transformer.is_some())
            .finish()
    }
}

impl CsvOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn without_header_row(mut self) -> Self {
        self.header_row = false;
        self
    }

    /// Sets a function that rewrites the header row.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ndserial::csv::{self, CsvOptions};
    ///
    /// let options = CsvOptions::new()
    ///     .with_header_transformer(|names| names.into_iter().map(|n| n.to_lowercase()).collect());
    /// let rows = csv::loads("Name\nmesh\n", &options).unwrap();
    /// assert!(rows[0].contains_key("name"));
    /// ```
    #[must_use]
    pub fn with_header_transformer<F>(mut self, transformer: F) -> Self
    where
        F: Fn(Vec<String>) -> Vec<String> + Send + Sync + 'static,
    {
        self.header_transformer = Some(Arc::new(transformer));
        self
    }
}

/// Reads a CSV table from a path or stream.
///
/// # Errors
///
/// Returns [`Error::Malformed`] if a data row's length differs from the
/// header's, [`Error::Parse`] for unreadable CSV, or I/O errors.
pub fn load<'a>(input: impl Into<Input<'a>>, options: &CsvOptions) -> Result<Vec<Map>> {
    io::with_reader(input.into(), |r| read_rows(r, options))
}

/// Reads a CSV table from text.
///
/// # Errors
///
/// As [`load`].
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn loads(text: &str, options: &CsvOptions) -> Result<Vec<Map>> {
    read_rows(&mut text.as_bytes(), options)
}

fn read_rows(reader: &mut dyn Read, options: &CsvOptions) -> Result<Vec<Map>> {
    let mut records = ::csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader)
        .into_records();

    let header = if options.header_row {
        match records.next() {
            Some(record) => {
                let names: Vec<String> = record
                    .map_err(|e| Error::parse("csv", e))?
                    .iter()
                    .map(str::to_string)
                    .collect();
                Some(match &options.header_transformer {
                    Some(transform) => transform(names),
                    None => names,
                })
            }
            None => return Ok(Vec::new()),
        }
    } else {
        None
    };
    let first_line = if header.is_some() { 2 } else { 1 };

    let mut rows = Vec::new();
    for (index, record) in records.enumerate() {
        let record = record.map_err(|e| Error::parse("csv", e))?;
        let mut row = Map::with_capacity(record.len());
        match &header {
            Some(names) => {
                if record.len() != names.len() {
                    return Err(Error::malformed(format!(
                        "Header row contains {} items but line {} contains {}",
                        names.len(),
                        first_line + index,
                        record.len()
                    )));
                }
                for (name, cell) in names.iter().zip(record.iter()) {
                    row.insert(name.clone(), Value::from(cell));
                }
            }
            None => {
                for (column, cell) in record.iter().enumerate() {
                    row.insert(column.to_string(), Value::from(cell));
                }
            }
        }
        rows.push(row);
    }
    tracing::trace!(rows = rows.len(), "read csv table");
    Ok(rows)
}

/// Writes `rows` as CSV to a path or stream.
///
/// # Errors
///
/// Returns [`Error::Malformed`] unless `rows` is a list of lists of scalars
/// (or a rank-2 array), or I/O errors.
pub fn dump<'a>(rows: &Value, output: impl Into<Output<'a>>) -> Result<()> {
    let table = table_rows(rows)?;
    io::with_writer(output.into(), |w| write_rows(w, &table))
}

/// Formats `rows` as CSV text.
///
/// # Errors
///
/// As [`dump`].
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn dumps(rows: &Value) -> Result<String> {
    let table = table_rows(rows)?;
    let mut out = Vec::new();
    write_rows(&mut out, &table)?;
    String::from_utf8(out).map_err(|e| Error::parse("csv", e))
}

fn table_rows(rows: &Value) -> Result<Vec<Vec<Value>>> {
    match rows {
        Value::Array(rows) => rows
            .iter()
            .map(|row| match row {
                Value::Array(cells) => Ok(cells.clone()),
                _ => Err(Error::malformed("rows should be a list of lists")),
            })
            .collect(),
        #[cfg(feature = "ndarray")]
        Value::NdArray(arr) if arr.ndim() == 2 => table_rows(&arr.to_nested()),
        _ => Err(Error::malformed("rows should be a list of lists")),
    }
}

fn write_rows(writer: &mut dyn Write, rows: &[Vec<Value>]) -> Result<()> {
    let mut out = ::csv::WriterBuilder::new().flexible(true).from_writer(writer);
    for row in rows {
        let cells = row.iter().map(cell_text).collect::<Result<Vec<_>>>()?;
        out.write_record(&cells).map_err(|e| Error::parse("csv", e))?;
    }
    out.flush().map_err(|e| Error::io(&e.to_string()))
}

fn cell_text(cell: &Value) -> Result<String> {
    match cell {
        Value::Null => Ok(String::new()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(Number::Float(f)) => Ok(format!("{:?}", f)),
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(s.clone()),
        other => Err(Error::malformed(format!(
            "csv cells must be scalars, found {}",
            other.kind()
        ))),
    }
}

/// Produces the rows of a CSV table: optional header rows, then the body.
pub trait CsvSerializer {
    fn header(&self) -> Vec<Vec<Value>> {
        Vec::new()
    }

    /// # Errors
    ///
    /// Implementation-defined.
    fn body(&self) -> Result<Vec<Vec<Value>>>;

    /// Header rows followed by body rows.
    ///
    /// # Errors
    ///
    /// As [`CsvSerializer::body`].
    fn render(&self) -> Result<Vec<Vec<Value>>> {
        let mut rows = self.header();
        rows.extend(self.body()?);
        Ok(rows)
    }

    /// Writes the rendered rows with [`dump`].
    ///
    /// # Errors
    ///
    /// As [`CsvSerializer::render`] and [`dump`].
    fn dump<'a>(&self, output: impl Into<Output<'a>>) -> Result<()>
    where
        Self: Sized,
    {
        let rows = self
            .render()?
            .into_iter()
            .map(Value::Array)
            .collect::<Vec<_>>();
        dump(&Value::Array(rows), output)
    }
}

/// Serializes a collection of mappings that share the same keys.
///
/// The sorted keys become the columns. A listed collection gets one header
/// row of keys. A keyed collection (a mapping of mappings) gets a leading
/// empty column holding each item's key, emitted in `row_ordering` when given.
///
/// # Examples
///
/// ```rust
/// use ndserial::csv::{CsvCollectionSerializer, CsvSerializer};
/// use ndserial::value;
///
/// let people = value!([{"name": "ada", "age": 36}, {"age": 41, "name": "alan"}]);
/// let rows = CsvCollectionSerializer::new(people, None).unwrap().render().unwrap();
/// assert_eq!(rows[0], vec![value!("age"), value!("name")]);
/// assert_eq!(rows[2], vec![value!(41), value!("alan")]);
/// ```
#[derive(Clone, Debug)]
pub struct CsvCollectionSerializer {
    collection: Value,
    keys: Vec<String>,
    row_ordering: Option<Vec<String>>,
}

impl CsvCollectionSerializer {
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] if the collection is empty, holds a
    /// non-mapping item, or its items disagree on their keys.
    pub fn new(collection: Value, row_ordering: Option<Vec<String>>) -> Result<Self> {
        let keys = compute_keys(&collection)?;
        Ok(CsvCollectionSerializer {
            collection,
            keys,
            row_ordering,
        })
    }

    /// Column keys, sorted.
    #[must_use]
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    fn cells(&self, item: &Value) -> Vec<Value> {
        self.keys
            .iter()
            .map(|k| item.get(k).cloned().unwrap_or(Value::Null))
            .collect()
    }
}

fn items(collection: &Value) -> Result<Vec<(String, &Map)>> {
    let entries: Vec<(String, &Value)> = match collection {
        Value::Array(list) => list
            .iter()
            .enumerate()
            .map(|(i, item)| (i.to_string(), item))
            .collect(),
        Value::Object(map) => map.iter().map(|(k, item)| (k.clone(), item)).collect(),
        other => {
            return Err(Error::malformed(format!(
                "collection must be a list or mapping of mappings, found {}",
                other.kind()
            )))
        }
    };
    entries
        .into_iter()
        .map(|(key, item)| match item {
            Value::Object(map) => Ok((key, map)),
            other => Err(Error::malformed(format!(
                "Item {} is a {}, not a mapping",
                key,
                other.kind()
            ))),
        })
        .collect()
}

fn compute_keys(collection: &Value) -> Result<Vec<String>> {
    let items = items(collection)?;
    let Some((_, first)) = items.first() else {
        return Err(Error::malformed("collection is empty"));
    };
    let mut expected: Vec<String> = first.keys().cloned().collect();
    expected.sort();

    for (key, item) in &items {
        let mut got: Vec<String> = item.keys().cloned().collect();
        got.sort();
        if got != expected {
            return Err(Error::malformed(format!(
                "Item {} had different keys (got {}, expected {})",
                key,
                got.join(" "),
                expected.join(" ")
            )));
        }
    }
    Ok(expected)
}

impl CsvSerializer for CsvCollectionSerializer {
    fn header(&self) -> Vec<Vec<Value>> {
        let keys = self.keys.iter().map(|k| Value::from(k.as_str()));
        match self.collection {
            Value::Object(_) => vec![std::iter::once(Value::from("")).chain(keys).collect()],
            _ => vec![keys.collect()],
        }
    }

    fn body(&self) -> Result<Vec<Vec<Value>>> {
        match &self.collection {
            Value::Object(map) => {
                let ordering: Vec<String> = match &self.row_ordering {
                    Some(ordering) => ordering.clone(),
                    None => map.keys().cloned().collect(),
                };
                ordering
                    .iter()
                    .map(|key| {
                        let item = map.get(key).ok_or_else(|| {
                            Error::malformed(format!("row ordering names unknown item {}", key))
                        })?;
                        let mut row = vec![Value::from(key.as_str())];
                        row.extend(self.cells(item));
                        Ok(row)
                    })
                    .collect()
            }
            Value::Array(list) => Ok(list.iter().map(|item| self.cells(item)).collect()),
            _ => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value;

    #[test]
    fn test_header_row_length_mismatch() {
        let err = loads("a,b\n1,2\n3\n", &CsvOptions::new()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "malformed payload: Header row contains 2 items but line 3 contains 1"
        );
    }

    #[test]
    fn test_without_header_keys_by_index() {
        let rows = loads("x,y\n", &CsvOptions::new().without_header_row()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("0"), Some(&value!("x")));
        assert_eq!(rows[0].get("1"), Some(&value!("y")));
    }

    #[test]
    fn test_empty_input() {
        assert!(loads("", &CsvOptions::new()).unwrap().is_empty());
    }

    #[test]
    fn test_dump_requires_list_of_lists() {
        assert!(matches!(dumps(&value!({"a": 1})), Err(Error::Malformed(_))));
        assert!(matches!(dumps(&value!([1, 2])), Err(Error::Malformed(_))));
        assert!(matches!(dumps(&value!([[[1]]])), Err(Error::Malformed(_))));
    }

    #[test]
    fn test_cell_rendering() {
        let text = dumps(&value!([[null, true, 1.0, -2, "a,b"]])).unwrap();
        assert_eq!(text, ",true,1.0,-2,\"a,b\"\n");
    }

    #[cfg(feature = "ndarray")]
    #[test]
    fn test_dump_rank_two_array() {
        let arr = crate::NdArray::from_shape_vec(&[2, 2], vec![1i32, 2, 3, 4]).unwrap();
        assert_eq!(dumps(&Value::NdArray(arr)).unwrap(), "1,2\n3,4\n");
    }

    #[test]
    fn test_collection_keyed_rows() {
        let data = value!({
            "one": {"foo": "baz1", "bar": "inga1"},
            "three": {"foo": "baz3", "bar": "inga3"},
            "two": {"foo": "baz2", "bar": "inga2"}
        });
        let ordering = vec!["one".to_string(), "two".to_string(), "three".to_string()];
        let rows = CsvCollectionSerializer::new(data, Some(ordering))
            .unwrap()
            .render()
            .unwrap();
        let expected: Vec<Vec<Value>> = vec![
            vec![value!(""), value!("bar"), value!("foo")],
            vec![value!("one"), value!("inga1"), value!("baz1")],
            vec![value!("two"), value!("inga2"), value!("baz2")],
            vec![value!("three"), value!("inga3"), value!("baz3")],
        ];
        assert_eq!(rows, expected);
    }

    #[test]
    fn test_collection_inconsistent_keys() {
        let data = value!([{"a": 1, "b": 2}, {"a": 1}]);
        let err = CsvCollectionSerializer::new(data, None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "malformed payload: Item 1 had different keys (got a, expected a b)"
        );
    }

    #[test]
    fn test_collection_unknown_ordering_key() {
        let data = value!({"one": {"a": 1}});
        let serializer = CsvCollectionSerializer::new(data, Some(vec!["two".to_string()])).unwrap();
        assert!(matches!(serializer.render(), Err(Error::Malformed(_))));
    }

    #[test]
    fn test_collection_dump_to_stream() {
        let data = value!([{"b": 2, "a": 1}]);
        let mut out = Vec::new();
        CsvCollectionSerializer::new(data, None)
            .unwrap()
            .dump(&mut out)
            .unwrap();
        assert_eq!(out, b"a,b\n1,2\n");
    }
}
