//! Path-or-stream resolution for the `load`/`dump` functions.
//!
//! Every format accepts either a filesystem path or a caller-owned stream.
//! Paths are opened and closed here. Caller streams are used as they are,
//! left open, and flushed after writing.
//!
//! ```rust
//! use ndserial::{json, value, DecodeOptions, EncodeOptions};
//! use std::io::Cursor;
//!
//! let mut buffer = Vec::new();
//! json::dump(&value!(["streaming API"]), &mut buffer, &EncodeOptions::new()).unwrap();
//! assert_eq!(buffer, br#"["streaming API"]"#);
//!
//! let mut cursor = Cursor::new(buffer);
//! let back = json::load(&mut cursor, &DecodeOptions::new()).unwrap();
//! assert_eq!(back, value!(["streaming API"]));
//! ```

use crate::{Error, Result};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Where to read a document from.
pub enum Input<'a> {
    Path(PathBuf),
    Stream(&'a mut dyn Read),
}

/// Where to write a document to.
pub enum Output<'a> {
    Path(PathBuf),
    Stream(&'a mut dyn Write),
}

macro_rules! path_conversions {
    ($target:ident: $($source:ty),*) => {
        $(
            impl From<$source> for $target<'_> {
                fn from(path: $source) -> Self {
                    $target::Path(PathBuf::from(path))
                }
            }
        )*
    };
}

path_conversions!(Input: &str, String, &Path, PathBuf, &PathBuf);
path_conversions!(Output: &str, String, &Path, PathBuf, &PathBuf);

impl<'a, R: Read + 'a> From<&'a mut R> for Input<'a> {
    fn from(stream: &'a mut R) -> Self {
        Input::Stream(stream)
    }
}

impl<'a, W: Write + 'a> From<&'a mut W> for Output<'a> {
    fn from(stream: &'a mut W) -> Self {
        Output::Stream(stream)
    }
}

impl fmt::Debug for Input<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Input::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Input::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl fmt::Debug for Output<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Output::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

fn io_error(path: &Path, e: std::io::Error) -> Error {
    Error::io(&format!("{}: {}", path.display(), e))
}

/// Runs `f` on a reader for `input`.
pub(crate) fn with_reader<T>(
    input: Input<'_>,
    f: impl FnOnce(&mut dyn Read) -> Result<T>,
) -> Result<T> {
    match input {
        Input::Path(path) => {
            tracing::debug!(path = %path.display(), "opening for read");
            let file = File::open(&path).map_err(|e| io_error(&path, e))?;
            f(&mut BufReader::new(file))
        }
        Input::Stream(stream) => f(stream),
    }
}

/// Runs `f` on a writer for `output`, flushing afterwards.
pub(crate) fn with_writer<T>(
    output: Output<'_>,
    f: impl FnOnce(&mut dyn Write) -> Result<T>,
) -> Result<T> {
    match output {
        Output::Path(path) => {
            tracing::debug!(path = %path.display(), "opening for write");
            let file = File::create(&path).map_err(|e| io_error(&path, e))?;
            let mut writer = BufWriter::new(file);
            let result = f(&mut writer)?;
            writer.flush().map_err(|e| io_error(&path, e))?;
            Ok(result)
        }
        Output::Stream(stream) => {
            let result = f(&mut *stream)?;
            stream.flush().map_err(|e| Error::io(&e.to_string()))?;
            Ok(result)
        }
    }
}

pub(crate) fn read_string(reader: &mut dyn Read) -> Result<String> {
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .map_err(|e| Error::io(&e.to_string()))?;
    Ok(text)
}

pub(crate) fn read_bytes(reader: &mut dyn Read) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|e| Error::io(&e.to_string()))?;
    Ok(bytes)
}

pub(crate) fn write_all(writer: &mut dyn Write, bytes: &[u8]) -> Result<()> {
    writer
        .write_all(bytes)
        .map_err(|e| Error::io(&e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    struct CountingWriter {
        bytes: Vec<u8>,
        flushes: usize,
    }

    impl Write for CountingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.bytes.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.flushes += 1;
            Ok(())
        }
    }

    #[test]
    fn test_stream_is_flushed_and_left_usable() {
        let mut sink = CountingWriter {
            bytes: Vec::new(),
            flushes: 0,
        };
        with_writer(Output::from(&mut sink), |w| write_all(w, b"abc")).unwrap();
        assert_eq!(sink.flushes, 1);
        sink.write_all(b"d").unwrap();
        assert_eq!(sink.bytes, b"abcd");
    }

    #[test]
    fn test_path_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        with_writer(Output::from(&path), |w| write_all(w, b"hello")).unwrap();
        let text = with_reader(Input::from(&path), read_string).unwrap();
        assert_eq!(text, "hello");
    }

    #[test]
    fn test_missing_path_is_io_error() {
        let err = with_reader(Input::from("/definitely/not/here.json"), read_string).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_reader_stream() {
        let mut cursor = Cursor::new(b"bytes".to_vec());
        let bytes = with_reader(Input::from(&mut cursor), read_bytes).unwrap();
        assert_eq!(bytes, b"bytes");
    }
}
