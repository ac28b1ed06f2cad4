//! # Output Formatting
//!
//! Serializes output documents as JSON, one document per line.
//!
//! ## Options
//!
//! - `pretty`: indent nested values by two spaces instead of writing each
//!   document on a single line.
//! - `ascii`: escape every non-ASCII character as `\uXXXX`, using a UTF-16
//!   surrogate pair for characters outside the Basic Multilingual Plane.
//!
//! Key order is whatever the document holds; nothing is sorted.
//!
//! ## Usage
//!
//! ```
//! use ocds_toolkit::output::OutputFormat;
//! use serde_json::json;
//!
//! let format = OutputFormat { pretty: false, ascii: true };
//! let mut out = Vec::new();
//! format.write(&mut out, &json!({"name": "Econom\u{ed}a"})).unwrap();
//! assert_eq!(out, b"{\"name\":\"Econom\\u00eda\"}\n");
//! ```

use std::io::{self, Write};

use serde::Serialize;
use serde_json::ser::{CompactFormatter, Formatter, PrettyFormatter};
use serde_json::{Serializer, Value};

use crate::error::{Error, Result};

/// How documents are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputFormat {
    /// Indent by two spaces
    pub pretty: bool,
    /// Escape non-ASCII characters
    pub ascii: bool,
}

impl OutputFormat {
    /// Write `document` followed by a newline.
    pub fn write<W, T>(&self, writer: &mut W, document: &T) -> Result<()>
    where
        W: Write,
        T: Serialize + ?Sized,
    {
        match (self.pretty, self.ascii) {
            (false, false) => serialize(&mut *writer, CompactFormatter, document)?,
            (false, true) => serialize(&mut *writer, AsciiFormatter(CompactFormatter), document)?,
            (true, false) => serialize(&mut *writer, PrettyFormatter::new(), document)?,
            (true, true) => {
                serialize(&mut *writer, AsciiFormatter(PrettyFormatter::new()), document)?
            }
        }
        writer.write_all(b"\n")?;
        Ok(())
    }

    /// Render `document` as a string, without the trailing newline.
    pub fn to_string(&self, document: &Value) -> Result<String> {
        let mut buffer = Vec::new();
        self.write(&mut buffer, document)?;
        buffer.pop();
        String::from_utf8(buffer).map_err(|err| Error::Serialization {
            message: err.to_string(),
        })
    }
}

fn serialize<W, F, T>(writer: W, formatter: F, document: &T) -> Result<()>
where
    W: Write,
    F: Formatter,
    T: Serialize + ?Sized,
{
    let mut serializer = Serializer::with_formatter(writer, formatter);
    document.serialize(&mut serializer).map_err(|err| {
        if err.is_io() {
            Error::Io(io::Error::from(err))
        } else {
            Error::Serialization {
                message: err.to_string(),
            }
        }
    })
}

/// Formatter that escapes non-ASCII characters in strings and delegates
/// layout to the wrapped formatter.
struct AsciiFormatter<F>(F);

impl<F: Formatter> Formatter for AsciiFormatter<F> {
    fn write_string_fragment<W: ?Sized + Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        let mut start = 0;
        for (offset, ch) in fragment.char_indices() {
            if ch.is_ascii() {
                continue;
            }
            writer.write_all(&fragment.as_bytes()[start..offset])?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{:04x}", unit)?;
            }
            start = offset + ch.len_utf8();
        }
        writer.write_all(&fragment.as_bytes()[start..])
    }

    fn begin_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.begin_array(writer)
    }

    fn end_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.0.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.begin_object(writer)
    }

    fn end_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.0.begin_object_key(writer, first)
    }

    fn end_object_key<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_object_key(writer)
    }

    fn begin_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_object_value(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(pretty: bool, ascii: bool, document: &Value) -> String {
        OutputFormat { pretty, ascii }.to_string(document).unwrap()
    }

    #[test]
    fn test_compact_keeps_key_order() {
        let document = json!({"tag": ["compiled"], "id": "x", "ocid": "x"});
        assert_eq!(
            render(false, false, &document),
            r#"{"tag":["compiled"],"id":"x","ocid":"x"}"#
        );
    }

    #[test]
    fn test_write_appends_newline() {
        let mut out = Vec::new();
        OutputFormat::default().write(&mut out, &json!([1])).unwrap();
        OutputFormat::default().write(&mut out, &json!([2])).unwrap();
        assert_eq!(out, b"[1]\n[2]\n");
    }

    #[test]
    fn test_pretty_indents_two_spaces() {
        let document = json!({"ocid": "x", "tag": ["compiled"]});
        assert_eq!(
            render(true, false, &document),
            "{\n  \"ocid\": \"x\",\n  \"tag\": [\n    \"compiled\"\n  ]\n}"
        );
    }

    #[test]
    fn test_non_ascii_is_kept_by_default() {
        assert_eq!(render(false, false, &json!("Econom\u{ed}a")), "\"Econom\u{ed}a\"");
    }

    #[test]
    fn test_ascii_escapes_basic_plane() {
        assert_eq!(render(false, true, &json!("Econom\u{ed}a")), r#""Econom\u00eda""#);
    }

    #[test]
    fn test_ascii_escapes_surrogate_pairs() {
        assert_eq!(render(false, true, &json!("\u{1F600}")), r#""\ud83d\ude00""#);
    }

    #[test]
    fn test_ascii_escapes_keys_and_keeps_control_escapes() {
        assert_eq!(
            render(false, true, &json!({"n\u{f1}": "a\n\u{e9}"})),
            r#"{"n\u00f1":"a\n\u00e9"}"#
        );
    }

    #[test]
    fn test_pretty_ascii_combined() {
        assert_eq!(
            render(true, true, &json!({"a": ["\u{e9}"]})),
            "{\n  \"a\": [\n    \"\\u00e9\"\n  ]\n}"
        );
    }
}
