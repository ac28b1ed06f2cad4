//! # Input Items
//!
//! Turns a byte stream (usually standard input) into a lazy sequence of JSON
//! values, one per input item.
//!
//! ## Pipeline
//!
//! 1. **Decoding**: bytes are checked (UTF-8) or transcoded (Latin-1) while
//!    they stream through. Undecodable bytes fail with [`Error::Encoding`] and
//!    the absolute byte position.
//! 2. **Parsing**: concatenated or whitespace-separated JSON values are parsed
//!    one at a time with `serde_json`'s stream deserializer. Malformed JSON
//!    fails with [`Error::Decoding`] and the line and column.
//! 3. **Selection**: an optional root path picks the items inside each value.
//!    Path segments are object keys, and the segment `item` stands for every
//!    element of an array: `item` selects the elements of a top-level array,
//!    `packages.item` those of a `packages` array.
//! 4. **Flattening**: a selected value that is an array yields each of its
//!    elements as a separate item.

use std::collections::VecDeque;
use std::fmt;
use std::io::{self, BufReader, Read};

use serde_json::de::IoRead;
use serde_json::{StreamDeserializer, Value};

use crate::error::{Error, Result};

const CHUNK_SIZE: usize = 8 * 1024;

/// Path segment that selects every element of an array.
pub const ARRAY_ITEM: &str = "item";

/// Text encoding of the input bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Encoding {
    #[default]
    Utf8,
    /// ISO-8859-1, transcoded to UTF-8 before parsing
    Latin1,
}

/// Undecodable input byte, carried through `io::Error` from the decoding
/// reader to the item iterator.
#[derive(Debug)]
struct InvalidByte {
    position: u64,
    byte: u8,
    reason: &'static str,
}

impl fmt::Display for InvalidByte {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "can't decode byte 0x{:02x} in position {}: {}",
            self.byte, self.position, self.reason
        )
    }
}

impl std::error::Error for InvalidByte {}

/// Reader that passes through bytes only once they are known to be valid
/// UTF-8.
///
/// A multi-byte sequence split across two reads of the inner reader is held
/// back until it is complete.
pub struct Utf8Validator<R> {
    inner: R,
    ready: Vec<u8>,
    cursor: usize,
    /// Start of an incomplete sequence at the end of the last chunk
    partial: Vec<u8>,
    /// Absolute offset of the first byte of `partial`
    position: u64,
    eof: bool,
}

impl<R: Read> Utf8Validator<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            ready: Vec::new(),
            cursor: 0,
            partial: Vec::new(),
            position: 0,
            eof: false,
        }
    }

    fn invalid(position: u64, byte: u8, reason: &'static str) -> io::Error {
        io::Error::new(
            io::ErrorKind::InvalidData,
            InvalidByte {
                position,
                byte,
                reason,
            },
        )
    }
}

impl<R: Read> Read for Utf8Validator<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        loop {
            if self.cursor < self.ready.len() {
                let n = out.len().min(self.ready.len() - self.cursor);
                out[..n].copy_from_slice(&self.ready[self.cursor..self.cursor + n]);
                self.cursor += n;
                return Ok(n);
            }
            if self.eof {
                return match self.partial.first() {
                    None => Ok(0),
                    Some(&byte) => Err(Self::invalid(
                        self.position,
                        byte,
                        "unexpected end of data",
                    )),
                };
            }

            let mut chunk = std::mem::take(&mut self.partial);
            let start = chunk.len();
            chunk.resize(start + CHUNK_SIZE, 0);
            let n = self.inner.read(&mut chunk[start..])?;
            chunk.truncate(start + n);
            if n == 0 {
                self.eof = true;
                self.partial = chunk;
                continue;
            }

            let valid = match std::str::from_utf8(&chunk) {
                Ok(_) => chunk.len(),
                Err(err) => {
                    let valid = err.valid_up_to();
                    if err.error_len().is_some() {
                        let byte = chunk[valid];
                        let reason = if (0xc2..=0xf4).contains(&byte) {
                            "invalid continuation byte"
                        } else {
                            "invalid start byte"
                        };
                        return Err(Self::invalid(self.position + valid as u64, byte, reason));
                    }
                    valid
                }
            };
            self.partial = chunk.split_off(valid);
            self.position += valid as u64;
            self.ready = chunk;
            self.cursor = 0;
        }
    }
}

/// Reader that transcodes ISO-8859-1 bytes to UTF-8.
pub struct Latin1Decoder<R> {
    inner: R,
    ready: Vec<u8>,
    cursor: usize,
}

impl<R: Read> Latin1Decoder<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            ready: Vec::new(),
            cursor: 0,
        }
    }
}

impl<R: Read> Read for Latin1Decoder<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if self.cursor == self.ready.len() {
            let mut chunk = [0u8; CHUNK_SIZE];
            let n = self.inner.read(&mut chunk)?;
            if n == 0 {
                return Ok(0);
            }
            self.ready.clear();
            self.cursor = 0;
            let mut buf = [0u8; 4];
            for &byte in &chunk[..n] {
                let encoded = char::from(byte).encode_utf8(&mut buf);
                self.ready.extend_from_slice(encoded.as_bytes());
            }
        }
        let n = out.len().min(self.ready.len() - self.cursor);
        out[..n].copy_from_slice(&self.ready[self.cursor..self.cursor + n]);
        self.cursor += n;
        Ok(n)
    }
}

/// Wrap `reader` so that it yields UTF-8 bytes.
pub fn decode<'a, R: Read + 'a>(reader: R, encoding: Encoding) -> Box<dyn Read + 'a> {
    match encoding {
        Encoding::Utf8 => Box::new(BufReader::new(Utf8Validator::new(reader))),
        Encoding::Latin1 => Box::new(BufReader::new(Latin1Decoder::new(reader))),
    }
}

/// Lazy iterator over the input items of a byte stream.
///
/// Yields at most one error, after which it is exhausted.
pub struct Items<'a> {
    stream: StreamDeserializer<'a, IoRead<Box<dyn Read + 'a>>, Value>,
    path: Vec<String>,
    pending: VecDeque<Value>,
    failed: bool,
}

impl<'a> Items<'a> {
    /// Read items from `reader`, decoded with `encoding`, selecting the
    /// values at `root_path` (dot-separated, empty for the top level).
    pub fn new<R: Read + 'a>(reader: R, encoding: Encoding, root_path: &str) -> Self {
        Self {
            stream: serde_json::Deserializer::from_reader(decode(reader, encoding)).into_iter(),
            path: root_path
                .split('.')
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .collect(),
            pending: VecDeque::new(),
            failed: false,
        }
    }
}

impl Iterator for Items<'_> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(value) = self.pending.pop_front() {
                return Some(Ok(value));
            }
            if self.failed {
                return None;
            }
            match self.stream.next()? {
                Ok(value) => {
                    let mut selected = Vec::new();
                    select(value, &self.path, &mut selected);
                    for value in selected {
                        match value {
                            Value::Array(items) => self.pending.extend(items),
                            other => self.pending.push_back(other),
                        }
                    }
                }
                Err(err) => {
                    self.failed = true;
                    return Some(Err(input_error(err)));
                }
            }
        }
    }
}

/// Collect the values at `path` within `value`. Missing keys select nothing.
fn select(value: Value, path: &[String], out: &mut Vec<Value>) {
    let Some((segment, rest)) = path.split_first() else {
        out.push(value);
        return;
    };
    match value {
        Value::Array(items) if segment == ARRAY_ITEM => {
            for item in items {
                select(item, rest, out);
            }
        }
        Value::Object(mut map) => {
            if let Some(child) = map.remove(segment) {
                select(child, rest, out);
            }
        }
        _ => {}
    }
}

/// Convert a parse failure into a decoding or encoding error.
fn input_error(err: serde_json::Error) -> Error {
    if err.is_io() {
        let err = io::Error::from(err);
        if let Some(invalid) = err
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<InvalidByte>())
        {
            return Error::Encoding {
                position: invalid.position,
                byte: invalid.byte,
                reason: invalid.reason.to_string(),
            };
        }
        return Error::Io(err);
    }

    let text = err.to_string();
    let message = match text.rsplit_once(" at line ") {
        Some((message, _)) => message.to_string(),
        None => text,
    };
    Error::Decoding {
        line: err.line(),
        column: err.column(),
        message,
    }
}
