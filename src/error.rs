//! # Error Handling
//!
//! This module defines the centralized error type for the `ocds-toolkit`
//! library. It uses the `thiserror` library to create an `Error` enum that
//! covers every way a compilation run can fail, with messages that tell the
//! user what went wrong and, where possible, how to fix it.
//!
//! ## Key Components
//!
//! - **`Error`**: The enum of all failure modes. Every variant is fatal for
//!   the run that produced it: the input is a single deterministic pass, so
//!   nothing is retried.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! The variants fall into three groups:
//!
//! - Input problems: `Decoding`, `Encoding`, `InvalidItem`.
//! - Cross-document consistency: `VersionMismatch`.
//! - Resource problems: `Storage`, `Io`, `Serialization`.

use thiserror::Error;

/// Main error type for ocds-toolkit operations
#[derive(Error, Debug)]
pub enum Error {
    /// An input item is not well-formed JSON.
    ///
    /// `line` and `column` locate the failure in the input stream.
    #[error("JSON error: {message} at line {line} column {column}")]
    Decoding {
        line: usize,
        column: usize,
        message: String,
    },

    /// Input bytes cannot be interpreted under the declared text encoding.
    ///
    /// `position` is the absolute byte offset of the first undecodable byte.
    #[error("encoding error: can't decode byte 0x{byte:02x} in position {position}: {reason}\nTry saving the inputs as UTF-8?")]
    Encoding {
        position: u64,
        byte: u8,
        reason: String,
    },

    /// A package declares a different schema version than the first package.
    ///
    /// `index` is the 1-based position of the offending input item.
    #[error(
        "item {index}: version error: this package uses version {actual}, but earlier packages used version {expected}\n\
         Try first upgrading packages to the same version:\n  \
         cat file [file ...] | ocds-toolkit upgrade {actual}:{expected} | ocds-toolkit compile --package --versioned"
    )]
    VersionMismatch {
        index: usize,
        expected: String,
        actual: String,
    },

    /// An input item is valid JSON but not a usable release package.
    #[error("item {index}: {message}")]
    InvalidItem { index: usize, message: String },

    /// The grouping store could not be created, written or read.
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error occurred while serializing output.
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
