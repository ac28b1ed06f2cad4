//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the
//! `ocds-toolkit` command-line tool. Each subcommand is defined in its own
//! file.
//!
//! ## Structure
//!
//! Each command module contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and performs the
//!   command's logic by calling into the `ocds_toolkit` library.

pub mod compile;
pub mod completions;
