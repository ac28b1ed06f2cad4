//! # OCDS Toolkit CLI
//!
//! This is the binary entry point for the `ocds-toolkit` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Executing the appropriate command based on the parsed arguments.
//! - Handling top-level application errors: a failed run prints a single
//!   `Error: ...` diagnostic to stderr and exits with status 1.
//!
//! The compilation logic lives in the `ocds_toolkit` library crate, so the
//! binary stays a thin wrapper around it.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
