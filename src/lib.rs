//! # OCDS Toolkit Library
//!
//! This library compiles Open Contracting Data Standard (OCDS) releases. It
//! reads release packages, groups their releases by contracting process
//! (`ocid`), and merges each group into a compiled release (the current state
//! of the process) and, optionally, a versioned release (the history of every
//! field). It backs the `ocds-toolkit` command-line tool.
//!
//! ## Quick Example
//!
//! ```
//! use ocds_toolkit::compiler::compile_all;
//! use ocds_toolkit::config::CompileOptions;
//! use serde_json::json;
//!
//! let packages = vec![
//!     json!({"version": "1.1", "releases": [
//!         {"ocid": "ocds-213czf-1", "id": "1", "date": "2001-02-03T00:00:00Z",
//!          "tag": ["tender"], "tender": {"title": "Pens", "status": "active"}}
//!     ]}),
//!     json!({"version": "1.1", "releases": [
//!         {"ocid": "ocds-213czf-1", "id": "2", "date": "2001-02-04T00:00:00Z",
//!          "tag": ["tenderUpdate"], "tender": {"status": "complete"}}
//!     ]}),
//! ];
//!
//! let documents = compile_all(packages.into_iter().map(Ok), &CompileOptions::default()).unwrap();
//! assert_eq!(documents.len(), 1);
//! assert_eq!(documents[0]["tender"]["title"], "Pens");
//! assert_eq!(documents[0]["tender"]["status"], "complete");
//! ```
//!
//! ## Core Concepts
//!
//! - **Item source (`reader`)**: Turns a byte stream into JSON values,
//!   handling text encoding and concatenated documents.
//! - **Version guard (`version`)**: Rejects inputs that mix schema versions.
//! - **Grouping store (`store`)**: Collects releases by `ocid`, in memory or
//!   in a temporary file.
//! - **Merge engine (`merge`)**: Folds the releases of one process into
//!   compiled and versioned releases.
//! - **Compiler (`compiler`)**: Orchestrates a run from input items to output
//!   documents.
//! - **Record packages (`package`)**: Wraps the output in a record package.
//! - **Output (`output`)**: Writes documents as compact, pretty or
//!   ASCII-only JSON.
//!
//! ## Execution Flow
//!
//! 1.  **Reading**: Each release package is checked against the version of the
//!     first package, and its releases are appended to their `ocid`'s group.
//! 2.  **Merging**: Once the input is exhausted, groups are merged in the order
//!     their `ocid` was first seen.
//! 3.  **Output**: Each merged group yields a compiled or versioned release, or
//!     a record in one record package.

pub mod compiler;
pub mod config;
pub mod error;
pub mod merge;
pub mod output;
pub mod package;
pub mod reader;
pub mod store;
pub mod version;

#[cfg(test)]
mod merge_proptest;
