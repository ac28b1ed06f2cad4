//! Shared test utilities for end-to-end tests.
//!
//! This module provides release package fixtures and helpers for running the
//! `ocds-toolkit` binary against them.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     compile_cmd()
//!         .write_stdin(packages::MINIMAL)
//!         .assert()
//!         .success();
//! }
//! ```

use std::path::Path;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::{compile_cmd, expected, packages, stdout_json, TestFixture};
}

/// Release package fixtures.
#[allow(dead_code)]
pub mod packages {
    /// One release with only the fields needed to compile it.
    pub const MINIMAL: &str =
        r#"{"releases":[{"ocid":"x","id":"x-01","date":"2001-02-03T00:00:00Z","tag":["planning"]}]}"#;

    /// The first of two OCDS 1.1 packages: one release for each of two processes.
    pub const FIRST: &str = r#"{"uri":"http://example.com/release-package-1.json","publishedDate":"2001-02-03T00:00:00Z","publisher":{"name":"Example Publisher"},"version":"1.1","extensions":["https://example.com/extension-a.json"],"releases":[{"ocid":"ocds-1","id":"ocds-1-01","date":"2001-02-03T00:00:00Z","tag":["tender"],"tender":{"id":"t1","title":"Pens","status":"active"}},{"ocid":"ocds-2","id":"ocds-2-01","date":"2001-02-04T00:00:00Z","tag":["planning"],"buyer":{"name":"Ministerio de Economía"}}]}"#;

    /// The second OCDS 1.1 package: an update to the first process.
    pub const SECOND: &str = r#"{"uri":"http://example.com/release-package-2.json","publishedDate":"2001-02-06T00:00:00Z","publisher":{"name":"Example Publisher"},"license":"http://opendatacommons.org/licenses/pddl/1.0/","version":"1.1","extensions":["https://example.com/extension-a.json","https://example.com/extension-b.json"],"releases":[{"ocid":"ocds-1","id":"ocds-1-02","date":"2001-02-05T00:00:00Z","tag":["tenderUpdate"],"tender":{"status":"complete","documents":[{"id":"d1","title":"Notice"}]}}]}"#;

    /// An OCDS 1.0 package.
    pub const VERSION_1_0: &str = r#"{"uri":"http://example.com/release-package-3.json","version":"1.0","releases":[{"ocid":"ocds-1","id":"ocds-1-03","date":"2001-02-07T00:00:00Z","tag":["award"]}]}"#;

    /// `FIRST` followed by `SECOND`, one package per line.
    pub fn both() -> String {
        format!("{}\n{}\n", FIRST, SECOND)
    }
}

/// Expected output for the package fixtures.
#[allow(dead_code)]
pub mod expected {
    pub const MINIMAL: &str =
        r#"{"tag":["compiled"],"id":"x-2001-02-03T00:00:00Z","date":"2001-02-03T00:00:00Z","ocid":"x"}"#;

    /// Compiled release of `ocds-1` from both packages.
    pub const COMPILED_1: &str = r#"{"tag":["compiled"],"id":"ocds-1-2001-02-05T00:00:00Z","date":"2001-02-05T00:00:00Z","ocid":"ocds-1","tender":{"id":"t1","title":"Pens","status":"complete","documents":[{"id":"d1","title":"Notice"}]}}"#;

    /// Compiled release of `ocds-2` from both packages.
    pub const COMPILED_2: &str = r#"{"tag":["compiled"],"id":"ocds-2-2001-02-04T00:00:00Z","date":"2001-02-04T00:00:00Z","ocid":"ocds-2","buyer":{"name":"Ministerio de Economía"}}"#;

    /// Both compiled releases, one per line.
    pub fn compiled() -> String {
        format!("{}\n{}\n", COMPILED_1, COMPILED_2)
    }
}

/// A `compile` command for the `ocds-toolkit` binary.
#[allow(dead_code)]
pub fn compile_cmd() -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("ocds-toolkit");
    cmd.arg("compile");
    cmd.env_remove("OCDS_TOOLKIT_BACKEND");
    cmd.env_remove("OCDS_TOOLKIT_TMPDIR");
    cmd.env_remove("RUST_LOG");
    cmd.env_remove("RUST_BACKTRACE");
    cmd.env_remove("RUST_LIB_BACKTRACE");
    cmd
}

/// Parse each line of `stdout` as a JSON document.
#[allow(dead_code)]
pub fn stdout_json(stdout: &[u8]) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("stdout line is not JSON"))
        .collect()
}

/// A test fixture that provides a temporary directory, for the disk
/// backend's spill file.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Number of entries in the temporary directory.
    pub fn entries(&self) -> usize {
        std::fs::read_dir(self.path())
            .expect("Failed to read temp directory")
            .count()
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_creates_temp_dir() {
        let fixture = TestFixture::new();
        assert!(fixture.path().exists());
        assert_eq!(fixture.entries(), 0);
    }

    #[test]
    fn test_package_fixtures_are_valid_json() {
        for package in [packages::MINIMAL, packages::FIRST, packages::SECOND, packages::VERSION_1_0] {
            let value: serde_json::Value = serde_json::from_str(package).unwrap();
            assert!(value["releases"].is_array());
        }
    }

    #[test]
    fn test_expected_fixtures_are_valid_json() {
        for line in expected::compiled().lines().chain([expected::MINIMAL]) {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert_eq!(value["tag"][0], "compiled");
        }
    }
}
