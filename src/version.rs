//! # Package Version Guard
//!
//! Merge semantics are not guaranteed to be stable across OCDS schema
//! versions, so every package compiled in one run must declare the same
//! version. The [`VersionGuard`] records the version of the first package it
//! sees and rejects any later package that declares a different one.
//!
//! Versions are compared as plain strings: `"1.0"` and `"1.1"` are different
//! even though one is a prefix of the other, and nothing is normalized.
//!
//! A package without a `version` field is an OCDS 1.0 package; callers pass
//! [`DEFAULT_VERSION`] for it.

use crate::error::{Error, Result};

/// The version implied by a package that has no `version` field.
pub const DEFAULT_VERSION: &str = "1.0";

/// Tracks the schema version of the packages in one compilation run.
#[derive(Debug, Clone, Default)]
pub struct VersionGuard {
    reference: Option<String>,
}

impl VersionGuard {
    /// Create a guard that has not seen any package yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe the version declared by the input item at 1-based `index`.
    ///
    /// The first call records `version` as the reference. Later calls fail
    /// with [`Error::VersionMismatch`] if `version` differs from it.
    pub fn observe(&mut self, index: usize, version: &str) -> Result<()> {
        match &self.reference {
            None => {
                self.reference = Some(version.to_string());
                Ok(())
            }
            Some(expected) if expected == version => Ok(()),
            Some(expected) => Err(Error::VersionMismatch {
                index,
                expected: expected.clone(),
                actual: version.to_string(),
            }),
        }
    }

    /// The reference version, once a package has been observed.
    pub fn version(&self) -> Option<&str> {
        self.reference.as_deref()
    }
}
