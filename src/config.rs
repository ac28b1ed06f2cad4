//! # Compilation Options
//!
//! This module defines the settings that control a compilation run. The CLI
//! builds a [`CompileOptions`] from its arguments (and their environment
//! variable fallbacks); library callers construct one directly.
//!
//! ## Key Components
//!
//! - **`CompileOptions`**: What to produce (compiled or versioned releases,
//!   bare or wrapped in a record package) and which grouping backend to use.
//!
//! - **`Backend`**: The grouping store implementation. The choice is explicit
//!   and made once, when the run starts.
//!
//! - **`PackageMetadata`** / **`Publisher`**: Metadata written on the record
//!   package when `package` is set.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Placeholder `uri` used when fake package metadata is requested.
pub const FAKE_URI: &str = "placeholder:";

/// Placeholder `publishedDate` used when fake package metadata is requested.
pub const FAKE_PUBLISHED_DATE: &str = "9999-01-01T00:00:00Z";

/// Grouping store implementation used during a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Keep every release in process memory. Fastest for small inputs.
    #[default]
    Memory,
    /// Spill releases to a temporary file and keep only an offset index in
    /// memory. For inputs that do not fit in memory.
    Disk,
}

/// The publisher block of a record package.
///
/// Only fields that were provided are serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publisher {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}

impl Publisher {
    /// Returns true if no publisher field was provided.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.scheme.is_none() && self.uid.is_none() && self.uri.is_none()
    }
}

/// Metadata for the record package produced when `package` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageMetadata {
    /// The package's `uri`.
    pub uri: String,
    /// The package's `publishedDate`.
    pub published_date: String,
    /// The package's `publisher`. When empty, the publisher of the last input
    /// package is used instead.
    pub publisher: Publisher,
    /// Fill a missing `uri` and `publishedDate` with placeholder values.
    pub fake: bool,
}

impl PackageMetadata {
    /// The `uri` to write, after applying fake defaults.
    pub fn resolved_uri(&self) -> &str {
        if self.fake && self.uri.is_empty() {
            FAKE_URI
        } else {
            &self.uri
        }
    }

    /// The `publishedDate` to write, after applying fake defaults.
    pub fn resolved_published_date(&self) -> &str {
        if self.fake && self.published_date.is_empty() {
            FAKE_PUBLISHED_DATE
        } else {
            &self.published_date
        }
    }
}

/// Settings for one compilation run.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Produce versioned releases (field histories) in addition to, or in
    /// place of, compiled releases.
    pub versioned: bool,
    /// Wrap the output in a single record package.
    pub package: bool,
    /// With `package`, list `{url, date, tag}` references instead of full
    /// release bodies.
    pub linked_releases: bool,
    /// Which grouping store to use.
    pub backend: Backend,
    /// Directory for the disk backend's spill file. Defaults to the system
    /// temporary directory.
    pub tmp_dir: Option<PathBuf>,
    /// Record package metadata, used when `package` is set.
    pub metadata: PackageMetadata,
}
