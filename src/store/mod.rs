//! # Grouping Store
//!
//! The grouping store collects releases by their process identifier (`ocid`)
//! while the input is being read, and hands each group over to the merge
//! engine once the input is exhausted.
//!
//! ## Contract
//!
//! - [`GroupingStore::put`] appends a release to the group for an `ocid`,
//!   creating the group on first sight. Arrival order within a group is kept.
//! - [`GroupingStore::groups`] drains the store, yielding groups in the order
//!   their `ocid` was first seen. This order decides output order, so it is
//!   deterministic for a given input.
//!
//! ## Backends
//!
//! - [`MemoryStore`]: everything in process memory.
//! - [`DiskStore`]: release bodies spilled to an anonymous temporary file,
//!   with only an offset index held in memory.
//!
//! Both backends produce identical groups for identical input. The choice is
//! a resource trade-off made once per run through [`open`].

mod disk;
mod memory;

pub use disk::DiskStore;
pub use memory::MemoryStore;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{Backend, CompileOptions};
use crate::error::Result;

/// A release as held by the grouping store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRelease {
    /// The `uri` of the release package the release arrived in.
    pub uri: String,
    /// The release document, untouched.
    pub release: Value,
}

impl StoredRelease {
    pub fn new(uri: impl Into<String>, release: Value) -> Self {
        Self {
            uri: uri.into(),
            release,
        }
    }
}

/// All releases for one `ocid`, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseGroup {
    pub ocid: String,
    pub releases: Vec<StoredRelease>,
}

/// Iterator over drained groups.
pub type Groups<'a> = Box<dyn Iterator<Item = Result<ReleaseGroup>> + 'a>;

/// A store that groups releases by `ocid`.
pub trait GroupingStore {
    /// Append `release` to the group for `ocid`.
    fn put(&mut self, ocid: &str, release: StoredRelease) -> Result<()>;

    /// Number of distinct groups currently held.
    fn len(&self) -> usize;

    /// Returns true if the store holds no groups.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drain the store, yielding groups in first-seen `ocid` order.
    fn groups(&mut self) -> Result<Groups<'_>>;
}

/// Create the grouping store selected by `options`.
///
/// Fails before any input is consumed if the store cannot be created.
pub fn open(options: &CompileOptions) -> Result<Box<dyn GroupingStore>> {
    match options.backend {
        Backend::Memory => Ok(Box::new(MemoryStore::new())),
        Backend::Disk => Ok(Box::new(DiskStore::new(options.tmp_dir.as_deref())?)),
    }
}
