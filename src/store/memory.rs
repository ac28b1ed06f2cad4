//! In-memory grouping store

use std::collections::HashMap;

use super::{GroupingStore, Groups, ReleaseGroup, StoredRelease};
use crate::error::Result;

/// Grouping store that keeps every release in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// `ocid`s in first-seen order
    order: Vec<String>,
    groups: HashMap<String, Vec<StoredRelease>>,
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl GroupingStore for MemoryStore {
    fn put(&mut self, ocid: &str, release: StoredRelease) -> Result<()> {
        match self.groups.get_mut(ocid) {
            Some(group) => group.push(release),
            None => {
                self.order.push(ocid.to_string());
                self.groups.insert(ocid.to_string(), vec![release]);
            }
        }
        Ok(())
    }

    fn len(&self) -> usize {
        self.order.len()
    }

    fn groups(&mut self) -> Result<Groups<'_>> {
        let order = std::mem::take(&mut self.order);
        let mut groups = std::mem::take(&mut self.groups);

        Ok(Box::new(order.into_iter().map(move |ocid| {
            let releases = groups.remove(&ocid).unwrap_or_default();
            Ok(ReleaseGroup { ocid, releases })
        })))
    }
}
