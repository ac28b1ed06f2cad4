//! # Merge Engine
//!
//! Folds every release of one contracting process into a compiled release
//! (the current state) and, on request, a versioned release (the history of
//! every field).
//!
//! ## Merge Rules
//!
//! Releases are merged in the order they arrived, not sorted by `date`. Two
//! releases may share a date, and arrival order is the only deterministic
//! tie-break. A release that arrives later wins even if its `date` is earlier.
//!
//! Starting from an empty accumulator, each release is merged field by field:
//!
//! - The top-level `ocid`, `id`, `date` and `tag` are release metadata. They
//!   are not merged as content.
//! - Scalars and `null` are replaced by the later value.
//! - Objects are merged key by key. A key missing from a later release is
//!   kept: a release can replace or add fields, never remove them.
//! - Arrays whose items are all objects with an `id` are merged by identity.
//!   Items with a known `id` are merged in place; new items are appended.
//! - Any other array (empty, scalars, objects without a uniform `id`) is
//!   replaced wholesale.
//!
//! ## Output
//!
//! The compiled release starts with the synthesized fields `tag`
//! (`["compiled"]`), `id` (`"{ocid}-{date}"`), `date` and `ocid`, followed by
//! the merged content. `date` is the date of the last release that has one.
//!
//! The versioned release keeps `ocid` as a plain value and replaces each leaf
//! with its history: one `{releaseID, releaseDate, releaseTag, value}` entry
//! per release that set a different value, in merge order. If a path
//! changes shape (say a string becomes an object and then a string again),
//! the leaf's history still starts at the first release that set the path,
//! with earlier object or array states recorded as whole values.
//!
//! ## Example
//!
//! ```
//! use ocds_toolkit::merge::merge;
//! use serde_json::json;
//!
//! let releases = vec![
//!     json!({"ocid": "x", "id": "1", "date": "2001-02-03T00:00:00Z", "tag": ["tender"],
//!            "tender": {"title": "Pens", "status": "active"}}),
//!     json!({"ocid": "x", "id": "2", "date": "2001-02-04T00:00:00Z", "tag": ["tenderUpdate"],
//!            "tender": {"status": "complete"}}),
//! ];
//!
//! let compiled = merge("x", &releases);
//! assert_eq!(compiled["id"], "x-2001-02-04T00:00:00Z");
//! assert_eq!(compiled["tender"], json!({"title": "Pens", "status": "complete"}));
//! ```

mod tree;

use log::warn;
use serde_json::{Map, Value};

use tree::{compiled_fields, merge_fields, versioned_fields, Node, OrderedMap, Source};

/// Top-level release fields that describe the release rather than the process.
pub const METADATA_FIELDS: [&str; 4] = ["ocid", "id", "date", "tag"];

/// Accumulates the releases of one process.
#[derive(Debug, Clone)]
pub struct Merger {
    ocid: String,
    history: bool,
    fields: OrderedMap<Node>,
    date: Option<Value>,
    count: usize,
}

impl Merger {
    /// Create a merger for `ocid`. With `history`, leaf histories are kept
    /// so that [`Merger::versioned`] can be rendered.
    pub fn new(ocid: impl Into<String>, history: bool) -> Self {
        Self {
            ocid: ocid.into(),
            history,
            fields: OrderedMap::default(),
            date: None,
            count: 0,
        }
    }

    /// Merge the next release. Releases that are not JSON objects carry no
    /// fields and are skipped.
    pub fn merge(&mut self, release: &Value) {
        let Some(map) = release.as_object() else {
            warn!("skipping non-object release for {}", self.ocid);
            return;
        };
        self.count += 1;

        let null = Value::Null;
        let date = map.get("date").unwrap_or(&null);
        if date.is_null() {
            warn!(
                "release {} of {} has no date",
                map.get("id").unwrap_or(&null),
                self.ocid
            );
        } else {
            self.date = Some(date.clone());
        }

        let source = Source {
            seq: self.count,
            id: map.get("id").unwrap_or(&null),
            date,
            tag: map.get("tag").unwrap_or(&null),
            history: self.history,
        };
        merge_fields(&mut self.fields, map, &source, &METADATA_FIELDS);
    }

    /// Number of releases merged so far.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns true if no release has been merged.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The compiled release for the releases merged so far.
    pub fn compiled(&self) -> Value {
        let mut output = Map::new();
        output.insert("tag".to_string(), Value::from(vec!["compiled"]));
        match &self.date {
            Some(date) => {
                let date_text = match date {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                };
                output.insert(
                    "id".to_string(),
                    Value::String(format!("{}-{}", self.ocid, date_text)),
                );
                output.insert("date".to_string(), date.clone());
            }
            None => {
                output.insert("id".to_string(), Value::String(self.ocid.clone()));
            }
        }
        output.insert("ocid".to_string(), Value::String(self.ocid.clone()));
        output.extend(compiled_fields(&self.fields));
        Value::Object(output)
    }

    /// The versioned release for the releases merged so far. Histories are
    /// only populated if the merger was created with `history`.
    pub fn versioned(&self) -> Value {
        let mut output = Map::new();
        output.insert("ocid".to_string(), Value::String(self.ocid.clone()));
        output.extend(versioned_fields(&self.fields, false));
        Value::Object(output)
    }
}

/// Merge `releases` in order into a compiled release.
pub fn merge(ocid: &str, releases: &[Value]) -> Value {
    let mut merger = Merger::new(ocid, false);
    for release in releases {
        merger.merge(release);
    }
    merger.compiled()
}

/// Merge `releases` in order into a versioned release.
pub fn merge_versioned(ocid: &str, releases: &[Value]) -> Value {
    let mut merger = Merger::new(ocid, true);
    for release in releases {
        merger.merge(release);
    }
    merger.versioned()
}
