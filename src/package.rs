//! # Record Packages
//!
//! Builds the record package written when compiling with `package` set: one
//! container holding a record per process, plus metadata gathered from the
//! input release packages.
//!
//! Records are pulled from an iterator while the package is serialized, so a
//! writer holds one record at a time no matter how many processes there are.
//!
//! ## Metadata
//!
//! - `uri`, `publishedDate`: from [`PackageMetadata`], with fake placeholders
//!   applied.
//! - `publisher`: from [`PackageMetadata`] if any publisher field was given,
//!   otherwise the publisher of the last input package that had one.
//! - `version`: the version every input package declared.
//! - `license`, `publicationPolicy`: from the last input package that had
//!   them. Omitted if none did.
//! - `extensions`: the union of all input packages' extensions, in first-seen
//!   order. Omitted if empty.
//! - `packages`: the distinct `uri`s of the input packages, in first-seen
//!   order.

use std::cell::RefCell;
use std::io::Write;

use serde::ser::{Error as _, SerializeSeq};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::config::PackageMetadata;
use crate::error::{Error, Result};
use crate::output::OutputFormat;
use crate::store::StoredRelease;

/// Metadata gathered from the input release packages.
#[derive(Debug, Clone, Default)]
pub struct PackageSummary {
    uris: Vec<String>,
    extensions: Vec<Value>,
    license: Option<Value>,
    publication_policy: Option<Value>,
    publisher: Option<Value>,
}

impl PackageSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the metadata of one input release package.
    pub fn observe(&mut self, package: &Map<String, Value>) {
        let uri = package_uri(package);
        if !uri.is_empty() && !self.uris.iter().any(|seen| seen == uri) {
            self.uris.push(uri.to_string());
        }
        if let Some(Value::Array(extensions)) = package.get("extensions") {
            for extension in extensions {
                if !self.extensions.contains(extension) {
                    self.extensions.push(extension.clone());
                }
            }
        }
        if let Some(license) = package.get("license") {
            self.license = Some(license.clone());
        }
        if let Some(policy) = package.get("publicationPolicy") {
            self.publication_policy = Some(policy.clone());
        }
        if let Some(publisher) = package.get("publisher") {
            self.publisher = Some(publisher.clone());
        }
    }

    /// Distinct input package URIs, in first-seen order.
    pub fn uris(&self) -> &[String] {
        &self.uris
    }
}

/// The `uri` of an input package, or `""` if it has none.
pub fn package_uri(package: &Map<String, Value>) -> &str {
    package.get("uri").and_then(Value::as_str).unwrap_or_default()
}

/// One process in a record package.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub ocid: String,
    /// Full release bodies, or linked-release references
    pub releases: Vec<Value>,
    pub compiled_release: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub versioned_release: Option<Value>,
}

impl Record {
    /// Build a record from the stored releases of one process.
    ///
    /// With `linked`, each release is listed as a [`linked_release`]
    /// reference instead of its full body.
    pub fn new(
        ocid: impl Into<String>,
        releases: Vec<StoredRelease>,
        linked: bool,
        compiled_release: Value,
        versioned_release: Option<Value>,
    ) -> Self {
        let releases = releases
            .into_iter()
            .map(|stored| {
                if linked {
                    linked_release(&stored)
                } else {
                    stored.release
                }
            })
            .collect();
        Self {
            ocid: ocid.into(),
            releases,
            compiled_release,
            versioned_release,
        }
    }

    /// The record as a JSON object, keys in output order.
    pub fn into_value(self) -> Value {
        let mut record = Map::new();
        record.insert("ocid".to_string(), Value::String(self.ocid));
        record.insert("releases".to_string(), Value::Array(self.releases));
        record.insert("compiledRelease".to_string(), self.compiled_release);
        if let Some(versioned) = self.versioned_release {
            record.insert("versionedRelease".to_string(), versioned);
        }
        Value::Object(record)
    }
}

/// A `{url, date, tag}` reference to a release, where `url` is
/// `"<package uri>#<release id>"`.
pub fn linked_release(stored: &StoredRelease) -> Value {
    let id = match stored.release.get("id") {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };
    let field = |key: &str| stored.release.get(key).cloned().unwrap_or(Value::Null);

    let mut link = Map::new();
    link.insert(
        "url".to_string(),
        Value::String(format!("{}#{}", stored.uri, id)),
    );
    link.insert("date".to_string(), field("date"));
    link.insert("tag".to_string(), field("tag"));
    Value::Object(link)
}

/// Records serialized as a JSON array straight from an iterator.
///
/// The iterator is consumed by the first serialization. An error it yields
/// stops serialization and is kept for [`RecordPackage`] to return.
struct RecordStream<I> {
    records: RefCell<Option<I>>,
    error: RefCell<Option<Error>>,
}

impl<I> Serialize for RecordStream<I>
where
    I: Iterator<Item = Result<Value>>,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let records = self
            .records
            .borrow_mut()
            .take()
            .ok_or_else(|| S::Error::custom("records have already been written"))?;
        let mut seq = serializer.serialize_seq(None)?;
        for record in records {
            match record {
                Ok(record) => seq.serialize_element(&record)?,
                Err(err) => {
                    let message = err.to_string();
                    *self.error.borrow_mut() = Some(err);
                    return Err(S::Error::custom(message));
                }
            }
        }
        seq.end()
    }
}

/// A record package whose records are produced while it is written.
#[derive(Serialize)]
#[serde(
    rename_all = "camelCase",
    bound(serialize = "I: Iterator<Item = Result<Value>>")
)]
pub struct RecordPackage<'a, I>
where
    I: Iterator<Item = Result<Value>>,
{
    uri: &'a str,
    publisher: Value,
    published_date: &'a str,
    version: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    license: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    publication_policy: Option<&'a Value>,
    #[serde(skip_serializing_if = "<[Value]>::is_empty")]
    extensions: &'a [Value],
    packages: &'a [String],
    records: RecordStream<I>,
}

impl<I> RecordPackage<'_, I>
where
    I: Iterator<Item = Result<Value>>,
{
    /// Write the package followed by a newline, pulling one record at a time.
    pub fn write<W: Write>(self, writer: &mut W, format: &OutputFormat) -> Result<()> {
        let written = format.write(writer, &self);
        self.finish(written)
    }

    /// Collect the package into a single JSON value.
    pub fn into_value(self) -> Result<Value> {
        let value = to_value(&self);
        self.finish(value)
    }

    /// Prefer the error the records yielded over the serializer's report of it.
    fn finish<T>(self, result: Result<T>) -> Result<T> {
        match self.records.error.into_inner() {
            Some(err) => Err(err),
            None => result,
        }
    }
}

/// Assemble a record package around `records`, each a JSON record object.
///
/// Nothing is pulled from `records` until the package is written.
pub fn record_package<'a, I>(
    metadata: &'a PackageMetadata,
    summary: &'a PackageSummary,
    version: &'a str,
    records: I,
) -> Result<RecordPackage<'a, I::IntoIter>>
where
    I: IntoIterator<Item = Result<Value>>,
{
    let publisher = if metadata.publisher.is_empty() {
        summary
            .publisher
            .clone()
            .unwrap_or_else(|| Value::Object(Map::new()))
    } else {
        to_value(&metadata.publisher)?
    };

    Ok(RecordPackage {
        uri: metadata.resolved_uri(),
        publisher,
        published_date: metadata.resolved_published_date(),
        version,
        license: summary.license.as_ref(),
        publication_policy: summary.publication_policy.as_ref(),
        extensions: &summary.extensions,
        packages: &summary.uris,
        records: RecordStream {
            records: RefCell::new(Some(records.into_iter())),
            error: RefCell::new(None),
        },
    })
}

fn to_value<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|err| Error::Serialization {
        message: err.to_string(),
    })
}
