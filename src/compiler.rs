//! # Compiler
//!
//! Drives a compilation run from input items to output documents.
//!
//! ## Lifecycle
//!
//! A [`Compiler`] moves through [`CompilerState`] in one direction:
//!
//! 1. **Idle**: created, grouping store opened, nothing read.
//! 2. **Reading**: [`Compiler::read`] consumes release packages. Each
//!    package's version is checked by the [`VersionGuard`] before its releases
//!    are stored, and its metadata is collected for record-package output.
//! 3. **Merging**: [`Compiler::outputs`] drains the grouping store. Groups are
//!    merged in first-seen `ocid` order and each group's document is yielded
//!    as soon as it is merged: a compiled or versioned release, or with
//!    `package` a record. [`Compiler::write`] wraps the records in a single
//!    record package while writing them, so only one group is held at a time.
//! 4. **Done** or **Failed**: terminal. Documents already yielded stay
//!    yielded.
//!
//! Output cannot start earlier: a process's compiled release is only final
//! once every release of the process has been read.

use std::io::Write;

use log::{debug, info};
use serde_json::Value;

use crate::config::CompileOptions;
use crate::error::{Error, Result};
use crate::merge::Merger;
use crate::output::OutputFormat;
use crate::package::{package_uri, record_package, PackageSummary, Record, RecordPackage};
use crate::store::{self, GroupingStore, Groups, ReleaseGroup, StoredRelease};
use crate::version::{VersionGuard, DEFAULT_VERSION};

/// Phase of a compilation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompilerState {
    Idle,
    Reading,
    Merging,
    Done,
    /// The run stopped with the given error message.
    Failed(String),
}

/// One compilation run.
pub struct Compiler {
    options: CompileOptions,
    store: Box<dyn GroupingStore>,
    guard: VersionGuard,
    summary: PackageSummary,
    state: CompilerState,
    packages: usize,
    releases: usize,
}

impl Compiler {
    /// Create a compiler and its grouping store.
    ///
    /// Fails with [`Error::Storage`] if the store cannot be created.
    pub fn new(options: CompileOptions) -> Result<Self> {
        let store = store::open(&options)?;
        debug!("opened {:?} grouping store", options.backend);
        Ok(Self {
            options,
            store,
            guard: VersionGuard::new(),
            summary: PackageSummary::new(),
            state: CompilerState::Idle,
            packages: 0,
            releases: 0,
        })
    }

    pub fn state(&self) -> &CompilerState {
        &self.state
    }

    /// Read release packages from `items`.
    ///
    /// May be called more than once before [`Compiler::outputs`]; item
    /// numbering continues across calls. Stops at the first error, which
    /// leaves the compiler in [`CompilerState::Failed`].
    pub fn read<I>(&mut self, items: I) -> Result<()>
    where
        I: IntoIterator<Item = Result<Value>>,
    {
        self.ensure_open()?;
        self.state = CompilerState::Reading;

        for item in items {
            if let Err(err) = item.and_then(|package| self.add_package(package)) {
                return Err(self.fail(err));
            }
        }

        info!(
            "read {} packages with {} releases for {} processes",
            self.packages,
            self.releases,
            self.store.len()
        );
        Ok(())
    }

    /// Drain the grouping store and yield the output documents.
    ///
    /// With `package`, each document is one record; use [`Compiler::write`]
    /// or [`Outputs::into_record_package`] to wrap them in a record package.
    pub fn outputs(&mut self) -> Result<Outputs<'_>> {
        self.ensure_open()?;
        self.state = CompilerState::Merging;

        let groups = match self.store.groups() {
            Ok(groups) => groups,
            Err(err) => {
                self.state = CompilerState::Failed(err.to_string());
                return Err(err);
            }
        };
        Ok(Outputs {
            groups,
            options: &self.options,
            summary: &self.summary,
            version: self.guard.version().unwrap_or(DEFAULT_VERSION),
            state: &mut self.state,
            merged: 0,
        })
    }

    /// Drain the grouping store and write every output document to `writer`.
    ///
    /// With `package`, a single record package is written, its records
    /// merged one group at a time as they are serialized.
    pub fn write<W: Write>(&mut self, writer: &mut W, format: &OutputFormat) -> Result<()> {
        let package = self.options.package;
        let outputs = self.outputs()?;
        if package {
            return outputs.into_record_package()?.write(writer, format);
        }
        for document in outputs {
            format.write(writer, &document?)?;
        }
        Ok(())
    }

    /// Reading and draining are only possible before the store is drained.
    fn ensure_open(&self) -> Result<()> {
        let message = match &self.state {
            CompilerState::Idle | CompilerState::Reading => return Ok(()),
            CompilerState::Merging | CompilerState::Done => {
                "grouping store has already been drained".to_string()
            }
            CompilerState::Failed(reason) => format!("compilation already failed: {}", reason),
        };
        Err(Error::Storage { message })
    }

    fn fail(&mut self, err: Error) -> Error {
        self.state = CompilerState::Failed(err.to_string());
        err
    }

    fn add_package(&mut self, item: Value) -> Result<()> {
        self.packages += 1;
        let index = self.packages;
        let invalid = |message: String| Error::InvalidItem { index, message };

        let Value::Object(mut package) = item else {
            return Err(invalid("expected a release package (JSON object)".to_string()));
        };

        let version = match package.get("version") {
            None => DEFAULT_VERSION,
            Some(Value::String(version)) => version.as_str(),
            Some(other) => return Err(invalid(format!("version must be a string, not {}", other))),
        };
        self.guard.observe(index, version)?;

        let releases = match package.remove("releases") {
            Some(Value::Array(releases)) => releases,
            _ => return Err(invalid("expected a \"releases\" array".to_string())),
        };
        let ocids = releases
            .iter()
            .enumerate()
            .map(|(position, release)| match release.get("ocid") {
                Some(Value::String(ocid)) => Ok(ocid.clone()),
                _ => Err(invalid(format!("release {} has no ocid", position))),
            })
            .collect::<Result<Vec<_>>>()?;

        self.summary.observe(&package);
        let uri = package_uri(&package);
        debug!("item {}: {} releases", index, releases.len());

        for (ocid, release) in ocids.iter().zip(releases) {
            self.store.put(ocid, StoredRelease::new(uri, release))?;
            self.releases += 1;
        }
        Ok(())
    }
}

/// Output documents of a compilation run, produced while the grouping store
/// drains.
pub struct Outputs<'a> {
    groups: Groups<'a>,
    options: &'a CompileOptions,
    summary: &'a PackageSummary,
    version: &'a str,
    state: &'a mut CompilerState,
    merged: usize,
}

impl<'a> Outputs<'a> {
    /// Wrap the remaining documents, which are records in `package` mode, in a
    /// record package. Records are merged as the package is written.
    pub fn into_record_package(self) -> Result<RecordPackage<'a, Self>> {
        let options: &'a CompileOptions = self.options;
        let (summary, version) = (self.summary, self.version);
        record_package(&options.metadata, summary, version, self)
    }

    fn compile_group(&mut self, group: ReleaseGroup) -> Value {
        let ReleaseGroup { ocid, releases } = group;
        let mut merger = Merger::new(ocid.as_str(), self.options.versioned);
        for stored in &releases {
            merger.merge(&stored.release);
        }
        debug!("merged {} releases for {}", merger.len(), ocid);
        self.merged += 1;

        if self.options.package {
            let versioned = self.options.versioned.then(|| merger.versioned());
            Record::new(
                ocid,
                releases,
                self.options.linked_releases,
                merger.compiled(),
                versioned,
            )
            .into_value()
        } else if self.options.versioned {
            merger.versioned()
        } else {
            merger.compiled()
        }
    }
}

impl Iterator for Outputs<'_> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if *self.state != CompilerState::Merging {
            return None;
        }
        match self.groups.next() {
            Some(Ok(group)) => Some(Ok(self.compile_group(group))),
            Some(Err(err)) => {
                *self.state = CompilerState::Failed(err.to_string());
                Some(Err(err))
            }
            None => {
                info!("compiled {} processes", self.merged);
                *self.state = CompilerState::Done;
                None
            }
        }
    }
}

/// Create a compiler for `options` and read every item into it.
///
/// The returned compiler is ready for [`Compiler::outputs`].
pub fn compile<I>(items: I, options: &CompileOptions) -> Result<Compiler>
where
    I: IntoIterator<Item = Result<Value>>,
{
    let mut compiler = Compiler::new(options.clone())?;
    compiler.read(items)?;
    Ok(compiler)
}

/// Compile every item and collect the output documents.
pub fn compile_all<I>(items: I, options: &CompileOptions) -> Result<Vec<Value>>
where
    I: IntoIterator<Item = Result<Value>>,
{
    let mut compiler = compile(items, options)?;
    let outputs = compiler.outputs()?;
    if options.package {
        let package = outputs.into_record_package()?.into_value()?;
        return Ok(vec![package]);
    }
    outputs.collect()
}
