//! # Compile Command Implementation
//!
//! Reads release packages from standard input, merges the releases of each
//! contracting process and prints one compiled release per process, one
//! versioned release per process (`--versioned`), or a single record package
//! (`--package`).
//!
//! Nothing is printed until the whole input has been read: a process's
//! compiled release is only final once all its releases are known.
//!
//! ## Example
//!
//! ```bash
//! cat release-package-1.json release-package-2.json | ocds-toolkit compile --package --versioned
//! ```

use anyhow::Result;
use clap::{Args, ValueEnum};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use ocds_toolkit::compiler::compile;
use ocds_toolkit::config::{Backend, CompileOptions, PackageMetadata, Publisher};
use ocds_toolkit::reader::Items;

use crate::cli::GlobalArgs;

/// Grouping store backends for `--backend`
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StoreBackend {
    /// Keep all releases in memory
    Memory,
    /// Spill releases to a temporary file
    Disk,
}

impl From<StoreBackend> for Backend {
    fn from(backend: StoreBackend) -> Self {
        match backend {
            StoreBackend::Memory => Backend::Memory,
            StoreBackend::Disk => Backend::Disk,
        }
    }
}

/// Arguments for the compile command
#[derive(Args, Debug)]
pub struct CompileArgs {
    /// The path to the items to process within each input
    #[arg(long, value_name = "PATH")]
    pub root_path: Option<String>,

    /// Print versioned releases instead of compiled releases (with --package,
    /// add versioned releases to each record)
    #[arg(long)]
    pub versioned: bool,

    /// Wrap the output in a record package
    #[arg(long)]
    pub package: bool,

    /// With --package, use linked releases instead of full releases
    #[arg(long)]
    pub linked_releases: bool,

    /// Where to group releases while reading the input
    #[arg(
        long,
        value_enum,
        default_value = "memory",
        env = "OCDS_TOOLKIT_BACKEND"
    )]
    pub backend: StoreBackend,

    /// Directory for the disk backend's temporary file
    #[arg(long, value_name = "PATH", env = "OCDS_TOOLKIT_TMPDIR")]
    pub tmp_dir: Option<PathBuf>,

    /// Set the record package's uri to this value
    #[arg(long, value_name = "URI", default_value = "")]
    pub uri: String,

    /// Set the record package's publishedDate to this value
    #[arg(long, value_name = "DATE", default_value = "")]
    pub published_date: String,

    /// Set the record package's publisher's name to this value
    #[arg(long, value_name = "NAME")]
    pub publisher_name: Option<String>,

    /// Set the record package's publisher's uri to this value
    #[arg(long, value_name = "URI")]
    pub publisher_uri: Option<String>,

    /// Set the record package's publisher's scheme to this value
    #[arg(long, value_name = "SCHEME")]
    pub publisher_scheme: Option<String>,

    /// Set the record package's publisher's uid to this value
    #[arg(long, value_name = "UID")]
    pub publisher_uid: Option<String>,

    /// Set the record package's required metadata to dummy values
    #[arg(long)]
    pub fake: bool,
}

impl CompileArgs {
    fn options(self) -> CompileOptions {
        let non_empty = |value: Option<String>| value.filter(|v| !v.is_empty());
        CompileOptions {
            versioned: self.versioned,
            package: self.package,
            linked_releases: self.linked_releases,
            backend: self.backend.into(),
            tmp_dir: self.tmp_dir,
            metadata: PackageMetadata {
                uri: self.uri,
                published_date: self.published_date,
                publisher: Publisher {
                    name: non_empty(self.publisher_name),
                    uri: non_empty(self.publisher_uri),
                    scheme: non_empty(self.publisher_scheme),
                    uid: non_empty(self.publisher_uid),
                },
                fake: self.fake,
            },
        }
    }
}

/// Execute the compile command
pub fn execute(args: CompileArgs, global: GlobalArgs) -> Result<()> {
    let root_path = args.root_path.clone().unwrap_or_default();
    let options = args.options();

    let items = Items::new(io::stdin().lock(), global.encoding, &root_path);
    let mut compiler = compile(items, &options)?;

    let mut out = BufWriter::new(io::stdout().lock());
    compiler.write(&mut out, &global.format)?;
    out.flush()?;
    Ok(())
}
