//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

use ocds_toolkit::output::OutputFormat;
use ocds_toolkit::reader::Encoding;

use crate::commands;

/// OCDS Toolkit - Compile releases into compiled and versioned releases
#[derive(Parser, Debug)]
#[command(name = "ocds-toolkit")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Encoding of the input
    #[arg(long, global = true, value_enum, default_value = "utf-8")]
    encoding: InputEncoding,

    /// Pretty print the output
    #[arg(long, global = true)]
    pretty: bool,

    /// Print escape sequences instead of non-ASCII characters
    #[arg(long, global = true)]
    ascii: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    log_level: String,
}

/// Input encodings accepted by `--encoding`
#[derive(Debug, Clone, Copy, ValueEnum)]
enum InputEncoding {
    #[value(name = "utf-8", alias = "utf8")]
    Utf8,
    #[value(name = "iso-8859-1", alias = "latin-1")]
    Latin1,
}

impl From<InputEncoding> for Encoding {
    fn from(encoding: InputEncoding) -> Self {
        match encoding {
            InputEncoding::Utf8 => Encoding::Utf8,
            InputEncoding::Latin1 => Encoding::Latin1,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Read release packages from standard input, merge the releases of each
    /// process and print compiled releases (or a record package)
    Compile(commands::compile::CompileArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

/// Settings shared by every command that reads and writes JSON.
#[derive(Debug, Clone, Copy)]
pub struct GlobalArgs {
    pub encoding: Encoding,
    pub format: OutputFormat,
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        // RUST_LOG takes precedence over --log-level.
        let _ = env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(&self.log_level),
        )
        .format_timestamp(None)
        .try_init();

        let global = GlobalArgs {
            encoding: self.encoding.into(),
            format: OutputFormat {
                pretty: self.pretty,
                ascii: self.ascii,
            },
        };

        match self.command {
            Commands::Compile(args) => commands::compile::execute(args, global),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}
