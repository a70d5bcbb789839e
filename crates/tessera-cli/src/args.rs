//! Command-line argument definitions for the Tessera CLI.
//!
//! Arguments select the scene to replay, where the resulting report goes,
//! the engine configuration file and the logging verbosity.

use clap::Parser;
use log::LevelFilter;

/// Command-line arguments for the Tessera scene runner
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the scene file (TOML)
    #[arg(help = "Path to the scene file")]
    pub input: String,

    /// Path to the report file; the report is printed when omitted
    #[arg(short, long)]
    pub output: Option<String>,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Fail when an action reports an error
    #[arg(long)]
    pub strict: bool,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: LevelFilter,
}
