// src/cli.rs
// =============================================================================
// Command-line interface, defined with clap's derive API.
//
// Every tunable is an Option here so that a value from the config file can
// fill the gap; defaults live in config.rs, not in clap attributes. That way
// "flag not given" and "flag given with the default value" stay distinct.
// =============================================================================

use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "check-links",
    version,
    about = "Validate links, anchors and orphaned pages in a Markdown documentation tree",
    long_about = "check-links parses every Markdown file under the given roots, builds the \
                  cross-document link graph and reports broken local paths, missing anchors, \
                  unreachable external URLs and documents no entry point links to.\n\n\
                  Exit codes: 0 = clean, 1 = issues found, 2 = fatal error."
)]
pub struct Cli {
    /// Directories (or single Markdown files) to scan
    #[arg(required = true, value_name = "ROOT")]
    pub roots: Vec<PathBuf>,

    /// Glob of paths to skip, relative to the repository root (repeatable)
    ///
    /// Example: --ignore 'vendor/**' --ignore 'site/**'
    #[arg(long, value_name = "GLOB")]
    pub ignore: Vec<String>,

    /// Entry point for orphan detection (repeatable)
    ///
    /// Defaults to every README.md / index.md found.
    #[arg(long, value_name = "PATH")]
    pub entry: Vec<String>,

    /// File holding external URL verdicts between runs
    #[arg(long, value_name = "PATH")]
    pub cache_file: Option<PathBuf>,

    /// How long a cached verdict stays valid, in seconds
    #[arg(long, value_name = "SECS")]
    pub cache_ttl_secs: Option<u64>,

    /// Per-request timeout for external checks
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Wall-clock budget for all external checks together
    #[arg(long, value_name = "SECS")]
    pub deadline_secs: Option<u64>,

    /// Maximum number of external checks in flight
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub max_concurrency: Option<u64>,

    /// Retries for transient failures (timeouts, 429, 5xx)
    #[arg(long, value_name = "N")]
    pub max_retries: Option<u32>,

    /// File of hosts or URL prefixes that are never checked
    #[arg(long, value_name = "PATH")]
    pub allow_list: Option<PathBuf>,

    /// Config file (default: .check-links.toml in the repository root, if present)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Skip every external URL check
    #[arg(long)]
    pub offline: bool,

    /// Print one JSON object per issue instead of the grouped summary
    #[arg(long)]
    pub json: bool,

    /// More logging on stderr (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}
