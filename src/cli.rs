//! Command-line interface definitions for filesame.
//!
//! Global options (verbosity, error format, config file) come first, then
//! one of two subcommands.
//!
//! # Example
//!
//! ```bash
//! # Group files by content
//! filesame group *.txt
//!
//! # Ignore case and whitespace, print digests, comma separated
//! filesame group -i -w -p -s , src/*.c
//!
//! # Cheap 4 KiB pass first, full verification only for collisions
//! find . -type f | filesame group -2 -m 4KiB -
//!
//! # Which files equal a reference?
//! filesame match -f original.txt copies/*
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::duplicates::Backend;

/// Find files with identical content.
///
/// Files are compared by an MD5 digest of their content, optionally after
/// ASCII case folding, whitespace removal, or truncation to a byte cap.
#[derive(Debug, Parser)]
#[command(name = "filesame")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print errors as JSON objects on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Read settings from this TOML file instead of the default location
    #[arg(long, global = true, value_name = "PATH", env = "FILESAME_CONFIG")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Group files into classes of equal content
    Group(GroupArgs),
    /// List files equal to one reference file
    Match(MatchArgs),
}

/// Normalization and pre-filter flags shared by both subcommands.
#[derive(Debug, Clone, Default, Args)]
pub struct CompareArgs {
    /// Treat ASCII upper and lower case letters as equal
    #[arg(short = 'i', long)]
    pub ignore_case: bool,

    /// Ignore spaces, tabs, carriage returns and newlines entirely
    #[arg(short = 'w', long)]
    pub ignore_whitespace: bool,

    /// Only consider the first SIZE (normalized) bytes of each file
    ///
    /// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
    #[arg(short = 'm', long, value_name = "SIZE", value_parser = parse_size)]
    pub max_bytes: Option<u64>,

    /// Size of the read buffer per pass (default 1024)
    ///
    /// Supports suffixes: B, KB, KiB, MB, MiB
    #[arg(short = 'b', long, value_name = "SIZE", value_parser = parse_size)]
    pub buffer_size: Option<u64>,

    /// Do not use file lengths to rule out candidates
    #[arg(short = 'n', long)]
    pub no_size_check: bool,
}

/// Arguments for the group subcommand.
#[derive(Debug, Args)]
pub struct GroupArgs {
    /// Files to compare; a single '-' reads newline-delimited paths from stdin
    #[arg(value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    #[command(flatten)]
    pub compare: CompareArgs,

    /// Fingerprint only the first --max-bytes, then verify collisions in full
    #[arg(short = '2', long)]
    pub two_stage: bool,

    /// Print each class's MD5 digest before its paths
    #[arg(short = 'p', long)]
    pub print_digest: bool,

    /// String placed between fields of a line (default: a single space)
    #[arg(short = 's', long, value_name = "SEP")]
    pub separator: Option<String>,

    /// Also print files that have no duplicate
    #[arg(short = 'a', long)]
    pub all: bool,

    /// Class map used for grouping
    #[arg(long, value_enum)]
    pub backend: Option<Backend>,

    /// Output format
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,
}

/// Arguments for the match subcommand.
#[derive(Debug, Args)]
pub struct MatchArgs {
    /// Reference file every candidate is compared against
    #[arg(short = 'f', long = "file", value_name = "REF")]
    pub reference: PathBuf,

    /// Candidate files; a single '-' reads newline-delimited paths from stdin
    #[arg(value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    #[command(flatten)]
    pub compare: CompareArgs,

    /// Output format
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,
}

/// Output format for results.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Separator-joined lines
    #[default]
    Text,
    /// JSON output for scripting
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Parse a human-readable size string into bytes.
///
/// Supports the following formats:
/// - Plain numbers: "1024" (bytes)
/// - Decimal suffixes: "1KB", "1MB", "1GB", "1TB" (powers of 1000)
/// - Binary suffixes: "1KiB", "1MiB", "1GiB", "1TiB" (powers of 1024)
///
/// # Examples
///
/// ```
/// use filesame::cli::parse_size;
///
/// assert_eq!(parse_size("1024").unwrap(), 1024);
/// assert_eq!(parse_size("4KiB").unwrap(), 4096);
/// assert_eq!(parse_size("1MB").unwrap(), 1_000_000);
/// ```
///
/// # Errors
///
/// Returns an error string if the input is not a valid size format.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }

    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1_000,
        "KIB" => 1_024,
        "MB" | "M" => 1_000_000,
        "MIB" => 1_048_576,
        "GB" | "G" => 1_000_000_000,
        "GIB" => 1_073_741_824,
        "TB" | "T" => 1_000_000_000_000,
        "TIB" => 1_099_511_627_776,
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    Ok((num * multiplier as f64) as u64)
}
