//! JSON output formatter for grouping and matching results.
//!
//! Provides machine-readable JSON output for scripting and automation.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "classes": [
//!     {
//!       "digest": "5d41402abc4b2a76b9719d911017c592",
//!       "files": ["a.txt", "b.txt"]
//!     }
//!   ],
//!   "unique": ["c.txt"],
//!   "summary": {
//!     "total_files": 3,
//!     "skipped_files": 0,
//!     "duplicate_classes": 1,
//!     "duplicate_files": 2,
//!     "scan_duration_ms": 4,
//!     "exit_code": 0,
//!     "exit_code_name": "FS000"
//!   }
//! }
//! ```
//!
//! # Example
//!
//! ```
//! use filesame::duplicates::{GroupingOutcome, ScanSummary};
//! use filesame::output::json::JsonOutput;
//! use filesame::error::ExitCode;
//!
//! let output = JsonOutput::new(
//!     &GroupingOutcome::default(),
//!     &ScanSummary::default(),
//!     ExitCode::NoMatches,
//!     false,
//! );
//! let json = output.to_json().unwrap();
//! assert!(json.starts_with('{'));
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::duplicates::{
    EquivalenceClass, GroupingOutcome, GroupingStats, MatchSummary, ScanSummary,
};
use crate::error::ExitCode;

/// A single equivalence class in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonClass {
    /// MD5 digest as lowercase hexadecimal (32 characters)
    pub digest: String,
    /// Member paths, representative first
    pub files: Vec<String>,
}

impl JsonClass {
    /// Create a JSON class from an [`EquivalenceClass`].
    #[must_use]
    pub fn from_class(class: &EquivalenceClass) -> Self {
        Self {
            digest: class.digest_hex(),
            files: class.paths().map(path_string).collect(),
        }
    }
}

/// Grouping summary in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Number of input paths
    pub total_files: usize,
    /// Paths that could not be examined
    pub skipped_files: usize,
    /// Size bucketing statistics, absent when the size check did not run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_stats: Option<GroupingStats>,
    /// Fingerprints computed in the primary pass
    pub fingerprinted: usize,
    /// Fingerprints computed in the refining pass
    pub refined: usize,
    /// Files proven unique without a full fingerprint
    pub known_unique: usize,
    /// Classes with more than one file
    pub duplicate_classes: usize,
    /// Files in classes with more than one file
    pub duplicate_files: usize,
    /// Duration of the run in milliseconds
    pub scan_duration_ms: u64,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "FS000")
    pub exit_code_name: String,
}

impl JsonSummary {
    /// Create a JSON summary from a [`ScanSummary`] and an exit code.
    #[must_use]
    pub fn from_scan_summary(summary: &ScanSummary, exit_code: ExitCode) -> Self {
        Self {
            total_files: summary.total_files,
            skipped_files: summary.skipped_files,
            size_stats: summary.size_stats.clone(),
            fingerprinted: summary.fingerprinted,
            refined: summary.refined,
            known_unique: summary.known_unique,
            duplicate_classes: summary.duplicate_classes,
            duplicate_files: summary.duplicate_files,
            scan_duration_ms: summary.scan_duration.as_millis() as u64,
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
        }
    }
}

/// Complete JSON output of a grouping run.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// Reported classes
    pub classes: Vec<JsonClass>,
    /// Known-unique paths (only with `show_all`)
    pub unique: Vec<String>,
    /// Run statistics
    pub summary: JsonSummary,
}

impl JsonOutput {
    /// Build the output for a grouping run.
    ///
    /// Without `show_all` only classes with more than one file are kept
    /// and `unique` is empty.
    #[must_use]
    pub fn new(
        outcome: &GroupingOutcome,
        summary: &ScanSummary,
        exit_code: ExitCode,
        show_all: bool,
    ) -> Self {
        let classes = outcome
            .classes
            .iter()
            .filter(|class| show_all || class.has_duplicates())
            .map(JsonClass::from_class)
            .collect();
        let unique = if show_all {
            outcome.unique.iter().map(|p| path_string(p)).collect()
        } else {
            Vec::new()
        };
        Self {
            classes,
            unique,
            summary: JsonSummary::from_scan_summary(summary, exit_code),
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        write_json(self, writer, pretty)
    }
}

/// Match summary in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonMatchSummary {
    /// Number of candidate paths
    pub candidates: usize,
    /// Candidates rejected by length alone
    pub size_rejected: usize,
    /// Candidates read and compared
    pub compared: usize,
    /// Candidates equal to the reference
    pub matched: usize,
    /// Candidates that could not be examined
    pub skipped_files: usize,
    /// Duration of the run in milliseconds
    pub scan_duration_ms: u64,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "FS000")
    pub exit_code_name: String,
}

/// Complete JSON output of a match run.
#[derive(Debug, Clone, Serialize)]
pub struct JsonMatchOutput {
    /// The reference file
    pub reference: String,
    /// Matching candidates in input order
    pub matches: Vec<String>,
    /// Run statistics
    pub summary: JsonMatchSummary,
}

impl JsonMatchOutput {
    /// Build the output for a match run.
    #[must_use]
    pub fn new(
        reference: &Path,
        matches: &[PathBuf],
        summary: &MatchSummary,
        exit_code: ExitCode,
    ) -> Self {
        Self {
            reference: path_string(reference),
            matches: matches.iter().map(|p| path_string(p)).collect(),
            summary: JsonMatchSummary {
                candidates: summary.candidates,
                size_rejected: summary.size_rejected,
                compared: summary.compared,
                matched: summary.matched,
                skipped_files: summary.skipped.len(),
                scan_duration_ms: summary.scan_duration.as_millis() as u64,
                exit_code: exit_code.as_i32(),
                exit_code_name: exit_code.code_prefix().to_string(),
            },
        }
    }

    /// Write JSON to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        write_json(self, writer, pretty)
    }
}

fn write_json<T: Serialize, W: Write>(
    value: &T,
    writer: &mut W,
    pretty: bool,
) -> Result<(), JsonOutputError> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    writer.write_all(json.as_bytes())?;
    writer.write_all(b"\n")?;
    Ok(())
}

/// Paths are reported as given; they are the caller's own input.
fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
