//! Structured error handling and exit codes.

use serde::Serialize;

use crate::duplicates::FinderError;

/// Exit codes for the filesame application.
///
/// - 0: Success (completed normally, duplicates or matches found)
/// - 1: General error (unexpected failure)
/// - 2: No matches (completed normally, nothing reported)
/// - 3: Partial success (completed, but some files were skipped)
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: at least one duplicate class or match was reported.
    Success = 0,
    /// General error: An unexpected error occurred.
    GeneralError = 1,
    /// No matches: the run completed without a duplicate class or match.
    NoMatches = 2,
    /// Partial success: the run completed but some files were skipped.
    PartialSuccess = 3,
    /// Interrupted: the run was interrupted by user (Ctrl+C).
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "FS000",
            Self::GeneralError => "FS001",
            Self::NoMatches => "FS002",
            Self::PartialSuccess => "FS003",
            Self::Interrupted => "FS130",
        }
    }

    /// Exit code of a completed run.
    ///
    /// Skipped files take precedence over the found/not-found distinction.
    #[must_use]
    pub fn from_results(found: usize, skipped: usize) -> Self {
        if skipped > 0 {
            Self::PartialSuccess
        } else if found > 0 {
            Self::Success
        } else {
            Self::NoMatches
        }
    }

    /// Exit code for an error that ended the run.
    #[must_use]
    pub fn for_error(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<FinderError>() {
            Some(FinderError::Interrupted) => Self::Interrupted,
            _ => Self::GeneralError,
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "FS001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
