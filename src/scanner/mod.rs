//! Per-file work: fingerprinting, streaming comparison and scratch buffers.
//!
//! This module provides functionality for:
//! - Content fingerprints (MD5 of a normalized byte stream)
//! - Direct two-file comparison without computing full digests
//! - Pluggable scratch memory for streaming I/O
//! - Reading path lists from arguments or standard input
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`buffer`]: Scratch buffer acquisition ([`BufferSource`])
//! - [`hasher`]: [`FileFingerprint`] construction and normalization
//! - [`comparator`]: [`streaming_equal`] for pairwise checks
//! - [`input`]: Path list collection
//!
//! # Example
//!
//! ```no_run
//! use filesame::scanner::{FileFingerprint, NormalizationConfig};
//! use std::path::Path;
//!
//! let config = NormalizationConfig::default().with_ignore_case(true);
//! let a = FileFingerprint::new(Path::new("a.txt"), &config).unwrap();
//! let b = FileFingerprint::new(Path::new("b.txt"), &config).unwrap();
//!
//! if a == b {
//!     println!("{} and {} match", a.path().display(), b.path().display());
//! }
//! ```

pub mod buffer;
pub mod comparator;
pub mod hasher;
pub mod input;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// Re-export main types
pub use buffer::{default_source, BufferSource, HeapBuffers, ScratchBuffer, SharedBuffer};
pub use comparator::{streaming_equal, streaming_equal_with_source};
pub use hasher::{hash_to_hex, Digest, FileFingerprint, DIGEST_LEN};
pub use input::{read_path_list, PathInput};

/// Default size of the per-pass work buffer.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Normalization applied identically to every side of a comparison.
///
/// `max_bytes == 0` means the whole stream is considered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizationConfig {
    /// Fold ASCII `A`-`Z` to lowercase before hashing or comparing.
    pub ignore_case: bool,
    /// Drop space, tab, CR and LF bytes entirely.
    pub ignore_whitespace: bool,
    /// Consider at most this many (normalized) bytes, 0 for unlimited.
    pub max_bytes: u64,
    /// Requested chunk size for streaming reads.
    pub buffer_size: usize,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            ignore_case: false,
            ignore_whitespace: false,
            max_bytes: 0,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl NormalizationConfig {
    /// Set case folding.
    #[must_use]
    pub fn with_ignore_case(mut self, enabled: bool) -> Self {
        self.ignore_case = enabled;
        self
    }

    /// Set whitespace removal.
    #[must_use]
    pub fn with_ignore_whitespace(mut self, enabled: bool) -> Self {
        self.ignore_whitespace = enabled;
        self
    }

    /// Set the byte cap (0 disables it).
    #[must_use]
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Set the requested buffer size. Zero is clamped to one byte.
    #[must_use]
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    /// The same normalization without a byte cap.
    ///
    /// This is the configuration used to re-verify clusters found under
    /// a truncated first pass.
    #[must_use]
    pub fn uncapped(self) -> Self {
        self.with_max_bytes(0)
    }

    /// Whether any byte-level transformation is requested.
    #[must_use]
    pub fn transforms_bytes(&self) -> bool {
        self.ignore_case || self.ignore_whitespace
    }
}

/// Errors that can occur while fingerprinting or comparing a file.
///
/// Every variant is terminal for the single operation that raised it.
#[derive(thiserror::Error, Debug)]
pub enum FileError {
    /// The file could not be opened for reading.
    #[error("Could not open {path}: {source}")]
    CannotOpen {
        /// Path that failed to open
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// File metadata could not be read.
    #[error("Could not stat {path}: {source}")]
    CannotStat {
        /// Path that failed to stat
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The buffer source returned no scratch memory.
    #[error("Could not allocate a {requested} byte buffer for {path}")]
    AllocationFailed {
        /// Path being processed
        path: PathBuf,
        /// Requested buffer size
        requested: usize,
    },

    /// The digest context could not be initialized.
    #[error("Could not initialize digest for {0}")]
    HashInitFailed(PathBuf),

    /// A chunk could not be fed to the digest.
    #[error("Digest update failed for {0}")]
    HashUpdateFailed(PathBuf),

    /// The digest could not be finalized.
    #[error("Digest finalization failed for {0}")]
    HashFinalizeFailed(PathBuf),

    /// Reading failed after the file was opened.
    #[error("Read error in {path}: {source}")]
    ReadFailed {
        /// Path being read
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl FileError {
    /// The path the failure is tied to.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::CannotOpen { path, .. }
            | Self::CannotStat { path, .. }
            | Self::AllocationFailed { path, .. }
            | Self::ReadFailed { path, .. } => path,
            Self::HashInitFailed(path)
            | Self::HashUpdateFailed(path)
            | Self::HashFinalizeFailed(path) => path,
        }
    }
}
