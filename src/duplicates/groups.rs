//! Size bucketing and equivalence class types.
//!
//! # Overview
//!
//! [`SizeIndex`] is the cheap first pass of batch grouping. Files of
//! different declared length cannot be byte-identical, so only buckets
//! with two or more members need to be opened and fingerprinted. The
//! index never stats anything itself; callers stat each path once and
//! decide what to do with failures.
//!
//! # Example
//!
//! ```
//! use filesame::duplicates::SizeIndex;
//! use std::path::PathBuf;
//!
//! let index = SizeIndex::from_sizes(vec![
//!     (PathBuf::from("/a.txt"), 100),
//!     (PathBuf::from("/b.txt"), 100),
//!     (PathBuf::from("/c.txt"), 200),
//! ]);
//!
//! assert_eq!(index.candidate_buckets().count(), 1);
//! assert_eq!(index.unique_paths(), vec![PathBuf::from("/c.txt")]);
//! assert_eq!(index.stats().eliminated_unique, 1);
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::scanner::{hash_to_hex, FileFingerprint};

/// Paths bucketed by exact declared length.
#[derive(Debug, Clone, Default)]
pub struct SizeIndex {
    buckets: BTreeMap<u64, Vec<PathBuf>>,
    total_files: usize,
    total_size: u64,
}

impl SizeIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from already-stat'ed paths.
    #[must_use]
    pub fn from_sizes(entries: impl IntoIterator<Item = (PathBuf, u64)>) -> Self {
        let mut index = Self::new();
        for (path, size) in entries {
            index.insert(path, size);
        }
        index
    }

    /// Add one path with its declared length. Insertion order is kept
    /// within a bucket.
    pub fn insert(&mut self, path: PathBuf, size: u64) {
        log::trace!("Size {} bytes: {}", size, path.display());
        self.total_files += 1;
        self.total_size += size;
        self.buckets.entry(size).or_default().push(path);
    }

    /// Buckets with two or more members, in ascending size order.
    pub fn candidate_buckets(&self) -> impl Iterator<Item = (u64, &[PathBuf])> {
        self.buckets
            .iter()
            .filter(|(_, paths)| paths.len() > 1)
            .map(|(size, paths)| (*size, paths.as_slice()))
    }

    /// Paths whose length no other path shares.
    #[must_use]
    pub fn unique_paths(&self) -> Vec<PathBuf> {
        self.buckets
            .values()
            .filter(|paths| paths.len() == 1)
            .flatten()
            .cloned()
            .collect()
    }

    /// Consume the index into its candidate buckets and known-unique paths.
    #[must_use]
    pub fn into_parts(self) -> (Vec<Vec<PathBuf>>, Vec<PathBuf>) {
        let mut candidates = Vec::new();
        let mut unique = Vec::new();
        for (size, mut paths) in self.buckets {
            if paths.len() > 1 {
                log::debug!("Size group {} bytes: {} candidates", size, paths.len());
                candidates.push(paths);
            } else {
                unique.append(&mut paths);
            }
        }
        (candidates, unique)
    }

    /// Statistics describing how much the index filtered.
    #[must_use]
    pub fn stats(&self) -> GroupingStats {
        let mut stats = GroupingStats {
            total_files: self.total_files,
            total_size: self.total_size,
            unique_sizes: self.buckets.len(),
            ..Default::default()
        };
        for paths in self.buckets.values() {
            if paths.len() > 1 {
                stats.potential_duplicates += paths.len();
                stats.candidate_buckets += 1;
            } else {
                stats.eliminated_unique += paths.len();
            }
        }
        stats
    }

    /// Number of indexed paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.total_files
    }

    /// Whether the index holds no paths.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_files == 0
    }
}

/// Statistics from the size bucketing pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupingStats {
    /// Total number of files indexed
    pub total_files: usize,
    /// Sum of declared lengths in bytes
    pub total_size: u64,
    /// Number of distinct lengths
    pub unique_sizes: usize,
    /// Files sharing their length with at least one other file
    pub potential_duplicates: usize,
    /// Files eliminated because their length is unique
    pub eliminated_unique: usize,
    /// Buckets with two or more files
    pub candidate_buckets: usize,
}

impl GroupingStats {
    /// Percentage of files eliminated without being opened.
    #[must_use]
    pub fn elimination_rate(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            (self.eliminated_unique as f64 / self.total_files as f64) * 100.0
        }
    }
}

/// A set of files sharing one fingerprint.
///
/// The head is an arbitrary representative; `members` holds every other
/// path in discovery order and never repeats the head's path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquivalenceClass {
    /// Representative fingerprint
    pub head: FileFingerprint,
    /// Other paths with the same fingerprint
    pub members: Vec<PathBuf>,
}

impl EquivalenceClass {
    /// Create a class from its head and additional members.
    #[must_use]
    pub fn new(head: FileFingerprint, members: Vec<PathBuf>) -> Self {
        Self { head, members }
    }

    /// Number of files in the class, head included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len() + 1
    }

    /// Always false; a class has at least its head.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Whether the class holds more than one file.
    #[must_use]
    pub fn has_duplicates(&self) -> bool {
        !self.members.is_empty()
    }

    /// All paths, head first.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.head.path()).chain(self.members.iter().map(PathBuf::as_path))
    }

    /// Digest as hexadecimal string.
    #[must_use]
    pub fn digest_hex(&self) -> String {
        hash_to_hex(self.head.digest())
    }
}
