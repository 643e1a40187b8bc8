//! Batch grouping pipeline.
//!
//! # Overview
//!
//! [`EquivalenceFinder`] turns a flat list of paths into equivalence
//! classes:
//! 1. **Size check**: stat every path and bucket by length
//!    (see [`crate::duplicates::groups`]); lone lengths are known-unique
//!    without opening the file.
//! 2. **Fingerprint**: each bucket with two or more paths goes through a
//!    fresh [`EquivalenceGrouper`].
//! 3. **Refine** (two-stage only): classes that gained members under the
//!    capped configuration are re-fingerprinted over the full stream.
//!
//! Files that cannot be stat'ed or fingerprinted are logged and reported
//! in [`GroupingOutcome::skipped`]; they never abort the run.
//!
//! # Example
//!
//! ```no_run
//! use filesame::duplicates::{EquivalenceFinder, FinderConfig};
//! use filesame::scanner::NormalizationConfig;
//! use std::path::PathBuf;
//!
//! let config = FinderConfig::default()
//!     .with_normalization(NormalizationConfig::default().with_max_bytes(4096))
//!     .with_two_stage(true);
//! let finder = EquivalenceFinder::new(config);
//!
//! let paths = vec![PathBuf::from("a.bin"), PathBuf::from("b.bin")];
//! let (outcome, summary) = finder.find_equivalent(paths).unwrap();
//! println!("{} duplicate classes", summary.duplicate_classes);
//! for class in outcome.classes.iter().filter(|c| c.has_duplicates()) {
//!     println!("{}", class.digest_hex());
//! }
//! ```

use std::path::PathBuf;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytesize::ByteSize;

use super::groups::{EquivalenceClass, GroupingStats, SizeIndex};
use super::grouper::{
    collect_classes, Backend, ClassStore, EquivalenceGrouper, HashedClasses, OrderedClasses,
};
use crate::scanner::{default_source, BufferSource, FileError, FileFingerprint, NormalizationConfig};

/// Configuration for the batch grouping pipeline.
#[derive(Clone, Default)]
pub struct FinderConfig {
    /// Normalization of the primary pass.
    pub normalization: NormalizationConfig,
    /// Re-verify capped classes over the whole stream.
    pub two_stage: bool,
    /// Allow the length pre-filter where it is sound.
    pub size_check: bool,
    /// Class map used per bucket.
    pub backend: Backend,
    /// Scratch memory; the thread's shared region when unset.
    pub buffer_source: Option<Rc<dyn BufferSource>>,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("normalization", &self.normalization)
            .field("two_stage", &self.two_stage)
            .field("size_check", &self.size_check)
            .field("backend", &self.backend)
            .field(
                "buffer_source",
                &self.buffer_source.as_ref().map(|_| "<source>"),
            )
            .field("shutdown_flag", &self.shutdown_flag)
            .finish()
    }
}

impl FinderConfig {
    /// Set the primary normalization.
    #[must_use]
    pub fn with_normalization(mut self, normalization: NormalizationConfig) -> Self {
        self.normalization = normalization;
        self
    }

    /// Enable two-stage grouping.
    #[must_use]
    pub fn with_two_stage(mut self, enabled: bool) -> Self {
        self.two_stage = enabled;
        self
    }

    /// Enable the length pre-filter.
    #[must_use]
    pub fn with_size_check(mut self, enabled: bool) -> Self {
        self.size_check = enabled;
        self
    }

    /// Set the class map backend.
    #[must_use]
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Set the scratch buffer source.
    #[must_use]
    pub fn with_buffer_source(mut self, source: Rc<dyn BufferSource>) -> Self {
        self.buffer_source = Some(source);
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Whether paths are bucketed by length before fingerprinting.
    ///
    /// Lengths only predict equality when no byte is dropped and the
    /// final comparison covers the whole file.
    #[must_use]
    pub fn size_check_active(&self) -> bool {
        self.size_check
            && !self.normalization.ignore_whitespace
            && (self.normalization.max_bytes == 0 || self.two_stage)
    }

    /// Normalization of the refining pass.
    #[must_use]
    pub fn stricter(&self) -> NormalizationConfig {
        self.normalization.uncapped()
    }

    /// Reject contradictory settings.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::InvalidConfig`] if the buffer size is zero or
    /// two-stage grouping is requested without a byte cap.
    pub fn validate(&self) -> Result<(), FinderError> {
        if self.normalization.buffer_size == 0 {
            return Err(FinderError::InvalidConfig(
                "buffer size must be at least 1 byte".to_string(),
            ));
        }
        if self.two_stage && self.normalization.max_bytes == 0 {
            return Err(FinderError::InvalidConfig(
                "two-stage grouping requires a non-zero max bytes".to_string(),
            ));
        }
        Ok(())
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    fn check_shutdown(&self) -> Result<(), FinderError> {
        if self.is_shutdown_requested() {
            log::info!("Grouping interrupted by shutdown signal");
            return Err(FinderError::Interrupted);
        }
        Ok(())
    }
}

/// Errors that can occur during grouping or matching.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// The run was interrupted by user (Ctrl+C or shutdown signal).
    #[error("Scan interrupted by user")]
    Interrupted,

    /// The requested settings contradict each other.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The reference file of a match run is unusable.
    #[error("Reference file {path}: {source}")]
    Reference {
        /// Reference path
        path: PathBuf,
        /// Why it could not be used
        #[source]
        source: FileError,
    },
}

/// Result of a grouping run.
#[derive(Debug, Default)]
pub struct GroupingOutcome {
    /// Classes in bucket order, singletons included.
    pub classes: Vec<EquivalenceClass>,
    /// Paths proven unique without a full fingerprint.
    pub unique: Vec<PathBuf>,
    /// Files that could not be examined.
    pub skipped: Vec<FileError>,
}

impl GroupingOutcome {
    /// Classes with more than one file.
    pub fn duplicate_classes(&self) -> impl Iterator<Item = &EquivalenceClass> {
        self.classes.iter().filter(|class| class.has_duplicates())
    }
}

/// Summary statistics from a grouping run.
#[derive(Debug, Clone, Default)]
pub struct ScanSummary {
    /// Number of input paths
    pub total_files: usize,
    /// Paths that could not be stat'ed or read
    pub skipped_files: usize,
    /// Size bucketing statistics, when the size check ran
    pub size_stats: Option<GroupingStats>,
    /// Fingerprints computed in the primary pass
    pub fingerprinted: usize,
    /// Fingerprints computed in the refining pass
    pub refined: usize,
    /// Files proven unique without a full fingerprint
    pub known_unique: usize,
    /// Classes produced, singletons included
    pub classes: usize,
    /// Classes with more than one file
    pub duplicate_classes: usize,
    /// Files in classes with more than one file
    pub duplicate_files: usize,
    /// Duration of the entire run
    pub scan_duration: Duration,
}

impl ScanSummary {
    /// Sum of declared lengths, if lengths were collected.
    #[must_use]
    pub fn total_size(&self) -> Option<u64> {
        self.size_stats.as_ref().map(|stats| stats.total_size)
    }

    /// Format total size as human-readable string.
    #[must_use]
    pub fn total_size_display(&self) -> String {
        self.total_size()
            .map_or_else(|| "unknown size".to_string(), |size| ByteSize(size).to_string())
    }
}

/// Drives the batch grouping pipeline.
#[derive(Debug, Clone, Default)]
pub struct EquivalenceFinder {
    config: FinderConfig,
}

impl EquivalenceFinder {
    /// Create a finder with the given configuration.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        Self { config }
    }

    /// The finder's configuration.
    #[must_use]
    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// Group `paths` into equivalence classes.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::InvalidConfig`] for contradictory settings
    /// and [`FinderError::Interrupted`] if the shutdown flag is raised.
    /// Per-file failures are reported in [`GroupingOutcome::skipped`].
    pub fn find_equivalent(
        &self,
        paths: impl IntoIterator<Item = PathBuf>,
    ) -> Result<(GroupingOutcome, ScanSummary), FinderError> {
        self.config.validate()?;
        log::debug!(
            "Grouping with {} backend, two-stage: {}",
            self.config.backend,
            self.config.two_stage
        );
        match self.config.backend {
            Backend::Ordered => self.run::<OrderedClasses>(paths.into_iter().collect()),
            Backend::Hashed => self.run::<HashedClasses>(paths.into_iter().collect()),
        }
    }

    fn run<S: ClassStore>(
        &self,
        paths: Vec<PathBuf>,
    ) -> Result<(GroupingOutcome, ScanSummary), FinderError> {
        let start_time = Instant::now();
        let mut outcome = GroupingOutcome::default();
        let mut summary = ScanSummary {
            total_files: paths.len(),
            ..Default::default()
        };

        self.config.check_shutdown()?;

        let buckets = if self.config.size_check_active() {
            let index = self.index_sizes(paths, &mut outcome)?;
            let stats = index.stats();
            log::info!(
                "Indexed {} files ({}), {} unique by size",
                stats.total_files,
                ByteSize(stats.total_size),
                stats.eliminated_unique
            );
            summary.size_stats = Some(stats);
            let (candidates, mut unique) = index.into_parts();
            outcome.unique.append(&mut unique);
            candidates
        } else {
            for path in &paths {
                log::debug!("Spooling {}", path.display());
            }
            if paths.len() > 1 {
                vec![paths]
            } else {
                outcome.unique.extend(paths);
                Vec::new()
            }
        };

        let source = self
            .config
            .buffer_source
            .clone()
            .unwrap_or_else(default_source);

        for bucket in buckets {
            self.config.check_shutdown()?;
            let grouper = self.fingerprint_bucket::<S>(&bucket, &source, &mut outcome, &mut summary)?;

            if self.config.two_stage {
                self.refine_bucket(grouper.into_common(), &source, &mut outcome, &mut summary);
            } else {
                outcome.classes.extend(grouper.classes());
            }
        }

        summary.skipped_files = outcome.skipped.len();
        summary.known_unique = outcome.unique.len();
        summary.classes = outcome.classes.len();
        for class in outcome.duplicate_classes() {
            summary.duplicate_classes += 1;
            summary.duplicate_files += class.len();
        }
        summary.scan_duration = start_time.elapsed();

        log::info!(
            "Found {} duplicate classes ({} files) in {:?}",
            summary.duplicate_classes,
            summary.duplicate_files,
            summary.scan_duration
        );
        Ok((outcome, summary))
    }

    fn index_sizes(
        &self,
        paths: Vec<PathBuf>,
        outcome: &mut GroupingOutcome,
    ) -> Result<SizeIndex, FinderError> {
        let mut index = SizeIndex::new();
        for path in paths {
            self.config.check_shutdown()?;
            match FileFingerprint::file_size(&path) {
                Ok(size) => {
                    log::debug!("Counting {}", path.display());
                    index.insert(path, size);
                }
                Err(e) => {
                    log::warn!("Skipping {}", e);
                    outcome.skipped.push(e);
                }
            }
        }
        Ok(index)
    }

    fn fingerprint_bucket<S: ClassStore>(
        &self,
        bucket: &[PathBuf],
        source: &Rc<dyn BufferSource>,
        outcome: &mut GroupingOutcome,
        summary: &mut ScanSummary,
    ) -> Result<EquivalenceGrouper<S>, FinderError> {
        let mut grouper: EquivalenceGrouper<S> =
            EquivalenceGrouper::with_source(self.config.normalization, Rc::clone(source));
        for path in bucket {
            self.config.check_shutdown()?;
            match grouper.add(path) {
                Ok(()) => {
                    summary.fingerprinted += 1;
                    log::debug!("Processing {}", path.display());
                }
                Err(e) => {
                    log::warn!("Skipping {}", e);
                    outcome.skipped.push(e);
                }
            }
        }
        Ok(grouper)
    }

    /// Re-verify the multi-member classes of one bucket over the full
    /// stream. Classes that stayed singletons are already unique.
    fn refine_bucket<S: ClassStore>(
        &self,
        cheap: S,
        source: &Rc<dyn BufferSource>,
        outcome: &mut GroupingOutcome,
        summary: &mut ScanSummary,
    ) {
        let mut prior = S::default();
        let mut pending = 0;
        for (head, members) in cheap.into_pairs() {
            if members.is_empty() {
                outcome.unique.push(head.path().to_path_buf());
            } else {
                pending += members.len() + 1;
                prior.insert_class(head, members);
            }
        }
        if pending == 0 {
            return;
        }

        summary.refined += pending;
        let mut refined = S::default();
        match EquivalenceGrouper::refine(&mut refined, &prior, &self.config.stricter(), source) {
            Ok(()) => outcome.classes.extend(collect_classes(&refined)),
            Err(e) => {
                log::warn!("Skipping bucket of {} files: {}", pending, e);
                outcome.skipped.push(e);
            }
        }
    }
}
