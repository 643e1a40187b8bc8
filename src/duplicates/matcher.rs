//! Single-reference matching pipeline.
//!
//! Every candidate is compared directly against one reference file with
//! [`streaming_equal`](crate::scanner::streaming_equal); no digests are
//! computed. Candidates that cannot be stat'ed or read are logged and
//! skipped.

use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::finder::FinderError;
use crate::scanner::{
    streaming_equal_with_source, BufferSource, FileError, FileFingerprint, HeapBuffers,
    NormalizationConfig,
};

/// Configuration for a match run.
#[derive(Clone, Default)]
pub struct MatchConfig {
    /// Normalization applied to both sides of every comparison.
    pub normalization: NormalizationConfig,
    /// Allow the length pre-filter where it is sound.
    pub size_check: bool,
    /// Scratch memory; must serve two leases at once. Heap buffers when unset.
    pub buffer_source: Option<Rc<dyn BufferSource>>,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
}

impl std::fmt::Debug for MatchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchConfig")
            .field("normalization", &self.normalization)
            .field("size_check", &self.size_check)
            .field(
                "buffer_source",
                &self.buffer_source.as_ref().map(|_| "<source>"),
            )
            .field("shutdown_flag", &self.shutdown_flag)
            .finish()
    }
}

impl MatchConfig {
    /// Set the normalization.
    #[must_use]
    pub fn with_normalization(mut self, normalization: NormalizationConfig) -> Self {
        self.normalization = normalization;
        self
    }

    /// Enable the length pre-filter.
    #[must_use]
    pub fn with_size_check(mut self, enabled: bool) -> Self {
        self.size_check = enabled;
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

    /// Whether unequal lengths reject a candidate without reading it.
    ///
    /// A byte cap makes longer files match their prefix, so lengths only
    /// help on uncapped, whitespace-preserving comparisons.
    #[must_use]
    pub fn size_check_active(&self) -> bool {
        self.size_check
            && !self.normalization.ignore_whitespace
            && self.normalization.max_bytes == 0
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Summary statistics from a match run.
#[derive(Debug, Default)]
pub struct MatchSummary {
    /// Number of candidate paths
    pub candidates: usize,
    /// Candidates rejected by length alone
    pub size_rejected: usize,
    /// Candidates read and compared
    pub compared: usize,
    /// Candidates equal to the reference
    pub matched: usize,
    /// Candidates that could not be examined
    pub skipped: Vec<FileError>,
    /// Duration of the entire run
    pub scan_duration: Duration,
}

/// Every candidate equal to `reference` under `config`, in input order.
///
/// # Errors
///
/// Returns [`FinderError::Reference`] if the size check is active and the
/// reference cannot be stat'ed, [`FinderError::InvalidConfig`] for a zero
/// buffer size and [`FinderError::Interrupted`] if the shutdown flag is
/// raised between candidates.
///
/// # Example
///
/// ```no_run
/// use filesame::duplicates::{find_matches, MatchConfig};
/// use std::path::{Path, PathBuf};
///
/// let candidates = vec![PathBuf::from("copy1.txt"), PathBuf::from("copy2.txt")];
/// let config = MatchConfig::default().with_size_check(true);
/// let (matches, summary) = find_matches(Path::new("orig.txt"), candidates, &config).unwrap();
/// println!("{} of {} match", matches.len(), summary.candidates);
/// ```
pub fn find_matches(
    reference: &Path,
    candidates: impl IntoIterator<Item = PathBuf>,
    config: &MatchConfig,
) -> Result<(Vec<PathBuf>, MatchSummary), FinderError> {
    let start_time = Instant::now();
    if config.normalization.buffer_size == 0 {
        return Err(FinderError::InvalidConfig(
            "buffer size must be at least 1 byte".to_string(),
        ));
    }

    let reference_size = if config.size_check_active() {
        let size = FileFingerprint::file_size(reference).map_err(|source| {
            FinderError::Reference {
                path: reference.to_path_buf(),
                source,
            }
        })?;
        Some(size)
    } else {
        None
    };

    let source: Rc<dyn BufferSource> = config
        .buffer_source
        .clone()
        .unwrap_or_else(|| Rc::new(HeapBuffers::new()));

    let mut matches = Vec::new();
    let mut summary = MatchSummary::default();

    for candidate in candidates {
        if config.is_shutdown_requested() {
            log::info!("Matching interrupted by shutdown signal");
            return Err(FinderError::Interrupted);
        }
        summary.candidates += 1;

        if let Some(expected) = reference_size {
            match FileFingerprint::file_size(&candidate) {
                Ok(size) if size != expected => {
                    log::debug!("Size differs: {}", candidate.display());
                    summary.size_rejected += 1;
                    continue;
                }
                Ok(_) => {}
                Err(e) => {
                    log::warn!("Skipping {}", e);
                    summary.skipped.push(e);
                    continue;
                }
            }
        }

        log::debug!("Processing {}", candidate.display());
        summary.compared += 1;
        match streaming_equal_with_source(
            reference,
            &candidate,
            &config.normalization,
            source.as_ref(),
        ) {
            Ok(true) => {
                summary.matched += 1;
                matches.push(candidate);
            }
            Ok(false) => {}
            Err(e) => {
                log::warn!("Skipping {}", e);
                summary.skipped.push(e);
            }
        }
    }

    summary.scan_duration = start_time.elapsed();
    log::info!(
        "{} of {} candidates match {}",
        summary.matched,
        summary.candidates,
        reference.display()
    );
    Ok((matches, summary))
}
