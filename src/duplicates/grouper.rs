//! Clustering of files into equivalence classes by fingerprint.
//!
//! # Overview
//!
//! An [`EquivalenceGrouper`] fingerprints each added path and files it
//! under the first fingerprint with an equal digest. The backing map is
//! pluggable through [`ClassStore`]:
//!
//! - [`OrderedClasses`] iterates in ascending fold-hash, then digest order.
//! - [`HashedClasses`] buckets by fold-hash; iteration order is unspecified.
//!
//! Both produce the same class membership.
//!
//! ## Two-stage refinement
//!
//! Files separated under a cheap configuration (for example, only the
//! first 256 bytes) can never become equal under a stricter one, so
//! [`EquivalenceGrouper::refine`] re-fingerprints only the members of
//! prior classes. Full-file hashing is deferred until a small,
//! pre-clustered candidate set is known.
//!
//! # Example
//!
//! ```no_run
//! use filesame::duplicates::EquivalenceGrouper;
//! use filesame::scanner::NormalizationConfig;
//! use std::path::Path;
//!
//! let mut grouper: EquivalenceGrouper = EquivalenceGrouper::new(NormalizationConfig::default());
//! for name in ["a.txt", "b.txt", "c.txt"] {
//!     if let Err(e) = grouper.add(Path::new(name)) {
//!         eprintln!("skipping: {e}");
//!     }
//! }
//! for class in grouper.classes() {
//!     println!("{} files share {}", class.len(), class.digest_hex());
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::groups::EquivalenceClass;
use crate::scanner::{default_source, BufferSource, FileError, FileFingerprint, NormalizationConfig};

/// Class map ordered by fingerprint.
pub type OrderedClasses = BTreeMap<FileFingerprint, Vec<PathBuf>>;

/// Class map hashed by fold-hash with digest equality as tie-break.
pub type HashedClasses = HashMap<FileFingerprint, Vec<PathBuf>>;

/// Storage for head fingerprints and their extra member paths.
pub trait ClassStore: Default {
    /// Members list of the class whose head equals `key`, if any.
    fn members_mut(&mut self, key: &FileFingerprint) -> Option<&mut Vec<PathBuf>>;

    /// Store a class, replacing the members of an existing equal head.
    fn insert_class(&mut self, head: FileFingerprint, members: Vec<PathBuf>);

    /// Every class in the store's natural iteration order.
    fn iter_classes(&self) -> Box<dyn Iterator<Item = (&FileFingerprint, &Vec<PathBuf>)> + '_>;

    /// Number of classes.
    fn class_count(&self) -> usize;

    /// Consume the store into its classes.
    fn into_pairs(self) -> Vec<(FileFingerprint, Vec<PathBuf>)>;
}

impl ClassStore for OrderedClasses {
    fn members_mut(&mut self, key: &FileFingerprint) -> Option<&mut Vec<PathBuf>> {
        self.get_mut(key)
    }

    fn insert_class(&mut self, head: FileFingerprint, members: Vec<PathBuf>) {
        self.insert(head, members);
    }

    fn iter_classes(&self) -> Box<dyn Iterator<Item = (&FileFingerprint, &Vec<PathBuf>)> + '_> {
        Box::new(self.iter())
    }

    fn class_count(&self) -> usize {
        self.len()
    }

    fn into_pairs(self) -> Vec<(FileFingerprint, Vec<PathBuf>)> {
        self.into_iter().collect()
    }
}

impl ClassStore for HashedClasses {
    fn members_mut(&mut self, key: &FileFingerprint) -> Option<&mut Vec<PathBuf>> {
        self.get_mut(key)
    }

    fn insert_class(&mut self, head: FileFingerprint, members: Vec<PathBuf>) {
        self.insert(head, members);
    }

    fn iter_classes(&self) -> Box<dyn Iterator<Item = (&FileFingerprint, &Vec<PathBuf>)> + '_> {
        Box::new(self.iter())
    }

    fn class_count(&self) -> usize {
        self.len()
    }

    fn into_pairs(self) -> Vec<(FileFingerprint, Vec<PathBuf>)> {
        self.into_iter().collect()
    }
}

/// Which [`ClassStore`] backs a grouping run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Ordered map; classes come out sorted by fold-hash then digest
    #[default]
    Ordered,
    /// Hash map; class order is unspecified
    Hashed,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Ordered => write!(f, "ordered"),
            Backend::Hashed => write!(f, "hashed"),
        }
    }
}

/// Groups files into equivalence classes under one normalization.
pub struct EquivalenceGrouper<S: ClassStore = OrderedClasses> {
    config: NormalizationConfig,
    source: Rc<dyn BufferSource>,
    classes: S,
}

impl<S: ClassStore> EquivalenceGrouper<S> {
    /// Create a grouper that reads through the thread's shared buffer.
    #[must_use]
    pub fn new(config: NormalizationConfig) -> Self {
        Self::with_source(config, default_source())
    }

    /// Create a grouper that reads through buffers from `source`.
    #[must_use]
    pub fn with_source(config: NormalizationConfig, source: Rc<dyn BufferSource>) -> Self {
        Self {
            config,
            source,
            classes: S::default(),
        }
    }

    /// The normalization every added file is fingerprinted under.
    #[must_use]
    pub fn config(&self) -> &NormalizationConfig {
        &self.config
    }

    /// Fingerprint `path` and file it under its class.
    ///
    /// # Errors
    ///
    /// Propagates the [`FileError`] from fingerprinting; the grouper is
    /// left unchanged in that case.
    pub fn add(&mut self, path: &Path) -> Result<(), FileError> {
        let fingerprint = FileFingerprint::with_source(path, &self.config, self.source.as_ref())?;
        self.add_fingerprint(fingerprint);
        Ok(())
    }

    /// File an already computed fingerprint.
    pub fn add_fingerprint(&mut self, fingerprint: FileFingerprint) {
        if let Some(members) = self.classes.members_mut(&fingerprint) {
            log::trace!("Duplicate digest: {}", fingerprint.path().display());
            members.push(fingerprint.path().to_path_buf());
        } else {
            self.classes.insert_class(fingerprint, Vec::new());
        }
    }

    /// The class map, singleton classes included.
    #[must_use]
    pub fn common(&self) -> &S {
        &self.classes
    }

    /// Consume the grouper into its class map.
    #[must_use]
    pub fn into_common(self) -> S {
        self.classes
    }

    /// Snapshot of every class in the store's iteration order.
    #[must_use]
    pub fn classes(&self) -> Vec<EquivalenceClass> {
        collect_classes(&self.classes)
    }

    /// Re-verify `prior` classes under `stricter` and merge the result
    /// into `result`.
    ///
    /// Each prior class (head and members) goes through a fresh grouper, so
    /// files from different prior classes are never compared with each
    /// other.
    ///
    /// # Errors
    ///
    /// Stops at the first file that cannot be fingerprinted and returns
    /// its error. Classes merged before the failure stay in `result`.
    pub fn refine(
        result: &mut S,
        prior: &S,
        stricter: &NormalizationConfig,
        source: &Rc<dyn BufferSource>,
    ) -> Result<(), FileError> {
        for (head, members) in prior.iter_classes() {
            let mut local: EquivalenceGrouper<S> =
                EquivalenceGrouper::with_source(*stricter, Rc::clone(source));
            local.add(head.path())?;
            for member in members {
                local.add(member)?;
            }

            let split = local.classes.class_count();
            if split > 1 {
                log::debug!(
                    "Class of {} split into {} under stricter comparison",
                    members.len() + 1,
                    split
                );
            }

            for (fingerprint, paths) in local.into_common().into_pairs() {
                result.insert_class(fingerprint, paths);
            }
        }
        Ok(())
    }
}

impl<S: ClassStore> std::fmt::Debug for EquivalenceGrouper<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EquivalenceGrouper")
            .field("config", &self.config)
            .field("classes", &self.classes.class_count())
            .finish()
    }
}

/// Snapshot a store's classes.
#[must_use]
pub fn collect_classes<S: ClassStore>(store: &S) -> Vec<EquivalenceClass> {
    store
        .iter_classes()
        .map(|(head, members)| EquivalenceClass::new(head.clone(), members.clone()))
        .collect()
}
