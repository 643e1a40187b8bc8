//! Multi-file work.
//!
//! This module provides functionality for:
//! - Size-based bucketing (cheap pre-filter)
//! - Fingerprint clustering into equivalence classes
//! - Two-stage refinement of capped classes
//! - Matching candidates against one reference file

pub mod finder;
pub mod groups;
pub mod grouper;
pub mod matcher;

pub use finder::{EquivalenceFinder, FinderConfig, FinderError, GroupingOutcome, ScanSummary};
pub use grouper::{
    collect_classes, Backend, ClassStore, EquivalenceGrouper, HashedClasses, OrderedClasses,
};
pub use groups::{EquivalenceClass, GroupingStats, SizeIndex};
pub use matcher::{find_matches, MatchConfig, MatchSummary};
