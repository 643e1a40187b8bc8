//! Output formatters for grouping and matching results.
//!
//! This module provides two output formats:
//! - Text lines joined by a separator, for shells and pipelines
//! - JSON for automation and scripting
//!
//! # Example
//!
//! ```no_run
//! use filesame::duplicates::EquivalenceFinder;
//! use filesame::output::TextOutput;
//! use std::path::PathBuf;
//!
//! let finder = EquivalenceFinder::default();
//! let (outcome, _summary) = finder
//!     .find_equivalent(vec![PathBuf::from("a"), PathBuf::from("b")])
//!     .unwrap();
//!
//! let output = TextOutput::new(" ").with_print_digest(true);
//! output.write_classes(&mut std::io::stdout(), &outcome).unwrap();
//! ```

pub mod json;
pub mod text;

// Re-export main types
pub use json::{JsonMatchOutput, JsonOutput, JsonOutputError};
pub use text::TextOutput;
