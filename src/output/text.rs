//! Line-oriented output.
//!
//! One line per equivalence class: an optional 32-character digest, the
//! representative path, then every other member, joined by a separator.
//! Match results are one path per line.

use std::io::Write;
use std::path::PathBuf;

use crate::duplicates::{EquivalenceClass, GroupingOutcome};

/// Formatter for separator-joined text lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextOutput {
    /// String placed between fields
    pub separator: String,
    /// Prefix each class with its hex digest
    pub print_digest: bool,
    /// Also emit singleton classes and known-unique paths
    pub show_all: bool,
}

impl Default for TextOutput {
    fn default() -> Self {
        Self::new(" ")
    }
}

impl TextOutput {
    /// Create a formatter with the given separator.
    #[must_use]
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
            print_digest: false,
            show_all: false,
        }
    }

    /// Prefix each class line with its digest.
    #[must_use]
    pub fn with_print_digest(mut self, enabled: bool) -> Self {
        self.print_digest = enabled;
        self
    }

    /// Emit singletons and known-unique paths as well.
    #[must_use]
    pub fn with_show_all(mut self, enabled: bool) -> Self {
        self.show_all = enabled;
        self
    }

    /// Render one class as a line, without the terminator.
    #[must_use]
    pub fn format_class(&self, class: &EquivalenceClass) -> String {
        let mut fields = Vec::with_capacity(class.len() + 1);
        if self.print_digest {
            fields.push(class.digest_hex());
        }
        fields.extend(class.paths().map(|path| path.display().to_string()));
        fields.join(&self.separator)
    }

    /// Write every selected class of `outcome`, then the known-unique
    /// paths when `show_all` is set.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_classes<W: Write>(
        &self,
        writer: &mut W,
        outcome: &GroupingOutcome,
    ) -> std::io::Result<()> {
        for class in &outcome.classes {
            if self.show_all || class.has_duplicates() {
                writeln!(writer, "{}", self.format_class(class))?;
            }
        }
        if self.show_all {
            for path in &outcome.unique {
                writeln!(writer, "{}", path.display())?;
            }
        }
        writer.flush()
    }

    /// Write matching paths, one per line.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_matches<W: Write>(&self, writer: &mut W, matches: &[PathBuf]) -> std::io::Result<()> {
        for path in matches {
            writeln!(writer, "{}", path.display())?;
        }
        writer.flush()
    }
}
