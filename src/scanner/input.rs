//! Collection of the input path list.
//!
//! Paths come either from the command line, in order, or as
//! newline-delimited lines on standard input when the sole positional
//! argument is `-`.

use std::io::BufRead;
use std::path::PathBuf;

/// Where the list of files to examine comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathInput {
    /// Paths given directly, in order.
    Arguments(Vec<PathBuf>),
    /// Newline-delimited paths read from standard input.
    Stdin,
}

impl PathInput {
    /// Interpret positional arguments.
    ///
    /// A lone `-` selects standard input.
    ///
    /// # Errors
    ///
    /// Returns an error if `-` is combined with other paths.
    pub fn from_args(args: &[PathBuf]) -> Result<Self, String> {
        let dash = std::path::Path::new("-");
        match args {
            [only] if only == dash => Ok(Self::Stdin),
            _ if args.iter().any(|arg| arg == dash) => {
                Err("'-' reads paths from stdin and cannot be mixed with other paths".to_string())
            }
            _ => Ok(Self::Arguments(args.to_vec())),
        }
    }

    /// Resolve to a concrete list, reading standard input if needed.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if standard input cannot be read.
    pub fn collect(self) -> std::io::Result<Vec<PathBuf>> {
        match self {
            Self::Arguments(paths) => Ok(paths),
            Self::Stdin => read_path_list(std::io::stdin().lock()),
        }
    }
}

/// Read one path per line, trimming the line terminator and skipping
/// empty lines.
///
/// # Errors
///
/// Returns an I/O error if the reader fails or yields invalid UTF-8.
pub fn read_path_list(reader: impl BufRead) -> std::io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.strip_suffix('\r').unwrap_or(&line);
        if line.is_empty() {
            continue;
        }
        paths.push(PathBuf::from(line));
    }
    log::debug!("Read {} paths from input", paths.len());
    Ok(paths)
}
