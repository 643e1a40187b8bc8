//! MD5 content fingerprints with streaming normalization.
//!
//! # Overview
//!
//! A [`FileFingerprint`] is computed once, at construction, by streaming the
//! file through a scratch buffer. Each chunk is normalized in place (case
//! folding, whitespace removal, byte cap) before it reaches the digest, so
//! memory use is bounded by the buffer size regardless of file length.
//!
//! Fingerprints compare by digest. A machine-word fold of the digest is
//! checked first and doubles as the hash and the primary sort key, which
//! lets both ordered and hashed containers use fingerprints as keys.
//!
//! # Example
//!
//! ```no_run
//! use filesame::scanner::{FileFingerprint, NormalizationConfig};
//! use std::path::Path;
//!
//! let fp = FileFingerprint::new(Path::new("notes.txt"), &NormalizationConfig::default()).unwrap();
//! println!("{}  {}", fp.digest_hex(), fp.path().display());
//! ```

use std::cmp::Ordering;
use std::fs::File;
use std::hash::{Hash as StdHash, Hasher as StdHasher};
use std::io::Read;
use std::path::{Path, PathBuf};

use md5::{Digest as _, Md5};

use super::buffer::{default_source, BufferSource};
use super::{FileError, NormalizationConfig};

/// Width of the content digest in bytes.
pub const DIGEST_LEN: usize = 16;

/// Raw MD5 digest bytes.
pub type Digest = [u8; DIGEST_LEN];

const WORD_BYTES: usize = std::mem::size_of::<usize>();

/// Content fingerprint of one file under a given normalization.
///
/// Equality, ordering and hashing consider the digest only; the path is
/// carried along for reporting.
#[derive(Debug, Clone)]
pub struct FileFingerprint {
    path: PathBuf,
    digest: Digest,
    fold_hash: usize,
}

impl FileFingerprint {
    /// Fingerprint `path` using the calling thread's shared scratch buffer.
    ///
    /// # Errors
    ///
    /// Returns a [`FileError`] if the file cannot be opened or read, or if
    /// the shared buffer is already leased.
    pub fn new(path: &Path, config: &NormalizationConfig) -> Result<Self, FileError> {
        let source = default_source();
        Self::with_source(path, config, source.as_ref())
    }

    /// Fingerprint `path` reading through a buffer from `source`.
    ///
    /// # Errors
    ///
    /// Returns a [`FileError`] if the file cannot be opened or read, or if
    /// `source` hands out no memory.
    pub fn with_source(
        path: &Path,
        config: &NormalizationConfig,
        source: &dyn BufferSource,
    ) -> Result<Self, FileError> {
        let mut file = File::open(path).map_err(|err| FileError::CannotOpen {
            path: path.to_path_buf(),
            source: err,
        })?;

        let requested = config.buffer_size.max(1);
        let mut scratch = source
            .acquire(requested)
            .filter(|buffer| buffer.capacity() > 0)
            .ok_or_else(|| FileError::AllocationFailed {
                path: path.to_path_buf(),
                requested,
            })?;
        let chunk_size = requested.min(scratch.capacity());
        let buffer = &mut scratch[..chunk_size];

        let mut context = Md5::new();
        let mut fed: u64 = 0;

        loop {
            let read = read_chunk(&mut file, buffer).map_err(|err| FileError::ReadFailed {
                path: path.to_path_buf(),
                source: err,
            })?;
            if read == 0 {
                break;
            }

            let mut len = read;
            if config.ignore_case {
                fold_case(&mut buffer[..len]);
            }
            if config.ignore_whitespace {
                len = strip_whitespace(&mut buffer[..len]);
                if len == 0 {
                    continue;
                }
            }

            let mut capped = false;
            if config.max_bytes > 0 {
                let remaining = config.max_bytes - fed;
                if len as u64 >= remaining {
                    len = remaining as usize;
                    capped = true;
                }
                fed += len as u64;
            }

            context.update(&buffer[..len]);
            log::trace!("Fed {} bytes of {}", len, path.display());

            if capped || read < chunk_size {
                break;
            }
        }

        let digest: Digest = context.finalize().into();

        Ok(Self {
            path: path.to_path_buf(),
            fold_hash: fold_digest(&digest),
            digest,
        })
    }

    /// Declared length of `path` in bytes.
    ///
    /// # Errors
    ///
    /// Returns [`FileError::CannotStat`] if metadata cannot be read.
    pub fn file_size(path: &Path) -> Result<u64, FileError> {
        std::fs::metadata(path)
            .map(|meta| meta.len())
            .map_err(|source| FileError::CannotStat {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Path this fingerprint was computed from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The MD5 digest of the normalized stream.
    #[must_use]
    pub fn digest(&self) -> &Digest {
        &self.digest
    }

    /// Word-sized XOR fold of the digest.
    #[must_use]
    pub fn fold_hash(&self) -> usize {
        self.fold_hash
    }

    /// Digest as 32 lowercase hex characters.
    #[must_use]
    pub fn digest_hex(&self) -> String {
        hash_to_hex(&self.digest)
    }
}

impl PartialEq for FileFingerprint {
    fn eq(&self, other: &Self) -> bool {
        self.fold_hash == other.fold_hash && self.digest == other.digest
    }
}

impl Eq for FileFingerprint {}

impl Ord for FileFingerprint {
    fn cmp(&self, other: &Self) -> Ordering {
        self.fold_hash
            .cmp(&other.fold_hash)
            .then_with(|| self.digest.cmp(&other.digest))
    }
}

impl PartialOrd for FileFingerprint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl StdHash for FileFingerprint {
    fn hash<H: StdHasher>(&self, state: &mut H) {
        state.write_usize(self.fold_hash);
    }
}

/// Fill `buffer` as far as the file allows. Returns fewer bytes than the
/// buffer length only at end of file.
pub(crate) fn read_chunk(file: &mut impl Read, buffer: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match file.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Lowercase ASCII letters in place; other bytes are untouched.
pub(crate) fn fold_case(bytes: &mut [u8]) {
    bytes.make_ascii_lowercase();
}

/// Space, tab, CR and LF.
#[must_use]
pub(crate) fn is_blank(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\r' | b'\n')
}

/// Remove every blank byte, compacting the rest to the front.
/// Returns the new logical length.
pub(crate) fn strip_whitespace(bytes: &mut [u8]) -> usize {
    let mut kept = 0;
    for i in 0..bytes.len() {
        let byte = bytes[i];
        if !is_blank(byte) {
            bytes[kept] = byte;
            kept += 1;
        }
    }
    kept
}

/// XOR byte `i` into word lane `i % WORD_BYTES`.
fn fold_digest(digest: &Digest) -> usize {
    digest.iter().enumerate().fold(0usize, |acc, (i, &byte)| {
        acc ^ (usize::from(byte) << ((i % WORD_BYTES) * 8))
    })
}

/// Convert a digest to a lowercase hexadecimal string.
#[must_use]
pub fn hash_to_hex(digest: &Digest) -> String {
    use std::fmt::Write;
    digest.iter().fold(String::with_capacity(DIGEST_LEN * 2), |mut out, byte| {
        let _ = write!(out, "{byte:02x}");
        out
    })
}
