//! Direct two-file equality without computing digests.
//!
//! # Overview
//!
//! [`streaming_equal`] reads two files side by side and stops at the first
//! difference. Each file has its own buffer and its own read cursor; a
//! buffer is refilled only when its own cursor runs out, since two files
//! rarely yield normalized bytes at the same rate once whitespace is
//! dropped.
//!
//! Without normalization the files are compared chunk against chunk. A
//! byte cap applies to this path only, and each stream counts against the
//! cap separately. When case folding or whitespace removal is requested
//! the byte-at-a-time path runs and the cap is not consulted.

use std::fs::File;
use std::path::Path;

use super::buffer::{BufferSource, HeapBuffers, ScratchBuffer};
use super::hasher::{is_blank, read_chunk};
use super::{FileError, NormalizationConfig};

/// Whether two files are equal under `config`, using independent heap buffers.
///
/// # Errors
///
/// Returns a [`FileError`] if either file cannot be opened or read.
///
/// # Example
///
/// ```no_run
/// use filesame::scanner::{streaming_equal, NormalizationConfig};
/// use std::path::Path;
///
/// let config = NormalizationConfig::default().with_ignore_whitespace(true);
/// if streaming_equal(Path::new("a.c"), Path::new("b.c"), &config).unwrap() {
///     println!("same modulo whitespace");
/// }
/// ```
pub fn streaming_equal(
    a: &Path,
    b: &Path,
    config: &NormalizationConfig,
) -> Result<bool, FileError> {
    streaming_equal_with_source(a, b, config, &HeapBuffers::new())
}

/// Whether two files are equal under `config`, leasing both buffers from `source`.
///
/// The source must be able to hold two leases at once; the default
/// [`SharedBuffer`](super::SharedBuffer) cannot, and fails with
/// [`FileError::AllocationFailed`] on the second file.
///
/// # Errors
///
/// Returns a [`FileError`] if either file cannot be opened or read, or if
/// `source` hands out no memory.
pub fn streaming_equal_with_source(
    a: &Path,
    b: &Path,
    config: &NormalizationConfig,
    source: &dyn BufferSource,
) -> Result<bool, FileError> {
    let mut left = Stream::open(a, config.buffer_size, source)?;
    let mut right = Stream::open(b, config.buffer_size, source)?;

    let equal = if config.transforms_bytes() {
        normalized_equal(&mut left, &mut right, config)?
    } else {
        raw_equal(&mut left, &mut right, config.max_bytes)?
    };

    log::trace!(
        "Compared {} and {}: {}",
        a.display(),
        b.display(),
        if equal { "equal" } else { "different" }
    );
    Ok(equal)
}

/// One side of a comparison: a file, its buffer and a cursor into it.
struct Stream<'s> {
    path: &'s Path,
    file: File,
    buffer: ScratchBuffer<'s>,
    chunk_size: usize,
    pos: usize,
    len: usize,
    eof: bool,
    consumed: u64,
}

impl<'s> Stream<'s> {
    fn open(
        path: &'s Path,
        requested: usize,
        source: &'s dyn BufferSource,
    ) -> Result<Self, FileError> {
        let file = File::open(path).map_err(|err| FileError::CannotOpen {
            path: path.to_path_buf(),
            source: err,
        })?;
        let requested = requested.max(1);
        let buffer = source
            .acquire(requested)
            .filter(|buffer| buffer.capacity() > 0)
            .ok_or_else(|| FileError::AllocationFailed {
                path: path.to_path_buf(),
                requested,
            })?;
        let chunk_size = requested.min(buffer.capacity());

        Ok(Self {
            path,
            file,
            buffer,
            chunk_size,
            pos: 0,
            len: 0,
            eof: false,
            consumed: 0,
        })
    }

    /// Read up to `limit` bytes into the front of the buffer.
    fn fill(&mut self, limit: usize) -> Result<usize, FileError> {
        let limit = limit.min(self.chunk_size);
        let read = read_chunk(&mut self.file, &mut self.buffer[..limit]).map_err(|source| {
            FileError::ReadFailed {
                path: self.path.to_path_buf(),
                source,
            }
        })?;
        if read < limit {
            self.eof = true;
        }
        self.pos = 0;
        self.len = read;
        Ok(read)
    }

    /// The byte under the cursor, refilling this stream's buffer if needed.
    fn peek(&mut self) -> Result<Option<u8>, FileError> {
        if self.pos == self.len && (self.eof || self.fill(self.chunk_size)? == 0) {
            return Ok(None);
        }
        Ok(Some(self.buffer[self.pos]))
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    /// Move the cursor past blank bytes, across refills.
    fn skip_blanks(&mut self) -> Result<(), FileError> {
        while let Some(byte) = self.peek()? {
            if !is_blank(byte) {
                break;
            }
            self.advance();
        }
        Ok(())
    }

    /// Apply the byte cap to the chunk just read. Returns the kept length
    /// and whether the cap has been reached.
    fn cap(&mut self, read: usize, max_bytes: u64) -> (usize, bool) {
        if max_bytes == 0 {
            return (read, false);
        }
        let remaining = max_bytes - self.consumed;
        let kept = if (read as u64) >= remaining {
            remaining as usize
        } else {
            read
        };
        self.consumed += kept as u64;
        (kept, self.consumed >= max_bytes)
    }
}

fn raw_equal(
    left: &mut Stream<'_>,
    right: &mut Stream<'_>,
    max_bytes: u64,
) -> Result<bool, FileError> {
    let chunk = left.chunk_size.min(right.chunk_size);

    loop {
        let read_left = left.fill(chunk)?;
        let read_right = right.fill(chunk)?;

        let (kept_left, capped_left) = left.cap(read_left, max_bytes);
        let (kept_right, capped_right) = right.cap(read_right, max_bytes);

        if kept_left != kept_right {
            return Ok(false);
        }
        if left.buffer[..kept_left] != right.buffer[..kept_right] {
            return Ok(false);
        }
        if capped_left && capped_right {
            return Ok(true);
        }
        if left.eof || right.eof {
            return Ok(left.eof && right.eof);
        }
    }
}

fn normalized_equal(
    left: &mut Stream<'_>,
    right: &mut Stream<'_>,
    config: &NormalizationConfig,
) -> Result<bool, FileError> {
    loop {
        if config.ignore_whitespace {
            left.skip_blanks()?;
            right.skip_blanks()?;
        }

        match (left.peek()?, right.peek()?) {
            (Some(mut x), Some(mut y)) => {
                if config.ignore_case {
                    x = x.to_ascii_lowercase();
                    y = y.to_ascii_lowercase();
                }
                if x != y {
                    return Ok(false);
                }
                left.advance();
                right.advance();
            }
            (None, None) => return Ok(true),
            // Blanks were already skipped, so any byte left on one side is significant.
            _ => return Ok(false),
        }
    }
}
