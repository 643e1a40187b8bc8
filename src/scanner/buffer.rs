//! Scratch memory for streaming reads.
//!
//! # Overview
//!
//! Fingerprinting and comparison read files chunk by chunk into scratch
//! buffers obtained from a [`BufferSource`]. A source may hand out less
//! memory than requested; callers size every read by
//! [`ScratchBuffer::capacity`], never by the request.
//!
//! Two strategies ship with the crate:
//!
//! - [`SharedBuffer`]: one fixed region per thread, handed out for any
//!   request. Only one lease can be outstanding at a time; a second
//!   `acquire` before the first lease is dropped returns `None`.
//! - [`HeapBuffers`]: a fresh heap allocation per lease. Use this when
//!   several buffers must be live at once (pairwise comparison, or one
//!   source per worker).
//!
//! Leases release themselves when dropped, so every exit path of a
//! fingerprint or comparison returns its memory.

use std::cell::{RefCell, RefMut};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

/// Capacity of the default shared region (32 KiB).
pub const SHARED_REGION_SIZE: usize = 32 * 1024;

/// Pluggable acquisition of scratch memory.
pub trait BufferSource {
    /// Hand out a buffer for one streaming pass, or `None` if no memory
    /// is available. The returned buffer may be smaller or larger than
    /// `requested`.
    fn acquire(&self, requested: usize) -> Option<ScratchBuffer<'_>>;

    /// Called exactly once when a lease from this source is dropped.
    fn release(&self, _buffer: &mut [u8]) {}
}

enum Memory<'a> {
    Borrowed(RefMut<'a, [u8]>),
    Owned(Vec<u8>),
}

/// A leased scratch buffer. Dropping it hands the memory back to its source.
pub struct ScratchBuffer<'a> {
    memory: Memory<'a>,
    source: &'a dyn BufferSource,
}

impl<'a> ScratchBuffer<'a> {
    /// Lease memory borrowed from a source's interior storage.
    pub fn borrowed(source: &'a dyn BufferSource, memory: RefMut<'a, [u8]>) -> Self {
        Self {
            memory: Memory::Borrowed(memory),
            source,
        }
    }

    /// Lease memory owned by the lease itself.
    pub fn owned(source: &'a dyn BufferSource, memory: Vec<u8>) -> Self {
        Self {
            memory: Memory::Owned(memory),
            source,
        }
    }

    /// Usable size of this buffer.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.len()
    }
}

impl Deref for ScratchBuffer<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match &self.memory {
            Memory::Borrowed(region) => &region[..],
            Memory::Owned(vec) => &vec[..],
        }
    }
}

impl DerefMut for ScratchBuffer<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        match &mut self.memory {
            Memory::Borrowed(region) => &mut region[..],
            Memory::Owned(vec) => &mut vec[..],
        }
    }
}

impl Drop for ScratchBuffer<'_> {
    fn drop(&mut self) {
        let source = self.source;
        source.release(self);
    }
}

impl fmt::Debug for ScratchBuffer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScratchBuffer")
            .field("capacity", &self.capacity())
            .field(
                "kind",
                &match self.memory {
                    Memory::Borrowed(_) => "borrowed",
                    Memory::Owned(_) => "owned",
                },
            )
            .finish()
    }
}

/// A single fixed region, reused by every caller on the owning thread.
///
/// The region is returned for any request regardless of size. It is not
/// reentrant: while one lease is alive, further `acquire` calls return
/// `None`. The type is `!Sync`, so it cannot be shared between threads;
/// give each worker its own source instead.
pub struct SharedBuffer {
    region: RefCell<Box<[u8]>>,
}

impl SharedBuffer {
    /// Create a region of [`SHARED_REGION_SIZE`] bytes.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(SHARED_REGION_SIZE)
    }

    /// Create a region of `capacity` bytes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            region: RefCell::new(vec![0u8; capacity].into_boxed_slice()),
        }
    }

    /// Whether a lease on the region is currently outstanding.
    #[must_use]
    pub fn is_leased(&self) -> bool {
        self.region.try_borrow_mut().is_err()
    }
}

impl Default for SharedBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SharedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedBuffer")
            .field("leased", &self.is_leased())
            .finish()
    }
}

impl BufferSource for SharedBuffer {
    fn acquire(&self, _requested: usize) -> Option<ScratchBuffer<'_>> {
        let region = self.region.try_borrow_mut().ok()?;
        let region = RefMut::map(region, |r| &mut **r);
        Some(ScratchBuffer::borrowed(self, region))
    }
}

/// Independent heap buffers, one per lease.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeapBuffers {
    ceiling: Option<usize>,
}

impl HeapBuffers {
    /// Allocate exactly the requested size.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Never allocate more than `ceiling` bytes per lease.
    #[must_use]
    pub fn with_ceiling(ceiling: usize) -> Self {
        Self {
            ceiling: Some(ceiling),
        }
    }
}

impl BufferSource for HeapBuffers {
    fn acquire(&self, requested: usize) -> Option<ScratchBuffer<'_>> {
        let size = self
            .ceiling
            .map_or(requested, |ceiling| requested.min(ceiling))
            .max(1);
        let mut memory = Vec::new();
        memory.try_reserve_exact(size).ok()?;
        memory.resize(size, 0);
        Some(ScratchBuffer::owned(self, memory))
    }
}

thread_local! {
    static DEFAULT_SOURCE: Rc<SharedBuffer> = Rc::new(SharedBuffer::new());
}

/// The calling thread's default [`SharedBuffer`].
#[must_use]
pub fn default_source() -> Rc<dyn BufferSource> {
    DEFAULT_SOURCE.with(|source| Rc::clone(source) as Rc<dyn BufferSource>)
}
