//! Block descriptors and the handles that own them.

use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for unique [`BlockHandle`] tags, shared by every pool in the
/// process so a handle can never match a block in a foreign pool.
static BLOCK_TAG_COUNTER: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_tag() -> u64 {
    BLOCK_TAG_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// A contiguous run of elements inside a pool's backing buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Block {
    /// Offset of the first element.
    pub start: usize,
    /// Number of elements.
    pub len: usize,
    /// Identity of the owning handle. Always `None` for free blocks.
    pub tag: Option<u64>,
}

impl Block {
    pub(crate) fn free(start: usize, len: usize) -> Self {
        Self {
            start,
            len,
            tag: None,
        }
    }

    /// One past the last element.
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    /// Element range covered by the block.
    pub fn range(&self) -> Range<usize> {
        self.start..self.end()
    }
}

/// Ownership token for an allocated block.
///
/// Deliberately neither `Clone` nor `Copy`: releasing a block consumes its
/// handle, so a block cannot be freed twice through the same handle.
/// [`BlockHandle::EMPTY`] stands for "nothing allocated" and is accepted
/// (and ignored) by [`SlabPool::free`](crate::SlabPool::free).
#[derive(Debug, PartialEq, Eq)]
pub struct BlockHandle {
    start: usize,
    len: usize,
    tag: u64,
}

impl BlockHandle {
    /// The empty handle.
    pub const EMPTY: Self = Self {
        start: 0,
        len: 0,
        tag: 0,
    };

    pub(crate) fn new(start: usize, len: usize, tag: u64) -> Self {
        Self { start, len, tag }
    }

    /// Offset of the first element in the pool's buffer.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Number of elements in the block.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether this is the empty handle.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Element range covered by the block.
    pub fn range(&self) -> Range<usize> {
        self.start..self.start + self.len
    }

    pub(crate) fn tag(&self) -> u64 {
        self.tag
    }
}

impl Default for BlockHandle {
    fn default() -> Self {
        Self::EMPTY
    }
}
