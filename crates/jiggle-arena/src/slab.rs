//! Fixed-capacity slab pool with free-space coalescing.
//!
//! [`SlabPool`] owns a backing `Vec<T>` of fixed length and carves it into
//! non-overlapping blocks. Two unordered block lists are kept: free and
//! used. Allocation is first-fit over the free list; release merges the
//! returned block with its address-contiguous free neighbours, so after
//! any `free()` no two free blocks touch.
//!
//! Block counts are expected to be small (tens per pool), so both lists
//! are scanned linearly.

use std::ops::Range;

use crate::block::{next_tag, Block, BlockHandle};
use crate::error::SlabError;

/// Used/free accounting for a pool, in elements.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SlabUsage {
    /// Total elements in the backing buffer.
    pub capacity: usize,
    /// Elements currently owned by handles.
    pub used: usize,
    /// Number of used blocks.
    pub used_blocks: usize,
    /// Number of free blocks.
    pub free_blocks: usize,
    /// Size of the largest free block.
    pub largest_free: usize,
}

/// A fixed-capacity buffer handing out contiguous, reusable blocks.
///
/// The backing buffer is allocated once at construction and never grows.
/// Elements keep their values across free/alloc cycles; callers are
/// expected to overwrite a block after allocating it.
#[derive(Debug)]
pub struct SlabPool<T> {
    buffer: Vec<T>,
    free: Vec<Block>,
    used: Vec<Block>,
    max_blocks: usize,
}

impl<T: Clone + Default> SlabPool<T> {
    /// Create a pool of `capacity` default-initialised elements that can
    /// track at most `max_blocks` simultaneously used blocks.
    ///
    /// `max_blocks` is raised to 1 if zero.
    pub fn new(capacity: usize, max_blocks: usize) -> Self {
        let max_blocks = max_blocks.max(1);
        let mut free = Vec::with_capacity(max_blocks + 1);
        if capacity > 0 {
            free.push(Block::free(0, capacity));
        }
        Self {
            buffer: vec![T::default(); capacity],
            free,
            used: Vec::with_capacity(max_blocks),
            max_blocks,
        }
    }
}

impl<T> SlabPool<T> {
    /// Allocate a block of `len` elements.
    ///
    /// Picks the first free block large enough, hands out its front `len`
    /// elements and keeps any remainder on the free list.
    ///
    /// # Errors
    ///
    /// [`SlabError::ZeroSize`] for `len == 0`, [`SlabError::BlockLimit`] if
    /// the used list is full, [`SlabError::Exhausted`] if no free block
    /// fits. The pool is unchanged on error.
    pub fn alloc(&mut self, len: usize) -> Result<BlockHandle, SlabError> {
        if len == 0 {
            return Err(SlabError::ZeroSize);
        }
        if self.used.len() >= self.max_blocks {
            return Err(SlabError::BlockLimit {
                limit: self.max_blocks,
            });
        }
        let Some(pos) = self.free.iter().position(|b| b.len >= len) else {
            return Err(SlabError::Exhausted {
                requested: len,
                largest_free: self.largest_free(),
            });
        };

        let found = self.free.swap_remove(pos);
        if found.len > len {
            self.free.push(Block::free(found.start + len, found.len - len));
        }

        let tag = next_tag();
        self.used.push(Block {
            start: found.start,
            len,
            tag: Some(tag),
        });
        Ok(BlockHandle::new(found.start, len, tag))
    }

    /// Release a block back to the pool.
    ///
    /// The empty handle is a no-op. Returns `false` if the handle does not
    /// belong to a live block of this pool (it is dropped unchanged).
    pub fn free(&mut self, handle: BlockHandle) -> bool {
        if handle.is_empty() {
            return false;
        }
        let Some(pos) = self.used.iter().position(|b| b.tag == Some(handle.tag())) else {
            return false;
        };
        let mut merged = self.used.swap_remove(pos);
        merged.tag = None;

        // Free block ending where this one starts.
        if let Some(i) = self.free.iter().position(|b| b.end() == merged.start) {
            let before = self.free.swap_remove(i);
            merged.start = before.start;
            merged.len += before.len;
        }
        // Free block starting where this one ends.
        if let Some(i) = self.free.iter().position(|b| b.start == merged.end()) {
            let after = self.free.swap_remove(i);
            merged.len += after.len;
        }

        self.free.push(merged);
        true
    }

    /// Elements of an allocated block.
    pub fn get(&self, handle: &BlockHandle) -> &[T] {
        &self.buffer[handle.range()]
    }

    /// Mutable elements of an allocated block.
    pub fn get_mut(&mut self, handle: &BlockHandle) -> &mut [T] {
        &mut self.buffer[handle.range()]
    }

    /// The whole backing buffer, including free space.
    pub fn as_slice(&self) -> &[T] {
        &self.buffer
    }

    /// The whole backing buffer, mutably.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.buffer
    }

    /// Total number of elements in the backing buffer.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Maximum number of simultaneously used blocks.
    pub fn max_blocks(&self) -> usize {
        self.max_blocks
    }

    /// Blocks currently available, in no particular order.
    pub fn free_blocks(&self) -> &[Block] {
        &self.free
    }

    /// Blocks currently owned by handles, in no particular order.
    pub fn used_blocks(&self) -> &[Block] {
        &self.used
    }

    /// Elements currently owned by handles.
    pub fn used_len(&self) -> usize {
        self.used.iter().map(|b| b.len).sum()
    }

    /// Elements currently free.
    pub fn free_len(&self) -> usize {
        self.free.iter().map(|b| b.len).sum()
    }

    /// Size of the largest free block (0 if none).
    pub fn largest_free(&self) -> usize {
        self.free.iter().map(|b| b.len).max().unwrap_or(0)
    }

    /// Whether `range` lies entirely inside one used block.
    pub fn is_allocated(&self, range: Range<usize>) -> bool {
        self.used
            .iter()
            .any(|b| b.start <= range.start && range.end <= b.end())
    }

    /// Snapshot of the pool's accounting.
    pub fn usage(&self) -> SlabUsage {
        SlabUsage {
            capacity: self.capacity(),
            used: self.used_len(),
            used_blocks: self.used.len(),
            free_blocks: self.free.len(),
            largest_free: self.largest_free(),
        }
    }
}
