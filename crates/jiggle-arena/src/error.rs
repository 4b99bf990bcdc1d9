//! Slab-specific error types.

use thiserror::Error;

/// Errors that can occur during slab allocation.
///
/// All variants are recoverable: the pool is left exactly as it was
/// before the failing call.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SlabError {
    /// A zero-length block was requested.
    #[error("cannot allocate a zero-length block")]
    ZeroSize,
    /// No free block is large enough for the request.
    #[error("slab exhausted: requested {requested} elements, largest free block is {largest_free}")]
    Exhausted {
        /// Number of elements requested.
        requested: usize,
        /// Size of the largest free block at the time of the request.
        largest_free: usize,
    },
    /// The pool already tracks its maximum number of used blocks.
    #[error("slab block limit of {limit} reached")]
    BlockLimit {
        /// Maximum number of simultaneously used blocks.
        limit: usize,
    },
}
