//! Fixed-capacity slab allocation for Jiggle simulation buffers.
//!
//! Every per-bone, per-collider and per-length-limit buffer the scheduler
//! owns is a [`SlabPool`]: a backing `Vec<T>` sized once at startup and
//! carved into contiguous blocks that registered chains borrow for their
//! lifetime. Nothing is allocated per frame.
//!
//! ```text
//! SlabPool<T>
//! ├── buffer: Vec<T>        (fixed length = capacity)
//! ├── free:   Vec<Block>    (first-fit scan, coalesced on free)
//! └── used:   Vec<Block>    (matched by handle tag on free)
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod block;
pub mod error;
pub mod slab;

pub use block::{Block, BlockHandle};
pub use error::SlabError;
pub use slab::{SlabPool, SlabUsage};
