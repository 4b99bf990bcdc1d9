//! Registration and scheduling errors.

use jiggle_arena::SlabError;
use jiggle_core::{ChainId, TransformId};

/// Which shared slab pool an allocation came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PoolKind {
    /// Bone properties and state.
    Bones,
    /// Collider properties and state.
    Colliders,
    /// Explicit per-bone collider lists.
    CollisionIndices,
    /// Length-limit properties and targets.
    LengthLimits,
}

impl std::fmt::Display for PoolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bones => write!(f, "bones"),
            Self::Colliders => write!(f, "colliders"),
            Self::CollisionIndices => write!(f, "collision indices"),
            Self::LengthLimits => write!(f, "length limits"),
        }
    }
}

/// Why a chain could not be registered.
///
/// Registration is all-or-nothing: on any of these errors every range
/// already granted to the chain has been released again.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum RegisterError {
    /// The scheduler already holds `limit` chains.
    #[error("chain limit of {limit} reached")]
    ChainLimit {
        /// Configured maximum.
        limit: usize,
    },
    /// A slab pool could not satisfy the chain.
    #[error("{pool} pool: {source}")]
    Capacity {
        /// The exhausted pool.
        pool: PoolKind,
        /// The allocator's error.
        source: SlabError,
    },
    /// The chain description is inconsistent.
    #[error("invalid chain: {reason}")]
    InvalidChain {
        /// What is wrong.
        reason: String,
    },
    /// A transform the chain references is unknown to the transform store.
    #[error("transform {transform} not found")]
    MissingTransform {
        /// The first missing transform found.
        transform: TransformId,
    },
    /// The deferred frame thread died with the simulation state.
    #[error("frame pipeline lost")]
    PipelineLost,
}

/// Errors from ticking or editing a registered chain.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum SchedulerError {
    /// No chain with this id is registered.
    #[error("chain {0} is not registered")]
    UnknownChain(ChainId),
    /// The deferred frame thread died with the simulation state.
    #[error("frame pipeline lost")]
    PipelineLost,
    /// The deferred frame thread could not be started.
    #[error("thread spawn failed: {reason}")]
    ThreadSpawnFailed {
        /// The OS error.
        reason: String,
    },
    /// A bone index is out of range for its chain.
    #[error("chain {chain} has no bone {bone}")]
    InvalidBone {
        /// The chain.
        chain: ChainId,
        /// The out-of-range bone index.
        bone: usize,
    },
}
