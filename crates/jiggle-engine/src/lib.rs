//! Frame scheduler and chain lifecycle for the Jiggle spring-bone engine.
//!
//! [`SpringScheduler`] owns every shared simulation buffer: four
//! fixed-capacity slab pools (bones, colliders, collision indices, length
//! limits) and the chain registry that maps each [`ChainId`] to its blocks.
//! Once per frame it gathers external poses from the host's
//! [`TransformStore`], steps every active chain through the spring kernel
//! and scatters the resulting local rotations back.
//!
//! ```text
//! host ──register(ChainDesc)──► SpringScheduler
//!                                 ├── ChainRegistry (IndexMap<ChainId, ChainEntry>)
//!                                 └── SimulationState
//!                                       ├── SlabPool<BoneProperties>   + bone buffers
//!                                       ├── SlabPool<ColliderProperties> + collider buffers
//!                                       ├── SlabPool<u32>              (collider lists)
//!                                       └── SlabPool<LengthLimitProperties> + targets
//! host ──tick(dt)──► gather ─► simulate ─► scatter ──► TransformStore
//! ```
//!
//! Frames run synchronously on the caller, or in [`SyncMode::Deferred`]
//! on a persistent frame thread whose result is awaited at the next
//! tick, mutation, query or drop.
//!
//! [`ChainId`]: jiggle_core::ChainId
//! [`TransformStore`]: jiggle_core::TransformStore

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod chain;
pub mod config;
pub mod error;
pub mod metrics;
pub mod scheduler;

mod frame_thread;
mod gather;
mod lifecycle;
mod pipeline;
mod registry;
mod scatter;
mod state;

pub use chain::{
    BoneDesc, BoneParent, BonePivot, BoneTuning, ChainDesc, ColliderDesc, CollisionFilter,
    LengthTarget,
};
pub use config::{SchedulerConfig, SyncMode, Timestep};
pub use error::{PoolKind, RegisterError, SchedulerError};
pub use metrics::{FrameMetrics, PoolUsage};
pub use scheduler::SpringScheduler;
