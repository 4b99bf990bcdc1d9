//! Jiggle: real-time spring-bone secondary motion for skeletal chains.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Jiggle sub-crates. For most users, adding `jiggle` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use jiggle::prelude::*;
//!
//! // The host's transforms: a root and two bones strung along +X.
//! let table = Arc::new(TransformTable::new());
//! let root = table.insert_root(Pose::from_position(Vec3::new(0.0, 2.0, 0.0)));
//! let upper = table.insert_root(Pose::from_position(Vec3::new(0.0, 2.0, 0.0)));
//! let lower = table.insert_root(Pose::from_position(Vec3::new(0.5, 2.0, 0.0)));
//!
//! let desc = ChainDesc::new()
//!     .with_bone(BoneDesc::new(upper, BoneParent::Transform(root)))
//!     .with_bone(BoneDesc::new(lower, BoneParent::Bone(0)));
//!
//! let mut scheduler = SpringScheduler::new(SchedulerConfig::default(), table.clone()).unwrap();
//! let chain = scheduler.register(desc).unwrap();
//! assert!(table.is_simulated(upper));
//!
//! for _ in 0..30 {
//!     scheduler.tick(1.0 / 60.0).unwrap();
//! }
//! // Gravity has pulled the upper bone's tip below its head.
//! let state = scheduler.bone_state(chain, 0).unwrap();
//! assert!(state.current_tip.y < state.position.y);
//!
//! scheduler.deregister(chain).unwrap();
//! assert!(!table.is_simulated(upper));
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `jiggle-core` | Poses, ids, the transform store trait |
//! | [`arena`] | `jiggle-arena` | Fixed-capacity slab pools |
//! | [`spring`] | `jiggle-spring` | Bone and collider data, the simulation kernel |
//! | [`engine`] | `jiggle-engine` | Scheduler, chain lifecycle, metrics |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types and the host transform seam (`jiggle-core`).
///
/// Implement [`types::TransformStore`] over your scene graph, or use the
/// bundled [`types::TransformTable`].
pub use jiggle_core as types;

/// Slab pools backing every shared simulation buffer (`jiggle-arena`).
pub use jiggle_arena as arena;

/// Per-bone simulation kernel and its data (`jiggle-spring`).
///
/// [`spring::simulate_chain`] advances one chain; the engine calls it once
/// per active chain per frame.
pub use jiggle_spring as spring;

/// Frame scheduler and chain lifecycle (`jiggle-engine`).
pub use jiggle_engine as engine;

/// Common imports for typical Jiggle usage.
///
/// ```rust
/// use jiggle::prelude::*;
/// ```
pub mod prelude {
    // Core
    pub use jiggle_core::{ChainId, Pose, Quat, TransformId, TransformStore, TransformTable, Vec3};

    // Chain data
    pub use jiggle_spring::{AngleLimit, BoneState, ChainSettings, ColliderKind, ColliderProperties};

    // Engine
    pub use jiggle_engine::{
        BoneDesc, BoneParent, BonePivot, BoneTuning, ChainDesc, CollisionFilter, FrameMetrics,
        LengthTarget, PoolUsage, RegisterError, SchedulerConfig, SchedulerError, SpringScheduler,
        SyncMode, Timestep,
    };
}
