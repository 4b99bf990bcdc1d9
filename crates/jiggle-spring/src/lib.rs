//! Spring-bone simulation kernel for Jiggle.
//!
//! Pure data and math: bone and collider descriptions, the constraint
//! resolvers, and [`simulate_chain`], which advances one chain's bones by
//! one step. Nothing here allocates, locks or touches the host's
//! transforms; the engine crate gathers inputs into flat buffers, calls
//! the kernel once per chain, and scatters the results.
//!
//! Per-bone step order:
//!
//! 1. Propagate the head pose from the parent.
//! 2. Verlet-integrate the tip and re-project it onto the rest length.
//! 3. Length-limit springs.
//! 4. Ground plane, then colliders (with bounce and friction).
//! 5. Angle limits.
//! 6. Reset non-finite tips, then rebuild the local rotation.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod angle;
pub mod bone;
pub mod collider;
pub mod collision;
pub mod kernel;
pub mod rest;
pub mod settings;

pub use angle::AngleLimit;
pub use bone::{BoneProperties, BoneState, IndexRange, LengthLimitProperties};
pub use collider::{ColliderKind, ColliderProperties, ColliderState};
pub use kernel::{simulate_chain, ChainInputs, StepStats};
pub use rest::{child_tip, rest_pose, RestPose};
pub use settings::ChainSettings;
