//! Core types and traits for the Jiggle spring-bone engine.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by the rest of the workspace: rigid poses,
//! strongly-typed identifiers, and the [`TransformStore`] trait through
//! which the engine reads and writes the host application's transforms.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod id;
pub mod pose;
pub mod transform;

pub use id::{ChainId, TransformId};
pub use pose::Pose;
pub use transform::{TransformSample, TransformStore, TransformTable};

/// Re-export of the math types used across the public API.
pub use glam::{Mat4, Quat, Vec3};
