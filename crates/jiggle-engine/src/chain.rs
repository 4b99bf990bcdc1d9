//! Host-facing description of a chain to register.
//!
//! A [`ChainDesc`] is consumed by
//! [`SpringScheduler::register`](crate::SpringScheduler::register): bone
//! and collider descriptions are flattened into the scheduler's shared
//! buffers and the descriptor itself is not kept.

use glam::Vec3;
use jiggle_core::TransformId;
use jiggle_spring::{AngleLimit, BoneProperties, ChainSettings, ColliderProperties};
use smallvec::SmallVec;

use crate::config::Timestep;

/// Where a bone's parent pose comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoneParent {
    /// An external transform, sampled every frame.
    Transform(TransformId),
    /// An earlier bone of the same chain (its simulated pose).
    Bone(usize),
}

/// Reference frame for a bone's angle limits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BonePivot {
    /// Same as the bone's parent.
    #[default]
    Parent,
    /// An external transform, sampled every frame.
    Transform(TransformId),
    /// Another bone of the same chain.
    Bone(usize),
}

/// What a length limit pulls a bone's tip towards.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LengthTarget {
    /// The head of another bone of the same chain.
    Bone(usize),
    /// An external transform, sampled every frame.
    Transform(TransformId),
    /// A fixed world-space point.
    Anchor(Vec3),
}

/// Which colliders a bone is tested against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CollisionFilter {
    /// Every collider of the chain whose layer bit is set in the mask.
    Mask(u32),
    /// Exactly these colliders (indices into [`ChainDesc::colliders`]).
    Colliders(SmallVec<[usize; 4]>),
}

impl Default for CollisionFilter {
    fn default() -> Self {
        CollisionFilter::Mask(u32::MAX)
    }
}

/// The live-editable per-bone parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoneTuning {
    /// Spring stiffness.
    pub stiffness: f32,
    /// Velocity damping in `[0, 1]`.
    pub drag: f32,
    /// Constant force.
    pub spring_force: Vec3,
    /// Scale applied to the chain's wind.
    pub wind_influence: f32,
    /// Angle-limit correction strength.
    pub angular_stiffness: f32,
    /// Swing limit towards the pivot's −Y.
    pub y_limit: AngleLimit,
    /// Swing limit towards the pivot's −Z.
    pub z_limit: AngleLimit,
    /// Tip collision radius.
    pub radius: f32,
}

impl Default for BoneTuning {
    fn default() -> Self {
        let p = BoneProperties::default();
        Self {
            stiffness: p.stiffness,
            drag: p.drag,
            spring_force: p.spring_force,
            wind_influence: p.wind_influence,
            angular_stiffness: p.angular_stiffness,
            y_limit: p.y_limit,
            z_limit: p.z_limit,
            radius: p.radius,
        }
    }
}

impl BoneTuning {
    /// Copy these values into `props`, leaving geometry and linkage alone.
    pub(crate) fn apply_to(&self, props: &mut BoneProperties) {
        props.stiffness = self.stiffness;
        props.drag = self.drag.clamp(0.0, 1.0);
        props.spring_force = self.spring_force;
        props.wind_influence = self.wind_influence;
        props.angular_stiffness = self.angular_stiffness.max(0.0);
        props.y_limit = self.y_limit.normalized();
        props.z_limit = self.z_limit.normalized();
        props.radius = self.radius.max(0.0);
    }
}

/// One bone of a chain.
#[derive(Clone, Debug, PartialEq)]
pub struct BoneDesc {
    /// The bone's own transform; receives the simulated local rotation.
    pub transform: TransformId,
    /// Parent pose source.
    pub parent: BoneParent,
    /// Angle-limit reference frame.
    pub pivot: BonePivot,
    /// Child transforms used to derive the rest tip. When empty, bones of
    /// the same chain parented to this one are used instead.
    pub children: SmallVec<[TransformId; 2]>,
    /// Tunable parameters.
    pub tuning: BoneTuning,
    /// Collider selection.
    pub collision: CollisionFilter,
    /// Length-limit targets.
    pub length_targets: SmallVec<[LengthTarget; 2]>,
}

impl BoneDesc {
    /// A bone with default tuning.
    pub fn new(transform: TransformId, parent: BoneParent) -> Self {
        Self {
            transform,
            parent,
            pivot: BonePivot::Parent,
            children: SmallVec::new(),
            tuning: BoneTuning::default(),
            collision: CollisionFilter::default(),
            length_targets: SmallVec::new(),
        }
    }

    /// Replace the tuning.
    pub fn with_tuning(mut self, tuning: BoneTuning) -> Self {
        self.tuning = tuning;
        self
    }

    /// Set the pivot.
    pub fn with_pivot(mut self, pivot: BonePivot) -> Self {
        self.pivot = pivot;
        self
    }

    /// Add a child transform.
    pub fn with_child(mut self, child: TransformId) -> Self {
        self.children.push(child);
        self
    }

    /// Set the collider selection.
    pub fn with_collision(mut self, filter: CollisionFilter) -> Self {
        self.collision = filter;
        self
    }

    /// Add a length-limit target.
    pub fn with_length_target(mut self, target: LengthTarget) -> Self {
        self.length_targets.push(target);
        self
    }
}

/// One collider of a chain.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColliderDesc {
    /// Transform the collider follows.
    pub transform: TransformId,
    /// Shape and layer.
    pub shape: ColliderProperties,
}

/// Everything needed to register a chain.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChainDesc {
    /// Bones, parents before children.
    pub bones: Vec<BoneDesc>,
    /// Colliders the bones may hit.
    pub colliders: Vec<ColliderDesc>,
    /// Initial settings.
    pub settings: ChainSettings,
    /// Step length policy.
    pub timestep: Timestep,
}

impl ChainDesc {
    /// An empty chain with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a bone.
    pub fn with_bone(mut self, bone: BoneDesc) -> Self {
        self.bones.push(bone);
        self
    }

    /// Append a collider.
    pub fn with_collider(mut self, transform: TransformId, shape: ColliderProperties) -> Self {
        self.colliders.push(ColliderDesc { transform, shape });
        self
    }

    /// Replace the settings.
    pub fn with_settings(mut self, settings: ChainSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Replace the timestep.
    pub fn with_timestep(mut self, timestep: Timestep) -> Self {
        self.timestep = timestep;
        self
    }

    /// Number of explicit collider-list entries across all bones.
    pub fn collision_index_count(&self) -> usize {
        self.bones
            .iter()
            .map(|b| match &b.collision {
                CollisionFilter::Mask(_) => 0,
                CollisionFilter::Colliders(list) => list.len(),
            })
            .sum()
    }

    /// Number of length limits across all bones.
    pub fn length_limit_count(&self) -> usize {
        self.bones.iter().map(|b| b.length_targets.len()).sum()
    }
}
