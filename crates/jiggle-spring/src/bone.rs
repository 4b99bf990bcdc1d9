//! Bone static properties, mutable state, and length-limit links.

use glam::{Quat, Vec3};

use crate::angle::AngleLimit;

/// A `start + len` window into one of a chain's shared buffers.
///
/// Offsets stored inside [`BoneProperties`] are relative to the owning
/// chain's block, never absolute buffer positions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IndexRange {
    /// First element.
    pub start: usize,
    /// Number of elements.
    pub len: usize,
}

impl IndexRange {
    /// The empty range.
    pub const EMPTY: Self = Self { start: 0, len: 0 };

    /// Create a range.
    pub fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    /// One past the last element.
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    /// Whether the range is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// As a `std::ops::Range`.
    pub fn as_range(&self) -> std::ops::Range<usize> {
        self.start..self.end()
    }
}

/// Per-bone parameters, fixed for the lifetime of a registration except
/// for the tuning fields a host may live-edit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoneProperties {
    /// Hooke's-law stiffness pulling the tip towards its rest position.
    pub stiffness: f32,
    /// Velocity damping in `[0, 1]`; `1` removes all inertia.
    pub drag: f32,
    /// Constant force added every step.
    pub spring_force: Vec3,
    /// Scale applied to the chain's wind force.
    pub wind_influence: f32,
    /// Strength of the angle-limit correction.
    pub angular_stiffness: f32,
    /// Swing limit measured towards the pivot's −Y.
    pub y_limit: AngleLimit,
    /// Swing limit measured towards the pivot's −Z.
    pub z_limit: AngleLimit,
    /// Collision radius of the tip.
    pub radius: f32,
    /// Rest distance from head to tip.
    pub rest_length: f32,
    /// Unit bone direction in the bone's rest local frame.
    pub bone_axis: Vec3,
    /// Collider layers this bone collides with (`1 << layer`).
    pub collision_mask: u32,
    /// Explicit collider list (chain-local, into the chain's collision
    /// index block). Overrides `collision_mask` when non-empty.
    pub collision_indices: IndexRange,
    /// Parent bone within the chain, or `None` if the parent is external.
    pub parent: Option<usize>,
    /// Pivot bone within the chain, or `None` if the pivot is external.
    pub pivot: Option<usize>,
    /// Position relative to the parent.
    pub local_position: Vec3,
    /// Rotation relative to the parent at registration.
    pub initial_local_rotation: Quat,
    /// Length limits of this bone (chain-local, into the chain's
    /// length-limit block).
    pub length_limits: IndexRange,
}

impl Default for BoneProperties {
    fn default() -> Self {
        Self {
            stiffness: 0.01,
            drag: 0.4,
            spring_force: Vec3::ZERO,
            wind_influence: 1.0,
            angular_stiffness: 100.0,
            y_limit: AngleLimit::default(),
            z_limit: AngleLimit::default(),
            radius: 0.05,
            rest_length: 0.0,
            bone_axis: Vec3::NEG_X,
            collision_mask: u32::MAX,
            collision_indices: IndexRange::EMPTY,
            parent: None,
            pivot: None,
            local_position: Vec3::ZERO,
            initial_local_rotation: Quat::IDENTITY,
            length_limits: IndexRange::EMPTY,
        }
    }
}

/// Per-bone state, read and written every frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoneState {
    /// Simulated tip position (world).
    pub current_tip: Vec3,
    /// Tip position one step ago; `current_tip - previous_tip` is the
    /// implicit velocity.
    pub previous_tip: Vec3,
    /// Rotation relative to the parent; the value scattered to the host.
    pub local_rotation: Quat,
    /// Head position (world).
    pub position: Vec3,
    /// World rotation.
    pub rotation: Quat,
    /// Parent world position used this step.
    pub parent_position: Vec3,
    /// Parent world rotation used this step.
    pub parent_rotation: Quat,
}

impl Default for BoneState {
    fn default() -> Self {
        Self {
            current_tip: Vec3::ZERO,
            previous_tip: Vec3::ZERO,
            local_rotation: Quat::IDENTITY,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            parent_position: Vec3::ZERO,
            parent_rotation: Quat::IDENTITY,
        }
    }
}

impl BoneState {
    /// State for a bone at rest with its tip at `tip`.
    pub fn at_rest(tip: Vec3, local_rotation: Quat) -> Self {
        Self {
            current_tip: tip,
            previous_tip: tip,
            local_rotation,
            ..Self::default()
        }
    }
}

/// A spring pulling a bone's tip towards a target at a fixed distance.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LengthLimitProperties {
    /// Target bone within the chain, or `None` if the target position is
    /// sampled externally (or is a fixed anchor).
    pub target: Option<usize>,
    /// Rest distance between tip and target.
    pub rest_distance: f32,
}
