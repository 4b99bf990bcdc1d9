//! Rigid position + rotation pairs.

use glam::{Mat4, Quat, Vec3};

/// A rigid transform: world (or parent-relative) position and rotation.
///
/// Scale is deliberately absent. Spring bones are simulated in unscaled
/// space, matching how the host's transforms are sampled.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    /// Translation component.
    pub position: Vec3,
    /// Rotation component. Expected to be normalized.
    pub rotation: Quat,
}

impl Pose {
    /// The identity pose (origin, no rotation).
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    /// Create a pose from a position and rotation.
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// A pose with the given position and no rotation.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    /// Local-to-world matrix of this pose.
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position)
    }

    /// Transform a point from this pose's local space into its parent space.
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.position + self.rotation * point
    }

    /// Rotate a direction from local space into parent space.
    pub fn transform_vector(&self, vector: Vec3) -> Vec3 {
        self.rotation * vector
    }

    /// Compose `self` (parent) with a child pose expressed in `self`'s space.
    pub fn mul_pose(&self, child: &Pose) -> Pose {
        Pose {
            position: self.transform_point(child.position),
            rotation: self.rotation * child.rotation,
        }
    }

    /// Whether every component is finite.
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.rotation.is_finite()
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}
