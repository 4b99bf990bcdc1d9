//! Collider shapes and their per-frame world state.

use glam::{Mat4, Quat, Vec3};
use jiggle_core::Pose;

/// Collider shape.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ColliderKind {
    /// Sphere centred on the collider origin.
    #[default]
    Sphere,
    /// Capsule whose segment runs from the origin to local `+Y * height`.
    Capsule,
    /// Rectangle in the local XY plane facing local `+Z`.
    Panel,
}

/// Static collider parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColliderProperties {
    /// Shape.
    pub kind: ColliderKind,
    /// Sphere / capsule radius.
    pub radius: f32,
    /// Panel extent along local X.
    pub width: f32,
    /// Capsule segment length, or panel extent along local Y.
    pub height: f32,
    /// Layer tested against a bone's collision mask.
    pub layer: u32,
}

impl ColliderProperties {
    /// A sphere of the given radius on layer 0.
    pub fn sphere(radius: f32) -> Self {
        Self {
            kind: ColliderKind::Sphere,
            radius,
            ..Self::default()
        }
    }

    /// A capsule of the given radius and segment length on layer 0.
    pub fn capsule(radius: f32, height: f32) -> Self {
        Self {
            kind: ColliderKind::Capsule,
            radius,
            height,
            ..Self::default()
        }
    }

    /// A panel of the given extents on layer 0.
    pub fn panel(width: f32, height: f32) -> Self {
        Self {
            kind: ColliderKind::Panel,
            width,
            height,
            ..Self::default()
        }
    }

    /// Move the collider to another layer.
    pub fn on_layer(mut self, layer: u32) -> Self {
        self.layer = layer;
        self
    }

    /// Whether a bone with `mask` collides with this collider.
    pub fn matches_mask(&self, mask: u32) -> bool {
        1u32.checked_shl(self.layer)
            .is_some_and(|bit| mask & bit != 0)
    }
}

impl Default for ColliderProperties {
    fn default() -> Self {
        Self {
            kind: ColliderKind::Sphere,
            radius: 0.1,
            width: 0.0,
            height: 0.0,
            layer: 0,
        }
    }
}

/// Collider world state, refreshed by the gather phase every frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColliderState {
    /// World position.
    pub position: Vec3,
    /// World rotation.
    pub rotation: Quat,
    /// Collider-local to world.
    pub local_to_world: Mat4,
    /// World to collider-local.
    pub world_to_local: Mat4,
}

impl ColliderState {
    /// State for a collider at `pose`.
    pub fn from_pose(pose: Pose) -> Self {
        let local_to_world = pose.to_matrix();
        Self {
            position: pose.position,
            rotation: pose.rotation,
            local_to_world,
            world_to_local: local_to_world.inverse(),
        }
    }
}

impl Default for ColliderState {
    fn default() -> Self {
        Self::from_pose(Pose::IDENTITY)
    }
}
