//! Per-chain simulation settings.

use glam::Vec3;

/// Settings shared by every bone of one chain.
///
/// Snapshotted into the chain's descriptor at registration and replaceable
/// at any time between frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChainSettings {
    /// Blend factor between last frame's local rotation and the freshly
    /// computed one. `1.0` is fully reactive, `0.0` frozen.
    pub dynamic_ratio: f32,
    /// Gravity acceleration applied to every tip.
    pub gravity: Vec3,
    /// External force (wind), scaled per bone by its wind influence.
    pub wind: Vec3,
    /// Fraction of the normal velocity kept after a collider hit, in `[0, 1]`.
    pub bounce: f32,
    /// Fraction of the tangential velocity removed after a collider hit,
    /// in `[0, 1]`.
    pub friction: f32,
    /// Apply per-bone angle limits.
    pub enable_angle_limits: bool,
    /// Resolve collisions against the chain's colliders.
    pub enable_collision: bool,
    /// Apply length-limit springs.
    pub enable_length_limits: bool,
    /// Resolve collisions against the ground plane.
    pub collide_with_ground: bool,
    /// Height of the ground plane on the world Y axis.
    pub ground_height: f32,
}

impl ChainSettings {
    /// Set [`dynamic_ratio`](Self::dynamic_ratio).
    pub fn with_dynamic_ratio(mut self, ratio: f32) -> Self {
        self.dynamic_ratio = ratio;
        self
    }

    /// Set [`gravity`](Self::gravity).
    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    /// Set [`wind`](Self::wind).
    pub fn with_wind(mut self, wind: Vec3) -> Self {
        self.wind = wind;
        self
    }

    /// Set [`bounce`](Self::bounce) and [`friction`](Self::friction).
    pub fn with_bounce_friction(mut self, bounce: f32, friction: f32) -> Self {
        self.bounce = bounce;
        self.friction = friction;
        self
    }

    /// Enable or disable the ground plane, at the given height.
    pub fn with_ground(mut self, enabled: bool, height: f32) -> Self {
        self.collide_with_ground = enabled;
        self.ground_height = height;
        self
    }

    /// Enable or disable collider collisions.
    pub fn with_collision(mut self, enabled: bool) -> Self {
        self.enable_collision = enabled;
        self
    }

    /// Enable or disable angle limits.
    pub fn with_angle_limits(mut self, enabled: bool) -> Self {
        self.enable_angle_limits = enabled;
        self
    }

    /// Enable or disable length limits.
    pub fn with_length_limits(mut self, enabled: bool) -> Self {
        self.enable_length_limits = enabled;
        self
    }
}

impl Default for ChainSettings {
    fn default() -> Self {
        Self {
            dynamic_ratio: 0.5,
            gravity: Vec3::new(0.0, -10.0, 0.0),
            wind: Vec3::ZERO,
            bounce: 0.0,
            friction: 1.0,
            enable_angle_limits: true,
            enable_collision: true,
            enable_length_limits: true,
            collide_with_ground: true,
            ground_height: 0.0,
        }
    }
}
