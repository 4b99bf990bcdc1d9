//! The external transform representation.
//!
//! The engine never walks a scene graph. Everything it needs from the
//! host is a flat lookup from [`TransformId`] to the transform's current
//! world and parent-relative pose, plus a way to write a bone's new local
//! rotation back. [`TransformStore`] is that seam; [`TransformTable`] is a
//! simple thread-safe implementation for hosts that do not already have
//! one (and for tests).

use std::sync::{PoisonError, RwLock};

use glam::Quat;

use crate::id::TransformId;
use crate::pose::Pose;

/// A transform's pose sampled at one instant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransformSample {
    /// Pose in world space.
    pub world: Pose,
    /// Pose relative to the transform's parent.
    pub local: Pose,
}

/// Read/write access to the host application's transforms.
///
/// Implementations must be shareable across the scheduler's worker
/// threads: gather passes call [`world_pose`](Self::world_pose)
/// concurrently, and the scatter pass calls
/// [`write_local_rotation`](Self::write_local_rotation) concurrently for
/// distinct ids.
pub trait TransformStore: Send + Sync {
    /// Sample a transform, or `None` if the id no longer refers to a live
    /// transform.
    fn sample(&self, id: TransformId) -> Option<TransformSample>;

    /// World pose of a transform.
    fn world_pose(&self, id: TransformId) -> Option<Pose> {
        self.sample(id).map(|s| s.world)
    }

    /// Overwrite a transform's parent-relative rotation.
    ///
    /// Unknown ids are ignored.
    fn write_local_rotation(&self, id: TransformId, rotation: Quat);

    /// Mark a transform as driven by the spring simulation.
    ///
    /// Hosts that run their own lightweight per-bone physics must stop
    /// driving the rotation of a transform while it is marked, or the two
    /// will fight. The default implementation does nothing.
    fn set_simulated(&self, _id: TransformId, _simulated: bool) {}
}

#[derive(Clone, Debug)]
struct TransformNode {
    world: Pose,
    local: Pose,
    simulated: bool,
    alive: bool,
}

/// A flat, lock-protected table of transforms.
///
/// World and local poses are stored independently; the table does not
/// propagate hierarchy. Hosts update world poses each frame before
/// ticking the scheduler and read local rotations back afterwards.
#[derive(Debug, Default)]
pub struct TransformTable {
    nodes: RwLock<Vec<TransformNode>>,
}

impl TransformTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a transform and return its id.
    pub fn insert(&self, world: Pose, local: Pose) -> TransformId {
        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        let id = TransformId(nodes.len() as u32);
        nodes.push(TransformNode {
            world,
            local,
            simulated: false,
            alive: true,
        });
        id
    }

    /// Insert a root transform whose local pose equals its world pose.
    pub fn insert_root(&self, world: Pose) -> TransformId {
        self.insert(world, world)
    }

    /// Mark a transform as destroyed. Later samples return `None`.
    pub fn remove(&self, id: TransformId) {
        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(node) = nodes.get_mut(id.0 as usize) {
            node.alive = false;
        }
    }

    /// Replace a transform's world pose.
    pub fn set_world(&self, id: TransformId, world: Pose) {
        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(node) = nodes.get_mut(id.0 as usize) {
            node.world = world;
        }
    }

    /// Replace a transform's parent-relative pose.
    pub fn set_local(&self, id: TransformId, local: Pose) {
        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(node) = nodes.get_mut(id.0 as usize) {
            node.local = local;
        }
    }

    /// Current parent-relative rotation of a live transform.
    pub fn local_rotation(&self, id: TransformId) -> Option<Quat> {
        self.sample(id).map(|s| s.local.rotation)
    }

    /// Whether the transform is currently marked as simulation-driven.
    pub fn is_simulated(&self, id: TransformId) -> bool {
        let nodes = self.nodes.read().unwrap_or_else(PoisonError::into_inner);
        nodes
            .get(id.0 as usize)
            .is_some_and(|node| node.alive && node.simulated)
    }

    /// Number of transforms ever inserted (including removed ones).
    pub fn len(&self) -> usize {
        self.nodes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TransformStore for TransformTable {
    fn sample(&self, id: TransformId) -> Option<TransformSample> {
        let nodes = self.nodes.read().unwrap_or_else(PoisonError::into_inner);
        nodes
            .get(id.0 as usize)
            .filter(|node| node.alive)
            .map(|node| TransformSample {
                world: node.world,
                local: node.local,
            })
    }

    fn write_local_rotation(&self, id: TransformId, rotation: Quat) {
        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(node) = nodes.get_mut(id.0 as usize).filter(|n| n.alive) {
            node.local.rotation = rotation;
        }
    }

    fn set_simulated(&self, id: TransformId, simulated: bool) {
        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(node) = nodes.get_mut(id.0 as usize) {
            node.simulated = simulated;
        }
    }
}
