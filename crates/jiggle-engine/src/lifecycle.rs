//! Chain registration, deregistration, and live editing.
//!
//! Registration runs in two passes. The first validates the description
//! and builds every bone, collider, collision-index and length-limit
//! record into scratch vectors, sampling the host's transforms for the
//! rest pose. Only then are the four blocks granted, each exactly as large
//! as its scratch vector, and the records copied in. A failure in either
//! pass leaves the pools untouched.

use glam::Vec3;
use jiggle_core::{ChainId, Pose, TransformId, TransformStore};
use jiggle_spring::{
    child_tip, rest_pose, BoneProperties, BoneState, ChainSettings, ColliderProperties,
    ColliderState, IndexRange, LengthLimitProperties,
};

use crate::chain::{BoneParent, BonePivot, BoneTuning, ChainDesc, CollisionFilter, LengthTarget};
use crate::config::Timestep;
use crate::error::{RegisterError, SchedulerError};
use crate::registry::ChainEntry;
use crate::scheduler::SpringScheduler;

// ── Scratch ───────────────────────────────────────────────────────

/// One chain flattened into pool-ready records, before any block exists.
struct ChainScratch {
    bones: Vec<BoneProperties>,
    states: Vec<BoneState>,
    bone_transforms: Vec<TransformId>,
    parent_poses: Vec<Pose>,
    parent_transforms: Vec<Option<TransformId>>,
    pivot_poses: Vec<Pose>,
    pivot_transforms: Vec<Option<TransformId>>,
    colliders: Vec<ColliderProperties>,
    collider_states: Vec<ColliderState>,
    collider_transforms: Vec<TransformId>,
    collision_indices: Vec<u32>,
    length_limits: Vec<LengthLimitProperties>,
    length_targets: Vec<Vec3>,
    length_target_transforms: Vec<Option<TransformId>>,
}

impl ChainScratch {
    /// Empty scratch sized for `desc`.
    fn for_desc(desc: &ChainDesc) -> Self {
        let bones = desc.bones.len();
        let colliders = desc.colliders.len();
        let limits = desc.length_limit_count();
        Self {
            bones: Vec::with_capacity(bones),
            states: Vec::with_capacity(bones),
            bone_transforms: Vec::with_capacity(bones),
            parent_poses: Vec::with_capacity(bones),
            parent_transforms: Vec::with_capacity(bones),
            pivot_poses: Vec::with_capacity(bones),
            pivot_transforms: Vec::with_capacity(bones),
            colliders: Vec::with_capacity(colliders),
            collider_states: Vec::with_capacity(colliders),
            collider_transforms: Vec::with_capacity(colliders),
            collision_indices: Vec::with_capacity(desc.collision_index_count()),
            length_limits: Vec::with_capacity(limits),
            length_targets: Vec::with_capacity(limits),
            length_target_transforms: Vec::with_capacity(limits),
        }
    }
}

fn invalid(reason: String) -> RegisterError {
    RegisterError::InvalidChain { reason }
}

fn world_pose(store: &dyn TransformStore, id: TransformId) -> Result<Pose, RegisterError> {
    store
        .world_pose(id)
        .ok_or(RegisterError::MissingTransform { transform: id })
}

/// Reject links that would index outside the chain or break
/// parent-before-child order.
fn validate(desc: &ChainDesc) -> Result<(), RegisterError> {
    let bone_count = desc.bones.len();
    let collider_count = desc.colliders.len();
    for (i, bone) in desc.bones.iter().enumerate() {
        if let BoneParent::Bone(p) = bone.parent {
            if p >= i {
                return Err(invalid(format!(
                    "bone {i} has parent bone {p}; parents must come first"
                )));
            }
        }
        if let BonePivot::Bone(p) = bone.pivot {
            if p >= bone_count || p == i {
                return Err(invalid(format!("bone {i} has invalid pivot bone {p}")));
            }
        }
        if let CollisionFilter::Colliders(list) = &bone.collision {
            if let Some(c) = list.iter().find(|&&c| c >= collider_count) {
                return Err(invalid(format!(
                    "bone {i} references collider {c} of {collider_count}"
                )));
            }
        }
        for target in &bone.length_targets {
            if let LengthTarget::Bone(b) = *target {
                if b >= bone_count || b == i {
                    return Err(invalid(format!("bone {i} has invalid length-limit bone {b}")));
                }
            }
        }
    }
    Ok(())
}

/// First pass: flatten `desc` into scratch records.
fn build_scratch(
    desc: &ChainDesc,
    store: &dyn TransformStore,
) -> Result<ChainScratch, RegisterError> {
    validate(desc)?;
    let mut s = ChainScratch::for_desc(desc);

    let worlds: Vec<Pose> = desc
        .bones
        .iter()
        .map(|b| world_pose(store, b.transform))
        .collect::<Result<_, _>>()?;

    for (i, bone) in desc.bones.iter().enumerate() {
        let world = worlds[i];
        let (parent_pose, parent_index, parent_transform) = match bone.parent {
            BoneParent::Bone(p) => (worlds[p], Some(p), None),
            BoneParent::Transform(t) => (world_pose(store, t)?, None, Some(t)),
        };
        let (pivot_pose, pivot_index, pivot_transform) = match bone.pivot {
            BonePivot::Parent => (parent_pose, parent_index, parent_transform),
            BonePivot::Bone(p) => (worlds[p], Some(p), None),
            BonePivot::Transform(t) => (world_pose(store, t)?, None, Some(t)),
        };

        // Rest tip from explicit children, else from in-chain children.
        let mut children: Vec<Vec3> = bone
            .children
            .iter()
            .filter_map(|&c| match store.world_pose(c) {
                Some(pose) => Some(pose.position),
                None => {
                    log::warn!("bone {i}: child transform {c} not found; ignoring it");
                    None
                }
            })
            .collect();
        if children.is_empty() {
            children.extend(
                desc.bones
                    .iter()
                    .enumerate()
                    .filter(|(_, b)| b.parent == BoneParent::Bone(i))
                    .map(|(j, _)| worlds[j].position),
            );
        }
        if children.is_empty() {
            log::warn!(
                "bone {i} (transform {}) has no valid children; using a short -X tip",
                bone.transform
            );
        }
        let rest = rest_pose(&world, child_tip(&world, &children));

        let inverse_parent = parent_pose.rotation.inverse();
        let initial_local_rotation = (inverse_parent * world.rotation).normalize();
        let mut props = BoneProperties {
            rest_length: rest.rest_length,
            bone_axis: rest.bone_axis,
            parent: parent_index,
            pivot: pivot_index,
            local_position: inverse_parent * (world.position - parent_pose.position),
            initial_local_rotation,
            ..BoneProperties::default()
        };
        bone.tuning.apply_to(&mut props);

        match &bone.collision {
            CollisionFilter::Mask(mask) => props.collision_mask = *mask,
            CollisionFilter::Colliders(list) => {
                props.collision_indices = IndexRange::new(s.collision_indices.len(), list.len());
                s.collision_indices.extend(list.iter().map(|&c| c as u32));
            }
        }

        props.length_limits = IndexRange::new(s.length_limits.len(), bone.length_targets.len());
        for target in &bone.length_targets {
            let (position, target_bone, binding) = match *target {
                LengthTarget::Bone(b) => (worlds[b].position, Some(b), None),
                LengthTarget::Transform(t) => (world_pose(store, t)?.position, None, Some(t)),
                LengthTarget::Anchor(p) => (p, None, None),
            };
            s.length_limits.push(LengthLimitProperties {
                target: target_bone,
                rest_distance: (position - rest.tip).length(),
            });
            s.length_targets.push(position);
            s.length_target_transforms.push(binding);
        }

        s.bones.push(props);
        s.states.push(BoneState {
            current_tip: rest.tip,
            previous_tip: rest.tip,
            local_rotation: initial_local_rotation,
            position: world.position,
            rotation: world.rotation,
            parent_position: parent_pose.position,
            parent_rotation: parent_pose.rotation,
        });
        s.bone_transforms.push(bone.transform);
        s.parent_poses.push(parent_pose);
        s.parent_transforms.push(parent_transform);
        s.pivot_poses.push(pivot_pose);
        s.pivot_transforms.push(pivot_transform);
    }

    for collider in &desc.colliders {
        let pose = world_pose(store, collider.transform)?;
        let mut shape = collider.shape;
        shape.radius = shape.radius.max(0.0);
        s.colliders.push(shape);
        s.collider_states.push(ColliderState::from_pose(pose));
        s.collider_transforms.push(collider.transform);
    }

    Ok(s)
}

// ── SpringScheduler lifecycle ─────────────────────────────────────

impl SpringScheduler {
    /// Register a chain and start simulating it from its current pose.
    ///
    /// Awaits any in-flight frame first. On error nothing is registered
    /// and every pool is as it was.
    pub fn register(&mut self, desc: ChainDesc) -> Result<ChainId, RegisterError> {
        let store = std::sync::Arc::clone(&self.store);
        let state = self.state_mut().map_err(|_| RegisterError::PipelineLost)?;
        if state.registry.is_full() {
            return Err(RegisterError::ChainLimit {
                limit: state.registry.limit(),
            });
        }

        let scratch = build_scratch(&desc, store.as_ref())?;
        let blocks = state.grant(
            scratch.bones.len(),
            scratch.colliders.len(),
            scratch.collision_indices.len(),
            scratch.length_limits.len(),
        )?;

        let bones = blocks.bones.range();
        state.bone_pool.get_mut(&blocks.bones).copy_from_slice(&scratch.bones);
        state.bone_states[bones.clone()].copy_from_slice(&scratch.states);
        state.parent_poses[bones.clone()].copy_from_slice(&scratch.parent_poses);
        state.pivot_poses[bones.clone()].copy_from_slice(&scratch.pivot_poses);
        state.parent_transforms[bones.clone()].copy_from_slice(&scratch.parent_transforms);
        state.pivot_transforms[bones.clone()].copy_from_slice(&scratch.pivot_transforms);
        for (slot, id) in state.bone_transforms[bones.clone()]
            .iter_mut()
            .zip(&scratch.bone_transforms)
        {
            *slot = Some(*id);
        }

        let colliders = blocks.colliders.range();
        state
            .collider_pool
            .get_mut(&blocks.colliders)
            .copy_from_slice(&scratch.colliders);
        state.collider_states[colliders.clone()].copy_from_slice(&scratch.collider_states);
        for (slot, id) in state.collider_transforms[colliders.clone()]
            .iter_mut()
            .zip(&scratch.collider_transforms)
        {
            *slot = Some(*id);
        }

        state
            .collision_index_pool
            .get_mut(&blocks.collision_indices)
            .copy_from_slice(&scratch.collision_indices);

        let limits = blocks.length_limits.range();
        state
            .length_limit_pool
            .get_mut(&blocks.length_limits)
            .copy_from_slice(&scratch.length_limits);
        state.length_targets[limits.clone()].copy_from_slice(&scratch.length_targets);
        state.length_target_transforms[limits.clone()]
            .copy_from_slice(&scratch.length_target_transforms);

        for id in &scratch.bone_transforms {
            store.set_simulated(*id, true);
        }

        let id = state.registry.insert(ChainEntry {
            settings: desc.settings,
            timestep: desc.timestep,
            paused: false,
            blocks,
        });
        log::debug!(
            "registered chain {id}: bones {bones:?}, colliders {colliders:?}, limits {limits:?}"
        );
        Ok(id)
    }

    /// Stop simulating a chain and release everything it owned.
    ///
    /// Awaits any in-flight frame first. The chain's bone transforms are
    /// handed back to the host (no longer marked simulated).
    pub fn deregister(&mut self, id: ChainId) -> Result<(), SchedulerError> {
        let store = std::sync::Arc::clone(&self.store);
        let state = self.state_mut()?;
        let entry = state
            .registry
            .remove(id)
            .ok_or(SchedulerError::UnknownChain(id))?;

        for transform in state.bone_transforms[entry.blocks.bones.range()].iter().flatten() {
            store.set_simulated(*transform, false);
        }
        log::debug!("deregistered chain {id}: bones {:?}", entry.blocks.bones.range());
        state.release(entry.blocks);
        Ok(())
    }

    /// Replace a chain's settings. Takes effect from the next frame.
    pub fn update_settings(
        &mut self,
        id: ChainId,
        settings: ChainSettings,
    ) -> Result<(), SchedulerError> {
        self.entry_mut(id)?.settings = settings;
        Ok(())
    }

    /// Replace a chain's timestep policy.
    pub fn set_timestep(&mut self, id: ChainId, timestep: Timestep) -> Result<(), SchedulerError> {
        self.entry_mut(id)?.timestep = timestep;
        Ok(())
    }

    /// Pause or resume a chain. A paused chain keeps its state and its
    /// bones keep receiving their last local rotation.
    pub fn set_paused(&mut self, id: ChainId, paused: bool) -> Result<(), SchedulerError> {
        self.entry_mut(id)?.paused = paused;
        Ok(())
    }

    /// Current settings of a chain.
    pub fn settings(&mut self, id: ChainId) -> Result<ChainSettings, SchedulerError> {
        Ok(self.entry_mut(id)?.settings)
    }

    /// Replace the tunable parameters of one bone.
    pub fn update_bone_tuning(
        &mut self,
        id: ChainId,
        bone: usize,
        tuning: BoneTuning,
    ) -> Result<(), SchedulerError> {
        let state = self.state_mut()?;
        let entry = state.registry.get(id).ok_or(SchedulerError::UnknownChain(id))?;
        let props = state.bone_pool.get_mut(&entry.blocks.bones);
        let props = props
            .get_mut(bone)
            .ok_or(SchedulerError::InvalidBone { chain: id, bone })?;
        tuning.apply_to(props);
        Ok(())
    }

    fn entry_mut(&mut self, id: ChainId) -> Result<&mut ChainEntry, SchedulerError> {
        self.state_mut()?
            .registry
            .get_mut(id)
            .ok_or(SchedulerError::UnknownChain(id))
    }
}
