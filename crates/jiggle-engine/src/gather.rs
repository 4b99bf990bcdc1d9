//! Gather phase: sample external transforms into the shared buffers.
//!
//! Four independent streams, each a flat map over a binding array:
//!
//! | Stream        | Bindings                   | Output            |
//! |---------------|----------------------------|-------------------|
//! | parent poses  | `parent_transforms`        | `parent_poses`    |
//! | pivot poses   | `pivot_transforms`         | `pivot_poses`     |
//! | colliders     | `collider_transforms`      | `collider_states` |
//! | length limits | `length_target_transforms` | `length_targets`  |
//!
//! Unbound slots (in-chain links, anchors, free slots) are skipped. A bound
//! transform the store no longer knows keeps its last sampled value.

use glam::Vec3;
use jiggle_core::{Pose, TransformId, TransformStore};
use jiggle_spring::ColliderState;
use rayon::ThreadPool;

use crate::state::SimulationState;

/// Run all four streams, concurrently on `pool` when there is one.
pub(crate) fn gather(
    state: &mut SimulationState,
    store: &dyn TransformStore,
    pool: Option<&ThreadPool>,
) {
    let SimulationState {
        parent_transforms,
        parent_poses,
        pivot_transforms,
        pivot_poses,
        collider_transforms,
        collider_states,
        length_target_transforms,
        length_targets,
        ..
    } = state;

    let Some(pool) = pool else {
        gather_poses(store, parent_transforms, parent_poses);
        gather_poses(store, pivot_transforms, pivot_poses);
        gather_colliders(store, collider_transforms, collider_states);
        gather_positions(store, length_target_transforms, length_targets);
        return;
    };

    pool.install(|| {
        rayon::join(
            || {
                rayon::join(
                    || gather_poses(store, parent_transforms, parent_poses),
                    || gather_poses(store, pivot_transforms, pivot_poses),
                )
            },
            || {
                rayon::join(
                    || gather_colliders(store, collider_transforms, collider_states),
                    || gather_positions(store, length_target_transforms, length_targets),
                )
            },
        );
    });
}

pub(crate) fn gather_poses(
    store: &dyn TransformStore,
    bindings: &[Option<TransformId>],
    out: &mut [Pose],
) {
    for (binding, pose) in bindings.iter().zip(out.iter_mut()) {
        if let Some(sampled) = binding.and_then(|id| store.world_pose(id)) {
            *pose = sampled;
        }
    }
}

pub(crate) fn gather_colliders(
    store: &dyn TransformStore,
    bindings: &[Option<TransformId>],
    out: &mut [ColliderState],
) {
    for (binding, state) in bindings.iter().zip(out.iter_mut()) {
        if let Some(sampled) = binding.and_then(|id| store.world_pose(id)) {
            *state = ColliderState::from_pose(sampled);
        }
    }
}

pub(crate) fn gather_positions(
    store: &dyn TransformStore,
    bindings: &[Option<TransformId>],
    out: &mut [Vec3],
) {
    for (binding, position) in bindings.iter().zip(out.iter_mut()) {
        if let Some(sampled) = binding.and_then(|id| store.world_pose(id)) {
            *position = sampled.position;
        }
    }
}
