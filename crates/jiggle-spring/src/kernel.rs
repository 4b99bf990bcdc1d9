//! The per-chain simulation step.
//!
//! Bones of a chain are stepped in index order. A bone whose parent lives
//! in the same chain reads that parent's pose as updated earlier in the
//! same step, which is why a chain must list parents before children.

use glam::{Quat, Vec3};
use jiggle_core::Pose;

use crate::bone::{BoneProperties, BoneState, LengthLimitProperties};
use crate::collider::{ColliderProperties, ColliderState};
use crate::collision::{fix_length, resolve_collider, resolve_ground};
use crate::settings::ChainSettings;

/// Below this head-to-tip distance the tip direction is taken from the
/// bone's rotation instead.
pub const LENGTH_EPSILON: f32 = 0.001;

/// Squared post-collision velocity below which a tip comes to rest.
pub const BOUNCE_SETTLE_THRESHOLD: f32 = 1e-4;

/// Read-only inputs for one chain, all sliced to the chain's own blocks.
#[derive(Clone, Copy, Debug)]
pub struct ChainInputs<'a> {
    /// Step length in seconds. `0` freezes integration.
    pub dt: f32,
    /// Chain settings.
    pub settings: &'a ChainSettings,
    /// One entry per bone.
    pub properties: &'a [BoneProperties],
    /// External parent pose per bone (ignored for in-chain parents).
    pub parent_poses: &'a [Pose],
    /// External pivot pose per bone (ignored for in-chain pivots).
    pub pivot_poses: &'a [Pose],
    /// The chain's colliders.
    pub colliders: &'a [ColliderProperties],
    /// World state per collider.
    pub collider_states: &'a [ColliderState],
    /// Explicit collider lists referenced by
    /// [`BoneProperties::collision_indices`].
    pub collision_indices: &'a [u32],
    /// Length limits referenced by [`BoneProperties::length_limits`].
    pub length_limits: &'a [LengthLimitProperties],
    /// Target position per length limit (ignored for in-chain targets).
    pub length_targets: &'a [Vec3],
}

/// Event counts from one or more chain steps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepStats {
    /// Bones stepped.
    pub bones: usize,
    /// Bones that hit at least one collider.
    pub collisions: usize,
    /// Bones that hit the ground plane.
    pub ground_contacts: usize,
    /// Bones whose tip went non-finite and was reset.
    pub nan_resets: usize,
}

impl StepStats {
    /// Add `other` into `self`.
    pub fn merge(&mut self, other: StepStats) {
        self.bones += other.bones;
        self.collisions += other.collisions;
        self.ground_contacts += other.ground_contacts;
        self.nan_resets += other.nan_resets;
    }
}

/// Advance every bone of one chain by `inputs.dt`.
///
/// `bones` must be the chain's state block, the same length as
/// `inputs.properties`.
pub fn simulate_chain(inputs: &ChainInputs<'_>, bones: &mut [BoneState]) -> StepStats {
    debug_assert_eq!(bones.len(), inputs.properties.len());
    let mut stats = StepStats::default();
    for index in 0..bones.len().min(inputs.properties.len()) {
        step_bone(inputs, bones, index, &mut stats);
    }
    stats
}

fn step_bone(
    inputs: &ChainInputs<'_>,
    bones: &mut [BoneState],
    index: usize,
    stats: &mut StepStats,
) {
    let props = &inputs.properties[index];
    let settings = inputs.settings;
    let parent = match props.parent {
        Some(p) if p < index => Pose::new(bones[p].position, bones[p].rotation),
        _ => inputs.parent_poses[index],
    };

    let mut bone = bones[index];
    bone.parent_position = parent.position;
    bone.parent_rotation = parent.rotation;
    bone.position = parent.transform_point(props.local_position);
    bone.rotation = parent.rotation * bone.local_rotation;

    let base = parent.rotation * props.initial_local_rotation;
    let rest_tip = bone.position + base * props.bone_axis * props.rest_length;

    integrate(&mut bone, props, settings, rest_tip, inputs.dt);

    if settings.enable_length_limits && !props.length_limits.is_empty() {
        apply_length_limits(inputs, bones, index, &mut bone);
    }
    let desired = bone.current_tip;

    let mut grounded = false;
    if settings.collide_with_ground {
        grounded = resolve_ground(
            bone.position,
            &mut bone.current_tip,
            settings.ground_height,
            props.radius,
        );
        if grounded {
            fix_length(
                bone.position,
                &mut bone.current_tip,
                props.rest_length * 0.5,
                props.rest_length,
            );
            bone.previous_tip = bone.current_tip;
            stats.ground_contacts += 1;
        }
    }

    if settings.enable_collision && !grounded {
        if let Some(normal) = collide(inputs, props, bone.position, &mut bone.current_tip) {
            apply_bounce(&mut bone, settings, desired, normal);
            stats.collisions += 1;
        }
    }

    if settings.enable_angle_limits && (props.y_limit.active || props.z_limit.active) {
        apply_angle_limits(inputs, bones, index, &mut bone);
    }

    if !bone.current_tip.is_finite() || !bone.previous_tip.is_finite() {
        bone.current_tip = rest_tip;
        bone.previous_tip = rest_tip;
        stats.nan_resets += 1;
    }

    update_rotation(&mut bone, props, base, settings.dynamic_ratio);
    bones[index] = bone;
    stats.bones += 1;
}

// ── Integration ─────────────────────────────────────────────────

fn integrate(
    bone: &mut BoneState,
    props: &BoneProperties,
    settings: &ChainSettings,
    rest_tip: Vec3,
    dt: f32,
) {
    let mut force = props.stiffness * (rest_tip - bone.current_tip);
    force += props.spring_force + settings.gravity + settings.wind * props.wind_influence;
    force *= 0.5 * dt * dt;
    force += (1.0 - props.drag) * (bone.current_tip - bone.previous_tip);

    bone.previous_tip = bone.current_tip;
    bone.current_tip += force;

    let offset = bone.current_tip - bone.position;
    let length = offset.length();
    let direction = if length <= LENGTH_EPSILON {
        bone.rotation * props.bone_axis
    } else {
        offset / length
    };
    bone.current_tip = bone.position + direction * props.rest_length;
}

// ── Constraints ─────────────────────────────────────────────────

fn apply_length_limits(
    inputs: &ChainInputs<'_>,
    bones: &[BoneState],
    index: usize,
    bone: &mut BoneState,
) {
    let props = &inputs.properties[index];
    let spring = 0.5 * inputs.dt * inputs.dt;
    let mut movement = Vec3::ZERO;

    for k in props.length_limits.as_range() {
        let Some(limit) = inputs.length_limits.get(k) else {
            continue;
        };
        let target = match limit.target {
            Some(b) if b == index => continue,
            Some(b) if b < bones.len() => bones[b].position,
            _ => match inputs.length_targets.get(k) {
                Some(&t) => t,
                None => continue,
            },
        };
        let to_tip = bone.current_tip - target;
        let distance = to_tip.length();
        if distance <= 0.0 {
            continue;
        }
        movement -= spring * (distance - limit.rest_distance) * (to_tip / distance);
    }

    bone.current_tip += movement;
}

fn collide(
    inputs: &ChainInputs<'_>,
    props: &BoneProperties,
    head: Vec3,
    tip: &mut Vec3,
) -> Option<Vec3> {
    let mut normal_sum = Vec3::ZERO;
    let mut hit = false;
    let mut test = |c: usize, tip: &mut Vec3| {
        let pair = (inputs.colliders.get(c), inputs.collider_states.get(c));
        if let (Some(collider), Some(state)) = pair {
            if let Some(normal) = resolve_collider(collider, state, head, tip, props.radius) {
                normal_sum += normal;
                hit = true;
            }
        }
    };

    if props.collision_indices.is_empty() {
        for (c, collider) in inputs.colliders.iter().enumerate() {
            if collider.matches_mask(props.collision_mask) {
                test(c, tip);
            }
        }
    } else {
        let list = inputs
            .collision_indices
            .get(props.collision_indices.as_range())
            .unwrap_or(&[]);
        for &c in list {
            test(c as usize, tip);
        }
    }

    hit.then(|| normal_sum.try_normalize().unwrap_or(Vec3::Y))
}

fn apply_bounce(bone: &mut BoneState, settings: &ChainSettings, desired: Vec3, normal: Vec3) {
    let incident = desired - bone.previous_tip;
    let reflected = incident - 2.0 * incident.dot(normal) * normal;
    let along_normal = normal * reflected.dot(normal);
    let lateral = reflected - along_normal;
    let velocity = along_normal * settings.bounce + lateral * (1.0 - settings.friction);

    if velocity.length_squared() > BOUNCE_SETTLE_THRESHOLD {
        let travelled = (bone.current_tip - bone.previous_tip).length();
        let speed = velocity.length();
        bone.previous_tip = bone.current_tip - velocity;
        bone.current_tip += (velocity / speed) * (speed - travelled).max(0.0);
    } else {
        bone.previous_tip = bone.current_tip;
    }
}

fn apply_angle_limits(
    inputs: &ChainInputs<'_>,
    bones: &[BoneState],
    index: usize,
    bone: &mut BoneState,
) {
    let props = &inputs.properties[index];
    let pivot = match props.pivot {
        Some(p) if p != index && p < bones.len() => Pose::new(bones[p].position, bones[p].rotation),
        _ => inputs.pivot_poses[index],
    };
    let forward = pivot.rotation * Vec3::NEG_X;
    let back = pivot.rotation * Vec3::NEG_Z;
    let down = pivot.rotation * Vec3::NEG_Y;
    let correction = props.angular_stiffness * inputs.dt;

    let mut vector = bone.current_tip - bone.position;
    if let Some(v) = props.y_limit.constrain(vector, down, back, forward, correction) {
        vector = v;
    }
    if let Some(v) = props.z_limit.constrain(vector, back, down, forward, correction) {
        vector = v;
    }
    bone.current_tip = bone.position + vector;
}

// ── Rotation ────────────────────────────────────────────────────

fn update_rotation(bone: &mut BoneState, props: &BoneProperties, base: Quat, dynamic_ratio: f32) {
    let local_tip = base.inverse() * (bone.current_tip - bone.position);
    let aim = match local_tip.try_normalize() {
        Some(direction) => Quat::from_rotation_arc(props.bone_axis, direction),
        None => Quat::IDENTITY,
    };
    let actual = props.initial_local_rotation * aim;
    bone.local_rotation = bone
        .local_rotation
        .lerp(actual, dynamic_ratio.clamp(0.0, 1.0))
        .normalize();
    bone.rotation = bone.parent_rotation * bone.local_rotation;
}


#[cfg(all(test, not(miri)))]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn integration_preserves_bone_length(
            stiffness in 0.0f32..10.0,
            drag in 0.0f32..1.0,
            gx in -20.0f32..20.0, gy in -20.0f32..20.0, gz in -20.0f32..20.0,
            vx in -0.5f32..0.5, vy in -0.5f32..0.5, vz in -0.5f32..0.5,
            length in 0.05f32..2.0,
        ) {
            let settings = ChainSettings::default()
                .with_gravity(Vec3::new(gx, gy, gz))
                .with_ground(false, 0.0)
                .with_collision(false)
                .with_angle_limits(false)
                .with_length_limits(false);
            let properties = [BoneProperties {
                stiffness,
                drag,
                rest_length: length,
                bone_axis: Vec3::X,
                ..BoneProperties::default()
            }];
            let head = Vec3::new(0.0, 1.0, 0.0);
            let tip = head + Vec3::X * length;
            let mut bones = [BoneState::at_rest(tip, Quat::IDENTITY)];
            bones[0].previous_tip = tip - Vec3::new(vx, vy, vz);
            let poses = [Pose::from_position(head)];
            let inputs = ChainInputs {
                dt: 1.0 / 60.0,
                settings: &settings,
                properties: &properties,
                parent_poses: &poses,
                pivot_poses: &poses,
                colliders: &[],
                collider_states: &[],
                collision_indices: &[],
                length_limits: &[],
                length_targets: &[],
            };
            for _ in 0..5 {
                simulate_chain(&inputs, &mut bones);
                let actual = (bones[0].current_tip - bones[0].position).length();
                prop_assert!((actual - length).abs() < 1e-3 * length.max(1.0));
                prop_assert!(bones[0].local_rotation.is_normalized());
            }
        }
    }
}
