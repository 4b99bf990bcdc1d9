//! Rest-pose derivation from a bone's children.

use glam::Vec3;
use jiggle_core::Pose;

/// Distance along the bone's local −X used when it has no children.
pub const CHILDLESS_TIP_DISTANCE: f32 = 0.1;

/// Rest geometry of one bone.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RestPose {
    /// World tip position.
    pub tip: Vec3,
    /// Head-to-tip distance.
    pub rest_length: f32,
    /// Unit tip direction in the bone's local frame.
    pub bone_axis: Vec3,
}

/// Where a bone's tip rests, derived from its children's world positions.
///
/// One child gives its position. Several give the direction to their mean
/// position, scaled to their mean distance. None gives a short stub along
/// the bone's −X.
pub fn child_tip(head: &Pose, children: &[Vec3]) -> Vec3 {
    match children {
        [] => head.transform_point(Vec3::NEG_X * CHILDLESS_TIP_DISTANCE),
        [only] => *only,
        many => {
            let mut sum = Vec3::ZERO;
            let mut distance = 0.0;
            for &child in many {
                sum += child;
                distance += (child - head.position).length();
            }
            let count = many.len() as f32;
            let direction = (sum / count - head.position).normalize_or_zero();
            head.position + direction * (distance / count)
        }
    }
}

/// Rest geometry for a bone at `head` whose tip sits at `tip`.
pub fn rest_pose(head: &Pose, tip: Vec3) -> RestPose {
    let local = head.rotation.inverse() * (tip - head.position);
    RestPose {
        tip,
        rest_length: local.length(),
        bone_axis: local.try_normalize().unwrap_or(Vec3::NEG_X),
    }
}
