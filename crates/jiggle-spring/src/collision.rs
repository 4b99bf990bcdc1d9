//! Tip-versus-shape collision resolution.
//!
//! Every resolver moves a penetrating tip to the nearest admissible point
//! that keeps the current head-to-tip distance, falling back to a plain
//! radial push when no such point exists. Collider shapes are resolved in
//! collider-local space through the state's matrices; the returned normal
//! is in world space.

use glam::Vec3;

use crate::collider::{ColliderKind, ColliderProperties, ColliderState};

const EPSILON: f32 = 1e-6;

/// Resolve `tip` against one collider. Returns the world-space contact
/// normal on a hit.
pub fn resolve_collider(
    collider: &ColliderProperties,
    state: &ColliderState,
    head: Vec3,
    tip: &mut Vec3,
    tip_radius: f32,
) -> Option<Vec3> {
    let local_head = state.world_to_local.transform_point3(head);
    let mut local_tip = state.world_to_local.transform_point3(*tip);

    let local_normal = match collider.kind {
        ColliderKind::Sphere => push_out_of_sphere(
            Vec3::ZERO,
            collider.radius + tip_radius,
            local_head,
            &mut local_tip,
        ),
        ColliderKind::Capsule => {
            let center = closest_on_segment(Vec3::ZERO, Vec3::Y * collider.height, local_tip);
            push_out_of_sphere(
                center,
                collider.radius + tip_radius,
                local_head,
                &mut local_tip,
            )
        }
        ColliderKind::Panel => resolve_panel(collider, local_head, &mut local_tip, tip_radius),
    }?;

    *tip = state.local_to_world.transform_point3(local_tip);
    Some(unit_or(
        state.local_to_world.transform_vector3(local_normal),
        Vec3::Y,
    ))
}

/// Resolve `tip` against the horizontal plane `y = height`.
pub fn resolve_ground(head: Vec3, tip: &mut Vec3, height: f32, tip_radius: f32) -> bool {
    let offset = Vec3::Y * height;
    let mut local_tip = *tip - offset;
    let hit = resolve_on_axis(head - offset, &mut local_tip, tip_radius, Vec3::Y);
    if hit {
        *tip = local_tip + offset;
    }
    hit
}

/// Clamp the head-to-tip distance into `[min, max]`.
pub fn fix_length(head: Vec3, tip: &mut Vec3, min: f32, max: f32) {
    let delta = *tip - head;
    let length = delta.length();
    if length < EPSILON {
        return;
    }
    let clamped = length.clamp(min, max);
    if clamped != length {
        *tip = head + delta * (clamped / length);
    }
}

/// Push `tip` out of the sphere `(center, radius)`, keeping its distance
/// from `head` where the geometry allows. Returns the outward normal.
pub fn push_out_of_sphere(center: Vec3, radius: f32, head: Vec3, tip: &mut Vec3) -> Option<Vec3> {
    let offset = *tip - center;
    if offset.length_squared() >= radius * radius {
        return None;
    }
    let length = (*tip - head).length();
    let pushed = sphere_circle_point(center, radius, head, length, *tip)
        .unwrap_or_else(|| center + unit_or(offset, head - center) * radius);
    *tip = pushed;
    Some(unit_or(pushed - center, Vec3::Y))
}

/// Closest point to `tip` on the circle where the sphere `(center,
/// radius)` meets the sphere `(head, length)`.
fn sphere_circle_point(
    center: Vec3,
    radius: f32,
    head: Vec3,
    length: f32,
    tip: Vec3,
) -> Option<Vec3> {
    let axis = head - center;
    let distance = axis.length();
    if distance < EPSILON
        || distance > radius + length
        || distance < (radius - length).abs()
    {
        return None;
    }
    let normal = axis / distance;
    let along = (radius * radius - length * length + distance * distance) / (2.0 * distance);
    let circle_radius_sq = radius * radius - along * along;
    if circle_radius_sq < 0.0 {
        return None;
    }
    let circle_center = center + normal * along;
    let toward_tip = tip - circle_center;
    let radial = toward_tip - normal * toward_tip.dot(normal);
    let radial = if radial.length_squared() < EPSILON * EPSILON {
        normal.any_orthonormal_vector()
    } else {
        radial.normalize()
    };
    Some(circle_center + radial * circle_radius_sq.sqrt())
}

fn closest_on_segment(a: Vec3, b: Vec3, point: Vec3) -> Vec3 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq < EPSILON {
        return a;
    }
    let t = ((point - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

fn resolve_panel(
    collider: &ColliderProperties,
    head: Vec3,
    tip: &mut Vec3,
    tip_radius: f32,
) -> Option<Vec3> {
    let half_width = collider.width * 0.5 + tip_radius;
    let half_height = collider.height * 0.5 + tip_radius;
    if head.z < 0.0 || tip.x.abs() > half_width || tip.y.abs() > half_height {
        return None;
    }
    resolve_on_axis(head, tip, tip_radius, Vec3::Z).then_some(Vec3::Z)
}

/// Lift `tip` so its coordinate along the unit `axis` is at least
/// `radius`, keeping its distance from `head`.
fn resolve_on_axis(head: Vec3, tip: &mut Vec3, radius: f32, axis: Vec3) -> bool {
    if tip.dot(axis) >= radius {
        return false;
    }
    let length = (*tip - head).length();
    let rise = radius - head.dot(axis);
    let planar = {
        let d = *tip - head;
        d - axis * d.dot(axis)
    };
    let planar_sq = length * length - rise * rise;
    *tip = if planar_sq <= 0.0 {
        head + axis * length.copysign(rise)
    } else {
        head + unit_or(planar, axis.any_orthonormal_vector()) * planar_sq.sqrt() + axis * rise
    };
    true
}

fn unit_or(v: Vec3, fallback: Vec3) -> Vec3 {
    v.try_normalize()
        .or_else(|| fallback.try_normalize())
        .unwrap_or(Vec3::Y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;
    use jiggle_core::Pose;

    fn at(position: Vec3) -> ColliderState {
        ColliderState::from_pose(Pose::from_position(position))
    }

    #[test]
    fn sphere_push_preserves_bone_length() {
        let head = Vec3::new(0.0, 2.0, 0.0);
        let mut tip = Vec3::new(0.0, 1.0, 0.0);
        let sphere = ColliderProperties::sphere(0.5);
        let normal = resolve_collider(&sphere, &at(Vec3::new(0.2, 1.0, 0.0)), head, &mut tip, 0.0)
            .expect("tip starts inside the sphere");
        assert!(((tip - head).length() - 1.0).abs() < 1e-4);
        let center = Vec3::new(0.2, 1.0, 0.0);
        assert!(((tip - center).length() - 0.5).abs() < 1e-4);
        assert!((normal.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn sphere_miss_leaves_tip() {
        let mut tip = Vec3::new(5.0, 0.0, 0.0);
        let before = tip;
        let hit = resolve_collider(
            &ColliderProperties::sphere(1.0),
            &ColliderState::default(),
            Vec3::new(5.0, 1.0, 0.0),
            &mut tip,
            0.1,
        );
        assert!(hit.is_none());
        assert_eq!(tip, before);
    }

    #[test]
    fn capsule_pushes_from_segment() {
        // Segment along world Y from (0,0,0) to (0,2,0).
        let capsule = ColliderProperties::capsule(0.3, 2.0);
        let head = Vec3::new(1.0, 1.0, 0.0);
        let mut tip = Vec3::new(0.1, 1.0, 0.05);
        resolve_collider(&capsule, &ColliderState::default(), head, &mut tip, 0.0).unwrap();
        let radial = Vec3::new(tip.x, 0.0, tip.z).length();
        assert!(radial >= 0.3 - 1e-4, "tip still inside capsule: {tip}");
    }

    #[test]
    fn rotated_panel_uses_local_normal() {
        // Panel facing world +Y.
        let state = ColliderState::from_pose(Pose::new(
            Vec3::ZERO,
            Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2),
        ));
        let panel = ColliderProperties::panel(4.0, 4.0);
        let head = Vec3::new(0.0, 1.0, 0.0);
        let mut tip = Vec3::new(0.5, -0.5, 0.0);
        let normal = resolve_collider(&panel, &state, head, &mut tip, 0.0).unwrap();
        assert!(normal.abs_diff_eq(Vec3::Y, 1e-4), "normal {normal}");
        assert!(tip.y >= -1e-4);
    }

    #[test]
    fn ground_lifts_tip_to_radius() {
        let head = Vec3::new(0.0, 0.5, 0.0);
        let mut tip = Vec3::new(0.5, -0.3, 0.0);
        assert!(resolve_ground(head, &mut tip, 0.0, 0.1));
        assert!((tip.y - 0.1).abs() < 1e-5);
    }

    #[test]
    fn fix_length_clamps_both_ways() {
        let mut tip = Vec3::new(3.0, 0.0, 0.0);
        fix_length(Vec3::ZERO, &mut tip, 0.5, 1.0);
        assert!((tip.length() - 1.0).abs() < 1e-6);
        let mut tip = Vec3::new(0.1, 0.0, 0.0);
        fix_length(Vec3::ZERO, &mut tip, 0.5, 1.0);
        assert!((tip.length() - 0.5).abs() < 1e-6);
    }
}
