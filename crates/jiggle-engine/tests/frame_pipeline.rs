//! Integration tests: whole frames through the scheduler.
//!
//! Chains are built with the `jiggle-test-utils` rig, registered against
//! its transform table and ticked at a fixed 60 Hz.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};

use glam::{Quat, Vec3};
use jiggle_core::{Pose, TransformId, TransformSample, TransformStore, TransformTable};
use jiggle_engine::{
    BoneDesc, BoneParent, BoneTuning, ChainDesc, SchedulerConfig, SpringScheduler, SyncMode,
};
use jiggle_spring::{ChainSettings, ColliderProperties};
use jiggle_test_utils::Rig;

const DT: f32 = 1.0 / 60.0;

fn sync_config() -> SchedulerConfig {
    SchedulerConfig::default().with_worker_count(1)
}

// ── Gravity ──────────────────────────────────────────────────────

#[test]
fn horizontal_chain_droops_under_gravity() {
    let rig = Rig::new();
    let chain = rig.horizontal_chain(3.0, 3);
    let mut s = rig.scheduler(sync_config()).unwrap();
    let id = s.register(chain.desc.clone()).unwrap();

    let mut nan_resets = 0;
    for _ in 0..120 {
        nan_resets += s.tick(DT).unwrap().nan_resets;
    }
    assert_eq!(nan_resets, 0);

    let first = s.bone_state(id, 0).unwrap();
    assert!(first.current_tip.y < 2.9, "tip did not fall: {:?}", first.current_tip);
    // Integration re-projects the tip onto the rest length every step.
    let length = (first.current_tip - first.position).length();
    assert!((length - 0.5).abs() < 1e-3, "length drifted to {length}");

    let written = rig.table.local_rotation(chain.bones[0]).unwrap();
    assert!(written.angle_between(Quat::IDENTITY) > 0.01);
}

#[test]
fn zero_gravity_chain_stays_at_rest() {
    let rig = Rig::new();
    let chain = rig.horizontal_chain(3.0, 2);
    let mut s = rig.scheduler(sync_config()).unwrap();
    let desc = chain
        .desc
        .clone()
        .with_settings(ChainSettings::default().with_gravity(Vec3::ZERO));
    let id = s.register(desc).unwrap();

    for _ in 0..60 {
        s.tick(DT).unwrap();
    }
    let first = s.bone_state(id, 0).unwrap();
    assert!(first.current_tip.abs_diff_eq(Vec3::new(0.5, 3.0, 0.0), 1e-4));
    let written = rig.table.local_rotation(chain.bones[0]).unwrap();
    assert!(written.abs_diff_eq(Quat::IDENTITY, 1e-4));
}

#[test]
fn moving_root_drags_the_chain() {
    let rig = Rig::new();
    let chain = rig.horizontal_chain(3.0, 2);
    let mut s = rig.scheduler(sync_config()).unwrap();
    let desc = chain
        .desc
        .clone()
        .with_settings(ChainSettings::default().with_gravity(Vec3::ZERO));
    let id = s.register(desc).unwrap();

    rig.move_root(chain.root, Vec3::new(0.0, 4.0, 0.0));
    s.tick(DT).unwrap();
    let first = s.bone_state(id, 0).unwrap();
    assert!(first.position.abs_diff_eq(Vec3::new(0.0, 4.0, 0.0), 1e-5));
    let length = (first.current_tip - first.position).length();
    assert!((length - 0.5).abs() < 1e-3);

    // The second bone hangs off the first bone's pose from this same frame.
    let second = s.bone_state(id, 1).unwrap();
    let expected = first.position + first.rotation * Vec3::new(0.5, 0.0, 0.0);
    assert!(second.position.abs_diff_eq(expected, 1e-5), "{:?}", second.position);
    assert!(second.parent_position.abs_diff_eq(first.position, 1e-6));
    assert!(second.position.y > 3.5, "second head left behind: {:?}", second.position);
}

#[test]
fn single_stiff_bone_settles_without_diverging() {
    let rig = Rig::new();
    let root = rig.table.insert_root(Pose::from_position(Vec3::new(0.0, 3.0, 0.0)));
    let bone = rig.table.insert_root(Pose::from_position(Vec3::new(0.0, 3.0, 0.0)));
    let child = rig.table.insert_root(Pose::from_position(Vec3::new(1.0, 3.0, 0.0)));
    let tuning = BoneTuning {
        stiffness: 1.0,
        ..BoneTuning::default()
    };
    let desc = ChainDesc::new()
        .with_bone(
            BoneDesc::new(bone, BoneParent::Transform(root))
                .with_child(child)
                .with_tuning(tuning),
        )
        .with_settings(
            ChainSettings::default()
                .with_dynamic_ratio(1.0)
                .with_ground(false, 0.0),
        );
    let mut s = rig.scheduler(sync_config()).unwrap();
    let id = s.register(desc).unwrap();

    // Largest per-frame tip movement over a window of 60 frames.
    let window = |s: &mut SpringScheduler| {
        let mut largest = 0.0f32;
        let mut last = s.bone_state(id, 0).unwrap().current_tip;
        for _ in 0..60 {
            let m = s.tick(DT).unwrap();
            assert_eq!(m.nan_resets, 0);
            let tip = s.bone_state(id, 0).unwrap().current_tip;
            assert!(tip.is_finite());
            largest = largest.max((tip - last).length());
            last = tip;
        }
        largest
    };

    let early = window(&mut s);
    for _ in 0..2000 {
        s.tick(DT).unwrap();
    }
    let late = window(&mut s);
    assert!(late < early * 0.1, "still oscillating: {late} vs {early}");

    let state = s.bone_state(id, 0).unwrap();
    assert!(state.current_tip.y < 3.0 - 0.1, "no sag: {:?}", state.current_tip);
    assert!(((state.current_tip - state.position).length() - 1.0).abs() < 1e-3);
}

// ── Collision ────────────────────────────────────────────────────

#[test]
fn sphere_collider_holds_the_tip_out() {
    let rig = Rig::new();
    let chain = rig.horizontal_chain(3.0, 2);
    let center = Vec3::new(0.0, 2.4, 0.0);
    let sphere = rig.table.insert_root(Pose::from_position(center));
    let desc = chain
        .desc
        .clone()
        .with_collider(sphere, ColliderProperties::sphere(0.2))
        .with_settings(ChainSettings::default().with_bounce_friction(0.0, 1.0));

    let mut s = rig.scheduler(sync_config()).unwrap();
    let id = s.register(desc).unwrap();

    let mut collisions = 0;
    for _ in 0..240 {
        collisions += s.tick(DT).unwrap().collisions;
    }
    assert!(collisions > 0);

    let first = s.bone_state(id, 0).unwrap();
    let clearance = (first.current_tip - center).length();
    // Collider radius plus the default bone radius.
    assert!(clearance >= 0.25 - 1e-3, "tip inside sphere: {clearance}");
}

#[test]
fn ground_plane_catches_a_low_chain() {
    let rig = Rig::new();
    let chain = rig.horizontal_chain(0.3, 2);
    let mut s = rig.scheduler(sync_config()).unwrap();
    let id = s.register(chain.desc.clone()).unwrap();

    let mut contacts = 0;
    for _ in 0..240 {
        contacts += s.tick(DT).unwrap().ground_contacts;
    }
    assert!(contacts > 0);
    let bone = s.bone_state(id, 0).unwrap();
    assert!(bone.current_tip.y >= -1e-4, "tip below ground: {:?}", bone.current_tip);
}

// ── Pause ────────────────────────────────────────────────────────

#[test]
fn paused_chain_is_frozen_and_resumes() {
    let rig = Rig::new();
    let chain = rig.horizontal_chain(3.0, 2);
    let mut s = rig.scheduler(sync_config()).unwrap();
    let id = s.register(chain.desc.clone()).unwrap();

    for _ in 0..10 {
        s.tick(DT).unwrap();
    }
    s.set_paused(id, true).unwrap();
    let frozen = s.bone_state(id, 0).unwrap();
    let m = s.tick(DT).unwrap();
    assert_eq!(m.chains, 0);
    assert_eq!(m.bones, 0);
    assert_eq!(s.bone_state(id, 0).unwrap(), frozen);

    s.set_paused(id, false).unwrap();
    let m = s.tick(DT).unwrap();
    assert_eq!(m.chains, 1);
    assert_ne!(s.bone_state(id, 0).unwrap().current_tip, frozen.current_tip);
}

// ── Threading ────────────────────────────────────────────────────

#[test]
fn parallel_frame_matches_serial_frame() {
    let serial_rig = Rig::new();
    let parallel_rig = Rig::new();
    let mut serial = serial_rig.scheduler(sync_config()).unwrap();
    let mut parallel = parallel_rig
        .scheduler(SchedulerConfig::default().with_worker_count(4))
        .unwrap();

    let mut serial_ids = Vec::new();
    let mut parallel_ids = Vec::new();
    for (a, b) in serial_rig.fan(6, 4).into_iter().zip(parallel_rig.fan(6, 4)) {
        serial_ids.push(serial.register(a.desc).unwrap());
        parallel_ids.push(parallel.register(b.desc).unwrap());
    }

    for _ in 0..30 {
        let a = serial.tick(DT).unwrap();
        let b = parallel.tick(DT).unwrap();
        assert_eq!(a.bones, b.bones);
    }
    for (a, b) in serial_ids.iter().zip(&parallel_ids) {
        for bone in 0..4 {
            assert_eq!(
                serial.bone_state(*a, bone).unwrap(),
                parallel.bone_state(*b, bone).unwrap()
            );
        }
    }
}

/// Forwards to a table and records every thread that touches it.
struct ThreadTracker {
    table: Arc<TransformTable>,
    seen: Mutex<HashSet<ThreadId>>,
}

impl ThreadTracker {
    fn record(&self) {
        self.seen.lock().unwrap().insert(thread::current().id());
    }

    fn distinct_threads(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

impl TransformStore for ThreadTracker {
    fn sample(&self, id: TransformId) -> Option<TransformSample> {
        self.record();
        self.table.sample(id)
    }

    fn write_local_rotation(&self, id: TransformId, rotation: Quat) {
        self.record();
        self.table.write_local_rotation(id, rotation);
    }
}

#[test]
fn frames_reuse_a_fixed_set_of_worker_threads() {
    let rig = Rig::new();
    let tracker = Arc::new(ThreadTracker {
        table: Arc::clone(&rig.table),
        seen: Mutex::new(HashSet::new()),
    });
    let config = SchedulerConfig::default().with_worker_count(4);
    let mut s = SpringScheduler::new(config, tracker.clone()).unwrap();
    for chain in rig.fan(8, 4) {
        s.register(chain.desc).unwrap();
    }

    for _ in 0..20 {
        s.tick(DT).unwrap();
    }
    // Four pool workers plus the registering thread.
    let threads = tracker.distinct_threads();
    assert!(threads <= 5, "{threads} threads touched the store");
}

#[test]
fn deferred_frames_reuse_a_fixed_set_of_worker_threads() {
    let rig = Rig::new();
    let tracker = Arc::new(ThreadTracker {
        table: Arc::clone(&rig.table),
        seen: Mutex::new(HashSet::new()),
    });
    let config = SchedulerConfig::default()
        .with_worker_count(2)
        .with_sync_mode(SyncMode::Deferred);
    let mut s = SpringScheduler::new(config, tracker.clone()).unwrap();
    for chain in rig.fan(4, 3) {
        s.register(chain.desc).unwrap();
    }

    for _ in 0..20 {
        s.tick(DT).unwrap();
    }
    s.complete().unwrap();
    let threads = tracker.distinct_threads();
    assert!(threads <= 3, "{threads} threads touched the store");
}

#[test]
fn deferred_frames_match_synchronous_frames() {
    let sync_rig = Rig::new();
    let deferred_rig = Rig::new();
    let mut sync = sync_rig.scheduler(sync_config()).unwrap();
    let mut deferred = deferred_rig
        .scheduler(sync_config().with_sync_mode(SyncMode::Deferred))
        .unwrap();

    let a = sync.register(sync_rig.horizontal_chain(3.0, 3).desc).unwrap();
    let b = deferred
        .register(deferred_rig.horizontal_chain(3.0, 3).desc)
        .unwrap();

    for _ in 0..20 {
        sync.tick(DT).unwrap();
        deferred.tick(DT).unwrap();
    }
    let last = deferred.complete().unwrap().unwrap();
    assert_eq!(last.frame, 20);
    assert!(last.deferred);
    for bone in 0..3 {
        assert_eq!(sync.bone_state(a, bone).unwrap(), deferred.bone_state(b, bone).unwrap());
    }
}

#[test]
fn deregister_awaits_in_flight_frame() {
    let rig = Rig::new();
    let mut s = rig
        .scheduler(SchedulerConfig::default().with_sync_mode(SyncMode::Deferred))
        .unwrap();
    let keep = s.register(rig.horizontal_chain(3.0, 2).desc).unwrap();
    let drop_chain = rig.horizontal_chain(5.0, 3);
    let gone = s.register(drop_chain.desc.clone()).unwrap();

    s.tick(DT).unwrap();
    assert!(s.is_frame_in_flight());
    s.deregister(gone).unwrap();
    assert!(!s.is_frame_in_flight());
    assert!(drop_chain.bones.iter().all(|&t| !rig.table.is_simulated(t)));

    s.tick(DT).unwrap();
    let m = s.complete().unwrap().unwrap();
    assert_eq!(m.chains, 1);
    assert_eq!(m.bones, 2);
    assert_eq!(s.chain_ids().unwrap(), vec![keep]);
}

#[test]
fn dropping_deferred_scheduler_completes_pending_frame() {
    let rig = Rig::new();
    let chain = rig.horizontal_chain(3.0, 4);
    let mut s = rig
        .scheduler(SchedulerConfig::default().with_sync_mode(SyncMode::Deferred))
        .unwrap();
    s.register(chain.desc.clone()).unwrap();
    for _ in 0..10 {
        s.tick(DT).unwrap();
    }
    drop(s);
    let written = rig.table.local_rotation(chain.bones[0]).unwrap();
    assert!(!written.abs_diff_eq(Quat::IDENTITY, 1e-4));
}

// ── Live edits ───────────────────────────────────────────────────

#[test]
fn stiff_tuning_resists_gravity() {
    let rig = Rig::new();
    let limp = rig.horizontal_chain(3.0, 1);
    let stiff = rig.straight_chain(
        Vec3::new(0.0, 3.0, 2.0),
        Vec3::X,
        1,
        BoneTuning::default(),
    );
    let mut s = rig.scheduler(sync_config()).unwrap();
    let limp_id = s.register(limp.desc.clone()).unwrap();
    let stiff_id = s.register(stiff.desc.clone()).unwrap();
    s.update_bone_tuning(
        stiff_id,
        0,
        BoneTuning {
            stiffness: 2000.0,
            ..BoneTuning::default()
        },
    )
    .unwrap();

    for _ in 0..120 {
        s.tick(DT).unwrap();
    }
    let limp_drop = 3.0 - s.bone_state(limp_id, 0).unwrap().current_tip.y;
    let stiff_drop = 3.0 - s.bone_state(stiff_id, 0).unwrap().current_tip.y;
    assert!(stiff_drop < limp_drop, "stiff {stiff_drop} vs limp {limp_drop}");
}
