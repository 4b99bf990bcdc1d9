//! Integration test: pool accounting under register/deregister churn.
//!
//! Chains of varying sizes are registered and deregistered in mixed order
//! while frames keep running. After every operation the pools must still
//! tile their capacity, and once everything is deregistered each pool must
//! have coalesced back into a single free block.

use glam::Vec3;
use jiggle_core::{ChainId, Pose};
use jiggle_engine::{
    BoneTuning, CollisionFilter, LengthTarget, PoolUsage, RegisterError, SchedulerConfig,
    SpringScheduler, SyncMode,
};
use jiggle_spring::ColliderProperties;
use jiggle_test_utils::{ChainFixture, Rig};
use smallvec::smallvec;

const DT: f32 = 1.0 / 60.0;

/// A chain of `bones` bones with one sphere collider, an explicit collider
/// list on the first bone and an anchor length limit on the last.
fn rich_chain(rig: &Rig, bones: usize) -> ChainFixture {
    let origin = Vec3::new(0.0, 3.0, 0.0);
    let mut chain = rig.straight_chain(origin, Vec3::X, bones, BoneTuning::default());
    let sphere = rig.table.insert_root(Pose::from_position(Vec3::new(0.5, 1.0, 0.0)));
    chain.desc = chain.desc.with_collider(sphere, ColliderProperties::sphere(0.3));
    chain.desc.bones[0].collision = CollisionFilter::Colliders(smallvec![0]);
    if let Some(last) = chain.desc.bones.last_mut() {
        last.length_targets.push(LengthTarget::Anchor(Vec3::new(0.0, 5.0, 0.0)));
    }
    chain
}

fn assert_consistent(usage: &PoolUsage) {
    for pool in [
        usage.bones,
        usage.colliders,
        usage.collision_indices,
        usage.length_limits,
    ] {
        assert!(pool.used <= pool.capacity);
        assert!(pool.largest_free <= pool.capacity - pool.used);
        assert!(pool.used_blocks <= usage.chains);
    }
}

fn assert_drained(usage: &PoolUsage) {
    assert_eq!(usage.chains, 0);
    for pool in [
        usage.bones,
        usage.colliders,
        usage.collision_indices,
        usage.length_limits,
    ] {
        assert_eq!(pool.used, 0);
        assert_eq!(pool.free_blocks, 1);
        assert_eq!(pool.largest_free, pool.capacity);
    }
}

fn churn(mode: SyncMode) {
    let rig = Rig::new();
    let config = SchedulerConfig::default()
        .with_capacities(8, 64, 8, 8, 8)
        .with_sync_mode(mode)
        .with_worker_count(2);
    let mut s: SpringScheduler = rig.scheduler(config).unwrap();
    let mut live: Vec<ChainId> = Vec::new();

    for round in 0..40usize {
        let bones = 1 + round % 5;
        match s.register(rich_chain(&rig, bones).desc) {
            Ok(id) => live.push(id),
            Err(RegisterError::ChainLimit { .. }) | Err(RegisterError::Capacity { .. }) => {}
            Err(e) => panic!("unexpected registration error: {e}"),
        }
        s.tick(DT).unwrap();

        // Drop every third chain from the middle to fragment the pools.
        if round % 3 == 2 && !live.is_empty() {
            let victim = live.remove(live.len() / 2);
            s.deregister(victim).unwrap();
        }
        let usage = s.pool_usage().unwrap();
        assert_eq!(usage.chains, live.len());
        assert_consistent(&usage);
    }

    for id in live.drain(..) {
        s.deregister(id).unwrap();
        s.tick(DT).unwrap();
    }
    assert_drained(&s.pool_usage().unwrap());
}

#[test]
fn synchronous_churn_returns_pools_to_empty() {
    churn(SyncMode::Synchronous);
}

#[test]
fn deferred_churn_returns_pools_to_empty() {
    churn(SyncMode::Deferred);
}

#[test]
fn rejected_registration_leaves_no_trace() {
    let rig = Rig::new();
    let config = SchedulerConfig::default().with_capacities(4, 16, 4, 4, 1);
    let mut s = rig.scheduler(config).unwrap();
    s.register(rich_chain(&rig, 3).desc).unwrap();
    let before = s.pool_usage().unwrap();

    // Needs a second length limit, but the only slot is taken.
    let err = s.register(rich_chain(&rig, 2).desc).unwrap_err();
    assert!(matches!(err, RegisterError::Capacity { .. }));
    assert_eq!(s.pool_usage().unwrap(), before);
    assert_eq!(s.chain_count().unwrap(), 1);
}

#[cfg(not(miri))]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Clone, Debug)]
    enum Op {
        Register(usize),
        Deregister(usize),
        Tick,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1usize..6).prop_map(Op::Register),
            (0usize..8).prop_map(Op::Deregister),
            Just(Op::Tick),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn any_op_sequence_drains_cleanly(ops in prop::collection::vec(op(), 1..40)) {
            let rig = Rig::new();
            let config = SchedulerConfig::default()
                .with_capacities(6, 24, 6, 6, 6)
                .with_worker_count(1);
            let mut s = rig.scheduler(config).unwrap();
            let mut live: Vec<ChainId> = Vec::new();

            for op in ops {
                match op {
                    Op::Register(bones) => {
                        if let Ok(id) = s.register(rich_chain(&rig, bones).desc) {
                            live.push(id);
                        }
                    }
                    Op::Deregister(i) if !live.is_empty() => {
                        let id = live.remove(i % live.len());
                        prop_assert!(s.deregister(id).is_ok());
                    }
                    Op::Deregister(_) => {}
                    Op::Tick => {
                        let m = s.tick(DT).unwrap();
                        prop_assert_eq!(m.nan_resets, 0);
                    }
                }
                let usage = s.pool_usage().unwrap();
                prop_assert_eq!(usage.chains, live.len());
                assert_consistent(&usage);
            }

            for id in live.drain(..) {
                prop_assert!(s.deregister(id).is_ok());
            }
            assert_drained(&s.pool_usage().unwrap());
        }
    }
}
