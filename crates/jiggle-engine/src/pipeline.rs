//! One frame of the gather → simulate → scatter pipeline.
//!
//! ```text
//!  gather ──┬── parent poses ──┐
//!           ├── pivot poses ───┤
//!           ├── colliders ─────┼── barrier ── simulate (per chain) ── scatter
//!           └── length targets ┘
//! ```
//!
//! Each phase fans out over the scheduler's persistent worker pool and
//! joins before the next phase starts. With a ceiling of one there is no
//! pool and everything runs inline on the calling thread.

use std::ops::Range;
use std::sync::Arc;
use std::time::Instant;

use jiggle_core::TransformStore;
use jiggle_spring::{simulate_chain, BoneState, ChainInputs, StepStats};
use rayon::prelude::*;
use rayon::ThreadPool;
use smallvec::SmallVec;

use crate::error::SchedulerError;
use crate::gather::gather;
use crate::metrics::FrameMetrics;
use crate::scatter::scatter;
use crate::state::SimulationState;

/// One chain's kernel inputs and its disjoint slice of bone state.
struct ChainJob<'a> {
    inputs: ChainInputs<'a>,
    bones: &'a mut [BoneState],
}

/// Build the worker pool for a ceiling of `workers` threads.
///
/// A ceiling of one needs no pool: every phase then runs on the thread
/// that drives the frame.
pub(crate) fn build_worker_pool(
    workers: usize,
) -> Result<Option<Arc<ThreadPool>>, SchedulerError> {
    if workers <= 1 {
        return Ok(None);
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("jiggle-worker-{i}"))
        .build()
        .map_err(|e| SchedulerError::ThreadSpawnFailed {
            reason: format!("worker pool: {e}"),
        })?;
    Ok(Some(Arc::new(pool)))
}

/// Run one full frame against `state`.
///
/// With no registered chains no phase runs and the returned metrics only
/// carry the frame number.
pub(crate) fn run_frame(
    state: &mut SimulationState,
    store: &dyn TransformStore,
    frame_dt: f32,
    pool: Option<&ThreadPool>,
    frame: u64,
) -> FrameMetrics {
    let mut metrics = FrameMetrics {
        frame,
        ..FrameMetrics::default()
    };
    if state.registry.is_empty() {
        return metrics;
    }
    let start = Instant::now();

    gather(state, store, pool);
    let gathered = Instant::now();
    metrics.gather_us = (gathered - start).as_micros() as u64;

    let (chains, stats) = simulate(state, frame_dt, pool);
    metrics.chains = chains;
    metrics.record_step(stats);
    let simulated = Instant::now();
    metrics.simulate_us = (simulated - gathered).as_micros() as u64;

    scatter(store, &state.bone_transforms, &state.bone_states, pool);
    let scattered = Instant::now();
    metrics.scatter_us = (scattered - simulated).as_micros() as u64;
    metrics.total_us = (scattered - start).as_micros() as u64;

    log::trace!(
        "frame {frame}: gather {}us, simulate {}us, scatter {}us, {} bones",
        metrics.gather_us,
        metrics.simulate_us,
        metrics.scatter_us,
        metrics.bones,
    );
    metrics
}

/// Step every active chain. Returns the number of chains stepped and the
/// merged kernel counters.
fn simulate(
    state: &mut SimulationState,
    frame_dt: f32,
    pool: Option<&ThreadPool>,
) -> (usize, StepStats) {
    let SimulationState {
        registry,
        bone_pool,
        bone_states,
        parent_poses,
        pivot_poses,
        collider_pool,
        collider_states,
        collision_index_pool,
        length_limit_pool,
        length_targets,
        ..
    } = state;

    let mut active: SmallVec<[_; 32]> = registry
        .iter()
        .filter(|(_, entry)| entry.is_active())
        .map(|(_, entry)| entry)
        .collect();
    active.sort_by_key(|entry| entry.blocks.bones.start());

    // Carve the bone-state buffer into one disjoint slice per chain, in
    // ascending block order.
    let mut jobs: SmallVec<[ChainJob<'_>; 32]> = SmallVec::with_capacity(active.len());
    let mut rest: &mut [BoneState] = bone_states.as_mut_slice();
    let mut offset = 0;
    for entry in active {
        let bones = entry.blocks.bones.range();
        let colliders = entry.blocks.colliders.range();
        let limits = entry.blocks.length_limits.range();

        let tail = std::mem::take(&mut rest);
        let (_, tail) = tail.split_at_mut(bones.start - offset);
        let (chain_bones, tail) = tail.split_at_mut(bones.len());
        rest = tail;
        offset = bones.end;

        jobs.push(ChainJob {
            inputs: ChainInputs {
                dt: entry.timestep.step_dt(frame_dt),
                settings: &entry.settings,
                properties: &bone_pool.as_slice()[bones.clone()],
                parent_poses: &parent_poses[bones.clone()],
                pivot_poses: &pivot_poses[bones],
                colliders: &collider_pool.as_slice()[colliders.clone()],
                collider_states: &collider_states[colliders],
                collision_indices: collision_index_pool.get(&entry.blocks.collision_indices),
                length_limits: &length_limit_pool.as_slice()[limits.clone()],
                length_targets: &length_targets[limits],
            },
            bones: chain_bones,
        });
    }

    let chains = jobs.len();
    let Some(pool) = pool else {
        return (chains, run_batch(&mut jobs));
    };

    let weights: SmallVec<[usize; 32]> = jobs.iter().map(|j| j.bones.len()).collect();
    let batches = partition_by_weight(&weights, pool.current_num_threads());
    if batches.len() <= 1 {
        return (chains, run_batch(&mut jobs));
    }

    let mut slices: SmallVec<[&mut [ChainJob<'_>]; 8]> = SmallVec::with_capacity(batches.len());
    let mut remaining: &mut [ChainJob<'_>] = &mut jobs;
    let mut consumed = 0;
    for batch in &batches {
        let (head, tail) = std::mem::take(&mut remaining).split_at_mut(batch.end - consumed);
        remaining = tail;
        consumed = batch.end;
        slices.push(head);
    }

    let total = pool.install(|| {
        slices
            .as_mut_slice()
            .par_iter_mut()
            .map(|batch| run_batch(batch))
            .reduce(StepStats::default, |mut a, b| {
                a.merge(b);
                a
            })
    });
    (chains, total)
}

fn run_batch(jobs: &mut [ChainJob<'_>]) -> StepStats {
    let mut stats = StepStats::default();
    for job in jobs {
        stats.merge(simulate_chain(&job.inputs, job.bones));
    }
    stats
}

/// Split `weights` into at most `parts` contiguous, non-empty ranges of
/// roughly equal total weight.
pub(crate) fn partition_by_weight(
    weights: &[usize],
    parts: usize,
) -> SmallVec<[Range<usize>; 8]> {
    let mut out = SmallVec::new();
    if weights.is_empty() {
        return out;
    }
    let parts = parts.clamp(1, weights.len());
    let total: usize = weights.iter().sum();
    let target = total.div_ceil(parts).max(1);

    let mut start = 0;
    let mut acc = 0;
    for (i, w) in weights.iter().enumerate() {
        acc += w;
        let remaining_items = weights.len() - (i + 1);
        let remaining_parts = parts - out.len() - 1;
        if remaining_parts > 0 && (acc >= target || remaining_items == remaining_parts) {
            out.push(start..i + 1);
            start = i + 1;
            acc = 0;
        }
    }
    out.push(start..weights.len());
    out
}


#[cfg(not(miri))]
#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn partition_covers_all_items(
            weights in prop::collection::vec(0usize..64, 0..40),
            parts in 1usize..10,
        ) {
            let p = partition_by_weight(&weights, parts);
            if weights.is_empty() {
                prop_assert!(p.is_empty());
            } else {
                prop_assert!(p.len() <= parts);
                let mut next = 0;
                for r in &p {
                    prop_assert_eq!(r.start, next);
                    prop_assert!(!r.is_empty());
                    next = r.end;
                }
                prop_assert_eq!(next, weights.len());
            }
        }
    }
}
