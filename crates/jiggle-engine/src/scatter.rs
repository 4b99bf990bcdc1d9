//! Scatter phase: write simulated local rotations back to the host.

use jiggle_core::{TransformId, TransformStore};
use jiggle_spring::BoneState;
use rayon::prelude::*;
use rayon::ThreadPool;

/// Write the local rotation of every bound bone, split into one contiguous
/// batch per pool thread.
pub(crate) fn scatter(
    store: &dyn TransformStore,
    bindings: &[Option<TransformId>],
    states: &[BoneState],
    pool: Option<&ThreadPool>,
) {
    let len = bindings.len().min(states.len());
    let (bindings, states) = (&bindings[..len], &states[..len]);
    let Some(pool) = pool.filter(|_| len > 0) else {
        write_batch(store, bindings, states);
        return;
    };

    let chunk = len.div_ceil(pool.current_num_threads());
    pool.install(|| {
        bindings
            .par_chunks(chunk)
            .zip(states.par_chunks(chunk))
            .for_each(|(b, st)| write_batch(store, b, st));
    });
}

fn write_batch(
    store: &dyn TransformStore,
    bindings: &[Option<TransformId>],
    states: &[BoneState],
) {
    for (binding, state) in bindings.iter().zip(states) {
        if let Some(id) = binding {
            store.write_local_rotation(*id, state.local_rotation);
        }
    }
}
