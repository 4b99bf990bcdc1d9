//! User-facing [`SpringScheduler`] and its frame state machine.
//!
//! # Synchronous mode
//!
//! `tick` drives gather, simulate and scatter from the calling thread
//! (fanning each phase out over the worker pool) and returns this frame's
//! metrics.
//!
//! # Deferred mode
//!
//! ```text
//! caller                              frame thread
//!   |                                     |
//!   |--tick(N)--------------------------->|
//!   |  await reply(N-1)                   |
//!   |  job_tx.send(state, dt)  ---------->| run_frame(N)
//!   |  return metrics(N-1)                |   gather / simulate / scatter
//!   |                                     |
//!   |--register / deregister / tick(N+1)  |
//!   |  await reply(N)  <------------------| reply.send(state, metrics)
//! ```
//!
//! The state is boxed and moved across; while a frame is in flight the
//! scheduler holds no state at all, so mutating operations must await the
//! reply first.

use std::sync::Arc;

use crossbeam_channel::Receiver;
use jiggle_core::{ChainId, TransformStore};
use jiggle_spring::BoneState;
use rayon::ThreadPool;

use crate::config::{SchedulerConfig, SyncMode};
use crate::error::SchedulerError;
use crate::frame_thread::{FrameDone, FrameThread};
use crate::metrics::{FrameMetrics, PoolUsage};
use crate::pipeline::{build_worker_pool, run_frame};
use crate::state::SimulationState;

/// Owns every shared simulation buffer and drives registered chains once
/// per frame.
pub struct SpringScheduler {
    pub(crate) config: SchedulerConfig,
    workers: usize,
    /// Persistent worker threads, shared with the frame thread. `None`
    /// when the ceiling is one.
    pool: Option<Arc<ThreadPool>>,
    pub(crate) store: Arc<dyn TransformStore>,
    /// `None` while a deferred frame owns it, or after the frame thread
    /// died mid-frame.
    state: Option<Box<SimulationState>>,
    frame_thread: Option<FrameThread>,
    in_flight: Option<Receiver<FrameDone>>,
    frames: u64,
}

impl SpringScheduler {
    /// Build a scheduler over `store`.
    ///
    /// Capacities in `config` are clamped to at least 1. In deferred mode
    /// this spawns the frame thread.
    pub fn new(
        config: SchedulerConfig,
        store: Arc<dyn TransformStore>,
    ) -> Result<Self, SchedulerError> {
        let config = config.sanitized();
        let workers = config.resolved_worker_count();
        let pool = build_worker_pool(workers)?;
        let frame_thread = match config.sync_mode {
            SyncMode::Synchronous => None,
            SyncMode::Deferred => Some(FrameThread::spawn(Arc::clone(&store), pool.clone())?),
        };
        log::debug!(
            "spring scheduler: {:?}, {} workers, {} chains / {} bones",
            config.sync_mode,
            workers,
            config.max_chains,
            config.max_bones,
        );
        Ok(Self {
            state: Some(Box::new(SimulationState::new(&config))),
            config,
            workers,
            pool,
            store,
            frame_thread,
            in_flight: None,
            frames: 0,
        })
    }

    /// The sanitized configuration.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Resolved worker ceiling.
    pub fn worker_count(&self) -> usize {
        self.workers
    }

    /// Whether a deferred frame is running.
    pub fn is_frame_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Advance every registered chain by one frame of `frame_dt` seconds.
    ///
    /// Synchronous mode returns this frame's metrics. Deferred mode first
    /// awaits the previous frame, starts this one on the frame thread and
    /// returns the previous frame's metrics (all zero on the first tick).
    pub fn tick(&mut self, frame_dt: f32) -> Result<FrameMetrics, SchedulerError> {
        let previous = self.complete()?;
        self.frames += 1;
        let frame = self.frames;

        let Some(frame_thread) = &self.frame_thread else {
            return self.run_inline(frame_dt, frame);
        };

        let state = self.state.take().ok_or(SchedulerError::PipelineLost)?;
        if state.registry.is_empty() {
            // Nothing to simulate: stay idle instead of waking the frame
            // thread.
            self.state = Some(state);
            let metrics = FrameMetrics {
                frame,
                deferred: true,
                ..FrameMetrics::default()
            };
            return Ok(previous.unwrap_or(metrics));
        }
        match frame_thread.submit(state, frame_dt, frame) {
            Ok(rx) => self.in_flight = Some(rx),
            Err(state) => {
                self.state = Some(state);
                log::warn!("jiggle frame thread is gone; running frame {frame} inline");
                return self.run_inline(frame_dt, frame);
            }
        }

        Ok(previous.unwrap_or(FrameMetrics {
            deferred: true,
            ..FrameMetrics::default()
        }))
    }

    fn run_inline(&mut self, frame_dt: f32, frame: u64) -> Result<FrameMetrics, SchedulerError> {
        let state = self.state.as_deref_mut().ok_or(SchedulerError::PipelineLost)?;
        Ok(run_frame(state, self.store.as_ref(), frame_dt, self.pool.as_deref(), frame))
    }

    /// Wait for the in-flight deferred frame, if any, and return its
    /// metrics.
    pub fn complete(&mut self) -> Result<Option<FrameMetrics>, SchedulerError> {
        let Some(rx) = self.in_flight.take() else {
            return Ok(None);
        };
        match rx.recv() {
            Ok(done) => {
                self.state = Some(done.state);
                Ok(Some(done.metrics))
            }
            Err(_) => {
                log::warn!("jiggle frame thread dropped the simulation state");
                Err(SchedulerError::PipelineLost)
            }
        }
    }

    /// Await any in-flight frame and borrow the state.
    pub(crate) fn state_mut(&mut self) -> Result<&mut SimulationState, SchedulerError> {
        self.complete()?;
        self.state.as_deref_mut().ok_or(SchedulerError::PipelineLost)
    }

    /// Occupancy of every slab pool. Awaits any in-flight frame.
    pub fn pool_usage(&mut self) -> Result<PoolUsage, SchedulerError> {
        Ok(self.state_mut()?.usage())
    }

    /// Number of registered chains. Awaits any in-flight frame.
    pub fn chain_count(&mut self) -> Result<usize, SchedulerError> {
        Ok(self.state_mut()?.registry.len())
    }

    /// Ids of every registered chain, in registration order.
    pub fn chain_ids(&mut self) -> Result<Vec<ChainId>, SchedulerError> {
        Ok(self.state_mut()?.registry.ids().collect())
    }

    /// Whether `id` is registered.
    pub fn contains(&mut self, id: ChainId) -> Result<bool, SchedulerError> {
        Ok(self.state_mut()?.registry.contains(id))
    }

    /// Current simulation state of one bone.
    pub fn bone_state(&mut self, id: ChainId, bone: usize) -> Result<BoneState, SchedulerError> {
        let state = self.state_mut()?;
        let entry = state.registry.get(id).ok_or(SchedulerError::UnknownChain(id))?;
        let range = entry.blocks.bones.range();
        if bone >= range.len() {
            return Err(SchedulerError::InvalidBone { chain: id, bone });
        }
        Ok(state.bone_states[range.start + bone])
    }
}

impl Drop for SpringScheduler {
    fn drop(&mut self) {
        if let Err(e) = self.complete() {
            log::warn!("in-flight frame lost during shutdown: {e}");
        }
        // Dropping the handle closes the job channel and joins the thread.
        self.frame_thread.take();
    }
}

impl std::fmt::Debug for SpringScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpringScheduler")
            .field("config", &self.config)
            .field("workers", &self.workers)
            .field("in_flight", &self.in_flight.is_some())
            .field("frames", &self.frames)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{BoneDesc, BoneParent, ChainDesc};
    use jiggle_core::{Pose, TransformTable};

    fn store() -> Arc<dyn TransformStore> {
        Arc::new(TransformTable::new())
    }

    #[test]
    fn empty_scheduler_ticks_idle() {
        let mut s = SpringScheduler::new(SchedulerConfig::default(), store()).unwrap();
        let m = s.tick(1.0 / 60.0).unwrap();
        assert_eq!(m.frame, 1);
        assert_eq!(m.chains, 0);
        assert_eq!(m.bones, 0);
        assert!(!m.deferred);
    }

    #[test]
    fn deferred_first_tick_reports_nothing() {
        let config = SchedulerConfig::default().with_sync_mode(SyncMode::Deferred);
        let table = Arc::new(TransformTable::new());
        let root = table.insert_root(Pose::IDENTITY);
        let bone = table.insert_root(Pose::IDENTITY);
        let mut s = SpringScheduler::new(config, table.clone()).unwrap();
        s.register(ChainDesc::new().with_bone(BoneDesc::new(bone, BoneParent::Transform(root))))
            .unwrap();

        let first = s.tick(1.0 / 60.0).unwrap();
        assert_eq!(first.frame, 0);
        assert!(first.deferred);
        assert!(s.is_frame_in_flight());

        let second = s.tick(1.0 / 60.0).unwrap();
        assert_eq!(second.frame, 1);

        let last = s.complete().unwrap().unwrap();
        assert_eq!(last.frame, 2);
        assert!(!s.is_frame_in_flight());
        assert_eq!(s.complete().unwrap(), None);
    }

    #[test]
    fn deferred_empty_scheduler_stays_idle() {
        let config = SchedulerConfig::default().with_sync_mode(SyncMode::Deferred);
        let mut s = SpringScheduler::new(config, store()).unwrap();
        for frame in 1..=3 {
            let m = s.tick(1.0 / 60.0).unwrap();
            assert_eq!(m.frame, frame);
            assert!(m.deferred);
            assert!(!s.is_frame_in_flight());
        }
    }

    #[test]
    fn zero_capacities_are_clamped() {
        let config = SchedulerConfig::default().with_capacities(0, 0, 0, 0, 0);
        let mut s = SpringScheduler::new(config, store()).unwrap();
        let usage = s.pool_usage().unwrap();
        assert_eq!(usage.bones.capacity, 1);
        assert_eq!(usage.length_limits.capacity, 1);
        assert_eq!(s.config().max_chains, 1);
    }

    #[test]
    fn unknown_chain_is_reported() {
        let mut s = SpringScheduler::new(SchedulerConfig::default(), store()).unwrap();
        assert_eq!(
            s.bone_state(ChainId(3), 0),
            Err(SchedulerError::UnknownChain(ChainId(3)))
        );
    }
}
