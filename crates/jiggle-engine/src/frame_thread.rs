//! Persistent frame thread for deferred mode.
//!
//! The frame thread owns the [`SimulationState`] while a deferred frame
//! runs: the scheduler moves the boxed state in through a bounded
//! crossbeam channel and gets it back, with the frame's metrics, on a
//! per-frame bounded(1) reply channel. No locks guard the buffers; whoever
//! holds the box owns them.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use jiggle_core::TransformStore;
use rayon::ThreadPool;

use crate::error::SchedulerError;
use crate::metrics::FrameMetrics;
use crate::pipeline::run_frame;
use crate::state::SimulationState;

/// A frame handed to the frame thread.
pub(crate) struct FrameJob {
    pub state: Box<SimulationState>,
    pub frame_dt: f32,
    pub frame: u64,
    pub reply: Sender<FrameDone>,
}

/// The state coming back from a finished frame.
pub(crate) struct FrameDone {
    pub state: Box<SimulationState>,
    pub metrics: FrameMetrics,
}

/// Handle to the running frame thread.
pub(crate) struct FrameThread {
    job_tx: Option<Sender<FrameJob>>,
    handle: Option<JoinHandle<()>>,
}

impl FrameThread {
    /// Spawn the thread. It runs until the handle is dropped, fanning each
    /// frame out over `pool` when there is one.
    pub fn spawn(
        store: Arc<dyn TransformStore>,
        pool: Option<Arc<ThreadPool>>,
    ) -> Result<Self, SchedulerError> {
        let (job_tx, job_rx) = crossbeam_channel::bounded::<FrameJob>(1);
        let handle = thread::Builder::new()
            .name("jiggle-frame".into())
            .spawn(move || frame_loop(job_rx, store, pool))
            .map_err(|e| SchedulerError::ThreadSpawnFailed {
                reason: format!("frame thread: {e}"),
            })?;
        Ok(Self {
            job_tx: Some(job_tx),
            handle: Some(handle),
        })
    }

    /// Start a frame. Returns the receiver its result arrives on.
    ///
    /// If the thread is gone the job (and with it the state) is handed
    /// back as the error value.
    pub fn submit(
        &self,
        state: Box<SimulationState>,
        frame_dt: f32,
        frame: u64,
    ) -> Result<Receiver<FrameDone>, Box<SimulationState>> {
        let (reply, done_rx) = crossbeam_channel::bounded(1);
        let job = FrameJob {
            state,
            frame_dt,
            frame,
            reply,
        };
        match &self.job_tx {
            Some(tx) => match tx.send(job) {
                Ok(()) => Ok(done_rx),
                Err(crossbeam_channel::SendError(job)) => Err(job.state),
            },
            None => Err(job.state),
        }
    }
}

impl Drop for FrameThread {
    fn drop(&mut self) {
        // Closing the job channel ends the loop.
        self.job_tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("jiggle frame thread panicked");
            }
        }
    }
}

fn frame_loop(
    job_rx: Receiver<FrameJob>,
    store: Arc<dyn TransformStore>,
    pool: Option<Arc<ThreadPool>>,
) {
    while let Ok(job) = job_rx.recv() {
        let FrameJob {
            mut state,
            frame_dt,
            frame,
            reply,
        } = job;
        let mut metrics = run_frame(&mut state, store.as_ref(), frame_dt, pool.as_deref(), frame);
        metrics.deferred = true;
        // Best-effort: the scheduler may have been dropped mid-frame.
        let _ = reply.send(FrameDone { state, metrics });
    }
}
