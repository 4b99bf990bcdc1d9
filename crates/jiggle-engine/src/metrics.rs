//! Per-frame performance and event metrics.
//!
//! [`FrameMetrics`] is returned by every
//! [`tick`](crate::SpringScheduler::tick). In deferred mode it describes
//! the previous frame, the one whose completion `tick` just awaited.

use jiggle_arena::SlabUsage;
use jiggle_spring::StepStats;

/// Timing and event counts for one frame.
///
/// All durations are in microseconds.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameMetrics {
    /// Sequence number of the frame described, starting at 1. Zero means
    /// no frame has completed yet.
    pub frame: u64,
    /// Wall-clock time for the whole pipeline.
    pub total_us: u64,
    /// Time spent sampling external transforms.
    pub gather_us: u64,
    /// Time spent in the simulation kernel.
    pub simulate_us: u64,
    /// Time spent writing local rotations back.
    pub scatter_us: u64,
    /// Chains stepped (paused and empty chains excluded).
    pub chains: usize,
    /// Bones stepped.
    pub bones: usize,
    /// Bones that hit a collider.
    pub collisions: usize,
    /// Bones that hit the ground plane.
    pub ground_contacts: usize,
    /// Bones reset after going non-finite.
    pub nan_resets: usize,
    /// Whether the frame ran on the deferred frame thread.
    pub deferred: bool,
}

impl FrameMetrics {
    pub(crate) fn record_step(&mut self, stats: StepStats) {
        self.bones += stats.bones;
        self.collisions += stats.collisions;
        self.ground_contacts += stats.ground_contacts;
        self.nan_resets += stats.nan_resets;
    }
}

/// Occupancy of every shared slab pool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolUsage {
    /// Registered chains.
    pub chains: usize,
    /// Bone pool.
    pub bones: SlabUsage,
    /// Collider pool.
    pub colliders: SlabUsage,
    /// Explicit collider-list pool.
    pub collision_indices: SlabUsage,
    /// Length-limit pool.
    pub length_limits: SlabUsage,
}
