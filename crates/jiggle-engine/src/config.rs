//! Scheduler capacity configuration and per-chain timestep.
//!
//! [`SchedulerConfig`] is set once when the scheduler is built. Unlike the
//! per-chain [`ChainSettings`](jiggle_spring::ChainSettings) it cannot be
//! changed afterwards: every shared buffer is sized from it.

/// Largest explicit worker ceiling accepted.
pub const MAX_WORKERS: usize = 64;

/// Largest auto-detected worker ceiling.
pub const MAX_AUTO_WORKERS: usize = 8;

/// Step length used when a fixed timestep has a non-positive rate.
pub const DEFAULT_DT: f32 = 1.0 / 60.0;

// ── SyncMode ──────────────────────────────────────────────────────

/// When a frame's pipeline is awaited.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SyncMode {
    /// Gather, simulate and scatter complete before `tick` returns.
    #[default]
    Synchronous,
    /// Frame N runs on the frame thread and is awaited at the start of
    /// frame N+1 (or at the next register/deregister).
    Deferred,
}

// ── Timestep ──────────────────────────────────────────────────────

/// How a chain derives its step length from the frame delta.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Timestep {
    /// Constant step of `1 / rate_hz` seconds regardless of frame delta.
    Fixed {
        /// Steps per second.
        rate_hz: f32,
    },
    /// Step by the frame delta passed to `tick`.
    Variable,
}

impl Timestep {
    /// Step length for a frame of `frame_dt` seconds.
    pub fn step_dt(&self, frame_dt: f32) -> f32 {
        match *self {
            Timestep::Fixed { rate_hz } if rate_hz.is_finite() && rate_hz > 0.0 => 1.0 / rate_hz,
            Timestep::Fixed { .. } => DEFAULT_DT,
            Timestep::Variable if frame_dt.is_finite() => frame_dt.max(0.0),
            Timestep::Variable => 0.0,
        }
    }
}

impl Default for Timestep {
    fn default() -> Self {
        Timestep::Fixed { rate_hz: 60.0 }
    }
}

// ── SchedulerConfig ───────────────────────────────────────────────

/// Capacities and threading for a [`SpringScheduler`](crate::SpringScheduler).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Maximum registered chains. Default: 32.
    pub max_chains: usize,
    /// Bone slots shared by every chain. Default: 512.
    pub max_bones: usize,
    /// Collider slots shared by every chain. Default: 512.
    pub max_colliders: usize,
    /// Explicit collider-list entries shared by every chain. Default: 512.
    pub max_collision_indices: usize,
    /// Length-limit slots shared by every chain. Default: 256.
    pub max_length_limits: usize,
    /// Synchronous or deferred completion. Default: synchronous.
    pub sync_mode: SyncMode,
    /// Worker-thread ceiling for the parallel phases. `None` = auto-detect
    /// (`available_parallelism - 1`, clamped to `[1, 8]`).
    pub worker_count: Option<usize>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_chains: 32,
            max_bones: 512,
            max_colliders: 512,
            max_collision_indices: 512,
            max_length_limits: 256,
            sync_mode: SyncMode::Synchronous,
            worker_count: None,
        }
    }
}

impl SchedulerConfig {
    /// Set [`sync_mode`](Self::sync_mode).
    pub fn with_sync_mode(mut self, mode: SyncMode) -> Self {
        self.sync_mode = mode;
        self
    }

    /// Set [`worker_count`](Self::worker_count).
    pub fn with_worker_count(mut self, workers: usize) -> Self {
        self.worker_count = Some(workers);
        self
    }

    /// Set every pool capacity at once.
    pub fn with_capacities(
        mut self,
        chains: usize,
        bones: usize,
        colliders: usize,
        collision_indices: usize,
        length_limits: usize,
    ) -> Self {
        self.max_chains = chains;
        self.max_bones = bones;
        self.max_colliders = colliders;
        self.max_collision_indices = collision_indices;
        self.max_length_limits = length_limits;
        self
    }

    /// Copy of `self` with every capacity raised to at least 1.
    ///
    /// A zero capacity would make the corresponding pool unusable; it is
    /// clamped with a warning rather than rejected.
    pub fn sanitized(&self) -> Self {
        let mut out = self.clone();
        for (name, value) in [
            ("max_chains", &mut out.max_chains),
            ("max_bones", &mut out.max_bones),
            ("max_colliders", &mut out.max_colliders),
            ("max_collision_indices", &mut out.max_collision_indices),
            ("max_length_limits", &mut out.max_length_limits),
        ] {
            if *value == 0 {
                log::warn!("{name} is 0; clamping to 1");
                *value = 1;
            }
        }
        out
    }

    /// Resolve the worker ceiling, applying auto-detection if `None`.
    ///
    /// Explicit values are clamped to `[1, 64]`. Auto-detection leaves one
    /// CPU for the caller and falls back to a single worker below three
    /// CPUs, where fan-out costs more than it saves.
    pub fn resolved_worker_count(&self) -> usize {
        match self.worker_count {
            Some(n) => n.clamp(1, MAX_WORKERS),
            None => {
                let cpus = std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1);
                if cpus < 3 {
                    1
                } else {
                    (cpus - 1).clamp(1, MAX_AUTO_WORKERS)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_capacities() {
        let c = SchedulerConfig::default();
        assert_eq!(c.max_chains, 32);
        assert_eq!(c.max_bones, 512);
        assert_eq!(c.max_colliders, 512);
        assert_eq!(c.max_collision_indices, 512);
        assert_eq!(c.max_length_limits, 256);
        assert_eq!(c.sync_mode, SyncMode::Synchronous);
    }

    #[test]
    fn sanitized_clamps_zero_capacities() {
        let c = SchedulerConfig::default()
            .with_capacities(0, 0, 5, 0, 0)
            .sanitized();
        assert_eq!(c.max_chains, 1);
        assert_eq!(c.max_bones, 1);
        assert_eq!(c.max_colliders, 5);
        assert_eq!(c.max_collision_indices, 1);
        assert_eq!(c.max_length_limits, 1);
    }

    #[test]
    fn explicit_worker_count_is_clamped() {
        assert_eq!(SchedulerConfig::default().with_worker_count(0).resolved_worker_count(), 1);
        assert_eq!(SchedulerConfig::default().with_worker_count(4).resolved_worker_count(), 4);
        assert_eq!(
            SchedulerConfig::default().with_worker_count(1000).resolved_worker_count(),
            MAX_WORKERS
        );
    }

    #[test]
    fn auto_worker_count_is_bounded() {
        let n = SchedulerConfig::default().resolved_worker_count();
        assert!((1..=MAX_AUTO_WORKERS).contains(&n));
    }

    #[test]
    fn fixed_timestep_ignores_frame_delta() {
        let t = Timestep::Fixed { rate_hz: 30.0 };
        assert!((t.step_dt(0.5) - 1.0 / 30.0).abs() < 1e-7);
    }

    #[test]
    fn non_positive_rate_falls_back() {
        assert_eq!(Timestep::Fixed { rate_hz: 0.0 }.step_dt(0.1), DEFAULT_DT);
        assert_eq!(Timestep::Fixed { rate_hz: -5.0 }.step_dt(0.1), DEFAULT_DT);
        assert_eq!(Timestep::Fixed { rate_hz: f32::NAN }.step_dt(0.1), DEFAULT_DT);
    }

    #[test]
    fn variable_timestep_uses_frame_delta() {
        assert_eq!(Timestep::Variable.step_dt(0.02), 0.02);
        assert_eq!(Timestep::Variable.step_dt(-1.0), 0.0);
        assert_eq!(Timestep::Variable.step_dt(f32::INFINITY), 0.0);
    }
}
