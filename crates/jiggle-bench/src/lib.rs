//! Benchmark profiles for the Jiggle spring-bone engine.
//!
//! Provides pre-built scheduler setups for benchmarks:
//!
//! - [`reference_profile`]: 32 chains of 16 bones, one sphere collider each
//! - [`stress_profile`]: 128 chains of 32 bones with colliders and length limits

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use jiggle_core::{ChainId, Pose, Vec3};
use jiggle_engine::{
    BoneTuning, LengthTarget, RegisterError, SchedulerConfig, SchedulerError, SpringScheduler,
};
use jiggle_spring::ColliderProperties;
use jiggle_test_utils::Rig;

/// A scheduler with registered chains, plus the rig backing it.
pub struct Profile {
    /// Transform table the scheduler reads and writes.
    pub rig: Rig,
    /// The scheduler under test.
    pub scheduler: SpringScheduler,
    /// Registered chains.
    pub chains: Vec<ChainId>,
}

/// Why a profile could not be built.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    /// The scheduler could not be created.
    #[error("profile scheduler: {0}")]
    Scheduler(#[from] SchedulerError),
    /// A chain could not be registered.
    #[error("profile chain: {0}")]
    Register(#[from] RegisterError),
}

/// Build `chains` horizontal chains of `bones` bones, each with one sphere
/// collider below its midpoint. With `length_limits`, every last bone is
/// also tied to an anchor above its root.
pub fn build_profile(
    chains: usize,
    bones: usize,
    length_limits: bool,
    config: SchedulerConfig,
) -> Result<Profile, ProfileError> {
    let rig = Rig::new();
    let config = config.with_capacities(chains, chains * bones, chains, chains, chains.max(1));
    let mut scheduler = rig.scheduler(config)?;
    let mut ids = Vec::with_capacity(chains);
    for c in 0..chains {
        let origin = Vec3::new(0.0, 4.0, c as f32 * 0.5);
        let mut chain = rig.straight_chain(origin, Vec3::X, bones, BoneTuning::default());
        let midpoint = origin + Vec3::new(bones as f32 * 0.25, -1.0, 0.0);
        let sphere = rig.table.insert_root(Pose::from_position(midpoint));
        chain.desc = chain.desc.with_collider(sphere, ColliderProperties::sphere(0.4));
        if length_limits {
            if let Some(last) = chain.desc.bones.last_mut() {
                last.length_targets.push(LengthTarget::Anchor(origin + Vec3::Y));
            }
        }
        ids.push(scheduler.register(chain.desc)?);
    }
    Ok(Profile {
        rig,
        scheduler,
        chains: ids,
    })
}

/// 32 chains × 16 bones (512 bones).
pub fn reference_profile(config: SchedulerConfig) -> Result<Profile, ProfileError> {
    build_profile(32, 16, false, config)
}

/// 128 chains × 32 bones (4096 bones) with length limits.
pub fn stress_profile(config: SchedulerConfig) -> Result<Profile, ProfileError> {
    build_profile(128, 32, true, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_profile_registers_every_chain() {
        let config = SchedulerConfig::default().with_worker_count(1);
        let mut profile = reference_profile(config).unwrap();
        assert_eq!(profile.chains.len(), 32);
        let m = profile.scheduler.tick(1.0 / 60.0).unwrap();
        assert_eq!(m.bones, 32 * 16);
    }

    #[test]
    fn profile_error_names_its_cause() {
        let err = ProfileError::from(RegisterError::ChainLimit { limit: 4 });
        assert_eq!(err.to_string(), "profile chain: chain limit of 4 reached");
        let err = ProfileError::from(SchedulerError::PipelineLost);
        assert_eq!(err.to_string(), "profile scheduler: frame pipeline lost");
    }
}
