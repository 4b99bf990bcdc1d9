//! Test fixtures for Jiggle development.
//!
//! [`Rig`] wraps a [`TransformTable`] and builds the chain shapes the
//! engine tests and benchmarks keep reaching for: straight chains along
//! an axis, fans of such chains, and a scheduler bound to the rig's table.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::sync::Arc;

use glam::Vec3;
use jiggle_core::{Pose, TransformId, TransformStore, TransformTable};
use jiggle_engine::{
    BoneDesc, BoneParent, BoneTuning, ChainDesc, SchedulerConfig, SchedulerError, SpringScheduler,
};

/// Spacing between consecutive bones of a fixture chain.
pub const BONE_SPACING: f32 = 0.5;

/// A straight chain built by [`Rig::straight_chain`].
#[derive(Clone, Debug)]
pub struct ChainFixture {
    /// External root the first bone hangs from.
    pub root: TransformId,
    /// One transform per bone, root first.
    pub bones: Vec<TransformId>,
    /// Ready-to-register description.
    pub desc: ChainDesc,
}

/// A transform table plus chain builders.
#[derive(Clone, Debug, Default)]
pub struct Rig {
    pub table: Arc<TransformTable>,
}

impl Rig {
    pub fn new() -> Self {
        Self::default()
    }

    /// The table as the engine's store type.
    pub fn store(&self) -> Arc<dyn TransformStore> {
        self.table.clone()
    }

    /// A scheduler reading and writing this rig's table.
    pub fn scheduler(&self, config: SchedulerConfig) -> Result<SpringScheduler, SchedulerError> {
        SpringScheduler::new(config, self.store())
    }

    /// `bones` bones strung from `origin` along `direction`,
    /// [`BONE_SPACING`] apart, all with `tuning`.
    ///
    /// Bone transforms carry identity rotation, so each bone's rest tip is
    /// the next bone's head and the last bone gets the short childless stub.
    pub fn straight_chain(
        &self,
        origin: Vec3,
        direction: Vec3,
        bones: usize,
        tuning: BoneTuning,
    ) -> ChainFixture {
        let step = direction.normalize_or_zero() * BONE_SPACING;
        let root = self.table.insert_root(Pose::from_position(origin));
        let mut ids = Vec::with_capacity(bones);
        let mut desc = ChainDesc::new();
        for i in 0..bones {
            let id = self.table.insert_root(Pose::from_position(origin + step * i as f32));
            let parent = match i {
                0 => BoneParent::Transform(root),
                _ => BoneParent::Bone(i - 1),
            };
            desc = desc.with_bone(BoneDesc::new(id, parent).with_tuning(tuning));
            ids.push(id);
        }
        ChainFixture { root, bones: ids, desc }
    }

    /// A horizontal chain along +X at height `y`, default tuning.
    pub fn horizontal_chain(&self, y: f32, bones: usize) -> ChainFixture {
        self.straight_chain(Vec3::new(0.0, y, 0.0), Vec3::X, bones, BoneTuning::default())
    }

    /// `count` horizontal chains of `bones` bones, spread along Z.
    pub fn fan(&self, count: usize, bones: usize) -> Vec<ChainFixture> {
        (0..count)
            .map(|c| {
                self.straight_chain(
                    Vec3::new(0.0, 2.0, c as f32),
                    Vec3::X,
                    bones,
                    BoneTuning::default(),
                )
            })
            .collect()
    }

    /// Move a root transform.
    pub fn move_root(&self, root: TransformId, position: Vec3) {
        self.table.set_world(root, Pose::from_position(position));
    }
}
