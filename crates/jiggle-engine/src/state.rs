//! Shared simulation buffers.
//!
//! ```text
//! SimulationState
//! ├── registry                      ChainId -> ChainEntry (blocks, settings)
//! ├── bone_pool: SlabPool<BoneProperties>
//! │     bone_states / parent_poses / pivot_poses          (same indices)
//! │     bone_transforms / parent_transforms / pivot_transforms
//! ├── collider_pool: SlabPool<ColliderProperties>
//! │     collider_states / collider_transforms             (same indices)
//! ├── collision_index_pool: SlabPool<u32>
//! └── length_limit_pool: SlabPool<LengthLimitProperties>
//!       length_targets / length_target_transforms         (same indices)
//! ```
//!
//! Every buffer is sized once from [`SchedulerConfig`] and never grows.
//! The whole state is owned by exactly one thread at a time: the caller
//! between frames, or the frame thread while a deferred frame runs.

use glam::Vec3;
use jiggle_arena::{BlockHandle, SlabPool};
use jiggle_core::{Pose, TransformId};
use jiggle_spring::{
    BoneProperties, BoneState, ColliderProperties, ColliderState, LengthLimitProperties,
};

use crate::config::SchedulerConfig;
use crate::error::{PoolKind, RegisterError};
use crate::metrics::PoolUsage;
use crate::registry::{ChainBlocks, ChainRegistry};

/// Everything the frame pipeline reads and writes.
#[derive(Debug)]
pub(crate) struct SimulationState {
    pub registry: ChainRegistry,

    pub bone_pool: SlabPool<BoneProperties>,
    pub bone_states: Vec<BoneState>,
    pub parent_poses: Vec<Pose>,
    pub pivot_poses: Vec<Pose>,
    pub bone_transforms: Vec<Option<TransformId>>,
    pub parent_transforms: Vec<Option<TransformId>>,
    pub pivot_transforms: Vec<Option<TransformId>>,

    pub collider_pool: SlabPool<ColliderProperties>,
    pub collider_states: Vec<ColliderState>,
    pub collider_transforms: Vec<Option<TransformId>>,

    pub collision_index_pool: SlabPool<u32>,

    pub length_limit_pool: SlabPool<LengthLimitProperties>,
    pub length_targets: Vec<Vec3>,
    pub length_target_transforms: Vec<Option<TransformId>>,
}

impl SimulationState {
    /// Allocate every buffer. `config` must already be sanitized.
    pub fn new(config: &SchedulerConfig) -> Self {
        let blocks = config.max_chains;
        Self {
            registry: ChainRegistry::new(config.max_chains),

            bone_pool: SlabPool::new(config.max_bones, blocks),
            bone_states: vec![BoneState::default(); config.max_bones],
            parent_poses: vec![Pose::IDENTITY; config.max_bones],
            pivot_poses: vec![Pose::IDENTITY; config.max_bones],
            bone_transforms: vec![None; config.max_bones],
            parent_transforms: vec![None; config.max_bones],
            pivot_transforms: vec![None; config.max_bones],

            collider_pool: SlabPool::new(config.max_colliders, blocks),
            collider_states: vec![ColliderState::default(); config.max_colliders],
            collider_transforms: vec![None; config.max_colliders],

            collision_index_pool: SlabPool::new(config.max_collision_indices, blocks),

            length_limit_pool: SlabPool::new(config.max_length_limits, blocks),
            length_targets: vec![Vec3::ZERO; config.max_length_limits],
            length_target_transforms: vec![None; config.max_length_limits],
        }
    }

    /// Allocate one block per pool, all or nothing.
    pub fn grant(
        &mut self,
        bones: usize,
        colliders: usize,
        collision_indices: usize,
        length_limits: usize,
    ) -> Result<ChainBlocks, RegisterError> {
        let mut blocks = ChainBlocks::default();
        let granted = (|| -> Result<(), RegisterError> {
            blocks.bones = alloc_block(&mut self.bone_pool, bones, PoolKind::Bones)?;
            blocks.colliders =
                alloc_block(&mut self.collider_pool, colliders, PoolKind::Colliders)?;
            blocks.collision_indices = alloc_block(
                &mut self.collision_index_pool,
                collision_indices,
                PoolKind::CollisionIndices,
            )?;
            blocks.length_limits =
                alloc_block(&mut self.length_limit_pool, length_limits, PoolKind::LengthLimits)?;
            Ok(())
        })();
        match granted {
            Ok(()) => Ok(blocks),
            Err(e) => {
                self.release(blocks);
                Err(e)
            }
        }
    }

    /// Clear every slot a chain's blocks cover and return the blocks to
    /// their pools.
    pub fn release(&mut self, blocks: ChainBlocks) {
        let bones = blocks.bones.range();
        self.bone_states[bones.clone()].fill(BoneState::default());
        self.parent_poses[bones.clone()].fill(Pose::IDENTITY);
        self.pivot_poses[bones.clone()].fill(Pose::IDENTITY);
        self.bone_transforms[bones.clone()].fill(None);
        self.parent_transforms[bones.clone()].fill(None);
        self.pivot_transforms[bones].fill(None);

        let colliders = blocks.colliders.range();
        self.collider_states[colliders.clone()].fill(ColliderState::default());
        self.collider_transforms[colliders].fill(None);

        let limits = blocks.length_limits.range();
        self.length_targets[limits.clone()].fill(Vec3::ZERO);
        self.length_target_transforms[limits].fill(None);

        self.bone_pool.free(blocks.bones);
        self.collider_pool.free(blocks.colliders);
        self.collision_index_pool.free(blocks.collision_indices);
        self.length_limit_pool.free(blocks.length_limits);
    }

    pub fn usage(&self) -> PoolUsage {
        PoolUsage {
            chains: self.registry.len(),
            bones: self.bone_pool.usage(),
            colliders: self.collider_pool.usage(),
            collision_indices: self.collision_index_pool.usage(),
            length_limits: self.length_limit_pool.usage(),
        }
    }
}

fn alloc_block<T>(
    pool: &mut SlabPool<T>,
    len: usize,
    kind: PoolKind,
) -> Result<BlockHandle, RegisterError> {
    if len == 0 {
        return Ok(BlockHandle::EMPTY);
    }
    pool.alloc(len)
        .map_err(|source| RegisterError::Capacity { pool: kind, source })
}
