//! Index-linked chain registry.
//!
//! Maps each registered [`ChainId`] to the blocks it borrows from the four
//! shared slab pools, plus its live-editable settings. All per-bone
//! linkage (parent, pivot, length-limit target, collider list) is stored
//! chain-locally inside the pooled properties; only the block offsets
//! live here.

use indexmap::IndexMap;
use jiggle_arena::BlockHandle;
use jiggle_core::ChainId;
use jiggle_spring::ChainSettings;

use crate::config::Timestep;

/// The blocks one chain owns, one per shared pool.
///
/// Any of them may be [`BlockHandle::EMPTY`] when the chain needs no
/// elements from that pool.
#[derive(Debug, Default)]
pub(crate) struct ChainBlocks {
    pub bones: BlockHandle,
    pub colliders: BlockHandle,
    pub collision_indices: BlockHandle,
    pub length_limits: BlockHandle,
}

/// One registered chain.
#[derive(Debug)]
pub(crate) struct ChainEntry {
    pub settings: ChainSettings,
    pub timestep: Timestep,
    pub paused: bool,
    pub blocks: ChainBlocks,
}

impl ChainEntry {
    /// Whether the simulation phase has anything to do for this chain.
    pub fn is_active(&self) -> bool {
        !self.paused && !self.blocks.bones.is_empty()
    }
}

/// Registered chains in registration order.
#[derive(Debug)]
pub(crate) struct ChainRegistry {
    chains: IndexMap<ChainId, ChainEntry>,
    next_id: u32,
    limit: usize,
}

impl ChainRegistry {
    pub fn new(limit: usize) -> Self {
        Self {
            chains: IndexMap::with_capacity(limit),
            next_id: 0,
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.chains.len() >= self.limit
    }

    /// Add a chain under a fresh id. Ids are never reused.
    pub fn insert(&mut self, entry: ChainEntry) -> ChainId {
        let id = ChainId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.chains.insert(id, entry);
        id
    }

    pub fn remove(&mut self, id: ChainId) -> Option<ChainEntry> {
        self.chains.shift_remove(&id)
    }

    pub fn get(&self, id: ChainId) -> Option<&ChainEntry> {
        self.chains.get(&id)
    }

    pub fn get_mut(&mut self, id: ChainId) -> Option<&mut ChainEntry> {
        self.chains.get_mut(&id)
    }

    pub fn contains(&self, id: ChainId) -> bool {
        self.chains.contains_key(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = ChainId> + '_ {
        self.chains.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ChainId, &ChainEntry)> {
        self.chains.iter().map(|(id, e)| (*id, e))
    }
}
