//! Sparse position-keyed storage and the block store collaborator.

use std::collections::hash_map::{self, HashMap};

use crate::block_registry::BlockKind;
use crate::position::BlockPos;

/// Sparse map from integer positions to values.
#[derive(Debug, Clone)]
pub struct SpatialIndex<T> {
    cells: HashMap<BlockPos, T>,
}

impl<T> Default for SpatialIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SpatialIndex<T> {
    pub fn new() -> Self {
        Self {
            cells: HashMap::new(),
        }
    }

    pub fn get(&self, pos: BlockPos) -> Option<&T> {
        self.cells.get(&pos)
    }

    pub fn get_mut(&mut self, pos: BlockPos) -> Option<&mut T> {
        self.cells.get_mut(&pos)
    }

    /// Store `value` at `pos`, returning the previous value.
    pub fn insert(&mut self, pos: BlockPos, value: T) -> Option<T> {
        self.cells.insert(pos, value)
    }

    pub fn remove(&mut self, pos: BlockPos) -> Option<T> {
        self.cells.remove(&pos)
    }

    pub fn contains(&self, pos: BlockPos) -> bool {
        self.cells.contains_key(&pos)
    }

    /// Occupied lattice neighbours of `pos`, in direction order.
    pub fn occupied_neighbors(&self, pos: BlockPos) -> impl Iterator<Item = BlockPos> + '_ {
        pos.neighbors().into_iter().filter(|n| self.contains(*n))
    }

    pub fn iter(&self) -> hash_map::Iter<'_, BlockPos, T> {
        self.cells.iter()
    }

    pub fn iter_mut(&mut self) -> hash_map::IterMut<'_, BlockPos, T> {
        self.cells.iter_mut()
    }

    pub fn positions(&self) -> impl Iterator<Item = BlockPos> + '_ {
        self.cells.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }
}

impl<T> FromIterator<(BlockPos, T)> for SpatialIndex<T> {
    fn from_iter<I: IntoIterator<Item = (BlockPos, T)>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().collect(),
        }
    }
}

/// World state as seen by the piston engine: lookup plus add/remove.
///
/// Implementations are assumed to be the single writer for the duration of
/// one push or update call.
pub trait BlockStore {
    /// The block at `pos`, or `None` for air.
    fn get_block(&self, pos: BlockPos) -> Option<BlockKind>;

    fn add_block(&mut self, kind: BlockKind, pos: BlockPos);

    fn remove_block(&mut self, pos: BlockPos);
}

/// In-memory [`BlockStore`] backed by a [`SpatialIndex`].
#[derive(Debug, Clone, Default)]
pub struct MemoryWorld {
    blocks: SpatialIndex<BlockKind>,
}

impl MemoryWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place every `(pos, kind)` pair, later entries winning.
    pub fn with_blocks<I, P>(blocks: I) -> Self
    where
        I: IntoIterator<Item = (P, BlockKind)>,
        P: Into<BlockPos>,
    {
        Self {
            blocks: blocks.into_iter().map(|(p, k)| (p.into(), k)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

impl BlockStore for MemoryWorld {
    fn get_block(&self, pos: BlockPos) -> Option<BlockKind> {
        self.blocks.get(pos).copied()
    }

    fn add_block(&mut self, kind: BlockKind, pos: BlockPos) {
        self.blocks.insert(pos, kind);
    }

    fn remove_block(&mut self, pos: BlockPos) {
        self.blocks.remove(pos);
    }
}
