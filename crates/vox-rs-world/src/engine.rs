//! The redstone engine: networks and pistons driven together against a
//! block store.
//!
//! [`RedstoneEngine`] is the single owner of all redstone state for one
//! world. Every mutating call propagates the affected networks and then
//! brings pistons in line with their power, so callers never observe a
//! powered piston that has not tried to extend.

use tracing::{debug, trace};

use crate::block_registry::{BlockKind, ComponentKind};
use crate::piston::{PistonManager, PistonPushResult};
use crate::position::{BlockPos, Direction};
use crate::redstone::{NetworkId, RedstoneSystem};
use crate::spatial::BlockStore;

#[derive(Debug, Default)]
pub struct RedstoneEngine {
    redstone: RedstoneSystem,
    pistons: PistonManager,
}

impl RedstoneEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an engine around an existing system (e.g. one restored from a
    /// snapshot). Pistons are re-registered from their nodes, extended or
    /// retracted as the node says.
    pub fn from_system(redstone: RedstoneSystem) -> Self {
        let mut pistons = PistonManager::new();
        for node in redstone.components().filter(|n| n.kind.is_piston()) {
            pistons.restore_piston(
                node.position,
                node.state.facing,
                node.kind == ComponentKind::StickyPiston,
                node.state.extended,
            );
        }
        Self { redstone, pistons }
    }

    pub fn redstone(&self) -> &RedstoneSystem {
        &self.redstone
    }

    pub fn redstone_mut(&mut self) -> &mut RedstoneSystem {
        &mut self.redstone
    }

    pub fn pistons(&self) -> &PistonManager {
        &self.pistons
    }

    /// Place a component, write it into `store`, and propagate.
    pub fn place_component(
        &mut self,
        pos: BlockPos,
        kind: ComponentKind,
        facing: Direction,
        store: &mut impl BlockStore,
    ) -> NetworkId {
        store.add_block(BlockKind::Component(kind), pos);
        let id = self.redstone.add_component(pos, kind);
        self.redstone.set_facing(pos, facing);

        if kind.is_piston() {
            let sticky = kind == ComponentKind::StickyPiston;
            self.pistons.add_piston(pos, facing, sticky);
        } else {
            self.pistons.remove_piston(pos);
        }

        self.redstone.update_network(id);
        self.sync_pistons(store);
        id
    }

    /// Remove a component from the world and re-propagate what is left.
    /// `false` if there is no component at `pos`.
    pub fn break_component(&mut self, pos: BlockPos, store: &mut impl BlockStore) -> bool {
        if self.redstone.component(pos).is_none() {
            return false;
        }
        store.remove_block(pos);
        self.pistons.remove_piston(pos);
        for id in self.redstone.remove_component(pos) {
            self.redstone.update_network(id);
        }
        self.sync_pistons(store);
        true
    }

    /// Flip a lever or button. `false` if `pos` is not toggleable.
    pub fn toggle(&mut self, pos: BlockPos, store: &mut impl BlockStore) -> bool {
        if !self.redstone.toggle_component(pos) {
            return false;
        }
        self.sync_pistons(store);
        true
    }

    /// Drive a source's output and bring pistons in line.
    pub fn set_source_power(
        &mut self,
        pos: BlockPos,
        power: u8,
        store: &mut impl BlockStore,
    ) -> bool {
        if !self.redstone.set_source_power(pos, power) {
            return false;
        }
        self.sync_pistons(store);
        true
    }

    /// Advance the world by `elapsed` ticks: fire due updates, then sync
    /// pistons. Returns the networks that were re-propagated.
    pub fn tick(&mut self, elapsed: u64, store: &mut impl BlockStore) -> Vec<NetworkId> {
        let updated = self.redstone.process_delayed_updates(elapsed);
        if !updated.is_empty() {
            trace!("Tick fired {} network update(s)", updated.len());
        }
        self.sync_pistons(store);
        updated
    }

    /// Extend powered retracted pistons and retract unpowered extended
    /// ones. Returns how many pistons moved blocks or changed phase.
    ///
    /// Blocks displaced by a push are mirrored into the redstone networks.
    /// A blocked piston stays retracted and is retried on the next sync.
    pub fn sync_pistons(&mut self, store: &mut impl BlockStore) -> usize {
        let snapshot: Vec<(BlockPos, bool)> = self
            .pistons
            .pistons()
            .map(|p| (p.position, p.is_extended()))
            .collect();

        let mut changed = 0;
        for (pos, extended) in snapshot {
            let powered = self
                .redstone
                .get_component_state(pos)
                .is_some_and(|s| s.is_powered);

            let result = match (powered, extended) {
                (true, false) => self.pistons.activate_piston(pos, store),
                (false, true) => self.pistons.deactivate_piston(pos, store),
                _ => None,
            };
            let Some(result) = result else {
                continue;
            };

            let now_extended = self
                .pistons
                .piston_state(pos)
                .is_some_and(|p| p.is_extended());
            self.redstone.set_extended(pos, now_extended);

            if result.success && now_extended != extended {
                changed += 1;
                self.mirror_displacement(&result);
            }
        }
        changed
    }

    /// Apply a successful push or pull to the redstone side: destroyed
    /// components are removed, moved components are relocated with their
    /// state, and every touched network is re-propagated.
    fn mirror_displacement(&mut self, result: &PistonPushResult) {
        let mut touched: Vec<NetworkId> = Vec::new();

        for destroyed in &result.destroyed_blocks {
            if self.redstone.component(destroyed.position).is_some() {
                touched.extend(self.redstone.remove_component(destroyed.position));
            }
        }

        for mv in &result.pushed_blocks {
            let Some(kind) = mv.kind.as_component() else {
                continue;
            };
            if kind.is_piston() {
                self.pistons.relocate(mv.from, mv.to);
            }
            touched.extend(self.redstone.move_component(mv.from, mv.to));
        }

        touched.sort_unstable();
        touched.dedup();
        for id in touched {
            self.redstone.update_network(id);
        }
        debug!(
            "Mirrored piston displacement: {} moved, {} destroyed",
            result.pushed_blocks.len(),
            result.destroyed_blocks.len()
        );
    }

    /// Drop all redstone and piston state.
    pub fn clear(&mut self) {
        self.redstone.clear();
        self.pistons.clear();
    }
}
