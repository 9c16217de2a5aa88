//! Piston mechanics: push chain calculation, sticky pull, and activation.
//!
//! A piston pushes up to 12 blocks along its facing. Fragile blocks in the
//! way are destroyed and end the chain; immovable blocks (or anything the
//! registry does not classify) abort the whole push. Sticky pistons pull the
//! single block in front of them back on retraction.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::block_registry::{classify, BlockKind};
use crate::position::{BlockPos, Direction};
use crate::spatial::{BlockStore, SpatialIndex};

/// Maximum number of blocks a piston can push.
pub const PISTON_PUSH_LIMIT: usize = 12;

/// One block displaced by a piston.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockMove {
    pub from: BlockPos,
    pub to: BlockPos,
    pub kind: BlockKind,
}

/// A fragile block broken by a push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestroyedBlock {
    pub position: BlockPos,
    pub kind: BlockKind,
}

/// Outcome of a push or pull calculation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PistonPushResult {
    pub success: bool,
    /// Moves ordered farthest-from-piston first.
    pub pushed_blocks: Vec<BlockMove>,
    pub destroyed_blocks: Vec<DestroyedBlock>,
}

impl PistonPushResult {
    fn succeeded() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    fn failed() -> Self {
        Self::default()
    }
}

/// Calculate the chain of blocks a piston at `piston_pos` would push.
///
/// Walks outward along `facing`: air ends the chain, a destructible block is
/// recorded and ends the chain, a pushable block joins it. An immovable or
/// unclassified block, more than `max_length` pushables, or an occupied
/// non-destructible cell beyond the last pushable all fail the push with
/// empty move and destroy lists.
pub fn calculate_push_chain(
    piston_pos: BlockPos,
    facing: Direction,
    max_length: usize,
    is_sticky: bool,
    get_block: &impl Fn(BlockPos) -> Option<BlockKind>,
) -> PistonPushResult {
    let mut result = PistonPushResult::succeeded();
    let mut chain: Vec<(BlockPos, BlockKind)> = Vec::new();
    let mut current = piston_pos.offset(facing);

    loop {
        let Some(kind) = get_block(current) else {
            break; // air
        };
        let class = classify(kind);

        if class.is_immovable {
            debug!("Piston at {piston_pos} blocked by immovable {kind:?} at {current}");
            return PistonPushResult::failed();
        }

        if class.is_destructible {
            result.destroyed_blocks.push(DestroyedBlock {
                position: current,
                kind,
            });
            break;
        }

        if !class.is_pushable {
            debug!("Piston at {piston_pos} blocked by unpushable {kind:?} at {current}");
            return PistonPushResult::failed();
        }

        chain.push((current, kind));
        if chain.len() > max_length {
            debug!("Piston at {piston_pos}: chain exceeds {max_length} blocks");
            return PistonPushResult::failed();
        }

        current = current.offset(facing);
    }

    // The cell after the last pushed block must be able to receive it.
    if let Some(&(last, _)) = chain.last() {
        let beyond = last.offset(facing);
        if let Some(kind) = get_block(beyond) {
            if !classify(kind).is_destructible {
                debug!("Piston at {piston_pos}: no room at {beyond}");
                return PistonPushResult::failed();
            }
        }
    }

    // Farthest first, so applying in order never overwrites an occupied cell.
    result.pushed_blocks = chain
        .iter()
        .rev()
        .map(|&(from, kind)| BlockMove {
            from,
            to: from.offset(facing),
            kind,
        })
        .collect();

    debug!(
        "Piston at {piston_pos} (sticky={is_sticky}) push chain: {} moved, {} destroyed",
        result.pushed_blocks.len(),
        result.destroyed_blocks.len()
    );
    result
}

/// Calculate a sticky piston's pull: the single block in front moves to the
/// cell behind the piston, if the block is pushable and that cell is empty.
pub fn calculate_pull_chain(
    piston_pos: BlockPos,
    facing: Direction,
    get_block: &impl Fn(BlockPos) -> Option<BlockKind>,
) -> PistonPushResult {
    let mut result = PistonPushResult::succeeded();
    let front = piston_pos.offset(facing);
    let back = piston_pos.offset(facing.opposite());

    if let Some(kind) = get_block(front) {
        if classify(kind).is_pushable && get_block(back).is_none() {
            result.pushed_blocks.push(BlockMove {
                from: front,
                to: back,
                kind,
            });
        }
    }

    result
}

/// Compute and apply a piston action against `store`.
///
/// Extending computes the push chain; a failed chain is returned untouched
/// and the store is not modified. Otherwise destroyed blocks are removed
/// first, then every move is applied in order as remove-then-add.
/// Retracting is a no-op for plain pistons and applies the single-block pull
/// for sticky ones.
pub fn execute_piston_push(
    piston_pos: BlockPos,
    facing: Direction,
    is_sticky: bool,
    extend: bool,
    store: &mut impl BlockStore,
) -> PistonPushResult {
    let result = if extend {
        calculate_push_chain(piston_pos, facing, PISTON_PUSH_LIMIT, is_sticky, &|p| {
            store.get_block(p)
        })
    } else if is_sticky {
        calculate_pull_chain(piston_pos, facing, &|p| store.get_block(p))
    } else {
        return PistonPushResult::succeeded();
    };

    if !result.success {
        return result;
    }

    // TODO: drop items for destroyed blocks once an item entity layer exists
    for destroyed in &result.destroyed_blocks {
        store.remove_block(destroyed.position);
    }
    for mv in &result.pushed_blocks {
        store.remove_block(mv.from);
        store.add_block(mv.kind, mv.to);
    }

    result
}

// ---------------------------------------------------------------------------
// Piston manager
// ---------------------------------------------------------------------------

/// Where a piston is in its extend/retract cycle.
///
/// Transitions resolve within a single call, so `Extending` and
/// `Retracting` are only observable from inside that call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PistonPhase {
    #[default]
    Retracted,
    Extending,
    Extended,
    Retracting,
}

/// Per-piston activation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PistonState {
    pub position: BlockPos,
    pub facing: Direction,
    pub is_sticky: bool,
    pub phase: PistonPhase,
}

impl PistonState {
    pub fn is_extended(&self) -> bool {
        self.phase == PistonPhase::Extended
    }
}

/// Tracks every piston's phase so a piston is never re-triggered while
/// already extended or mid-transition.
#[derive(Debug, Default)]
pub struct PistonManager {
    pistons: SpatialIndex<PistonState>,
}

impl PistonManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a retracted piston, replacing any previous record at `position`.
    pub fn add_piston(&mut self, position: BlockPos, facing: Direction, is_sticky: bool) {
        self.restore_piston(position, facing, is_sticky, false);
    }

    /// Register a piston that is already extended or retracted, as when
    /// rebuilding from saved node state.
    pub fn restore_piston(
        &mut self,
        position: BlockPos,
        facing: Direction,
        is_sticky: bool,
        extended: bool,
    ) {
        let phase = if extended {
            PistonPhase::Extended
        } else {
            PistonPhase::Retracted
        };
        self.pistons.insert(
            position,
            PistonState {
                position,
                facing,
                is_sticky,
                phase,
            },
        );
    }

    pub fn remove_piston(&mut self, position: BlockPos) -> Option<PistonState> {
        self.pistons.remove(position)
    }

    /// Extend a retracted piston.
    ///
    /// Returns `None` if there is no piston at `position` or it is not
    /// retracted. A blocked push leaves the piston retracted.
    pub fn activate_piston(
        &mut self,
        position: BlockPos,
        store: &mut impl BlockStore,
    ) -> Option<PistonPushResult> {
        let piston = self.pistons.get_mut(position)?;
        if piston.phase != PistonPhase::Retracted {
            return None;
        }

        piston.phase = PistonPhase::Extending;
        let result = execute_piston_push(position, piston.facing, piston.is_sticky, true, store);
        piston.phase = if result.success {
            PistonPhase::Extended
        } else {
            PistonPhase::Retracted
        };
        debug!("Piston at {position} activate: success={}", result.success);
        Some(result)
    }

    /// Retract an extended piston. Returns `None` if there is no piston at
    /// `position` or it is not extended.
    pub fn deactivate_piston(
        &mut self,
        position: BlockPos,
        store: &mut impl BlockStore,
    ) -> Option<PistonPushResult> {
        let piston = self.pistons.get_mut(position)?;
        if piston.phase != PistonPhase::Extended {
            return None;
        }

        piston.phase = PistonPhase::Retracting;
        let result = execute_piston_push(position, piston.facing, piston.is_sticky, false, store);
        piston.phase = PistonPhase::Retracted;
        debug!(
            "Piston at {position} deactivate: pulled={}",
            result.pushed_blocks.len()
        );
        Some(result)
    }

    /// Move a piston's record to `to`, keeping its facing and phase.
    /// `false` if there is no piston at `from`.
    pub fn relocate(&mut self, from: BlockPos, to: BlockPos) -> bool {
        let Some(mut piston) = self.pistons.remove(from) else {
            return false;
        };
        piston.position = to;
        self.pistons.insert(to, piston);
        true
    }

    pub fn piston_state(&self, position: BlockPos) -> Option<&PistonState> {
        self.pistons.get(position)
    }

    pub fn has_piston(&self, position: BlockPos) -> bool {
        self.pistons.contains(position)
    }

    pub fn pistons(&self) -> impl Iterator<Item = &PistonState> {
        self.pistons.iter().map(|(_, state)| state)
    }

    pub fn len(&self) -> usize {
        self.pistons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pistons.is_empty()
    }

    pub fn clear(&mut self) {
        self.pistons.clear();
    }
}
