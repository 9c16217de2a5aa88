//! Redstone networks: connectivity, signal propagation and delayed updates.
//!
//! Components that touch on the 6-connected lattice form a network. Signal
//! strength is recomputed per network with a Dijkstra-like relaxation from
//! every powered source, losing one level per hop. Networks are merged when
//! a new component bridges them and split when a removal disconnects them.

use std::collections::{BinaryHeap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};
use tracing::debug;

use crate::block_registry::{
    initial_state, ComponentKind, ComponentState, MAX_POWER, MAX_REPEATER_DELAY,
    MIN_REPEATER_DELAY,
};
use crate::block_tick::UpdateScheduler;
use crate::position::{BlockPos, Direction};
use crate::spatial::SpatialIndex;

new_key_type! {
    /// Handle to a network owned by a [`RedstoneSystem`].
    pub struct NetworkId;
}

/// A component and its links to other members of the same network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentNode {
    pub position: BlockPos,
    pub kind: ComponentKind,
    pub state: ComponentState,
    /// Lattice neighbours that belong to the same network.
    pub neighbors: Vec<BlockPos>,
}

/// A connected group of components propagated as one unit.
#[derive(Debug, Clone, Default)]
pub struct RedstoneNetwork {
    nodes: SpatialIndex<ComponentNode>,
    power_sources: Vec<BlockPos>,
    consumers: Vec<BlockPos>,
}

impl RedstoneNetwork {
    /// Build a network from nodes, deriving neighbour lists and member subsets.
    pub(crate) fn from_nodes(nodes: impl IntoIterator<Item = ComponentNode>) -> Self {
        let mut network = Self::default();
        for node in nodes {
            network.insert_node(node);
        }
        let positions: Vec<BlockPos> = network.nodes.positions().collect();
        for pos in positions {
            network.refresh_neighbors(pos);
        }
        network
    }

    pub fn node(&self, pos: BlockPos) -> Option<&ComponentNode> {
        self.nodes.get(pos)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ComponentNode> {
        self.nodes.iter().map(|(_, node)| node)
    }

    pub fn contains(&self, pos: BlockPos) -> bool {
        self.nodes.contains(pos)
    }

    pub fn power_sources(&self) -> &[BlockPos] {
        &self.power_sources
    }

    pub fn consumers(&self) -> &[BlockPos] {
        &self.consumers
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn insert_node(&mut self, node: ComponentNode) {
        let pos = node.position;
        if node.kind.is_source() {
            self.power_sources.push(pos);
        }
        if node.kind.is_consumer() {
            self.consumers.push(pos);
        }
        self.nodes.insert(pos, node);
    }

    fn take_node(&mut self, pos: BlockPos) -> Option<ComponentNode> {
        let node = self.nodes.remove(pos)?;
        self.power_sources.retain(|p| *p != pos);
        self.consumers.retain(|p| *p != pos);
        Some(node)
    }

    /// Recompute the neighbour list of the node at `pos`, if present.
    fn refresh_neighbors(&mut self, pos: BlockPos) {
        let neighbors: Vec<BlockPos> = self.nodes.occupied_neighbors(pos).collect();
        if let Some(node) = self.nodes.get_mut(pos) {
            node.neighbors = neighbors;
        }
    }

    /// Positions reachable from `start` through neighbour links.
    fn connected_from(&self, start: BlockPos) -> HashSet<BlockPos> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::new();
        if self.nodes.contains(start) {
            seen.insert(start);
            queue.push_back(start);
        }
        while let Some(pos) = queue.pop_front() {
            let Some(node) = self.nodes.get(pos) else {
                continue;
            };
            for &n in &node.neighbors {
                if seen.insert(n) {
                    queue.push_back(n);
                }
            }
        }
        seen
    }

    /// Torches go dark while the component directly below them is a powered
    /// source other than a torch, and light up again otherwise.
    fn refresh_torches(&mut self) {
        let torches: Vec<(BlockPos, bool)> = self
            .power_sources
            .iter()
            .filter_map(|&pos| {
                let node = self.nodes.get(pos)?;
                if node.kind != ComponentKind::RedstoneTorch {
                    return None;
                }
                let below = self.nodes.get(pos.offset(Direction::Down));
                let powered_from_below = below.is_some_and(|b| {
                    b.kind.is_source()
                        && b.kind != ComponentKind::RedstoneTorch
                        && b.state.power > 0
                });
                Some((pos, !powered_from_below))
            })
            .collect();

        for (pos, lit) in torches {
            if let Some(node) = self.nodes.get_mut(pos) {
                node.state.is_lit = lit;
                node.state.set_power(if lit { MAX_POWER } else { 0 });
            }
        }
    }

    /// Recompute every node's power from the current source states.
    ///
    /// Non-source nodes are reset to 0, then power flows outward from each
    /// source with `power > 0`, highest signal first. A node is only
    /// re-expanded when its power strictly increases, so each node settles
    /// at the maximum over all paths. Sources keep their own emission.
    fn propagate(&mut self) {
        self.refresh_torches();

        for (_, node) in self.nodes.iter_mut() {
            if !node.kind.is_source() {
                node.state.set_power(0);
            }
        }

        // Max-heap by signal: (power, position)
        let mut heap: BinaryHeap<(u8, BlockPos)> = BinaryHeap::new();
        for &pos in &self.power_sources {
            if let Some(node) = self.nodes.get(pos) {
                if node.state.power > 0 {
                    heap.push((node.state.power, pos));
                }
            }
        }

        while let Some((power, pos)) = heap.pop() {
            let Some(node) = self.nodes.get(pos) else {
                continue;
            };
            if power < node.state.power {
                continue; // already settled with a stronger signal
            }
            let next_power = power.saturating_sub(1);
            if next_power == 0 {
                continue;
            }
            let neighbors = node.neighbors.clone();
            for n in neighbors {
                let Some(neighbor) = self.nodes.get_mut(n) else {
                    continue;
                };
                if neighbor.kind.is_source() {
                    continue;
                }
                if next_power > neighbor.state.power {
                    neighbor.state.set_power(next_power);
                    heap.push((next_power, n));
                }
            }
        }

        for (_, node) in self.nodes.iter_mut() {
            if node.kind == ComponentKind::RedstoneLamp {
                node.state.is_lit = node.state.is_powered;
            }
        }
    }
}

/// Owner of every redstone network in a world.
#[derive(Debug, Default)]
pub struct RedstoneSystem {
    networks: SlotMap<NetworkId, RedstoneNetwork>,
    /// Which network each component position belongs to.
    membership: SpatialIndex<NetworkId>,
    scheduler: UpdateScheduler,
}

impl RedstoneSystem {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Topology
    // -----------------------------------------------------------------------

    /// Place a component with its initial state.
    ///
    /// Joins the network already holding `pos`, else the network of an
    /// adjacent component (merging every adjacent network into one), else a
    /// fresh network. Does not propagate; call [`update_network`] after.
    ///
    /// [`update_network`]: Self::update_network
    pub fn add_component(&mut self, pos: BlockPos, kind: ComponentKind) -> NetworkId {
        let id = match self.membership.get(pos).copied() {
            Some(id) => {
                if let Some(network) = self.networks.get_mut(id) {
                    network.take_node(pos);
                }
                id
            }
            None => {
                let mut adjacent: Vec<NetworkId> = Vec::new();
                for n in pos.neighbors() {
                    if let Some(&nid) = self.membership.get(n) {
                        if !adjacent.contains(&nid) {
                            adjacent.push(nid);
                        }
                    }
                }
                match adjacent.split_first() {
                    None => self.networks.insert(RedstoneNetwork::default()),
                    Some((&first, rest)) => {
                        let mut target = first;
                        for &other in rest {
                            target = self.merge(target, other);
                        }
                        target
                    }
                }
            }
        };

        let node = ComponentNode {
            position: pos,
            kind,
            state: initial_state(kind),
            neighbors: Vec::new(),
        };
        self.membership.insert(pos, id);
        if let Some(network) = self.networks.get_mut(id) {
            network.insert_node(node);
            network.refresh_neighbors(pos);
            for n in pos.neighbors() {
                network.refresh_neighbors(n);
            }
        }
        debug!("Added {} at {pos} to network {id:?}", kind.name());
        id
    }

    /// Remove the component at `pos`.
    ///
    /// An emptied network is discarded; a disconnected one is split into one
    /// network per connected piece. Returns the networks that still hold the
    /// former neighbours so the caller can re-propagate them. Does not
    /// propagate by itself.
    pub fn remove_component(&mut self, pos: BlockPos) -> Vec<NetworkId> {
        let Some(id) = self.membership.remove(pos) else {
            return Vec::new();
        };
        let Some(network) = self.networks.get_mut(id) else {
            return Vec::new();
        };
        let Some(node) = network.take_node(pos) else {
            return Vec::new();
        };

        let former: Vec<BlockPos> = node
            .neighbors
            .iter()
            .copied()
            .filter(|n| network.contains(*n))
            .collect();
        for &n in &former {
            network.refresh_neighbors(n);
        }
        debug!("Removed {} at {pos} from network {id:?}", node.kind.name());

        if network.is_empty() {
            self.networks.remove(id);
            return Vec::new();
        }

        // Group former neighbours into connected pieces.
        let mut pieces: Vec<HashSet<BlockPos>> = Vec::new();
        for &n in &former {
            if pieces.iter().any(|piece| piece.contains(&n)) {
                continue;
            }
            pieces.push(network.connected_from(n));
        }
        if pieces.len() <= 1 {
            return vec![id];
        }

        // The first piece stays in place; the others move to new networks.
        let detached: Vec<Vec<ComponentNode>> = pieces
            .into_iter()
            .skip(1)
            .map(|piece| piece.into_iter().filter_map(|p| network.take_node(p)).collect())
            .collect();
        let mut ids = vec![id];
        for nodes in detached {
            ids.push(self.insert_network(RedstoneNetwork::from_nodes(nodes)));
        }
        debug!("Network {id:?} split into {} pieces", ids.len());
        ids
    }

    /// Relocate the component at `from` to `to`, keeping its state.
    ///
    /// Connectivity is rebuilt at both ends. Returns every network touched
    /// by the move so the caller can re-propagate them.
    pub fn move_component(&mut self, from: BlockPos, to: BlockPos) -> Vec<NetworkId> {
        let Some(node) = self.component(from).cloned() else {
            return Vec::new();
        };
        let mut touched = self.remove_component(from);
        let id = self.add_component(to, node.kind);
        if let Some(moved) = self.node_mut(id, to) {
            moved.state = node.state;
        }
        touched.retain(|t| self.networks.contains_key(*t));
        if !touched.contains(&id) {
            touched.push(id);
        }
        touched
    }

    /// Fold `b` into `a` (or the other way round if `b` is larger).
    /// Returns the id of the surviving network.
    fn merge(&mut self, a: NetworkId, b: NetworkId) -> NetworkId {
        if a == b {
            return a;
        }
        let len_a = self.networks.get(a).map_or(0, RedstoneNetwork::len);
        let len_b = self.networks.get(b).map_or(0, RedstoneNetwork::len);
        let (keep, absorb) = if len_b > len_a { (b, a) } else { (a, b) };

        let Some(absorbed) = self.networks.remove(absorb) else {
            return keep;
        };
        if let Some(target) = self.networks.get_mut(keep) {
            for (pos, node) in absorbed.nodes.iter() {
                target.insert_node(node.clone());
                self.membership.insert(*pos, keep);
            }
        }
        debug!("Merged network {absorb:?} into {keep:?}");
        keep
    }

    // -----------------------------------------------------------------------
    // Propagation
    // -----------------------------------------------------------------------

    /// Recompute signal strength across one network. Returns `false` if the
    /// network does not exist.
    pub fn update_network(&mut self, id: NetworkId) -> bool {
        let Some(network) = self.networks.get_mut(id) else {
            return false;
        };
        network.propagate();
        debug!(
            "Updated network {id:?}: {} nodes, {} powered",
            network.len(),
            network.nodes().filter(|n| n.state.is_powered).count()
        );
        true
    }

    /// Recompute the network that owns `pos`.
    pub fn update_at(&mut self, pos: BlockPos) -> bool {
        match self.membership.get(pos).copied() {
            Some(id) => self.update_network(id),
            None => false,
        }
    }

    /// Flip a lever or button and propagate. `false` for any other kind or
    /// an unknown position.
    pub fn toggle_component(&mut self, pos: BlockPos) -> bool {
        let Some(id) = self.membership.get(pos).copied() else {
            return false;
        };
        let Some(node) = self.node_mut(id, pos) else {
            return false;
        };
        if !node.kind.is_toggleable() {
            return false;
        }
        let powered = !node.state.is_powered;
        node.state.set_power(if powered { MAX_POWER } else { 0 });
        debug!("Toggled {} at {pos}: powered={powered}", node.kind.name());
        self.update_network(id)
    }

    /// Drive a source's output level directly (pressure plate weight,
    /// daylight level, ...) and propagate. Clamped to 0..=15.
    pub fn set_source_power(&mut self, pos: BlockPos, power: u8) -> bool {
        let Some(id) = self.membership.get(pos).copied() else {
            return false;
        };
        let Some(node) = self.node_mut(id, pos) else {
            return false;
        };
        if !node.kind.is_source() {
            return false;
        }
        node.state.set_power(power);
        self.update_network(id)
    }

    // -----------------------------------------------------------------------
    // Component queries and edits
    // -----------------------------------------------------------------------

    pub fn get_component_state(&self, pos: BlockPos) -> Option<ComponentState> {
        self.component(pos).map(|node| node.state)
    }

    pub fn component(&self, pos: BlockPos) -> Option<&ComponentNode> {
        let id = self.membership.get(pos)?;
        self.networks.get(*id)?.node(pos)
    }

    /// Every component across all networks.
    pub fn components(&self) -> impl Iterator<Item = &ComponentNode> {
        self.networks.values().flat_map(RedstoneNetwork::nodes)
    }

    /// Directions in which the component at `pos` touches another
    /// component, in [`Direction::ALL`] order. Used to draw dust lines.
    pub fn dust_connections(&self, pos: BlockPos) -> Option<Vec<Direction>> {
        let node = self.component(pos)?;
        Some(
            Direction::ALL
                .into_iter()
                .filter(|dir| node.neighbors.contains(&pos.offset(*dir)))
                .collect(),
        )
    }

    /// Set a repeater's delay, clamped to 1..=4. `false` for non-repeaters.
    pub fn set_repeater_delay(&mut self, pos: BlockPos, delay: u8) -> bool {
        match self.component_mut(pos) {
            Some(node) if node.kind == ComponentKind::RedstoneRepeater => {
                node.state.delay = delay.clamp(MIN_REPEATER_DELAY, MAX_REPEATER_DELAY);
                true
            }
            _ => false,
        }
    }

    pub fn set_facing(&mut self, pos: BlockPos, facing: Direction) -> bool {
        match self.component_mut(pos) {
            Some(node) => {
                node.state.facing = facing;
                true
            }
            None => false,
        }
    }

    /// Mirror a piston's extension into its node state.
    pub fn set_extended(&mut self, pos: BlockPos, extended: bool) -> bool {
        match self.component_mut(pos) {
            Some(node) if node.kind.is_piston() => {
                node.state.extended = extended;
                true
            }
            _ => false,
        }
    }

    fn component_mut(&mut self, pos: BlockPos) -> Option<&mut ComponentNode> {
        let id = self.membership.get(pos).copied()?;
        self.node_mut(id, pos)
    }

    fn node_mut(&mut self, id: NetworkId, pos: BlockPos) -> Option<&mut ComponentNode> {
        self.networks.get_mut(id)?.nodes.get_mut(pos)
    }

    // -----------------------------------------------------------------------
    // Delayed updates
    // -----------------------------------------------------------------------

    /// Queue a re-propagation of the network owning `pos` after `delay` ticks.
    pub fn trigger_update(&mut self, pos: BlockPos, delay: u64) {
        self.scheduler.schedule(pos, delay);
    }

    /// Arm a component whose input changed.
    ///
    /// Repeaters count down their own delay before the network fires; every
    /// other kind fires on the next pass. Returns `false` for unknown
    /// positions.
    pub fn notify_input_changed(&mut self, pos: BlockPos) -> bool {
        let Some(node) = self.component_mut(pos) else {
            return false;
        };
        let delay = if node.kind == ComponentKind::RedstoneRepeater {
            node.state.triggered = true;
            u64::from(node.state.delay)
        } else {
            0
        };
        self.scheduler.schedule(pos, delay);
        true
    }

    /// Advance pending updates by `elapsed` ticks and propagate the networks
    /// whose updates fired. Each network is updated at most once per call.
    /// Returns the networks that were updated.
    pub fn process_delayed_updates(&mut self, elapsed: u64) -> Vec<NetworkId> {
        let fired = self.scheduler.advance(elapsed);
        let mut updated = Vec::new();
        for pos in fired {
            if let Some(node) = self.component_mut(pos) {
                node.state.triggered = false;
            }
            let Some(id) = self.membership.get(pos).copied() else {
                continue;
            };
            if !updated.contains(&id) && self.update_network(id) {
                updated.push(id);
            }
        }
        updated
    }

    pub fn scheduler(&self) -> &UpdateScheduler {
        &self.scheduler
    }

    // -----------------------------------------------------------------------
    // Networks
    // -----------------------------------------------------------------------

    pub fn network_of(&self, pos: BlockPos) -> Option<NetworkId> {
        self.membership.get(pos).copied()
    }

    pub fn network(&self, id: NetworkId) -> Option<&RedstoneNetwork> {
        self.networks.get(id)
    }

    pub fn networks(&self) -> impl Iterator<Item = (NetworkId, &RedstoneNetwork)> {
        self.networks.iter()
    }

    pub fn network_count(&self) -> usize {
        self.networks.len()
    }

    pub fn component_count(&self) -> usize {
        self.membership.len()
    }

    /// Add a whole network, claiming its positions. Positions must not be
    /// members of another network.
    pub(crate) fn insert_network(&mut self, network: RedstoneNetwork) -> NetworkId {
        let positions: Vec<BlockPos> = network.nodes.positions().collect();
        let id = self.networks.insert(network);
        for pos in positions {
            self.membership.insert(pos, id);
        }
        id
    }

    /// Drop every network and pending update.
    pub fn clear(&mut self) {
        self.networks.clear();
        self.membership.clear();
        self.scheduler.clear();
    }
}
