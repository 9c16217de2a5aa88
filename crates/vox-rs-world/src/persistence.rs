//! Network snapshots for saving and restoring redstone state.
//!
//! A snapshot is a plain value copy of one network's nodes. Neighbour lists
//! and source/consumer subsets are derived data and are rebuilt on load, so
//! a hand-edited snapshot only needs positions, kinds and states to be
//! consistent.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::WorldError;
use crate::redstone::{ComponentNode, RedstoneNetwork, RedstoneSystem};

/// Value copy of one network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    /// Nodes sorted by position.
    pub nodes: Vec<ComponentNode>,
}

impl NetworkSnapshot {
    fn capture(network: &RedstoneNetwork) -> Self {
        let mut nodes: Vec<ComponentNode> = network.nodes().cloned().collect();
        nodes.sort_by_key(|n| n.position);
        Self { nodes }
    }
}

impl RedstoneSystem {
    /// Snapshot every network, ordered by each network's smallest position
    /// so equal systems serialize identically.
    pub fn get_all_networks(&self) -> Vec<NetworkSnapshot> {
        let mut snapshots: Vec<NetworkSnapshot> = self
            .networks()
            .map(|(_, network)| NetworkSnapshot::capture(network))
            .collect();
        snapshots.sort_by_key(|s| s.nodes.first().map(|n| n.position));
        snapshots
    }

    /// Replace all state with `snapshots`.
    ///
    /// Fails without touching the current state if any position appears
    /// twice, within one snapshot or across several. Empty snapshots are
    /// skipped. Pending delayed updates are discarded.
    pub fn load_networks(&mut self, snapshots: Vec<NetworkSnapshot>) -> Result<(), WorldError> {
        let mut seen = HashSet::new();
        for node in snapshots.iter().flat_map(|s| &s.nodes) {
            if !seen.insert(node.position) {
                warn!("Rejected network snapshot: {} claimed twice", node.position);
                return Err(WorldError::DuplicatePosition(node.position));
            }
        }

        self.clear();
        let mut loaded = 0;
        for snapshot in snapshots {
            if snapshot.nodes.is_empty() {
                continue;
            }
            self.insert_network(RedstoneNetwork::from_nodes(snapshot.nodes));
            loaded += 1;
        }
        info!(
            "Loaded {loaded} redstone network(s), {} component(s)",
            self.component_count()
        );
        Ok(())
    }

    /// Serialize every network as pretty JSON.
    pub fn to_json(&self) -> Result<String, WorldError> {
        Ok(serde_json::to_string_pretty(&self.get_all_networks())?)
    }

    /// Replace all state with networks parsed from JSON.
    pub fn from_json(&mut self, json: &str) -> Result<(), WorldError> {
        let snapshots: Vec<NetworkSnapshot> = serde_json::from_str(json)?;
        self.load_networks(snapshots)
    }
}
