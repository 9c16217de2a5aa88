//! Property-based tests for redstone propagation, network topology and
//! piston push chains.

use std::collections::{HashMap, HashSet, VecDeque};

use proptest::prelude::*;
use vox_rs_world::block_registry::{BlockKind, ComponentKind, TerrainBlock};
use vox_rs_world::piston::{calculate_push_chain, execute_piston_push, PISTON_PUSH_LIMIT};
use vox_rs_world::redstone::RedstoneNetwork;
use vox_rs_world::{BlockPos, BlockStore, Direction, MemoryWorld, RedstoneSystem};

// ===========================================================================
// Generators
// ===========================================================================

fn arb_pushable() -> impl Strategy<Value = BlockKind> {
    prop_oneof![
        Just(BlockKind::Terrain(TerrainBlock::Stone)),
        Just(BlockKind::Terrain(TerrainBlock::Dirt)),
        Just(BlockKind::Terrain(TerrainBlock::Sand)),
        Just(BlockKind::Terrain(TerrainBlock::Planks)),
        Just(BlockKind::Component(ComponentKind::RedstoneBlock)),
    ]
}

/// Topology edits inside a 4x2x4 box.
#[derive(Debug, Clone)]
enum EditOp {
    Add(BlockPos, bool),
    Remove(BlockPos),
}

fn arb_pos() -> impl Strategy<Value = BlockPos> {
    (0..4i32, 0..2i32, 0..4i32).prop_map(|(x, y, z)| BlockPos::new(x, y, z))
}

fn arb_edits(max_ops: usize) -> impl Strategy<Value = Vec<EditOp>> {
    proptest::collection::vec(
        prop_oneof![
            3 => (arb_pos(), any::<bool>()).prop_map(|(p, lever)| EditOp::Add(p, lever)),
            1 => arb_pos().prop_map(EditOp::Remove),
        ],
        1..=max_ops,
    )
}

/// Expected power of every non-source node in `network`: the best of
/// `source power - hops` over all sources, where paths run through
/// non-source nodes only. Unreached nodes expect 0.
fn expected_power(network: &RedstoneNetwork) -> HashMap<BlockPos, u8> {
    let mut expected: HashMap<BlockPos, u8> = network
        .nodes()
        .filter(|n| !n.kind.is_source())
        .map(|n| (n.position, 0))
        .collect();

    for source in network.nodes().filter(|n| n.kind.is_source()) {
        let mut dist = HashMap::from([(source.position, 0u8)]);
        let mut queue = VecDeque::from([source.position]);
        while let Some(pos) = queue.pop_front() {
            let d = dist[&pos];
            let Some(node) = network.node(pos) else {
                continue;
            };
            for &n in &node.neighbors {
                if dist.contains_key(&n) || !expected.contains_key(&n) {
                    continue;
                }
                dist.insert(n, d + 1);
                queue.push_back(n);
                let power = source.state.power.saturating_sub(d + 1);
                let best = expected.entry(n).or_default();
                *best = (*best).max(power);
            }
        }
    }
    expected
}

fn apply_edits(ops: &[EditOp]) -> RedstoneSystem {
    let mut rs = RedstoneSystem::new();
    for op in ops {
        match *op {
            EditOp::Add(pos, lever) => {
                let kind = if lever {
                    ComponentKind::Lever
                } else {
                    ComponentKind::RedstoneDust
                };
                let id = rs.add_component(pos, kind);
                if lever {
                    rs.toggle_component(pos);
                } else {
                    rs.update_network(id);
                }
            }
            EditOp::Remove(pos) => {
                for id in rs.remove_component(pos) {
                    rs.update_network(id);
                }
            }
        }
    }
    rs
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Along a straight line from a powered lever, power is 15 minus distance.
    #[test]
    fn attenuation_along_line(len in 1..30i32) {
        let mut rs = RedstoneSystem::new();
        rs.add_component(BlockPos::new(0, 0, 0), ComponentKind::Lever);
        for x in 1..=len {
            rs.add_component(BlockPos::new(x, 0, 0), ComponentKind::RedstoneDust);
        }
        rs.toggle_component(BlockPos::new(0, 0, 0));

        for x in 1..=len {
            let power = rs.get_component_state(BlockPos::new(x, 0, 0)).unwrap().power;
            prop_assert_eq!(i32::from(power), (15 - x).max(0));
        }
    }

    /// On any topology, a node's power is the strongest source minus its
    /// hop distance, and 0 when no powered source reaches it.
    #[test]
    fn power_is_best_source_minus_distance(ops in arb_edits(40)) {
        let rs = apply_edits(&ops);
        for (_, network) in rs.networks() {
            for (pos, power) in expected_power(network) {
                prop_assert_eq!(
                    rs.get_component_state(pos).unwrap().power,
                    power,
                    "power at {}",
                    pos
                );
            }
        }
    }

    /// Re-running propagation changes nothing.
    #[test]
    fn propagation_is_idempotent(ops in arb_edits(40)) {
        let mut rs = apply_edits(&ops);
        let before = rs.get_all_networks();
        let ids: Vec<_> = rs.networks().map(|(id, _)| id).collect();
        for id in ids {
            rs.update_network(id);
        }
        prop_assert_eq!(rs.get_all_networks(), before);
    }

    /// After any sequence of edits every network is connected, no two
    /// networks touch, and membership covers exactly the placed components.
    #[test]
    fn networks_stay_maximal_and_connected(ops in arb_edits(40)) {
        let rs = apply_edits(&ops);
        let mut total = 0;

        for (id, network) in rs.networks() {
            prop_assert!(!network.is_empty());
            total += network.len();

            let positions: HashSet<BlockPos> = network.nodes().map(|n| n.position).collect();
            let start = *positions.iter().next().unwrap();
            let mut seen = HashSet::from([start]);
            let mut stack = vec![start];
            while let Some(pos) = stack.pop() {
                for n in pos.neighbors() {
                    if positions.contains(&n) && seen.insert(n) {
                        stack.push(n);
                    }
                    if let Some(other) = rs.network_of(n) {
                        prop_assert_eq!(other, id);
                    }
                }
            }
            prop_assert_eq!(seen.len(), positions.len());
        }
        prop_assert_eq!(total, rs.component_count());
    }

    /// Chains within the limit succeed when there is room; longer ones fail.
    #[test]
    fn push_limit(n in 0..=16usize) {
        let mut world = MemoryWorld::new();
        for i in 0..n {
            let pos = BlockPos::new(0, 0, i as i32 + 1);
            world.add_block(BlockKind::Terrain(TerrainBlock::Stone), pos);
        }
        let result = calculate_push_chain(
            BlockPos::new(0, 0, 0),
            Direction::South,
            PISTON_PUSH_LIMIT,
            false,
            &|pos| world.get_block(pos),
        );
        prop_assert_eq!(result.success, n <= PISTON_PUSH_LIMIT);
        if result.success {
            prop_assert_eq!(result.pushed_blocks.len(), n);
        } else {
            prop_assert!(result.pushed_blocks.is_empty());
        }
    }

    /// Applying moves farthest first shifts the chain by one with nothing lost.
    #[test]
    fn push_shifts_chain_without_loss(chain in proptest::collection::vec(arb_pushable(), 0..=12)) {
        let origin = BlockPos::new(0, 64, 0);
        let mut world = MemoryWorld::new();
        for (i, &kind) in chain.iter().enumerate() {
            world.add_block(kind, origin.offset_by(Direction::East, i as i32 + 1));
        }

        let result = execute_piston_push(origin, Direction::East, false, true, &mut world);
        prop_assert!(result.success);
        prop_assert_eq!(world.len(), chain.len());
        prop_assert_eq!(world.get_block(origin.offset(Direction::East)), None);
        for (i, &kind) in chain.iter().enumerate() {
            prop_assert_eq!(
                world.get_block(origin.offset_by(Direction::East, i as i32 + 2)),
                Some(kind)
            );
        }
    }
}
