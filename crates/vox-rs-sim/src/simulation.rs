//! The headless simulation: one engine, one in-memory world, one scenario.

use tracing::{debug, info};
use vox_rs_world::{BlockStore, ComponentKind, MemoryWorld, RedstoneEngine, RedstoneSystem};

use crate::error::SimError;
use crate::scenario::Scenario;

pub struct Simulation {
    engine: RedstoneEngine,
    world: MemoryWorld,
    scenario: Scenario,
    current_tick: u64,
}

impl Simulation {
    /// Lay out the scenario's terrain and components.
    pub fn new(scenario: Scenario) -> Self {
        let mut world = MemoryWorld::new();
        let mut engine = RedstoneEngine::new();
        scenario.place_blocks(&mut world);
        scenario.place_components(&mut engine, &mut world);
        Self {
            engine,
            world,
            scenario,
            current_tick: 0,
        }
    }

    /// Lay out the scenario's terrain, but restore components from a
    /// network snapshot instead of placing them.
    pub fn from_snapshot(scenario: Scenario, json: &str) -> Result<Self, SimError> {
        let mut system = RedstoneSystem::new();
        system.from_json(json)?;

        let mut world = MemoryWorld::new();
        scenario.place_blocks(&mut world);
        for node in system.components() {
            world.add_block(node.kind.into(), node.position);
        }

        Ok(Self {
            engine: RedstoneEngine::from_system(system),
            world,
            scenario,
            current_tick: 0,
        })
    }

    pub fn engine(&self) -> &RedstoneEngine {
        &self.engine
    }

    pub fn world(&self) -> &MemoryWorld {
        &self.world
    }

    pub fn current_tick(&self) -> u64 {
        self.current_tick
    }

    /// Whether every scheduled action has run and no update is pending.
    pub fn is_idle(&self) -> bool {
        let actions_done = self
            .scenario
            .last_tick()
            .is_none_or(|last| self.current_tick > last);
        actions_done && self.engine.redstone().scheduler().is_empty()
    }

    /// Run the actions due this tick, then advance the engine by one tick.
    pub fn step(&mut self) {
        let actions: Vec<_> = self.scenario.actions_at(self.current_tick).cloned().collect();
        for action in &actions {
            debug!("Tick {}: {action:?}", self.current_tick);
            action.apply(&mut self.engine, &mut self.world);
        }
        self.engine.tick(1, &mut self.world);
        self.current_tick += 1;
    }

    /// Log every component's state, ordered by position.
    pub fn report(&self) {
        let mut nodes: Vec<_> = self.engine.redstone().components().collect();
        nodes.sort_by_key(|n| n.position);
        info!(
            "Tick {}: {} component(s) in {} network(s), {} block(s)",
            self.current_tick,
            nodes.len(),
            self.engine.redstone().network_count(),
            self.world.len()
        );
        for node in nodes {
            let s = node.state;
            info!(
                "  {} at {}: power={} powered={} lit={} extended={}",
                node.kind.properties().display_name,
                node.position,
                s.power,
                s.is_powered,
                s.is_lit,
                s.extended
            );
            if node.kind == ComponentKind::RedstoneDust {
                let links = self
                    .engine
                    .redstone()
                    .dust_connections(node.position)
                    .unwrap_or_default();
                debug!("    connects {links:?}");
            }
        }
    }

    pub fn snapshot_json(&self) -> Result<String, SimError> {
        Ok(self.engine.redstone().to_json()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vox_rs_world::{BlockKind, BlockPos, TerrainBlock};

    fn p(x: i32, y: i32, z: i32) -> BlockPos {
        BlockPos::new(x, y, z)
    }

    const LAMP_CIRCUIT: &str = r#"
        [[components]]
        pos = [0, 0, 0]
        kind = "lever"

        [[components]]
        pos = [1, 0, 0]
        kind = "redstone_dust"

        [[components]]
        pos = [2, 0, 0]
        kind = "redstone_dust"

        [[components]]
        pos = [3, 0, 0]
        kind = "redstone_dust"

        [[components]]
        pos = [4, 0, 0]
        kind = "redstone_lamp"

        [[actions]]
        tick = 2
        action = "toggle"
        pos = [0, 0, 0]

        [[actions]]
        tick = 5
        action = "toggle"
        pos = [0, 0, 0]
    "#;

    #[test]
    fn lamp_follows_lever_timeline() {
        let mut sim = Simulation::new(Scenario::parse(LAMP_CIRCUIT).unwrap());
        let lamp = |sim: &Simulation| {
            sim.engine()
                .redstone()
                .get_component_state(p(4, 0, 0))
                .unwrap()
        };

        sim.step(); // tick 0
        sim.step(); // tick 1
        assert!(!lamp(&sim).is_lit);
        sim.step(); // tick 2: lever on
        assert!(lamp(&sim).is_lit);
        assert_eq!(
            sim.engine().redstone().get_component_state(p(3, 0, 0)).unwrap().power,
            12
        );
        assert!(!sim.is_idle());

        for _ in 3..=5 {
            sim.step();
        }
        assert!(!lamp(&sim).is_lit);
        assert!(sim.is_idle());
        assert_eq!(sim.current_tick(), 6);
    }

    #[test]
    fn piston_scenario_moves_terrain() {
        let scenario = Scenario::parse(
            r#"
            [[blocks]]
            pos = [2, 0, 0]
            kind = "cobblestone"

            [[components]]
            pos = [0, 0, 0]
            kind = "lever"

            [[components]]
            pos = [1, 0, 0]
            kind = "sticky_piston"
            facing = "east"

            [[actions]]
            tick = 0
            action = "toggle"
            pos = [0, 0, 0]
            "#,
        )
        .unwrap();
        let mut sim = Simulation::new(scenario);
        sim.step();
        assert_eq!(
            sim.world().get_block(p(3, 0, 0)),
            Some(BlockKind::Terrain(TerrainBlock::Cobblestone))
        );
        assert!(sim
            .engine()
            .redstone()
            .get_component_state(p(1, 0, 0))
            .unwrap()
            .extended);
    }

    #[test]
    fn snapshot_restores_components() {
        let mut sim = Simulation::new(Scenario::parse(LAMP_CIRCUIT).unwrap());
        for _ in 0..3 {
            sim.step();
        }
        let json = sim.snapshot_json().unwrap();

        let restored = Simulation::from_snapshot(Scenario::default(), &json).unwrap();
        assert_eq!(restored.world().len(), 5);
        assert!(restored
            .engine()
            .redstone()
            .get_component_state(p(4, 0, 0))
            .unwrap()
            .is_lit);
    }

    #[test]
    fn bad_snapshot_is_world_error() {
        let result = Simulation::from_snapshot(Scenario::default(), "[]]");
        assert!(matches!(result, Err(SimError::World(_))));
    }
}
