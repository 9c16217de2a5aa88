//! Scenario files: the initial world plus a timeline of actions.
//!
//! ```toml
//! [[blocks]]
//! pos = [2, 0, 0]
//! kind = "stone"
//!
//! [[components]]
//! pos = [0, 0, 0]
//! kind = "lever"
//!
//! [[actions]]
//! tick = 5
//! action = "toggle"
//! pos = [0, 0, 0]
//! ```

use std::path::Path;

use serde::Deserialize;
use tracing::warn;
use vox_rs_world::{
    BlockKind, BlockPos, BlockStore, ComponentKind, Direction, RedstoneEngine, TerrainBlock,
};

use crate::error::SimError;

#[derive(Debug, Default, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub blocks: Vec<BlockSpec>,
    #[serde(default)]
    pub components: Vec<ComponentSpec>,
    #[serde(default)]
    pub actions: Vec<TimedAction>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockSpec {
    pub pos: BlockPos,
    pub kind: TerrainBlock,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComponentSpec {
    pub pos: BlockPos,
    pub kind: ComponentKind,
    #[serde(default)]
    pub facing: Direction,
    /// Repeater delay in ticks.
    #[serde(default)]
    pub delay: Option<u8>,
    /// Initial output for sources that are not toggled (redstone blocks,
    /// pressure plates, daylight detectors).
    #[serde(default)]
    pub power: Option<u8>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimedAction {
    pub tick: u64,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Toggle {
        pos: BlockPos,
    },
    SetPower {
        pos: BlockPos,
        power: u8,
    },
    SetDelay {
        pos: BlockPos,
        delay: u8,
    },
    /// Arm a repeater (or any component) as if its input changed.
    Notify {
        pos: BlockPos,
    },
    Place {
        pos: BlockPos,
        kind: ComponentKind,
        #[serde(default)]
        facing: Direction,
    },
    Break {
        pos: BlockPos,
    },
    PutBlock {
        pos: BlockPos,
        kind: TerrainBlock,
    },
    RemoveBlock {
        pos: BlockPos,
    },
}

impl Scenario {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SimError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| SimError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, SimError> {
        let mut scenario: Self = toml::from_str(contents)?;
        // Stable sort keeps file order for actions on the same tick.
        scenario.actions.sort_by_key(|a| a.tick);
        Ok(scenario)
    }

    /// Write terrain into `store`.
    pub fn place_blocks(&self, store: &mut impl BlockStore) {
        for block in &self.blocks {
            store.add_block(BlockKind::Terrain(block.kind), block.pos);
        }
    }

    /// Place every component, then apply configured delays and powers.
    pub fn place_components(&self, engine: &mut RedstoneEngine, store: &mut impl BlockStore) {
        for spec in &self.components {
            engine.place_component(spec.pos, spec.kind, spec.facing, store);
        }
        for spec in &self.components {
            if let Some(delay) = spec.delay {
                engine.redstone_mut().set_repeater_delay(spec.pos, delay);
            }
            if let Some(power) = spec.power {
                engine.set_source_power(spec.pos, power, store);
            }
        }
    }

    /// Actions scheduled for exactly `tick`, in file order.
    pub fn actions_at(&self, tick: u64) -> impl Iterator<Item = &Action> {
        self.actions
            .iter()
            .filter(move |a| a.tick == tick)
            .map(|a| &a.action)
    }

    /// Tick of the last scheduled action, if any.
    pub fn last_tick(&self) -> Option<u64> {
        self.actions.last().map(|a| a.tick)
    }
}

impl Action {
    /// Apply to the engine. Returns `false` when the target does not accept
    /// the action (unknown position, wrong kind).
    pub fn apply(&self, engine: &mut RedstoneEngine, store: &mut impl BlockStore) -> bool {
        let applied = match *self {
            Action::Toggle { pos } => engine.toggle(pos, store),
            Action::SetPower { pos, power } => engine.set_source_power(pos, power, store),
            Action::SetDelay { pos, delay } => engine.redstone_mut().set_repeater_delay(pos, delay),
            Action::Notify { pos } => engine.redstone_mut().notify_input_changed(pos),
            Action::Place { pos, kind, facing } => {
                engine.place_component(pos, kind, facing, store);
                true
            }
            Action::Break { pos } => engine.break_component(pos, store),
            Action::PutBlock { pos, kind } => {
                store.add_block(BlockKind::Terrain(kind), pos);
                true
            }
            Action::RemoveBlock { pos } => {
                store.remove_block(pos);
                true
            }
        };
        if !applied {
            warn!("Action {self:?} had no effect");
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vox_rs_world::MemoryWorld;

    const CIRCUIT: &str = r#"
        [[blocks]]
        pos = [5, 0, 0]
        kind = "stone"

        [[components]]
        pos = [0, 0, 0]
        kind = "lever"

        [[components]]
        pos = [1, 0, 0]
        kind = "redstone_dust"

        [[components]]
        pos = [2, 0, 0]
        kind = "redstone_repeater"
        facing = "east"
        delay = 3

        [[actions]]
        tick = 4
        action = "toggle"
        pos = [0, 0, 0]

        [[actions]]
        tick = 1
        action = "place"
        pos = [3, 0, 0]
        kind = "redstone_lamp"

        [[actions]]
        tick = 4
        action = "set_delay"
        pos = [2, 0, 0]
        delay = 2
    "#;

    #[test]
    fn parse_scenario() {
        let scenario = Scenario::parse(CIRCUIT).unwrap();
        assert_eq!(scenario.blocks.len(), 1);
        assert_eq!(scenario.blocks[0].kind, TerrainBlock::Stone);
        assert_eq!(scenario.components.len(), 3);
        assert_eq!(scenario.components[0].facing, Direction::North);
        assert_eq!(scenario.components[2].delay, Some(3));

        // Sorted by tick, file order within a tick
        let ticks: Vec<u64> = scenario.actions.iter().map(|a| a.tick).collect();
        assert_eq!(ticks, vec![1, 4, 4]);
        let at_four: Vec<&Action> = scenario.actions_at(4).collect();
        assert_eq!(at_four[0], &Action::Toggle { pos: BlockPos::new(0, 0, 0) });
        assert_eq!(scenario.last_tick(), Some(4));
    }

    #[test]
    fn place_into_engine() {
        let scenario = Scenario::parse(CIRCUIT).unwrap();
        let mut world = MemoryWorld::new();
        let mut engine = RedstoneEngine::new();
        scenario.place_blocks(&mut world);
        scenario.place_components(&mut engine, &mut world);

        assert_eq!(world.len(), 4);
        let repeater = engine
            .redstone()
            .get_component_state(BlockPos::new(2, 0, 0))
            .unwrap();
        assert_eq!(repeater.delay, 3);
        assert_eq!(repeater.facing, Direction::East);
    }

    #[test]
    fn apply_actions() {
        let scenario = Scenario::parse(CIRCUIT).unwrap();
        let mut world = MemoryWorld::new();
        let mut engine = RedstoneEngine::new();
        scenario.place_components(&mut engine, &mut world);

        assert!(Action::Toggle { pos: BlockPos::new(0, 0, 0) }.apply(&mut engine, &mut world));
        assert_eq!(
            engine
                .redstone()
                .get_component_state(BlockPos::new(1, 0, 0))
                .unwrap()
                .power,
            14
        );
        assert!(!Action::Toggle { pos: BlockPos::new(1, 0, 0) }.apply(&mut engine, &mut world));
        assert!(!Action::Break { pos: BlockPos::new(9, 9, 9) }.apply(&mut engine, &mut world));
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = Scenario::parse(
            r#"
            [[components]]
            pos = [0, 0, 0]
            kind = "flux_capacitor"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, SimError::Toml(_)));
    }
}
