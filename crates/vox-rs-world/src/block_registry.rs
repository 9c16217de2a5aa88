//! Block and redstone component kinds with their fixed classification.
//!
//! Every kind is a closed enum so classification is total. Pistons consult
//! [`classify`] when walking a push chain; the redstone network consults
//! [`ComponentKind::is_source`] and [`initial_state`] when nodes are created.

use serde::{Deserialize, Serialize};

use crate::position::Direction;

/// Maximum redstone signal strength.
pub const MAX_POWER: u8 = 15;

/// Repeater delay bounds, in redstone ticks.
pub const MIN_REPEATER_DELAY: u8 = 1;
pub const MAX_REPEATER_DELAY: u8 = 4;

/// Plain terrain blocks a piston may run into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerrainBlock {
    Grass,
    Dirt,
    Stone,
    Sand,
    Gravel,
    Cobblestone,
    Planks,
    Wood,
    Wool,
    Glass,
    Ice,
    PackedIce,
    Leaves,
    OakSapling,
    BirchSapling,
    SpruceSapling,
    Obsidian,
    Bedrock,
    EnderChest,
    EnchantingTable,
    Furnace,
    FurnaceLit,
    CraftingTable,
    Chest,
    Water,
    Glowstone,
    HayBlock,
}

/// Redstone components tracked by the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    RedstoneDust,
    RedstoneTorch,
    RedstoneBlock,
    RedstoneRepeater,
    RedstoneComparator,
    RedstoneLamp,
    Piston,
    StickyPiston,
    Dispenser,
    Dropper,
    Observer,
    Lever,
    StoneButton,
    WoodenButton,
    StonePressurePlate,
    WoodenPressurePlate,
    HeavyWeightedPressurePlate,
    LightWeightedPressurePlate,
    TripwireHook,
    NoteBlock,
    Tnt,
    IronDoor,
    WoodenDoor,
    IronTrapdoor,
    WoodenTrapdoor,
    FenceGate,
    Hopper,
    DaylightDetector,
    TrappedChest,
    Target,
}

/// Anything that can occupy a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockKind {
    Terrain(TerrainBlock),
    Component(ComponentKind),
}

impl From<TerrainBlock> for BlockKind {
    fn from(block: TerrainBlock) -> Self {
        BlockKind::Terrain(block)
    }
}

impl From<ComponentKind> for BlockKind {
    fn from(kind: ComponentKind) -> Self {
        BlockKind::Component(kind)
    }
}

impl BlockKind {
    pub fn is_component(self) -> bool {
        matches!(self, BlockKind::Component(_))
    }

    pub fn as_component(self) -> Option<ComponentKind> {
        match self {
            BlockKind::Component(kind) => Some(kind),
            BlockKind::Terrain(_) => None,
        }
    }
}

/// Fixed behaviour flags for a block kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Classification {
    /// Emits power without external input.
    pub is_source: bool,
    /// Reacts to received power (lamps, pistons, doors...).
    pub is_consumer: bool,
    /// Moved along by a piston. Sticky pistons pull any pushable block.
    pub is_pushable: bool,
    /// Broken when a piston pushes into it; ends the chain. Takes
    /// precedence over `is_pushable` on a push.
    pub is_destructible: bool,
    /// Blocks any push that reaches it.
    pub is_immovable: bool,
}

/// Classify any block kind. Pure and total.
pub fn classify(kind: BlockKind) -> Classification {
    match kind {
        BlockKind::Terrain(block) => block.classification(),
        BlockKind::Component(kind) => kind.classification(),
    }
}

impl TerrainBlock {
    pub fn classification(self) -> Classification {
        use TerrainBlock::*;
        match self {
            Grass | Dirt | Stone | Sand | Gravel | Cobblestone | Planks | Wood | Wool | Glass
            | Ice | PackedIce => Classification {
                is_pushable: true,
                ..Classification::default()
            },
            Leaves | OakSapling | BirchSapling | SpruceSapling => Classification {
                is_destructible: true,
                ..Classification::default()
            },
            Obsidian | Bedrock | EnderChest | EnchantingTable | Furnace | FurnaceLit
            | CraftingTable | Chest => Classification {
                is_immovable: true,
                ..Classification::default()
            },
            Water | Glowstone | HayBlock => Classification::default(),
        }
    }
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 30] = [
        ComponentKind::RedstoneDust,
        ComponentKind::RedstoneTorch,
        ComponentKind::RedstoneBlock,
        ComponentKind::RedstoneRepeater,
        ComponentKind::RedstoneComparator,
        ComponentKind::RedstoneLamp,
        ComponentKind::Piston,
        ComponentKind::StickyPiston,
        ComponentKind::Dispenser,
        ComponentKind::Dropper,
        ComponentKind::Observer,
        ComponentKind::Lever,
        ComponentKind::StoneButton,
        ComponentKind::WoodenButton,
        ComponentKind::StonePressurePlate,
        ComponentKind::WoodenPressurePlate,
        ComponentKind::HeavyWeightedPressurePlate,
        ComponentKind::LightWeightedPressurePlate,
        ComponentKind::TripwireHook,
        ComponentKind::NoteBlock,
        ComponentKind::Tnt,
        ComponentKind::IronDoor,
        ComponentKind::WoodenDoor,
        ComponentKind::IronTrapdoor,
        ComponentKind::WoodenTrapdoor,
        ComponentKind::FenceGate,
        ComponentKind::Hopper,
        ComponentKind::DaylightDetector,
        ComponentKind::TrappedChest,
        ComponentKind::Target,
    ];

    pub fn classification(self) -> Classification {
        use ComponentKind::*;
        let is_source = self.is_source();
        let is_consumer = self.is_consumer();
        match self {
            RedstoneDust | RedstoneTorch => Classification {
                is_source,
                is_consumer,
                is_pushable: true,
                is_destructible: true,
                ..Classification::default()
            },
            RedstoneBlock | Piston | StickyPiston => Classification {
                is_source,
                is_consumer,
                is_pushable: true,
                ..Classification::default()
            },
            _ => Classification {
                is_source,
                is_consumer,
                ..Classification::default()
            },
        }
    }

    /// Torches, redstone blocks, levers, buttons and pressure plates.
    pub fn is_source(self) -> bool {
        use ComponentKind::*;
        matches!(
            self,
            RedstoneTorch
                | RedstoneBlock
                | Lever
                | StoneButton
                | WoodenButton
                | StonePressurePlate
                | WoodenPressurePlate
                | HeavyWeightedPressurePlate
                | LightWeightedPressurePlate
        )
    }

    pub fn is_consumer(self) -> bool {
        use ComponentKind::*;
        matches!(
            self,
            RedstoneLamp
                | Piston
                | StickyPiston
                | Dispenser
                | Dropper
                | NoteBlock
                | Tnt
                | IronDoor
                | WoodenDoor
                | IronTrapdoor
                | WoodenTrapdoor
                | FenceGate
                | Hopper
        )
    }

    /// Levers and buttons: the kinds a player can flip directly.
    pub fn is_toggleable(self) -> bool {
        matches!(
            self,
            ComponentKind::Lever | ComponentKind::StoneButton | ComponentKind::WoodenButton
        )
    }

    pub fn is_piston(self) -> bool {
        matches!(self, ComponentKind::Piston | ComponentKind::StickyPiston)
    }

    /// Stable string id, identical to the serde name.
    pub fn name(self) -> &'static str {
        self.properties().id
    }

    pub fn from_name(name: &str) -> Option<ComponentKind> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn properties(self) -> &'static ComponentProperties {
        // COMPONENT_DATA is declared in ALL order.
        &COMPONENT_DATA[self as usize]
    }
}

/// Mutable per-node redstone state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ComponentState {
    /// Signal strength, 0..=15.
    pub power: u8,
    pub is_powered: bool,
    /// Torches are lit while not powered from below; lamps while powered.
    pub is_lit: bool,
    pub facing: Direction,
    /// Repeater delay in redstone ticks, 1..=4. Zero for other kinds.
    pub delay: u8,
    /// Reserved for repeater locking; nothing drives it yet.
    pub locked: bool,
    pub extended: bool,
    /// Set while a delayed update is armed for this component.
    pub triggered: bool,
}

impl ComponentState {
    /// Set `power` and keep `is_powered` consistent with it.
    pub fn set_power(&mut self, power: u8) {
        self.power = power.min(MAX_POWER);
        self.is_powered = self.power > 0;
    }
}

/// Default state for a freshly placed component.
pub fn initial_state(kind: ComponentKind) -> ComponentState {
    let base = ComponentState::default();
    match kind {
        ComponentKind::RedstoneTorch => ComponentState {
            power: MAX_POWER,
            is_powered: true,
            is_lit: true,
            ..base
        },
        ComponentKind::RedstoneRepeater => ComponentState {
            delay: MIN_REPEATER_DELAY,
            ..base
        },
        _ => base,
    }
}

/// Static presentation data for a component.
#[derive(Debug, Clone)]
pub struct ComponentProperties {
    pub id: &'static str,
    pub display_name: &'static str,
}

macro_rules! component {
    ($id:expr, $display:expr) => {
        ComponentProperties {
            id: $id,
            display_name: $display,
        }
    };
}

static COMPONENT_DATA: [ComponentProperties; 30] = [
    component!("redstone_dust", "Redstone Dust"),
    component!("redstone_torch", "Redstone Torch"),
    component!("redstone_block", "Block of Redstone"),
    component!("redstone_repeater", "Redstone Repeater"),
    component!("redstone_comparator", "Redstone Comparator"),
    component!("redstone_lamp", "Redstone Lamp"),
    component!("piston", "Piston"),
    component!("sticky_piston", "Sticky Piston"),
    component!("dispenser", "Dispenser"),
    component!("dropper", "Dropper"),
    component!("observer", "Observer"),
    component!("lever", "Lever"),
    component!("stone_button", "Stone Button"),
    component!("wooden_button", "Wooden Button"),
    component!("stone_pressure_plate", "Stone Pressure Plate"),
    component!("wooden_pressure_plate", "Wooden Pressure Plate"),
    component!("heavy_weighted_pressure_plate", "Heavy Weighted Pressure Plate"),
    component!("light_weighted_pressure_plate", "Light Weighted Pressure Plate"),
    component!("tripwire_hook", "Tripwire Hook"),
    component!("note_block", "Note Block"),
    component!("tnt", "TNT"),
    component!("iron_door", "Iron Door"),
    component!("wooden_door", "Wooden Door"),
    component!("iron_trapdoor", "Iron Trapdoor"),
    component!("wooden_trapdoor", "Wooden Trapdoor"),
    component!("fence_gate", "Fence Gate"),
    component!("hopper", "Hopper"),
    component!("daylight_detector", "Daylight Detector"),
    component!("trapped_chest", "Trapped Chest"),
    component!("target", "Target"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_table_matches_enum_order() {
        for kind in ComponentKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.name()), "{kind:?}");
            assert_eq!(ComponentKind::from_name(kind.name()), Some(kind));
            assert!(!kind.properties().display_name.is_empty());
        }
    }

    #[test]
    fn sources() {
        assert!(ComponentKind::RedstoneTorch.is_source());
        assert!(ComponentKind::Lever.is_source());
        assert!(ComponentKind::HeavyWeightedPressurePlate.is_source());
        assert!(!ComponentKind::RedstoneDust.is_source());
        assert!(!ComponentKind::RedstoneRepeater.is_source());
        assert!(!ComponentKind::RedstoneLamp.is_source());
    }

    #[test]
    fn immovable_excludes_other_movement() {
        for kind in ComponentKind::ALL {
            let c = kind.classification();
            if c.is_immovable {
                assert!(!c.is_pushable && !c.is_destructible, "{kind:?}");
            }
            if c.is_destructible {
                assert!(c.is_pushable, "{kind:?}");
            }
        }
    }

    #[test]
    fn terrain_classes() {
        assert!(classify(TerrainBlock::Stone.into()).is_pushable);
        assert!(classify(TerrainBlock::Leaves.into()).is_destructible);
        assert!(classify(TerrainBlock::Obsidian.into()).is_immovable);
        assert!(classify(TerrainBlock::Chest.into()).is_immovable);
        assert_eq!(classify(TerrainBlock::Water.into()), Classification::default());
    }

    #[test]
    fn dust_and_torch_break_when_pushed() {
        let dust = classify(ComponentKind::RedstoneDust.into());
        assert!(dust.is_destructible);
        assert!(dust.is_pushable);
        let torch = classify(ComponentKind::RedstoneTorch.into());
        assert!(torch.is_destructible && torch.is_pushable);
        assert!(classify(ComponentKind::StickyPiston.into()).is_pushable);
    }

    #[test]
    fn initial_states() {
        let torch = initial_state(ComponentKind::RedstoneTorch);
        assert_eq!(torch.power, MAX_POWER);
        assert!(torch.is_powered && torch.is_lit);

        let repeater = initial_state(ComponentKind::RedstoneRepeater);
        assert_eq!(repeater.delay, 1);
        assert_eq!(repeater.power, 0);

        let lever = initial_state(ComponentKind::Lever);
        assert_eq!(lever, ComponentState::default());
        assert_eq!(lever.facing, Direction::North);
    }

    #[test]
    fn set_power_clamps() {
        let mut state = ComponentState::default();
        state.set_power(40);
        assert_eq!(state.power, MAX_POWER);
        assert!(state.is_powered);
        state.set_power(0);
        assert!(!state.is_powered);
    }

    #[test]
    fn block_kind_serde_untagged() {
        let stone: BlockKind = serde_json::from_str("\"stone\"").unwrap();
        assert_eq!(stone, BlockKind::Terrain(TerrainBlock::Stone));
        let lever: BlockKind = serde_json::from_str("\"lever\"").unwrap();
        assert_eq!(lever, BlockKind::Component(ComponentKind::Lever));
        assert!(serde_json::from_str::<BlockKind>("\"unobtainium\"").is_err());
    }
}
