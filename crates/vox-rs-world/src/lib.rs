//! Redstone simulation: component networks, signal propagation, pistons.

pub mod block_registry;
pub mod block_tick;
pub mod engine;
pub mod error;
pub mod persistence;
pub mod piston;
pub mod position;
pub mod redstone;
pub mod spatial;

pub use block_registry::{BlockKind, ComponentKind, ComponentState, TerrainBlock};
pub use engine::RedstoneEngine;
pub use error::WorldError;
pub use position::{BlockPos, Direction};
pub use redstone::{NetworkId, RedstoneSystem};
pub use spatial::{BlockStore, MemoryWorld};
