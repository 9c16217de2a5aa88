//! Integer block positions and the six lattice directions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An integer block coordinate. Two positions are equal iff all three
/// coordinates match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The adjacent cell in `dir`.
    pub fn offset(self, dir: Direction) -> Self {
        self.offset_by(dir, 1)
    }

    /// The cell `distance` steps away along `dir`.
    pub fn offset_by(self, dir: Direction, distance: i32) -> Self {
        let (dx, dy, dz) = dir.delta();
        Self {
            x: self.x + dx * distance,
            y: self.y + dy * distance,
            z: self.z + dz * distance,
        }
    }

    /// All 6 lattice neighbours, in [`Direction::ALL`] order.
    pub fn neighbors(self) -> [BlockPos; 6] {
        Direction::ALL.map(|dir| self.offset(dir))
    }
}

impl From<[i32; 3]> for BlockPos {
    fn from([x, y, z]: [i32; 3]) -> Self {
        Self { x, y, z }
    }
}

impl From<(i32, i32, i32)> for BlockPos {
    fn from((x, y, z): (i32, i32, i32)) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.x, self.y, self.z)
    }
}

/// One of the six axis directions a component can face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    North,
    South,
    East,
    West,
    Up,
    Down,
}

impl Direction {
    /// Neighbour iteration order: east, west, south, north, up, down.
    pub const ALL: [Direction; 6] = [
        Direction::East,
        Direction::West,
        Direction::South,
        Direction::North,
        Direction::Up,
        Direction::Down,
    ];

    /// Unit offset `(dx, dy, dz)`. North is -z, south is +z.
    pub fn delta(self) -> (i32, i32, i32) {
        match self {
            Direction::North => (0, 0, -1),
            Direction::South => (0, 0, 1),
            Direction::East => (1, 0, 0),
            Direction::West => (-1, 0, 0),
            Direction::Up => (0, 1, 0),
            Direction::Down => (0, -1, 0),
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }
}
