//! Tile positions and the six grid directions.
//!
//! The map is a sheared hexagonal tile grid: every tile has six neighbours,
//! reached by the offsets of [`Direction`]. Directions are ordered clockwise,
//! so rotating right is a step forward in that order.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// TilePosition
// ---------------------------------------------------------------------------

/// A position on the tile grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TilePosition {
    pub x: i32,
    pub y: i32,
}

impl TilePosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The position `steps` tiles away along `(dx, dy)`, or `None` if it
    /// falls outside the coordinate range.
    pub fn offset_by(self, dx: i32, dy: i32, steps: i32) -> Option<Self> {
        Some(Self {
            x: self.x.checked_add(steps.checked_mul(dx)?)?,
            y: self.y.checked_add(steps.checked_mul(dy)?)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// The six neighbour directions of the tile grid, in clockwise order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    NorthEast,
    East,
    SouthEast,
    SouthWest,
    West,
    NorthWest,
}

impl Direction {
    /// All six directions, clockwise starting at north-east.
    pub fn all() -> [Direction; 6] {
        [
            Direction::NorthEast,
            Direction::East,
            Direction::SouthEast,
            Direction::SouthWest,
            Direction::West,
            Direction::NorthWest,
        ]
    }

    /// Tile offset for this direction.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::NorthEast => (0, -1),
            Direction::East => (1, 0),
            Direction::SouthEast => (1, 1),
            Direction::SouthWest => (0, 1),
            Direction::West => (-1, 0),
            Direction::NorthWest => (-1, -1),
        }
    }

    /// The direction whose offset is exactly `(dx, dy)`, if any.
    pub fn from_offset(dx: i32, dy: i32) -> Option<Direction> {
        Self::all().into_iter().find(|d| d.offset() == (dx, dy))
    }

    fn index(self) -> usize {
        self as usize
    }

    /// Rotate clockwise by `steps` sixths of a turn.
    pub fn rotate_right(self, steps: usize) -> Direction {
        Self::all()[(self.index() + steps) % 6]
    }
}
