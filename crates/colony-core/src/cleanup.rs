use crate::context::BuildingsGrid;
use crate::geometry::TilePosition;
use crate::material::MapObjectKind;
use serde::{Deserialize, Serialize};

/// Map objects (pig and donkey pens, crops ...) a building's worker left on
/// the map, removed when the building goes away.
///
/// Kept as a small vector: a building accumulates a few dozen entries at
/// most, and insertion order keeps removal deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupRegistry {
    entries: Vec<(TilePosition, MapObjectKind)>,
}

impl CleanupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a cleanup. Returns false if the pair was already registered.
    pub fn add(&mut self, pos: TilePosition, kind: MapObjectKind) -> bool {
        if self.entries.iter().any(|&(p, k)| p == pos && k == kind) {
            return false;
        }
        self.entries.push((pos, kind));
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(TilePosition, MapObjectKind)> {
        self.entries.iter()
    }

    /// Issue one removal per entry and empty the registry.
    pub fn run(&mut self, grid: &mut dyn BuildingsGrid) -> usize {
        let count = self.entries.len();
        for (pos, kind) in self.entries.drain(..) {
            grid.remove_map_object_type(pos, kind);
        }
        count
    }
}
