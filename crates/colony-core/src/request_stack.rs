//! Per-material input buffers of a worker building.
//!
//! A building holds at most one [`RequestStack`] per material kind. The set is
//! built from the template's stack layout when a worker occupies the building
//! and torn down when the worker leaves; stack identity does not survive an
//! occupancy cycle.

use crate::context::BuildingsGrid;
use crate::geometry::TilePosition;
use crate::id::BuildingId;
use crate::material::MaterialKind;
use crate::registry::StackDef;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RequestStack
// ---------------------------------------------------------------------------

/// A single material buffer placed on a tile next to its building.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestStack {
    pub material: MaterialKind,
    pub position: TilePosition,
    /// Handle of the owning building; never a strong reference.
    pub building: BuildingId,
    count: u32,
    capacity: u32,
}

impl RequestStack {
    pub fn new(material: MaterialKind, position: TilePosition, building: BuildingId, capacity: u32) -> Self {
        Self {
            material,
            position,
            building,
            count: 0,
            capacity,
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn has_material(&self) -> bool {
        self.count > 0
    }

    /// Units still requested before the stack is full.
    pub fn still_needed(&self) -> u32 {
        self.capacity.saturating_sub(self.count)
    }

    /// Accept delivered units. Returns the amount that didn't fit.
    #[must_use = "overflow count indicates units that did not fit"]
    pub fn deliver(&mut self, quantity: u32) -> u32 {
        let to_add = quantity.min(self.still_needed());
        self.count += to_add;
        quantity - to_add
    }

    #[cfg(test)]
    pub(crate) fn force_count(&mut self, count: u32) {
        self.count = count;
    }

    /// Take one unit. Returns false if the stack is empty.
    pub fn pop(&mut self) -> bool {
        if self.count == 0 {
            return false;
        }
        self.count -= 1;
        true
    }
}

// ---------------------------------------------------------------------------
// RequestStacks
// ---------------------------------------------------------------------------

/// The set of request stacks of one building, in template order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestStacks {
    stacks: Vec<RequestStack>,
}

impl RequestStacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a fresh set from a template layout. A material listed twice is
    /// skipped after its first stack so no kind is ever claimed twice.
    pub fn from_layout(layout: &[StackDef], building: BuildingId, origin: TilePosition) -> Self {
        let mut stacks: Vec<RequestStack> = Vec::with_capacity(layout.len());
        for def in layout {
            if stacks.iter().any(|s| s.material == def.material) {
                tracing::warn!(?building, material = ?def.material, "duplicate request stack skipped");
                continue;
            }
            let (dx, dy) = def.offset;
            let Some(position) = origin.offset_by(dx, dy, 1) else {
                tracing::warn!(?building, material = ?def.material, "request stack off the map skipped");
                continue;
            };
            stacks.push(RequestStack::new(def.material, position, building, def.capacity));
        }
        Self { stacks }
    }

    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.stacks.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RequestStack> {
        self.stacks.iter()
    }

    pub fn get(&self, material: MaterialKind) -> Option<&RequestStack> {
        self.stacks.iter().find(|s| s.material == material)
    }

    pub fn get_mut(&mut self, material: MaterialKind) -> Option<&mut RequestStack> {
        self.stacks.iter_mut().find(|s| s.material == material)
    }

    /// Take one unit of `material` from the stack claiming that kind.
    ///
    /// Only the first matching stack is consulted; returns false if there is
    /// none or it is empty.
    pub fn pop_material(&mut self, material: MaterialKind) -> bool {
        match self.get_mut(material) {
            Some(stack) => stack.pop(),
            None => false,
        }
    }

    /// Position of the first stack holding `material`.
    pub fn where_is_material_available(&self, material: MaterialKind) -> Option<TilePosition> {
        self.stacks
            .iter()
            .find(|s| s.material == material && s.has_material())
            .map(|s| s.position)
    }

    /// Tear the set down, handing leftover units back to the grid.
    pub fn release(&mut self, grid: &mut dyn BuildingsGrid) {
        for stack in self.stacks.drain(..) {
            if stack.count > 0 {
                grid.drop_material(stack.position, stack.material, stack.count);
            }
        }
    }
}
