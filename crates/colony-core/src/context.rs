//! Collaborator contracts the building subsystem calls into.
//!
//! The grid, the worker registry, and the unit grid are shared simulation
//! state owned outside this crate. Buildings never hold them; every lifecycle
//! operation receives a [`Context`] bundling mutable handles to all three for
//! the duration of the call.

use crate::dock::DockPosition;
use crate::fixed::Fixed64;
use crate::geometry::{Direction, TilePosition};
use crate::id::{BuildingId, PlayerId, UnitId, WorkerId};
use crate::material::{MapObjectKind, MaterialKind, MaterialProductionSettings, MovableKind, WorkerKind};

// ---------------------------------------------------------------------------
// Collaborator traits
// ---------------------------------------------------------------------------

/// The map grid as seen by buildings.
pub trait BuildingsGrid {
    /// Ask the partition manager for a worker of `kind` for `building`. The
    /// worker arrives later through `occupy_building`.
    fn request_building_worker(&mut self, kind: WorkerKind, building: BuildingId);

    /// Register (`enabled`) or unregister a dock anchor for `player`.
    fn set_dock(&mut self, dock: DockPosition, enabled: bool, player: PlayerId);

    /// Remove a map object of `kind` at `pos`, if present.
    fn remove_map_object_type(&mut self, pos: TilePosition, kind: MapObjectKind);

    /// Production preferences of the region containing `pos`.
    fn material_production_settings_at(&self, pos: TilePosition) -> MaterialProductionSettings;

    /// Put loose material back on the ground when a stack is torn down.
    fn drop_material(&mut self, pos: TilePosition, material: MaterialKind, count: u32);

    /// Show or hide a map object (the building flag) at `pos`.
    fn set_map_object_visible(&mut self, pos: TilePosition, kind: MapObjectKind, visible: bool);
}

/// The worker registry: owns worker entities and their idle pool.
pub trait WorkerRegistry {
    /// The worker's building was destroyed; return it to the idle pool.
    fn building_destroyed(&mut self, worker: WorkerId);
}

/// The unit grid: spawns and drives movable units such as ferries.
pub trait TransportUnits {
    fn spawn(&mut self, kind: MovableKind, pos: TilePosition, player: PlayerId) -> UnitId;
    fn set_direction(&mut self, unit: UnitId, direction: Direction);
    fn increase_state_progress(&mut self, unit: UnitId, delta: Fixed64);
    fn state_progress(&self, unit: UnitId) -> Fixed64;
    fn kill(&mut self, unit: UnitId);
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Mutable handles to every collaborator, passed into each operation.
pub struct Context<'a> {
    pub grid: &'a mut dyn BuildingsGrid,
    pub workers: &'a mut dyn WorkerRegistry,
    pub units: &'a mut dyn TransportUnits,
}

impl<'a> Context<'a> {
    pub fn new(
        grid: &'a mut dyn BuildingsGrid,
        workers: &'a mut dyn WorkerRegistry,
        units: &'a mut dyn TransportUnits,
    ) -> Self {
        Self {
            grid,
            workers,
            units,
        }
    }
}
