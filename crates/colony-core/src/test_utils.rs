//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature). The mock collaborators record every call so tests
//! can assert exactly what a building asked the world to do.

use crate::building::WorkerBuilding;
use crate::context::Context;
pub use crate::context::{BuildingsGrid, TransportUnits, WorkerRegistry};
use crate::dock::DockPosition;
use crate::engine::Engine;
use crate::fixed::Fixed64;
use crate::geometry::{Direction, TilePosition};
use crate::id::*;
use crate::material::*;
use crate::registry::*;
use slotmap::SlotMap;

// ===========================================================================
// Templates and registry
// ===========================================================================

/// Plank at (-2, 1), iron at (2, 1).
pub fn stack_layout() -> Vec<StackDef> {
    vec![
        StackDef {
            material: MaterialKind::Plank,
            offset: (-2, 1),
            capacity: 8,
        },
        StackDef {
            material: MaterialKind::Iron,
            offset: (2, 1),
            capacity: 4,
        },
    ]
}

pub fn template(variant: BuildingVariant) -> BuildingTemplateDef {
    match variant {
        BuildingVariant::Producer => BuildingTemplateDef {
            name: "toolsmith".to_string(),
            worker: WorkerKind::Smith,
            variant,
            stacks: stack_layout(),
        },
        BuildingVariant::Dockyard => BuildingTemplateDef {
            name: "dockyard".to_string(),
            worker: WorkerKind::Shipwright,
            variant,
            stacks: stack_layout(),
        },
    }
}

/// Registry with `toolsmith` (type 0) and `dockyard` (type 1).
pub fn test_registry() -> Registry {
    let mut builder = RegistryBuilder::new();
    for variant in [BuildingVariant::Producer, BuildingVariant::Dockyard] {
        let def = template(variant);
        builder.register_building(&def.name, def.worker, def.variant, def.stacks);
    }
    builder.build().expect("test registry is valid")
}

pub fn toolsmith() -> BuildingTypeId {
    BuildingTypeId(0)
}

pub fn dockyard() -> BuildingTypeId {
    BuildingTypeId(1)
}

pub fn make_building_id() -> BuildingId {
    let mut sm = SlotMap::<BuildingId, ()>::with_key();
    sm.insert(())
}

/// A standalone building under construction, owned by player 0.
pub fn make_building(variant: BuildingVariant, position: TilePosition) -> WorkerBuilding {
    let type_id = match variant {
        BuildingVariant::Producer => toolsmith(),
        BuildingVariant::Dockyard => dockyard(),
    };
    WorkerBuilding::new(make_building_id(), type_id, template(variant), PlayerId(0), position)
}

pub fn east_dock(x: i32, y: i32) -> DockPosition {
    DockPosition::new(TilePosition::new(x, y), Direction::East)
}

// ===========================================================================
// Recording grid
// ===========================================================================

#[derive(Debug, Default)]
pub struct RecordingGrid {
    pub worker_requests: Vec<(WorkerKind, BuildingId)>,
    pub docks: Vec<(DockPosition, bool, PlayerId)>,
    pub removed: Vec<(TilePosition, MapObjectKind)>,
    pub dropped: Vec<(TilePosition, MaterialKind, u32)>,
    pub flags: Vec<(TilePosition, MapObjectKind, bool)>,
    pub settings: MaterialProductionSettings,
}

impl BuildingsGrid for RecordingGrid {
    fn request_building_worker(&mut self, kind: WorkerKind, building: BuildingId) {
        self.worker_requests.push((kind, building));
    }

    fn set_dock(&mut self, dock: DockPosition, enabled: bool, player: PlayerId) {
        self.docks.push((dock, enabled, player));
    }

    fn remove_map_object_type(&mut self, pos: TilePosition, kind: MapObjectKind) {
        self.removed.push((pos, kind));
    }

    fn material_production_settings_at(&self, _pos: TilePosition) -> MaterialProductionSettings {
        self.settings.clone()
    }

    fn drop_material(&mut self, pos: TilePosition, material: MaterialKind, count: u32) {
        self.dropped.push((pos, material, count));
    }

    fn set_map_object_visible(&mut self, pos: TilePosition, kind: MapObjectKind, visible: bool) {
        self.flags.push((pos, kind, visible));
    }
}

// ===========================================================================
// Recording worker registry
// ===========================================================================

#[derive(Debug, Default)]
pub struct RecordingWorkers {
    pub destroyed_notices: Vec<WorkerId>,
}

impl WorkerRegistry for RecordingWorkers {
    fn building_destroyed(&mut self, worker: WorkerId) {
        self.destroyed_notices.push(worker);
    }
}

// ===========================================================================
// Mock unit grid
// ===========================================================================

#[derive(Debug, Clone)]
pub struct MockUnit {
    pub kind: MovableKind,
    pub position: TilePosition,
    pub player: PlayerId,
    pub direction: Option<Direction>,
    pub progress: Fixed64,
    pub killed: bool,
}

#[derive(Debug, Default)]
pub struct MockUnits {
    pub units: SlotMap<UnitId, MockUnit>,
    pub spawned: Vec<UnitId>,
}

impl MockUnits {
    pub fn get(&self, unit: UnitId) -> Option<&MockUnit> {
        self.units.get(unit)
    }

    pub fn direction(&self, unit: UnitId) -> Option<Direction> {
        self.units.get(unit).and_then(|u| u.direction)
    }

    pub fn is_killed(&self, unit: UnitId) -> bool {
        self.units.get(unit).is_some_and(|u| u.killed)
    }

    pub fn alive_count(&self) -> usize {
        self.units.values().filter(|u| !u.killed).count()
    }
}

impl TransportUnits for MockUnits {
    fn spawn(&mut self, kind: MovableKind, pos: TilePosition, player: PlayerId) -> UnitId {
        let unit = self.units.insert(MockUnit {
            kind,
            position: pos,
            player,
            direction: None,
            progress: Fixed64::ZERO,
            killed: false,
        });
        self.spawned.push(unit);
        unit
    }

    fn set_direction(&mut self, unit: UnitId, direction: Direction) {
        if let Some(u) = self.units.get_mut(unit) {
            u.direction = Some(direction);
        }
    }

    fn increase_state_progress(&mut self, unit: UnitId, delta: Fixed64) {
        if let Some(u) = self.units.get_mut(unit) {
            u.progress += delta;
        }
    }

    fn state_progress(&self, unit: UnitId) -> Fixed64 {
        self.units.get(unit).map(|u| u.progress).unwrap_or(Fixed64::ZERO)
    }

    fn kill(&mut self, unit: UnitId) {
        if let Some(u) = self.units.get_mut(unit) {
            u.killed = true;
        }
    }
}

// ===========================================================================
// MockWorld
// ===========================================================================

/// All three collaborators plus a worker key allocator.
#[derive(Debug, Default)]
pub struct MockWorld {
    pub grid: RecordingGrid,
    pub workers: RecordingWorkers,
    pub units: MockUnits,
    pub worker_keys: SlotMap<WorkerId, ()>,
}

impl MockWorld {
    pub fn ctx(&mut self) -> Context<'_> {
        Context::new(&mut self.grid, &mut self.workers, &mut self.units)
    }

    pub fn new_worker(&mut self) -> WorkerId {
        self.worker_keys.insert(())
    }
}

// ===========================================================================
// Engine helpers
// ===========================================================================

/// Add a building and finish its construction immediately.
pub fn add_active_building(
    engine: &mut Engine,
    world: &mut MockWorld,
    type_id: BuildingTypeId,
    position: TilePosition,
) -> BuildingId {
    let registry = test_registry();
    let id = engine
        .add_building(&registry, type_id, PlayerId(0), position)
        .expect("type is registered");
    engine
        .construction_finished(id, &mut world.ctx())
        .expect("fresh building");
    id
}

/// An active, occupied dockyard with an east-facing dock at `(x + 10, y)`.
pub fn add_working_dockyard(
    engine: &mut Engine,
    world: &mut MockWorld,
    position: TilePosition,
) -> (BuildingId, WorkerId) {
    let id = add_active_building(engine, world, dockyard(), position);
    let worker = world.new_worker();
    engine
        .occupy_building(id, worker, &mut world.ctx())
        .expect("building is vacant");
    engine
        .set_dock(id, east_dock(position.x + 10, position.y), &mut world.ctx())
        .expect("dockyard accepts a dock");
    (id, worker)
}
