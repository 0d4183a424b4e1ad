//! The worker building: one worker, a set of request stacks, an optional
//! production order, and for dockyards a ferry controller.
//!
//! # Lifecycle
//!
//! ```text
//! UnderConstruction --construction_finished--> Active(Vacant)
//! Active(Vacant)    --occupy_building-------> Active(Occupied)
//! Active(Occupied)  --leave_building--------> Active(Vacant)   (re-requests a worker)
//! Active(_)         --killed_event----------> Destroyed        (terminal)
//! ```
//!
//! Every entry point first checks that the building is alive. Events for a
//! destroyed building, mismatched workers, and other contract violations are
//! logged and returned as [`BuildingError`]; they never change state, so a
//! participant that sees one stays in lockstep with everyone else.

use crate::cleanup::CleanupRegistry;
use crate::context::{BuildingsGrid, Context};
use crate::dock::{DockError, DockFerryController, DockPosition, SHIP_COMPLETE_THRESHOLD, ShipAction};
use crate::fixed::Fixed64;
use crate::geometry::TilePosition;
use crate::id::{BuildingId, BuildingTypeId, PlayerId, UnitId, WorkerId};
use crate::material::{MapObjectKind, MaterialKind, MaterialProductionSettings};
use crate::production_order::{OrderError, ProductionOrder};
use crate::registry::{BuildingTemplateDef, BuildingVariant};
use crate::request_stack::RequestStacks;
use crate::sim::StateHash;
use crate::worker_slot::{SlotError, WorkerSlot};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// State and results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildingState {
    #[default]
    UnderConstruction,
    Active,
    Destroyed,
}

/// What the scheduler should do after a lifecycle callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// No periodic callback; the building is driven by worker events.
    Never,
}

/// Side effects of destroying a building.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Teardown {
    pub notified_worker: Option<WorkerId>,
    pub cleanups_issued: usize,
    pub destroyed_ship: Option<UnitId>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildingError {
    #[error("building is destroyed")]
    Destroyed,
    #[error("building is not active (state {0:?})")]
    NotActive(BuildingState),
    #[error("construction already finished (state {0:?})")]
    NotUnderConstruction(BuildingState),
    #[error("building is not a dockyard")]
    NotDockyard,
    #[error("building not found")]
    UnknownBuilding,
    #[error("unknown building type {0:?}")]
    UnknownBuildingType(BuildingTypeId),
    #[error(transparent)]
    Slot(#[from] SlotError),
    #[error(transparent)]
    Order(#[from] OrderError),
    #[error(transparent)]
    Dock(#[from] DockError),
}

// ---------------------------------------------------------------------------
// WorkerBuilding
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerBuilding {
    id: BuildingId,
    type_id: BuildingTypeId,
    template: BuildingTemplateDef,
    player: PlayerId,
    position: TilePosition,
    state: BuildingState,
    slot: WorkerSlot,
    stacks: RequestStacks,
    flag_shown: bool,
    order: Option<ProductionOrder>,
    ferry: Option<DockFerryController>,
    cleanup: CleanupRegistry,
}

impl WorkerBuilding {
    pub fn new(
        id: BuildingId,
        type_id: BuildingTypeId,
        template: BuildingTemplateDef,
        player: PlayerId,
        position: TilePosition,
    ) -> Self {
        Self {
            id,
            type_id,
            template,
            player,
            position,
            state: BuildingState::UnderConstruction,
            slot: WorkerSlot::Vacant,
            stacks: RequestStacks::new(),
            flag_shown: false,
            order: None,
            ferry: None,
            cleanup: CleanupRegistry::new(),
        }
    }

    // -- Identity --

    pub fn id(&self) -> BuildingId {
        self.id
    }

    pub fn type_id(&self) -> BuildingTypeId {
        self.type_id
    }

    pub fn template(&self) -> &BuildingTemplateDef {
        &self.template
    }

    pub fn variant(&self) -> BuildingVariant {
        self.template.variant
    }

    pub fn player(&self) -> PlayerId {
        self.player
    }

    pub fn position(&self) -> TilePosition {
        self.position
    }

    pub fn state(&self) -> BuildingState {
        self.state
    }

    pub fn is_alive(&self) -> bool {
        self.state != BuildingState::Destroyed
    }

    /// The map object shown on the roof while a worker is inside.
    pub fn flag_kind(&self) -> MapObjectKind {
        MapObjectKind::FlagRoof
    }

    pub fn is_flag_shown(&self) -> bool {
        self.flag_shown
    }

    fn ensure_alive(&self) -> Result<(), BuildingError> {
        if self.is_alive() {
            Ok(())
        } else {
            tracing::warn!(building = ?self.id, "event for destroyed building ignored");
            Err(BuildingError::Destroyed)
        }
    }

    fn ensure_active(&self) -> Result<(), BuildingError> {
        self.ensure_alive()?;
        if self.state != BuildingState::Active {
            tracing::warn!(building = ?self.id, state = ?self.state, "building not active");
            return Err(BuildingError::NotActive(self.state));
        }
        Ok(())
    }

    // -- Lifecycle --

    /// Construction completed: become active and ask for a worker.
    pub fn construction_finished(&mut self, ctx: &mut Context<'_>) -> Result<Schedule, BuildingError> {
        self.ensure_alive()?;
        if self.state != BuildingState::UnderConstruction {
            tracing::error!(building = ?self.id, state = ?self.state, "construction finished twice");
            return Err(BuildingError::NotUnderConstruction(self.state));
        }
        self.state = BuildingState::Active;
        self.request_worker(ctx.grid)?;
        Ok(Schedule::Never)
    }

    /// Generic periodic callback. Worker buildings are never scheduled, so
    /// reaching this is an engine bug; it is reported and ignored.
    pub fn sub_timer_event(&mut self) -> Schedule {
        tracing::error!(building = ?self.id, "timer event on a building that is never scheduled");
        Schedule::Never
    }

    fn request_worker(&mut self, grid: &mut dyn BuildingsGrid) -> Result<(), BuildingError> {
        self.ensure_active()?;
        if let Some(held) = self.slot.worker() {
            tracing::error!(building = ?self.id, worker = ?held, "worker requested while occupied");
            return Err(SlotError::AlreadyOccupied(held).into());
        }
        tracing::debug!(building = ?self.id, kind = ?self.template.worker, "requesting worker");
        grid.request_building_worker(self.template.worker, self.id);
        Ok(())
    }

    /// A worker arrives. Shows the flag and builds fresh request stacks.
    pub fn occupy_building(&mut self, worker: WorkerId, ctx: &mut Context<'_>) -> Result<(), BuildingError> {
        self.ensure_active()?;
        if let Err(e) = self.slot.occupy(worker) {
            tracing::error!(building = ?self.id, ?worker, error = %e, "occupy rejected");
            return Err(e.into());
        }
        self.show_flag(ctx.grid, true);
        self.stacks = RequestStacks::from_layout(&self.template.stacks, self.id, self.position);
        tracing::debug!(building = ?self.id, ?worker, "occupied");
        Ok(())
    }

    /// The worker leaves. Hides the flag, releases stacks, asks for another.
    pub fn leave_building(&mut self, worker: WorkerId, ctx: &mut Context<'_>) -> Result<(), BuildingError> {
        self.ensure_alive()?;
        if let Err(e) = self.slot.vacate(worker) {
            tracing::error!(building = ?self.id, ?worker, error = %e, "a worker not registered at the building wanted to leave it");
            return Err(e.into());
        }
        self.show_flag(ctx.grid, false);
        self.stacks.release(ctx.grid);
        tracing::debug!(building = ?self.id, ?worker, "vacated");
        self.request_worker(ctx.grid)
    }

    /// Destroy the building: notify the worker, run cleanups, scrap any
    /// half-built ferry, then release stacks and the flag.
    pub fn killed_event(&mut self, ctx: &mut Context<'_>) -> Result<Teardown, BuildingError> {
        self.ensure_alive()?;
        let mut teardown = Teardown::default();

        if let Some(worker) = self.slot.clear() {
            ctx.workers.building_destroyed(worker);
            teardown.notified_worker = Some(worker);
        }
        teardown.cleanups_issued = self.cleanup.run(ctx.grid);
        if let Some(ferry) = self.ferry.as_mut() {
            teardown.destroyed_ship = ferry.tear_down(self.player, ctx.grid, ctx.units);
        }

        self.stacks.release(ctx.grid);
        self.show_flag(ctx.grid, false);
        self.state = BuildingState::Destroyed;
        tracing::debug!(building = ?self.id, ?teardown, "destroyed");
        Ok(teardown)
    }

    fn show_flag(&mut self, grid: &mut dyn BuildingsGrid, visible: bool) {
        if self.flag_shown != visible {
            grid.set_map_object_visible(self.position, self.flag_kind(), visible);
            self.flag_shown = visible;
        }
    }

    // -- Occupancy --

    pub fn is_occupied(&self) -> bool {
        self.slot.is_occupied()
    }

    pub fn worker(&self) -> Option<WorkerId> {
        self.slot.worker()
    }

    // -- Request stacks --

    pub fn stacks(&self) -> &RequestStacks {
        &self.stacks
    }

    #[cfg(test)]
    pub(crate) fn stacks_mut(&mut self) -> &mut RequestStacks {
        &mut self.stacks
    }

    /// Take one unit of `material` for production.
    pub fn pop_material(&mut self, material: MaterialKind) -> bool {
        self.is_alive() && self.stacks.pop_material(material)
    }

    /// Where a worker can fetch `material` from, if any stack holds it.
    pub fn where_is_material_available(&self, material: MaterialKind) -> Option<TilePosition> {
        if !self.is_alive() {
            return None;
        }
        self.stacks.where_is_material_available(material)
    }

    /// A carrier drops material on the stack for `material`. Returns the
    /// units that could not be stored.
    pub fn deliver_material(&mut self, material: MaterialKind, quantity: u32) -> Result<u32, BuildingError> {
        self.ensure_alive()?;
        Ok(match self.stacks.get_mut(material) {
            Some(stack) => stack.deliver(quantity),
            None => quantity,
        })
    }

    /// Production preferences of the region the building stands in.
    pub fn material_production(&self, grid: &dyn BuildingsGrid) -> MaterialProductionSettings {
        grid.material_production_settings_at(self.position)
    }

    // -- Production order --

    /// Replace the production order; a partially fulfilled one is dropped.
    pub fn set_order(&mut self, materials: Vec<MaterialKind>) -> Result<(), BuildingError> {
        self.ensure_alive()?;
        self.order.get_or_insert_with(ProductionOrder::default).set(materials);
        Ok(())
    }

    pub fn ordered_material(&self) -> Option<MaterialKind> {
        self.order.as_ref().and_then(ProductionOrder::ordered_material)
    }

    pub fn order(&self) -> Option<&ProductionOrder> {
        self.order.as_ref()
    }

    /// Mark the current ordered material as consumed.
    pub fn reduce_order(&mut self) -> Result<(), BuildingError> {
        self.ensure_alive()?;
        let result = match self.order.as_mut() {
            Some(order) => order.reduce(),
            None => Err(OrderError::Exhausted { len: 0 }),
        };
        if let Err(e) = result {
            tracing::error!(building = ?self.id, error = %e, "reduce_order past the end");
            return Err(e.into());
        }
        Ok(())
    }

    // -- Dock --

    /// Place or move the dock. Only dockyards have one; for anything else this
    /// changes nothing. Returns the ferry destroyed by a move, if any.
    pub fn set_dock(&mut self, dock: DockPosition, ctx: &mut Context<'_>) -> Result<Option<UnitId>, BuildingError> {
        self.ensure_alive()?;
        if self.template.variant != BuildingVariant::Dockyard {
            tracing::debug!(building = ?self.id, "set_dock ignored for non-dockyard");
            return Err(BuildingError::NotDockyard);
        }
        let ferry = self.ferry.get_or_insert_with(DockFerryController::new);
        Ok(ferry.set_dock(dock, self.player, ctx.grid, ctx.units))
    }

    pub fn dock(&self) -> Option<DockPosition> {
        self.ferry.as_ref().and_then(DockFerryController::dock)
    }

    pub fn ferry(&self) -> Option<&DockFerryController> {
        self.ferry.as_ref()
    }

    /// Whether the per-tick ferry action applies this tick: an occupied,
    /// active dockyard with a dock and no ordered material outstanding.
    pub fn wants_ship_action(&self) -> bool {
        self.state == BuildingState::Active
            && self.slot.is_occupied()
            && self.dock().is_some()
            && self.ordered_material().is_none()
    }

    /// Advance ferry construction by one action.
    pub fn build_ship_action(&mut self, ctx: &mut Context<'_>) -> Result<ShipAction, BuildingError> {
        self.ensure_active()?;
        let ferry = match (self.template.variant, self.ferry.as_mut()) {
            (BuildingVariant::Dockyard, Some(ferry)) => ferry,
            (BuildingVariant::Dockyard, None) => return Err(DockError::NoDock.into()),
            (BuildingVariant::Producer, _) => return Err(BuildingError::NotDockyard),
        };
        Ok(ferry.build_ship_action(self.player, ctx.units)?)
    }

    // -- Cleanup --

    /// Remember a map object to remove when the building is destroyed.
    /// Returns false if it was already registered or the building is gone.
    pub fn add_cleanup_position(&mut self, pos: TilePosition, kind: MapObjectKind) -> bool {
        self.is_alive() && self.cleanup.add(pos, kind)
    }

    pub fn cleanup(&self) -> &CleanupRegistry {
        &self.cleanup
    }

    // -- Consistency --

    /// Check the relations every live operation maintains. Used on state that
    /// did not come from those operations, such as a decoded snapshot.
    pub fn check_consistency(&self) -> Result<(), &'static str> {
        if self.slot.is_occupied() && self.state != BuildingState::Active {
            return Err("worker inside a building that is not active");
        }
        if self.flag_shown != self.slot.is_occupied() {
            return Err("roof flag out of sync with occupancy");
        }
        if !self.slot.is_occupied() && !self.stacks.is_empty() {
            return Err("request stacks without a worker");
        }
        for (i, stack) in self.stacks.iter().enumerate() {
            if stack.count() > stack.capacity() {
                return Err("request stack over capacity");
            }
            if stack.building != self.id {
                return Err("request stack owned by another building");
            }
            if self.stacks.iter().skip(i + 1).any(|s| s.material == stack.material) {
                return Err("two request stacks claim one material");
            }
        }
        if let Some(order) = &self.order {
            if order.cursor() > order.materials().len() {
                return Err("production order cursor past the end");
            }
        }
        if let Some(ferry) = &self.ferry {
            if self.template.variant != BuildingVariant::Dockyard {
                return Err("dock on a building that is not a dockyard");
            }
            if let Some(dock) = ferry.dock() {
                if !self.is_alive() {
                    return Err("destroyed building still holds a dock");
                }
                if dock.ship_spawn_position().is_err() {
                    return Err("dock without room for a ferry");
                }
            }
            if let Some(ship) = ferry.ship() {
                if ferry.dock().is_none() {
                    return Err("ferry under construction without a dock");
                }
                if ship.progress < Fixed64::ZERO || ship.progress >= SHIP_COMPLETE_THRESHOLD {
                    return Err("ferry progress out of range");
                }
            }
        }
        Ok(())
    }

    // -- Hashing --

    /// Feed every persisted attribute into `hash`, in a fixed order.
    pub fn hash_into(&self, hash: &mut StateHash) {
        hash.write_u32(self.type_id.0);
        hash.write(&[self.player.0, self.state as u8, self.flag_shown as u8]);
        hash.write_position(self.position);
        match self.slot.worker() {
            Some(w) => {
                hash.write(&[1]);
                hash.write_key(w);
            }
            None => hash.write(&[0]),
        }
        hash.write_u32(self.stacks.len() as u32);
        for stack in self.stacks.iter() {
            hash.write_u32(stack.material as u32);
            hash.write_position(stack.position);
            hash.write_u32(stack.count());
        }
        match &self.order {
            Some(order) => {
                hash.write_u32(order.materials().len() as u32);
                for m in order.materials() {
                    hash.write_u32(*m as u32);
                }
                hash.write_u64(order.cursor() as u64);
            }
            None => hash.write(&[0xFF]),
        }
        match &self.ferry {
            Some(ferry) => {
                hash.write(&[1]);
                match ferry.dock() {
                    Some(dock) => {
                        hash.write(&[1]);
                        for v in dock.to_array() {
                            hash.write_u32(v as u32);
                        }
                    }
                    None => hash.write(&[0]),
                }
                match ferry.ship() {
                    Some(ship) => {
                        hash.write(&[1]);
                        hash.write_key(ship.unit);
                        hash.write_fixed64(ship.progress);
                    }
                    None => hash.write(&[0]),
                }
            }
            None => hash.write(&[0]),
        }
        hash.write_u32(self.cleanup.len() as u32);
        for (pos, kind) in self.cleanup.iter() {
            hash.write_position(*pos);
            hash.write_u32(*kind as u32);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dock::SHIP_COMPLETE_THRESHOLD;
    use crate::test_utils::*;

    fn built(world: &mut MockWorld, variant: BuildingVariant) -> WorkerBuilding {
        let mut b = make_building(variant, TilePosition::new(30, 30));
        b.construction_finished(&mut world.ctx()).unwrap();
        b
    }

    #[test]
    fn construction_finished_requests_worker_once() {
        let mut world = MockWorld::default();
        let mut b = make_building(BuildingVariant::Producer, TilePosition::new(0, 0));
        assert_eq!(b.construction_finished(&mut world.ctx()), Ok(Schedule::Never));
        assert_eq!(b.state(), BuildingState::Active);
        assert_eq!(world.grid.worker_requests.len(), 1);

        assert!(matches!(
            b.construction_finished(&mut world.ctx()),
            Err(BuildingError::NotUnderConstruction(BuildingState::Active))
        ));
        assert_eq!(world.grid.worker_requests.len(), 1);
    }

    #[test]
    fn occupy_before_construction_rejected() {
        let mut world = MockWorld::default();
        let worker = world.new_worker();
        let mut b = make_building(BuildingVariant::Producer, TilePosition::new(0, 0));
        assert!(matches!(
            b.occupy_building(worker, &mut world.ctx()),
            Err(BuildingError::NotActive(BuildingState::UnderConstruction))
        ));
        assert!(!b.is_occupied());
    }

    #[test]
    fn occupy_shows_flag_and_builds_stacks() {
        let mut world = MockWorld::default();
        let worker = world.new_worker();
        let mut b = built(&mut world, BuildingVariant::Producer);

        b.occupy_building(worker, &mut world.ctx()).unwrap();
        assert!(b.is_occupied());
        assert_eq!(b.worker(), Some(worker));
        assert!(b.is_flag_shown());
        assert_eq!(b.stacks().len(), b.template().stacks.len());
        assert_eq!(
            world.grid.flags,
            vec![(TilePosition::new(30, 30), MapObjectKind::FlagRoof, true)]
        );
    }

    #[test]
    fn leave_releases_and_rerequests() {
        let mut world = MockWorld::default();
        let worker = world.new_worker();
        let mut b = built(&mut world, BuildingVariant::Producer);
        b.occupy_building(worker, &mut world.ctx()).unwrap();
        assert_eq!(b.deliver_material(MaterialKind::Plank, 2), Ok(0));

        b.leave_building(worker, &mut world.ctx()).unwrap();
        assert!(!b.is_occupied());
        assert!(!b.is_flag_shown());
        assert!(b.stacks().is_empty());
        assert_eq!(world.grid.worker_requests.len(), 2);
        assert_eq!(world.grid.dropped.len(), 1);
    }

    #[test]
    fn mismatched_leave_is_ignored() {
        let mut world = MockWorld::default();
        let worker = world.new_worker();
        let stranger = world.new_worker();
        let mut b = built(&mut world, BuildingVariant::Producer);
        b.occupy_building(worker, &mut world.ctx()).unwrap();
        let before = b.clone();

        assert!(matches!(
            b.leave_building(stranger, &mut world.ctx()),
            Err(BuildingError::Slot(SlotError::WorkerMismatch { .. }))
        ));
        assert_eq!(b, before);
        assert_eq!(world.grid.worker_requests.len(), 1);
    }

    #[test]
    fn pop_material_consumes_one_unit() {
        let mut world = MockWorld::default();
        let worker = world.new_worker();
        let mut b = built(&mut world, BuildingVariant::Producer);
        b.occupy_building(worker, &mut world.ctx()).unwrap();

        assert!(!b.pop_material(MaterialKind::Plank));
        assert_eq!(b.deliver_material(MaterialKind::Plank, 1), Ok(0));
        assert_eq!(
            b.where_is_material_available(MaterialKind::Plank),
            Some(TilePosition::new(28, 31))
        );
        assert!(b.pop_material(MaterialKind::Plank));
        assert!(!b.pop_material(MaterialKind::Plank));
        assert_eq!(b.where_is_material_available(MaterialKind::Plank), None);
    }

    #[test]
    fn deliver_to_missing_stack_overflows() {
        let mut world = MockWorld::default();
        let mut b = built(&mut world, BuildingVariant::Producer);
        assert_eq!(b.deliver_material(MaterialKind::Gold, 3), Ok(3));
    }

    #[test]
    fn order_lifecycle() {
        let mut b = make_building(BuildingVariant::Dockyard, TilePosition::new(0, 0));
        assert_eq!(b.ordered_material(), None);
        assert!(b.reduce_order().is_err());

        b.set_order(vec![MaterialKind::Plank, MaterialKind::Iron]).unwrap();
        assert_eq!(b.ordered_material(), Some(MaterialKind::Plank));
        b.reduce_order().unwrap();
        b.reduce_order().unwrap();
        assert_eq!(b.ordered_material(), None);
        assert!(matches!(
            b.reduce_order(),
            Err(BuildingError::Order(OrderError::Exhausted { len: 2 }))
        ));
        assert_eq!(b.order().unwrap().cursor(), 2);
    }

    #[test]
    fn set_dock_ignored_for_producer() {
        let mut world = MockWorld::default();
        let mut b = built(&mut world, BuildingVariant::Producer);
        let dock = DockPosition::from_array([1, 1, 1, 0]).unwrap();
        assert_eq!(b.set_dock(dock, &mut world.ctx()), Err(BuildingError::NotDockyard));
        assert_eq!(b.dock(), None);
        assert!(world.grid.docks.is_empty());
    }

    #[test]
    fn dockyard_builds_ferry() {
        let mut world = MockWorld::default();
        let worker = world.new_worker();
        let mut b = built(&mut world, BuildingVariant::Dockyard);
        b.occupy_building(worker, &mut world.ctx()).unwrap();
        assert!(!b.wants_ship_action());

        let dock = DockPosition::from_array([40, 30, 1, 0]).unwrap();
        assert_eq!(b.set_dock(dock, &mut world.ctx()), Ok(None));
        assert!(b.wants_ship_action());

        let ShipAction::Spawned { unit, .. } = b.build_ship_action(&mut world.ctx()).unwrap() else {
            panic!("expected spawn");
        };
        for _ in 0..23 {
            b.build_ship_action(&mut world.ctx()).unwrap();
        }
        assert_eq!(
            b.build_ship_action(&mut world.ctx()),
            Ok(ShipAction::Launched { unit })
        );
        assert!(world.units.state_progress(unit) >= SHIP_COMPLETE_THRESHOLD);
    }

    #[test]
    fn pending_order_suppresses_ship_action() {
        let mut world = MockWorld::default();
        let worker = world.new_worker();
        let mut b = built(&mut world, BuildingVariant::Dockyard);
        b.occupy_building(worker, &mut world.ctx()).unwrap();
        b.set_dock(DockPosition::from_array([40, 30, 1, 0]).unwrap(), &mut world.ctx())
            .unwrap();
        b.set_order(vec![MaterialKind::Plank]).unwrap();
        assert!(!b.wants_ship_action());
        b.reduce_order().unwrap();
        assert!(b.wants_ship_action());
    }

    #[test]
    fn killed_event_tears_everything_down() {
        let mut world = MockWorld::default();
        let worker = world.new_worker();
        let mut b = built(&mut world, BuildingVariant::Dockyard);
        b.occupy_building(worker, &mut world.ctx()).unwrap();
        b.set_dock(DockPosition::from_array([40, 30, 1, 0]).unwrap(), &mut world.ctx())
            .unwrap();
        b.build_ship_action(&mut world.ctx()).unwrap();
        b.build_ship_action(&mut world.ctx()).unwrap();
        let ship = b.ferry().unwrap().ship().unwrap().unit;
        assert!(b.add_cleanup_position(TilePosition::new(1, 1), MapObjectKind::Pig));
        assert!(b.add_cleanup_position(TilePosition::new(2, 2), MapObjectKind::Donkey));
        assert!(!b.add_cleanup_position(TilePosition::new(1, 1), MapObjectKind::Pig));

        let teardown = b.killed_event(&mut world.ctx()).unwrap();
        assert_eq!(
            teardown,
            Teardown {
                notified_worker: Some(worker),
                cleanups_issued: 2,
                destroyed_ship: Some(ship),
            }
        );
        assert_eq!(world.workers.destroyed_notices, vec![worker]);
        assert!(!b.is_occupied());
        assert!(world.units.is_killed(ship));
        assert_eq!(world.grid.removed.len(), 2);
        assert_eq!(b.state(), BuildingState::Destroyed);
        assert!(!b.is_flag_shown());
    }

    #[test]
    fn destroyed_building_ignores_everything() {
        let mut world = MockWorld::default();
        let worker = world.new_worker();
        let mut b = built(&mut world, BuildingVariant::Dockyard);
        b.killed_event(&mut world.ctx()).unwrap();
        let before = b.clone();
        let requests = world.grid.worker_requests.len();

        assert_eq!(b.occupy_building(worker, &mut world.ctx()), Err(BuildingError::Destroyed));
        assert_eq!(b.leave_building(worker, &mut world.ctx()), Err(BuildingError::Destroyed));
        assert_eq!(b.killed_event(&mut world.ctx()), Err(BuildingError::Destroyed));
        assert_eq!(b.set_order(vec![MaterialKind::Plank]), Err(BuildingError::Destroyed));
        assert!(!b.add_cleanup_position(TilePosition::new(0, 0), MapObjectKind::Pig));
        assert!(!b.pop_material(MaterialKind::Plank));
        assert_eq!(
            b.set_dock(DockPosition::from_array([0, 0, 1, 0]).unwrap(), &mut world.ctx()),
            Err(BuildingError::Destroyed)
        );

        assert_eq!(b, before);
        assert_eq!(world.grid.worker_requests.len(), requests);
        assert!(world.workers.destroyed_notices.is_empty());
    }

    #[test]
    fn sub_timer_event_is_inert() {
        let mut b = make_building(BuildingVariant::Producer, TilePosition::new(0, 0));
        let before = b.clone();
        assert_eq!(b.sub_timer_event(), Schedule::Never);
        assert_eq!(b, before);
    }

    #[test]
    fn hash_tracks_state() {
        let mut world = MockWorld::default();
        let worker = world.new_worker();
        let mut b = built(&mut world, BuildingVariant::Producer);
        let mut h1 = StateHash::new();
        b.hash_into(&mut h1);

        b.occupy_building(worker, &mut world.ctx()).unwrap();
        let mut h2 = StateHash::new();
        b.hash_into(&mut h2);
        assert_ne!(h1.finish(), h2.finish());
    }

    #[test]
    fn hash_tells_torn_down_ferry_from_none() {
        let mut world = MockWorld::default();
        let mut with_dock = built(&mut world, BuildingVariant::Dockyard);
        let mut without = with_dock.clone();
        with_dock.set_dock(east_dock(1, 1), &mut world.ctx()).unwrap();
        with_dock.killed_event(&mut world.ctx()).unwrap();
        without.killed_event(&mut world.ctx()).unwrap();

        let (mut a, mut b) = (StateHash::new(), StateHash::new());
        with_dock.hash_into(&mut a);
        without.hash_into(&mut b);
        assert_ne!(with_dock, without);
        assert_ne!(a.finish(), b.finish());
    }

    #[test]
    fn consistency_holds_through_lifecycle() {
        let mut world = MockWorld::default();
        let worker = world.new_worker();
        let mut b = built(&mut world, BuildingVariant::Dockyard);
        assert_eq!(b.check_consistency(), Ok(()));
        b.occupy_building(worker, &mut world.ctx()).unwrap();
        b.set_dock(east_dock(1, 1), &mut world.ctx()).unwrap();
        b.build_ship_action(&mut world.ctx()).unwrap();
        let _ = b.deliver_material(MaterialKind::Plank, 100).unwrap();
        assert_eq!(b.check_consistency(), Ok(()));
        b.killed_event(&mut world.ctx()).unwrap();
        assert_eq!(b.check_consistency(), Ok(()));
    }

    #[test]
    fn consistency_rejects_broken_state() {
        let mut world = MockWorld::default();
        let worker = world.new_worker();
        let mut ok = built(&mut world, BuildingVariant::Dockyard);
        ok.occupy_building(worker, &mut world.ctx()).unwrap();
        ok.set_dock(east_dock(1, 1), &mut world.ctx()).unwrap();
        ok.build_ship_action(&mut world.ctx()).unwrap();

        let mut b = ok.clone();
        b.state = BuildingState::Destroyed;
        assert!(b.check_consistency().is_err());

        let mut b = ok.clone();
        b.flag_shown = false;
        assert!(b.check_consistency().is_err());

        let mut b = ok.clone();
        b.stacks_mut().get_mut(MaterialKind::Plank).unwrap().force_count(1000);
        assert_eq!(b.check_consistency(), Err("request stack over capacity"));

        let mut b = ok.clone();
        if let Some(ferry) = b.ferry.as_mut() {
            ferry.forget_dock();
        }
        assert_eq!(b.check_consistency(), Err("ferry under construction without a dock"));

        let mut b = make_building(BuildingVariant::Producer, TilePosition::new(0, 0));
        b.ferry = ok.ferry.clone();
        assert_eq!(b.check_consistency(), Err("dock on a building that is not a dockyard"));
    }
}
