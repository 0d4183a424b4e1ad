//! The simulation engine: owns the building table and orchestrates the
//! per-tick pipeline.
//!
//! # Architecture
//!
//! The `Engine` owns:
//! - A [`SlotMap`] of [`WorkerBuilding`]s keyed by [`BuildingId`] (the
//!   arena; sub-entities hold handles into it, never references)
//! - A [`CommandQueue`] of inputs submitted between ticks
//! - A [`SimState`] (tick counter) and the last state hash
//! - An [`EventBus`] for building events
//!
//! The grid, worker registry, and unit grid are not owned; every operation
//! that touches them takes a [`Context`].
//!
//! # Pipeline
//!
//! Each `step()` runs:
//! 1. **Commands** -- drain the queue and apply commands in submission order
//! 2. **Ferries** -- one build action for every dockyard that wants one, in
//!    building-key order
//! 3. **Post-tick** -- deliver buffered events to listeners
//! 4. **Bookkeeping** -- update tick counter, compute state hash
//!
//! A failing command is logged and skipped; it never aborts the tick.

use crate::building::{BuildingError, BuildingState, Schedule, Teardown, WorkerBuilding};
use crate::command_queue::{Command, CommandQueue};
use crate::context::Context;
use crate::dock::{DockPosition, ShipAction};
use crate::event::{Event, EventBus, EventKind, PassiveListener};
use crate::geometry::TilePosition;
use crate::id::{BuildingId, BuildingTypeId, PlayerId, UnitId, WorkerId};
use crate::material::{MapObjectKind, MaterialKind};
use crate::registry::Registry;
use crate::sim::{SimState, StateHash};
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Engine construction parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Events kept in the delivered-event history.
    pub event_capacity: usize,
    /// Executed commands kept for debugging. 0 = none.
    pub command_history: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_capacity: 1024,
            command_history: 0,
        }
    }
}

/// Outcome of one `step()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepResult {
    pub commands_applied: usize,
    pub commands_rejected: usize,
    pub ship_actions: usize,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Engine {
    pub(crate) buildings: SlotMap<BuildingId, WorkerBuilding>,

    /// Simulation state (tick counter).
    pub sim_state: SimState,

    pub(crate) paused: bool,

    /// The most recently computed state hash.
    pub(crate) last_state_hash: u64,

    pub(crate) config: EngineConfig,

    /// Inputs waiting for the next tick boundary.
    pub commands: CommandQueue,

    pub event_bus: EventBus,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let mut engine = Self {
            buildings: SlotMap::with_key(),
            sim_state: SimState::new(),
            paused: false,
            last_state_hash: 0,
            commands: CommandQueue::with_max_history(config.command_history),
            event_bus: EventBus::new(config.event_capacity),
            config,
        };
        engine.last_state_hash = engine.compute_state_hash();
        engine
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn tick(&self) -> u64 {
        self.sim_state.tick
    }

    // -----------------------------------------------------------------------
    // Building table
    // -----------------------------------------------------------------------

    /// Place a new building (under construction) from a registry template.
    pub fn add_building(
        &mut self,
        registry: &Registry,
        type_id: BuildingTypeId,
        player: PlayerId,
        position: TilePosition,
    ) -> Result<BuildingId, BuildingError> {
        let template = registry
            .get_building(type_id)
            .ok_or(BuildingError::UnknownBuildingType(type_id))?
            .clone();
        let id = self
            .buildings
            .insert_with_key(|id| WorkerBuilding::new(id, type_id, template, player, position));
        self.event_bus.emit(Event::BuildingPlaced {
            building: id,
            building_type: type_id,
            tick: self.tick(),
        });
        Ok(id)
    }

    pub fn building(&self, id: BuildingId) -> Option<&WorkerBuilding> {
        self.buildings.get(id)
    }

    /// All buildings in key order.
    pub fn buildings(&self) -> impl Iterator<Item = (BuildingId, &WorkerBuilding)> {
        self.buildings.iter()
    }

    pub fn building_count(&self) -> usize {
        self.buildings.len()
    }

    /// Drop destroyed buildings from the table. Returns how many were removed.
    ///
    /// Handles to removed buildings then resolve to `UnknownBuilding`.
    pub fn compact(&mut self) -> usize {
        let before = self.buildings.len();
        self.buildings.retain(|_, b| b.state() != BuildingState::Destroyed);
        before - self.buildings.len()
    }

    fn get_mut(&mut self, id: BuildingId) -> Result<&mut WorkerBuilding, BuildingError> {
        self.buildings.get_mut(id).ok_or_else(|| {
            tracing::warn!(building = ?id, "unknown building");
            BuildingError::UnknownBuilding
        })
    }

    // -----------------------------------------------------------------------
    // Lifecycle operations
    // -----------------------------------------------------------------------

    pub fn construction_finished(&mut self, id: BuildingId, ctx: &mut Context<'_>) -> Result<Schedule, BuildingError> {
        let tick = self.tick();
        let building = self.get_mut(id)?;
        let schedule = building.construction_finished(ctx)?;
        let kind = building.template().worker;
        self.event_bus.emit(Event::BuildingCompleted { building: id, tick });
        self.event_bus.emit(Event::WorkerRequested {
            building: id,
            kind,
            tick,
        });
        Ok(schedule)
    }

    pub fn occupy_building(&mut self, id: BuildingId, worker: WorkerId, ctx: &mut Context<'_>) -> Result<(), BuildingError> {
        let tick = self.tick();
        self.get_mut(id)?.occupy_building(worker, ctx)?;
        self.event_bus.emit(Event::WorkerArrived {
            building: id,
            worker,
            tick,
        });
        Ok(())
    }

    pub fn leave_building(&mut self, id: BuildingId, worker: WorkerId, ctx: &mut Context<'_>) -> Result<(), BuildingError> {
        let tick = self.tick();
        let building = self.get_mut(id)?;
        building.leave_building(worker, ctx)?;
        let kind = building.template().worker;
        self.event_bus.emit(Event::WorkerLeft {
            building: id,
            worker,
            tick,
        });
        self.event_bus.emit(Event::WorkerRequested {
            building: id,
            kind,
            tick,
        });
        Ok(())
    }

    pub fn destroy(&mut self, id: BuildingId, ctx: &mut Context<'_>) -> Result<Teardown, BuildingError> {
        let tick = self.tick();
        let teardown = self.get_mut(id)?.killed_event(ctx)?;
        if let Some(unit) = teardown.destroyed_ship {
            self.event_bus.emit(Event::ShipAbandoned {
                building: id,
                unit,
                tick,
            });
        }
        self.event_bus.emit(Event::BuildingDestroyed {
            building: id,
            cleanups: teardown.cleanups_issued,
            tick,
        });
        Ok(teardown)
    }

    // -----------------------------------------------------------------------
    // Materials and orders
    // -----------------------------------------------------------------------

    pub fn pop_material(&mut self, id: BuildingId, material: MaterialKind) -> bool {
        self.buildings
            .get_mut(id)
            .is_some_and(|b| b.pop_material(material))
    }

    pub fn where_is_material_available(&self, id: BuildingId, material: MaterialKind) -> Option<TilePosition> {
        self.buildings.get(id)?.where_is_material_available(material)
    }

    pub fn deliver_material(&mut self, id: BuildingId, material: MaterialKind, quantity: u32) -> Result<u32, BuildingError> {
        self.get_mut(id)?.deliver_material(material, quantity)
    }

    pub fn set_order(&mut self, id: BuildingId, materials: Vec<MaterialKind>) -> Result<(), BuildingError> {
        self.get_mut(id)?.set_order(materials)
    }

    pub fn ordered_material(&self, id: BuildingId) -> Option<MaterialKind> {
        self.buildings.get(id)?.ordered_material()
    }

    pub fn reduce_order(&mut self, id: BuildingId) -> Result<(), BuildingError> {
        self.get_mut(id)?.reduce_order()
    }

    pub fn add_cleanup_position(&mut self, id: BuildingId, position: TilePosition, kind: MapObjectKind) -> bool {
        self.buildings
            .get_mut(id)
            .is_some_and(|b| b.add_cleanup_position(position, kind))
    }

    // -----------------------------------------------------------------------
    // Dock
    // -----------------------------------------------------------------------

    pub fn set_dock(&mut self, id: BuildingId, dock: DockPosition, ctx: &mut Context<'_>) -> Result<Option<UnitId>, BuildingError> {
        let tick = self.tick();
        let abandoned = self.get_mut(id)?.set_dock(dock, ctx)?;
        if let Some(unit) = abandoned {
            self.event_bus.emit(Event::ShipAbandoned {
                building: id,
                unit,
                tick,
            });
        }
        self.event_bus.emit(Event::DockPlaced {
            building: id,
            dock: dock.to_array(),
            tick,
        });
        Ok(abandoned)
    }

    pub fn dock(&self, id: BuildingId) -> Option<DockPosition> {
        self.buildings.get(id)?.dock()
    }

    pub fn build_ship_action(&mut self, id: BuildingId, ctx: &mut Context<'_>) -> Result<ShipAction, BuildingError> {
        let tick = self.tick();
        let action = self.get_mut(id)?.build_ship_action(ctx)?;
        let event = match action {
            ShipAction::Spawned { unit, position } => Event::ShipSpawned {
                building: id,
                unit,
                position,
                tick,
            },
            ShipAction::Progressed { unit, progress } => Event::ShipProgressed {
                building: id,
                unit,
                progress,
                tick,
            },
            ShipAction::Launched { unit } => Event::ShipLaunched {
                building: id,
                unit,
                tick,
            },
        };
        self.event_bus.emit(event);
        Ok(action)
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Apply one command immediately.
    pub fn apply_command(&mut self, command: Command, ctx: &mut Context<'_>) -> Result<(), BuildingError> {
        match command {
            Command::FinishConstruction { building } => {
                self.construction_finished(building, ctx).map(|_| ())
            }
            Command::OccupyBuilding { building, worker } => self.occupy_building(building, worker, ctx),
            Command::LeaveBuilding { building, worker } => self.leave_building(building, worker, ctx),
            Command::SetOrder {
                building,
                materials,
            } => self.set_order(building, materials),
            Command::SetDock { building, dock } => {
                let dock = DockPosition::from_array(dock)?;
                self.set_dock(building, dock, ctx).map(|_| ())
            }
            Command::AddCleanupPosition {
                building,
                position,
                kind,
            } => {
                let target = self.get_mut(building)?;
                if !target.is_alive() {
                    return Err(BuildingError::Destroyed);
                }
                target.add_cleanup_position(position, kind);
                Ok(())
            }
            Command::Destroy { building } => self.destroy(building, ctx).map(|_| ()),
        }
    }

    // -----------------------------------------------------------------------
    // Pipeline
    // -----------------------------------------------------------------------

    /// Run one tick of the pipeline. No-op while paused.
    pub fn step(&mut self, ctx: &mut Context<'_>) -> StepResult {
        let mut result = StepResult::default();
        if self.paused {
            return result;
        }

        // Phase 1: commands.
        for command in self.commands.drain(self.sim_state.tick) {
            let building = command.building();
            match self.apply_command(command, ctx) {
                Ok(()) => result.commands_applied += 1,
                Err(error) => {
                    tracing::warn!(?building, %error, tick = self.sim_state.tick, "command rejected");
                    result.commands_rejected += 1;
                }
            }
        }

        // Phase 2: ferries, in key order.
        let shipyards: Vec<BuildingId> = self
            .buildings
            .iter()
            .filter(|(_, b)| b.wants_ship_action())
            .map(|(id, _)| id)
            .collect();
        for id in shipyards {
            match self.build_ship_action(id, ctx) {
                Ok(_) => result.ship_actions += 1,
                Err(error) => tracing::error!(building = ?id, %error, "ship action failed"),
            }
        }

        // Phase 3: post-tick.
        self.event_bus.deliver();

        // Phase 4: bookkeeping.
        self.sim_state.tick += 1;
        self.last_state_hash = self.compute_state_hash();
        result
    }

    /// Run `ticks` steps.
    pub fn advance(&mut self, ticks: u64, ctx: &mut Context<'_>) -> StepResult {
        let mut total = StepResult::default();
        for _ in 0..ticks {
            let r = self.step(ctx);
            total.commands_applied += r.commands_applied;
            total.commands_rejected += r.commands_rejected;
            total.ship_actions += r.ship_actions;
        }
        total
    }

    // -----------------------------------------------------------------------
    // Pause / Resume
    // -----------------------------------------------------------------------

    /// Pause the simulation. While paused, `step()` is a no-op; direct
    /// building operations still work.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    pub fn suppress_event(&mut self, kind: EventKind) {
        self.event_bus.suppress(kind);
    }

    pub fn on_passive(&mut self, kind: EventKind, listener: PassiveListener) {
        self.event_bus.on_passive(kind, listener);
    }

    // -----------------------------------------------------------------------
    // State hash
    // -----------------------------------------------------------------------

    /// The hash computed at the end of the last step.
    pub fn state_hash(&self) -> u64 {
        self.last_state_hash
    }

    /// Hash the tick and every building in key order.
    pub fn compute_state_hash(&self) -> u64 {
        let mut hash = StateHash::new();
        hash.write_u64(self.sim_state.tick);
        hash.write_u64(self.buildings.len() as u64);
        for (id, building) in &self.buildings {
            hash.write_key(id);
            building.hash_into(&mut hash);
        }
        hash.finish()
    }
}
