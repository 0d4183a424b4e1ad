//! Dock anchors and incremental ferry construction.
//!
//! A dockyard owns at most one dock. While its worker is active the engine
//! calls [`DockFerryController::build_ship_action`] once per tick: the first
//! call spawns a ferry in the water in front of the dock, every further call
//! adds [`SHIP_PROGRESS_STEP`] until the hull reaches
//! [`SHIP_COMPLETE_THRESHOLD`], at which point the ferry is launched as an
//! independent unit and the controller is ready for the next one.

use crate::context::{BuildingsGrid, TransportUnits};
use crate::fixed::Fixed64;
use crate::geometry::{Direction, TilePosition};
use crate::id::{PlayerId, UnitId};
use crate::material::MovableKind;
use serde::{Deserialize, Serialize};

/// Tiles between the dock anchor and the ferry's hull.
pub const SHIP_SPAWN_DISTANCE: i32 = 5;

/// Progress added per build action: a ferry takes 24 actions after spawning.
pub const SHIP_PROGRESS_STEP: Fixed64 = Fixed64::from_bits((1i64 << 32) / 24);

/// Progress at which a ferry counts as finished.
pub const SHIP_COMPLETE_THRESHOLD: Fixed64 = Fixed64::from_bits((99i64 << 32) / 100);

// ---------------------------------------------------------------------------
// DockPosition
// ---------------------------------------------------------------------------

/// A dock anchor tile plus the direction the dock faces the water.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DockPosition {
    pub anchor: TilePosition,
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DockError {
    #[error("dock orientation ({dx}, {dy}) is not a grid direction")]
    InvalidOrientation { dx: i32, dy: i32 },
    #[error("building has no dock")]
    NoDock,
    #[error("dock at ({x}, {y}) has no room for a ferry on the map")]
    OutOfBounds { x: i32, y: i32 },
}

impl DockPosition {
    pub fn new(anchor: TilePosition, direction: Direction) -> Self {
        Self { anchor, direction }
    }

    /// Build from the wire layout `[x, y, dx, dy]`. Anchors whose ferry
    /// would spawn off the coordinate range are rejected.
    pub fn from_array(raw: [i32; 4]) -> Result<Self, DockError> {
        let [x, y, dx, dy] = raw;
        let direction =
            Direction::from_offset(dx, dy).ok_or(DockError::InvalidOrientation { dx, dy })?;
        let dock = Self::new(TilePosition::new(x, y), direction);
        dock.ship_spawn_position()?;
        Ok(dock)
    }

    pub fn to_array(self) -> [i32; 4] {
        let (dx, dy) = self.direction.offset();
        [self.anchor.x, self.anchor.y, dx, dy]
    }

    /// Where a new ferry's hull is placed.
    pub fn ship_spawn_position(self) -> Result<TilePosition, DockError> {
        let (dx, dy) = self.direction.offset();
        self.anchor
            .offset_by(dx, dy, SHIP_SPAWN_DISTANCE)
            .ok_or(DockError::OutOfBounds {
                x: self.anchor.x,
                y: self.anchor.y,
            })
    }

    /// Heading of a new ferry: the dock direction turned one step clockwise.
    pub fn ship_direction(self) -> Direction {
        self.direction.rotate_right(1)
    }
}

// ---------------------------------------------------------------------------
// DockFerryController
// ---------------------------------------------------------------------------

/// A ferry under construction at the dock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipConstruction {
    pub unit: UnitId,
    pub progress: Fixed64,
}

/// What one build action did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShipAction {
    Spawned { unit: UnitId, position: TilePosition },
    Progressed { unit: UnitId, progress: Fixed64 },
    Launched { unit: UnitId },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DockFerryController {
    dock: Option<DockPosition>,
    ship: Option<ShipConstruction>,
}

impl DockFerryController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dock(&self) -> Option<DockPosition> {
        self.dock
    }

    pub fn ship(&self) -> Option<ShipConstruction> {
        self.ship
    }

    /// Register `dock`, replacing any previous one. The old anchor is
    /// unregistered and a half-built ferry is destroyed.
    ///
    /// Returns the abandoned ferry, if there was one.
    pub fn set_dock(
        &mut self,
        dock: DockPosition,
        player: PlayerId,
        grid: &mut dyn BuildingsGrid,
        units: &mut dyn TransportUnits,
    ) -> Option<UnitId> {
        let mut abandoned = None;
        if let Some(old) = self.dock.take() {
            grid.set_dock(old, false, player);
            abandoned = self.abandon_ship(units);
        }
        self.dock = Some(dock);
        grid.set_dock(dock, true, player);
        abandoned
    }

    /// Advance ferry construction by one action.
    pub fn build_ship_action(
        &mut self,
        player: PlayerId,
        units: &mut dyn TransportUnits,
    ) -> Result<ShipAction, DockError> {
        let dock = self.dock.ok_or(DockError::NoDock)?;

        let Some(ship) = self.ship.as_mut() else {
            let position = dock.ship_spawn_position()?;
            let unit = units.spawn(MovableKind::Ferry, position, player);
            units.set_direction(unit, dock.ship_direction());
            self.ship = Some(ShipConstruction {
                unit,
                progress: Fixed64::ZERO,
            });
            return Ok(ShipAction::Spawned { unit, position });
        };

        ship.progress += SHIP_PROGRESS_STEP;
        units.increase_state_progress(ship.unit, SHIP_PROGRESS_STEP);
        let unit = ship.unit;
        if ship.progress >= SHIP_COMPLETE_THRESHOLD {
            self.ship = None;
            return Ok(ShipAction::Launched { unit });
        }
        Ok(ShipAction::Progressed {
            unit,
            progress: ship.progress,
        })
    }

    #[cfg(test)]
    pub(crate) fn forget_dock(&mut self) {
        self.dock = None;
    }

    /// Kill the ferry under construction, if any.
    pub fn abandon_ship(&mut self, units: &mut dyn TransportUnits) -> Option<UnitId> {
        let ship = self.ship.take()?;
        units.kill(ship.unit);
        Some(ship.unit)
    }

    /// Destroy any half-built ferry and unregister the dock.
    pub fn tear_down(
        &mut self,
        player: PlayerId,
        grid: &mut dyn BuildingsGrid,
        units: &mut dyn TransportUnits,
    ) -> Option<UnitId> {
        let abandoned = self.abandon_ship(units);
        if let Some(dock) = self.dock.take() {
            grid.set_dock(dock, false, player);
        }
        abandoned
    }
}
