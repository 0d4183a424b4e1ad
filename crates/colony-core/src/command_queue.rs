//! Input command queue for externally-submitted building mutations.
//!
//! Commands are queued by the game client (UI, worker logic, network) and
//! executed at tick boundaries to maintain simulation determinism. Each
//! command represents a single atomic operation on one building.

use crate::geometry::TilePosition;
use crate::id::{BuildingId, WorkerId};
use crate::material::{MapObjectKind, MaterialKind};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Command enum
// ---------------------------------------------------------------------------

/// A single command that can be submitted to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Construction of the building finished.
    FinishConstruction { building: BuildingId },
    /// A worker reached the building it was assigned to.
    OccupyBuilding { building: BuildingId, worker: WorkerId },
    /// The worker leaves its building.
    LeaveBuilding { building: BuildingId, worker: WorkerId },
    /// Replace the production order.
    SetOrder {
        building: BuildingId,
        materials: Vec<MaterialKind>,
    },
    /// Player placed a dock: `[x, y, dx, dy]`. Validated when applied.
    SetDock { building: BuildingId, dock: [i32; 4] },
    /// Remember a map object to clean up when the building is destroyed.
    AddCleanupPosition {
        building: BuildingId,
        position: TilePosition,
        kind: MapObjectKind,
    },
    /// Destroy the building.
    Destroy { building: BuildingId },
}

impl Command {
    /// The building this command targets.
    pub fn building(&self) -> BuildingId {
        match *self {
            Command::FinishConstruction { building }
            | Command::OccupyBuilding { building, .. }
            | Command::LeaveBuilding { building, .. }
            | Command::SetOrder { building, .. }
            | Command::SetDock { building, .. }
            | Command::AddCleanupPosition { building, .. }
            | Command::Destroy { building } => building,
        }
    }
}

// ---------------------------------------------------------------------------
// CommandQueue
// ---------------------------------------------------------------------------

/// A queue of commands waiting to be executed at the next tick boundary.
///
/// Supports optional history tracking for replay and debugging.
#[derive(Debug, Default)]
pub struct CommandQueue {
    /// Commands waiting to be executed.
    pending: Vec<Command>,
    /// History of executed commands: (tick, command).
    history: Vec<(u64, Command)>,
    /// Maximum history entries to retain. 0 = no history.
    max_history: usize,
}

impl CommandQueue {
    /// Create a new empty command queue with no history tracking.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new command queue that retains up to `max_history` entries.
    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            max_history,
            ..Self::default()
        }
    }

    pub fn push(&mut self, command: Command) {
        self.pending.push(command);
    }

    pub fn push_batch(&mut self, commands: impl IntoIterator<Item = Command>) {
        self.pending.extend(commands);
    }

    /// Drain all pending commands, moving them to history with the given tick.
    /// Returns the drained commands in submission order.
    pub fn drain(&mut self, tick: u64) -> Vec<Command> {
        let commands: Vec<Command> = self.pending.drain(..).collect();

        if self.max_history > 0 {
            for cmd in &commands {
                self.history.push((tick, cmd.clone()));
            }
            let excess = self.history.len().saturating_sub(self.max_history);
            if excess > 0 {
                self.history.drain(..excess);
            }
        }

        commands
    }

    /// Commands not yet drained, in submission order.
    pub fn pending(&self) -> &[Command] {
        &self.pending
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Get the command history (tick, command) pairs.
    pub fn history(&self) -> &[(u64, Command)] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}
