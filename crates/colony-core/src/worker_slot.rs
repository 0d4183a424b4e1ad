use crate::id::WorkerId;
use serde::{Deserialize, Serialize};

/// Occupancy of a worker building. Holds a non-owning handle to the worker;
/// the worker itself lives in the worker registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerSlot {
    #[default]
    Vacant,
    Occupied(WorkerId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SlotError {
    #[error("slot already held by {0:?}")]
    AlreadyOccupied(WorkerId),
    #[error("worker {caller:?} does not hold the slot (held by {held:?})")]
    WorkerMismatch {
        held: Option<WorkerId>,
        caller: WorkerId,
    },
}

impl WorkerSlot {
    pub fn is_occupied(&self) -> bool {
        matches!(self, WorkerSlot::Occupied(_))
    }

    pub fn worker(&self) -> Option<WorkerId> {
        match *self {
            WorkerSlot::Occupied(worker) => Some(worker),
            WorkerSlot::Vacant => None,
        }
    }

    /// `Vacant -> Occupied(worker)`.
    pub fn occupy(&mut self, worker: WorkerId) -> Result<(), SlotError> {
        match *self {
            WorkerSlot::Occupied(held) => Err(SlotError::AlreadyOccupied(held)),
            WorkerSlot::Vacant => {
                *self = WorkerSlot::Occupied(worker);
                Ok(())
            }
        }
    }

    /// `Occupied(worker) -> Vacant`, only for the worker holding the slot.
    pub fn vacate(&mut self, worker: WorkerId) -> Result<(), SlotError> {
        match *self {
            WorkerSlot::Occupied(held) if held == worker => {
                *self = WorkerSlot::Vacant;
                Ok(())
            }
            _ => Err(SlotError::WorkerMismatch {
                held: self.worker(),
                caller: worker,
            }),
        }
    }

    /// Force the slot vacant, returning the worker that held it.
    pub fn clear(&mut self) -> Option<WorkerId> {
        let worker = self.worker();
        *self = WorkerSlot::Vacant;
        worker
    }
}
