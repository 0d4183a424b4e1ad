use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a building in the engine's building table.
    pub struct BuildingId;

    /// Identifies a worker owned by the external worker registry.
    pub struct WorkerId;

    /// Identifies a movable unit (ferry, carrier, ...) owned by the unit grid.
    pub struct UnitId;
}

/// Identifies a building template in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BuildingTypeId(pub u32);

/// Identifies the player owning a building or unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub u8);
