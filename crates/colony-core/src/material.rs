use crate::fixed::Fixed64;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A material a building can request, store, or produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MaterialKind {
    Trunk,
    Plank,
    Stone,
    Coal,
    IronOre,
    Iron,
    GoldOre,
    Gold,
    Crop,
    Flour,
    Bread,
    Fish,
    Pig,
    Meat,
    Water,
    Wine,
    Axe,
    Pick,
    Saw,
    Hammer,
    Sword,
    Bow,
}

/// Kinds of map objects the grid keeps on tiles (flags, animals, crops ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MapObjectKind {
    FlagRoof,
    Pig,
    Donkey,
    Wheat,
    Vine,
}

/// The job a worker performs; each building template names one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WorkerKind {
    Lumberjack,
    Sawmiller,
    Stonecutter,
    Miner,
    Smith,
    Farmer,
    Miller,
    Baker,
    Fisher,
    PigFarmer,
    DonkeyFarmer,
    Butcher,
    Winegrower,
    Shipwright,
}

/// Kinds of movable units this subsystem can spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovableKind {
    Ferry,
}

/// Per-player production preferences the grid stores for a region: relative
/// ratios and absolute request counts per material (tools and weapons).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialProductionSettings {
    pub ratios: BTreeMap<MaterialKind, Fixed64>,
    pub absolute: BTreeMap<MaterialKind, u32>,
}

impl MaterialProductionSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configured ratio for a material; zero if unset.
    pub fn ratio(&self, material: MaterialKind) -> Fixed64 {
        self.ratios.get(&material).copied().unwrap_or(Fixed64::ZERO)
    }

    /// Outstanding absolute requests for a material.
    pub fn absolute(&self, material: MaterialKind) -> u32 {
        self.absolute.get(&material).copied().unwrap_or(0)
    }

    pub fn set_ratio(&mut self, material: MaterialKind, ratio: Fixed64) {
        self.ratios.insert(material, ratio);
    }

    pub fn set_absolute(&mut self, material: MaterialKind, count: u32) {
        self.absolute.insert(material, count);
    }
}
