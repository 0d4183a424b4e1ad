use crate::id::BuildingTypeId;
use crate::material::{MaterialKind, WorkerKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which special behaviour a building template enables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildingVariant {
    /// Plain worker building: consumes request stacks, produces via its worker.
    Producer,
    /// Shipyard: additionally owns a dock and builds ferries there.
    Dockyard,
}

/// One request stack in a building template's layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackDef {
    pub material: MaterialKind,
    /// Offset of the stack tile relative to the building position.
    pub offset: (i32, i32),
    /// Maximum units the stack requests at once.
    pub capacity: u32,
}

/// A building template definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingTemplateDef {
    pub name: String,
    pub worker: WorkerKind,
    pub variant: BuildingVariant,
    pub stacks: Vec<StackDef>,
}

/// Builder for constructing an immutable Registry.
/// Three-phase lifecycle: registration -> mutation -> finalization.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    buildings: Vec<BuildingTemplateDef>,
    building_name_to_id: HashMap<String, BuildingTypeId>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Phase 1: Register a building template. Returns its ID.
    ///
    /// Re-registering a name keeps the first template; the duplicate is
    /// reported by [`RegistryBuilder::build`].
    pub fn register_building(
        &mut self,
        name: &str,
        worker: WorkerKind,
        variant: BuildingVariant,
        stacks: Vec<StackDef>,
    ) -> BuildingTypeId {
        let id = BuildingTypeId(self.buildings.len() as u32);
        self.buildings.push(BuildingTemplateDef {
            name: name.to_string(),
            worker,
            variant,
            stacks,
        });
        self.building_name_to_id.entry(name.to_string()).or_insert(id);
        id
    }

    /// Phase 2: Mutate an existing building template by name.
    pub fn mutate_building<F>(&mut self, name: &str, f: F) -> Result<(), RegistryError>
    where
        F: FnOnce(&mut BuildingTemplateDef),
    {
        let id = self
            .building_name_to_id
            .get(name)
            .ok_or(RegistryError::NotFound(name.to_string()))?;
        f(&mut self.buildings[id.0 as usize]);
        Ok(())
    }

    /// Lookup building type ID by name.
    pub fn building_id(&self, name: &str) -> Option<BuildingTypeId> {
        self.building_name_to_id.get(name).copied()
    }

    /// Phase 3: Finalize and build the immutable registry.
    pub fn build(self) -> Result<Registry, RegistryError> {
        if self.building_name_to_id.len() != self.buildings.len() {
            let mut seen = HashMap::new();
            for building in &self.buildings {
                if seen.insert(building.name.as_str(), ()).is_some() {
                    return Err(RegistryError::DuplicateName(building.name.clone()));
                }
            }
        }

        for building in &self.buildings {
            for (i, stack) in building.stacks.iter().enumerate() {
                if stack.capacity == 0 {
                    return Err(RegistryError::ZeroCapacity {
                        building: building.name.clone(),
                        material: stack.material,
                    });
                }
                if building.stacks[..i].iter().any(|s| s.material == stack.material) {
                    return Err(RegistryError::DuplicateStackMaterial {
                        building: building.name.clone(),
                        material: stack.material,
                    });
                }
            }
        }

        Ok(Registry {
            buildings: self.buildings,
            building_name_to_id: self.building_name_to_id,
        })
    }
}

/// Immutable registry. Frozen after build(). Thread-safe to share.
#[derive(Debug)]
pub struct Registry {
    buildings: Vec<BuildingTemplateDef>,
    building_name_to_id: HashMap<String, BuildingTypeId>,
}

impl Registry {
    pub fn get_building(&self, id: BuildingTypeId) -> Option<&BuildingTemplateDef> {
        self.buildings.get(id.0 as usize)
    }

    pub fn building_id(&self, name: &str) -> Option<BuildingTypeId> {
        self.building_name_to_id.get(name).copied()
    }

    pub fn building_count(&self) -> usize {
        self.buildings.len()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("duplicate building name: {0}")]
    DuplicateName(String),
    #[error("building '{building}' lists {material:?} in more than one stack")]
    DuplicateStackMaterial {
        building: String,
        material: MaterialKind,
    },
    #[error("building '{building}' has a zero-capacity {material:?} stack")]
    ZeroCapacity {
        building: String,
        material: MaterialKind,
    },
}
