use crate::material::MaterialKind;
use serde::{Deserialize, Serialize};

/// An ordered recipe with a cursor. `0 <= cursor <= materials.len()`; the
/// order is exhausted once the cursor reaches the end.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionOrder {
    materials: Vec<MaterialKind>,
    cursor: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    #[error("production order exhausted after {len} materials")]
    Exhausted { len: usize },
}

impl ProductionOrder {
    pub fn new(materials: Vec<MaterialKind>) -> Self {
        Self {
            materials,
            cursor: 0,
        }
    }

    /// Replace the recipe; any partially fulfilled order is abandoned.
    pub fn set(&mut self, materials: Vec<MaterialKind>) {
        self.materials = materials;
        self.cursor = 0;
    }

    /// The material at the cursor, or `None` once exhausted.
    pub fn ordered_material(&self) -> Option<MaterialKind> {
        self.materials.get(self.cursor).copied()
    }

    /// Advance the cursor by one.
    pub fn reduce(&mut self) -> Result<(), OrderError> {
        if self.is_exhausted() {
            return Err(OrderError::Exhausted {
                len: self.materials.len(),
            });
        }
        self.cursor += 1;
        Ok(())
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.materials.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn materials(&self) -> &[MaterialKind] {
        &self.materials
    }
}
