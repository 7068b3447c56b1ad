use serde::{Deserialize, Serialize};

use crate::error::MapError;

/// Default number of cells along each side of a layer.
pub const DEFAULT_LAYER_SIDE: u32 = 1024;

/// Largest side whose squared cell count still fits a signed 32-bit index.
pub const MAX_LAYER_SIDE: u32 = 46_340;

/// Simulation configuration. Every field has a default so partial JSON
/// files are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Cells along each side of every layer.
    pub layer_side: u32,
    /// Number of layers a fresh map starts with.
    pub layer_count: usize,
    /// Seed for gravity tie-breaks and viscosity re-rolls.
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            layer_side: DEFAULT_LAYER_SIDE,
            layer_count: 1,
            seed: 0,
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), MapError> {
        if self.layer_side == 0 || self.layer_side > MAX_LAYER_SIDE {
            return Err(MapError::InvalidSide(self.layer_side));
        }
        Ok(())
    }
}
