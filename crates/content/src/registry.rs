use std::path::Path;

use asct_common::CellPos;
use asct_kernel::Tile;
use serde::{Deserialize, Serialize};

/// Categories every registry starts with.
pub const DEFAULT_CATEGORIES: [&str; 2] = ["structural", "logic"];

/// Errors from catalog configuration.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("category '{0}' already exists")]
    DuplicateCategory(String),
    #[error("unknown category '{0}'")]
    UnknownCategory(String),
    #[error("category '{category}' has no tile at index {index}")]
    NoSuchTile { category: String, index: usize },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A selectable group of tile prototypes, kept ordered by tile name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileCategory {
    name: String,
    tiles: Vec<Tile>,
    current: usize,
}

impl TileCategory {
    fn new(name: String) -> Self {
        Self {
            name,
            tiles: Vec::new(),
            current: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Index of the selected prototype.
    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_tile(&self) -> Option<&Tile> {
        self.tiles.get(self.current)
    }

    pub fn select(&mut self, index: usize) -> Result<(), RegistryError> {
        if index >= self.tiles.len() {
            return Err(RegistryError::NoSuchTile {
                category: self.name.clone(),
                index,
            });
        }
        self.current = index;
        Ok(())
    }

    /// Stamp the selected prototype at `pos`.
    pub fn instantiate_current(&self, pos: CellPos) -> Option<Tile> {
        self.current_tile().map(|t| t.placed_at(pos))
    }

    /// Insert keeping name order; the selection follows the tile it pointed at.
    fn add(&mut self, prototype: Tile) {
        let at = self
            .tiles
            .partition_point(|t| t.cmp_by_name(&prototype).is_le());
        if !self.tiles.is_empty() && at <= self.current {
            self.current += 1;
        }
        self.tiles.insert(at, prototype);
    }
}

/// The set of tile categories shown to a player.
///
/// Names are case-insensitive and stored lowercase. `structural` and `logic`
/// always exist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRegistry {
    categories: Vec<TileCategory>,
}

impl Default for CategoryRegistry {
    fn default() -> Self {
        Self {
            categories: DEFAULT_CATEGORIES
                .iter()
                .map(|name| TileCategory::new((*name).to_string()))
                .collect(),
        }
    }
}

impl CategoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_category(&mut self, name: &str) -> Result<(), RegistryError> {
        let name = name.to_lowercase();
        if self.categories.iter().any(|c| c.name == name) {
            return Err(RegistryError::DuplicateCategory(name));
        }
        tracing::debug!(category = %name, "registered tile category");
        self.categories.push(TileCategory::new(name));
        Ok(())
    }

    /// Categories in registration order.
    pub fn categories(&self) -> &[TileCategory] {
        &self.categories
    }

    pub fn category(&self, name: &str) -> Option<&TileCategory> {
        let name = name.to_lowercase();
        self.categories.iter().find(|c| c.name == name)
    }

    pub fn category_mut(&mut self, name: &str) -> Option<&mut TileCategory> {
        let name = name.to_lowercase();
        self.categories.iter_mut().find(|c| c.name == name)
    }

    /// File a prototype under an existing category.
    pub fn register_tile(&mut self, category: &str, prototype: Tile) -> Result<(), RegistryError> {
        let Some(target) = self.category_mut(category) else {
            return Err(RegistryError::UnknownCategory(category.to_lowercase()));
        };
        target.add(prototype);
        Ok(())
    }

    /// First prototype with this display name, in any category.
    pub fn find(&self, tile_name: &str) -> Option<&Tile> {
        self.categories
            .iter()
            .flat_map(|c| c.tiles.iter())
            .find(|t| t.name() == tile_name)
    }

    /// Total number of registered prototypes.
    pub fn tile_count(&self) -> usize {
        self.categories.iter().map(TileCategory::len).sum()
    }

    /// Write the catalog to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), RegistryError> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    /// Read a catalog written by [`save`](Self::save). Duplicate or missing
    /// default categories are rejected.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let file = std::fs::File::open(path)?;
        let loaded: Self = serde_json::from_reader(file)?;

        let mut checked = Self { categories: Vec::new() };
        for category in loaded.categories {
            let name = category.name.to_lowercase();
            if checked.categories.iter().any(|c| c.name == name) {
                return Err(RegistryError::DuplicateCategory(name));
            }
            checked.categories.push(TileCategory { name, ..category });
        }
        for name in DEFAULT_CATEGORIES {
            if checked.category(name).is_none() {
                return Err(RegistryError::UnknownCategory(name.to_string()));
            }
        }
        Ok(checked)
    }
}
