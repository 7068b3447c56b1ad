//! Tile catalog for the ASCT simulation.
//!
//! Tiles reach a player through a [`CategoryRegistry`]: named, ordered groups
//! of prototypes. Content packs add categories in their
//! [`startup`](ContentPack::startup) hook and then contribute prototypes;
//! [`load_packs`] runs every hook before filing any tile.

pub mod builtin;
mod pack;
mod registry;

pub use builtin::Builtin;
pub use pack::{ContentPack, Prototype, load_packs};
pub use registry::{CategoryRegistry, DEFAULT_CATEGORIES, RegistryError, TileCategory};

/// Registry with the built-in catalog loaded.
pub fn stock_registry() -> Result<CategoryRegistry, RegistryError> {
    let mut registry = CategoryRegistry::new();
    load_packs(&mut registry, &[&Builtin])?;
    Ok(registry)
}
