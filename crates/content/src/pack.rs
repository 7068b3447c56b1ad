use asct_kernel::Tile;

use crate::registry::{CategoryRegistry, RegistryError};

/// A prototype offered by a content pack.
#[derive(Debug, Clone)]
pub struct Prototype {
    /// Category to list it under; `None` uses the kind's default.
    pub category: Option<String>,
    pub tile: Tile,
}

impl Prototype {
    pub fn new(tile: Tile) -> Self {
        Self {
            category: None,
            tile,
        }
    }

    pub fn in_category(category: impl Into<String>, tile: Tile) -> Self {
        Self {
            category: Some(category.into()),
            tile,
        }
    }

    pub fn category_name(&self) -> &str {
        self.category
            .as_deref()
            .unwrap_or_else(|| self.tile.kind().default_category())
    }
}

/// A bundle of tiles loaded into a registry before play starts.
pub trait ContentPack {
    fn name(&self) -> &str;

    /// Runs before any pack's tiles are filed. Register extra categories here.
    fn startup(&self, _registry: &mut CategoryRegistry) -> Result<(), RegistryError> {
        Ok(())
    }

    fn prototypes(&self) -> Vec<Prototype>;
}

/// Run every pack's startup hook, then file every pack's prototypes.
///
/// Returns the number of prototypes registered.
pub fn load_packs(
    registry: &mut CategoryRegistry,
    packs: &[&dyn ContentPack],
) -> Result<usize, RegistryError> {
    let _span = tracing::info_span!("load_packs", packs = packs.len()).entered();

    for pack in packs {
        pack.startup(registry)?;
    }

    let mut count = 0;
    for pack in packs {
        let prototypes = pack.prototypes();
        tracing::debug!(pack = pack.name(), tiles = prototypes.len(), "filing prototypes");
        for prototype in prototypes {
            let category = prototype.category_name().to_string();
            registry.register_tile(&category, prototype.tile)?;
            count += 1;
        }
    }

    tracing::info!(tiles = count, categories = registry.categories().len(), "content loaded");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use asct_common::{CellPos, Rgb};

    struct Optics;

    impl ContentPack for Optics {
        fn name(&self) -> &str {
            "optics"
        }

        fn startup(&self, registry: &mut CategoryRegistry) -> Result<(), RegistryError> {
            registry.register_category("Optics")
        }

        fn prototypes(&self) -> Vec<Prototype> {
            vec![
                Prototype::in_category(
                    "optics",
                    Tile::pixel(CellPos::new(0, 0), "Lamp", "LAMP", Rgb(255, 255, 200), Rgb(40, 40, 30)),
                ),
                Prototype::new(Tile::n_silicon(CellPos::new(0, 0))),
            ]
        }
    }

    /// Files under a category only the other pack's startup creates.
    struct Lenses;

    impl ContentPack for Lenses {
        fn name(&self) -> &str {
            "lenses"
        }

        fn prototypes(&self) -> Vec<Prototype> {
            vec![Prototype::in_category(
                "OPTICS",
                Tile::static_block(CellPos::new(0, 0), "Lens", "LENS", Rgb(180, 220, 255)),
            )]
        }
    }

    #[test]
    fn startup_runs_before_tiles_are_filed() {
        let mut registry = CategoryRegistry::new();
        let count = load_packs(&mut registry, &[&Lenses, &Optics]).unwrap();
        assert_eq!(count, 3);
        assert_eq!(registry.category("optics").unwrap().len(), 2);
        assert_eq!(registry.category("logic").unwrap().len(), 1);
    }

    #[test]
    fn default_category_comes_from_kind() {
        let p = Prototype::new(Tile::transistor(CellPos::new(0, 0)));
        assert_eq!(p.category_name(), "logic");
    }

    #[test]
    fn missing_category_fails() {
        let mut registry = CategoryRegistry::new();
        let err = load_packs(&mut registry, &[&Lenses]).unwrap_err();
        assert!(matches!(err, RegistryError::UnknownCategory(_)));
    }

    #[test]
    fn loading_a_pack_twice_fails_in_startup() {
        let mut registry = CategoryRegistry::new();
        let err = load_packs(&mut registry, &[&Optics, &Optics]).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateCategory(_)));
    }
}
