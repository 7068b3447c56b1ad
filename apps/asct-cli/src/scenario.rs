//! Canned circuits for trying the simulation from the command line.

use anyhow::{Context, bail};
use asct_common::CellPos;
use asct_content::CategoryRegistry;
use asct_kernel::{GameMap, SimConfig};
use clap::ValueEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// A wire with a single pulse travelling along it.
    Strip,
    /// P-type feeding N-type, and N-type failing to feed P-type.
    Diode,
    /// N-type arms a transistor that P-type then fires into a wire.
    Transistor,
    /// A blob of molten solder falling onto a ledge.
    Lava,
    /// A row of pixels lit from one end.
    Pixels,
}

fn stamp(
    map: &mut GameMap,
    registry: &CategoryRegistry,
    layer: usize,
    name: &str,
    x: u32,
    y: u32,
) -> anyhow::Result<()> {
    let prototype = registry
        .find(name)
        .with_context(|| format!("tile '{name}' is not in the catalog"))?;
    map.place_tile(layer, prototype.placed_at(CellPos::new(x, y)))?;
    Ok(())
}

impl Scenario {
    pub fn build(self, config: &SimConfig, registry: &CategoryRegistry) -> anyhow::Result<GameMap> {
        if config.layer_side < 16 {
            bail!("scenarios need a layer side of at least 16, got {}", config.layer_side);
        }
        let mut map = GameMap::from_config(config)?;
        if map.layer_count() == 0 {
            bail!("scenarios need at least one layer");
        }
        let m = &mut map;
        match self {
            Scenario::Strip => {
                for x in 1..12 {
                    stamp(m, registry, 0, "Copper Wire", x, 2)?;
                }
                m.set_powered(0, CellPos::new(1, 2), true)?;
            }
            Scenario::Diode => {
                stamp(m, registry, 0, "P-type Silicon", 1, 1)?;
                stamp(m, registry, 0, "N-type Silicon", 2, 1)?;
                stamp(m, registry, 0, "Copper Wire", 3, 1)?;
                stamp(m, registry, 0, "N-type Silicon", 1, 3)?;
                stamp(m, registry, 0, "P-type Silicon", 2, 3)?;
                stamp(m, registry, 0, "Copper Wire", 3, 3)?;
                m.set_powered(0, CellPos::new(1, 1), true)?;
                m.set_powered(0, CellPos::new(1, 3), true)?;
            }
            Scenario::Transistor => {
                stamp(m, registry, 0, "N-type Silicon", 2, 1)?;
                stamp(m, registry, 0, "P-type Silicon", 1, 2)?;
                stamp(m, registry, 0, "Transistor", 2, 2)?;
                for x in 3..8 {
                    stamp(m, registry, 0, "Copper Wire", x, 2)?;
                }
                m.set_powered(0, CellPos::new(2, 1), true)?;
                m.set_powered(0, CellPos::new(1, 2), true)?;
            }
            Scenario::Lava => {
                for x in 4..12 {
                    stamp(m, registry, 0, "Insulator", x, 10)?;
                }
                for (x, y) in [(7, 0), (8, 0), (7, 1), (8, 1)] {
                    stamp(m, registry, 0, "Insulator", x, y)?;
                    if let Some(tile) = m.tile_mut(0, CellPos::new(x, y)) {
                        tile.set_temperature(900.0);
                    }
                }
            }
            Scenario::Pixels => {
                for x in 1..8 {
                    stamp(m, registry, 0, "Red Pixel", x, 1)?;
                }
                stamp(m, registry, 0, "Blue Pixel", 8, 1)?;
                stamp(m, registry, 0, "P-type Silicon", 1, 2)?;
                // Let fresh pixels settle before the P-type fires.
                for _ in 0..4 {
                    m.step();
                }
                m.set_powered(0, CellPos::new(1, 2), true)?;
            }
        }
        let tiles: usize = map.layers().iter().map(|l| l.len()).sum();
        tracing::debug!(scenario = ?self, tiles, "scenario built");
        Ok(map)
    }
}
