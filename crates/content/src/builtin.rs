//! Prototypes shipped with the simulation.

use asct_common::{CellPos, Rgb};
use asct_kernel::Tile;

use crate::pack::{ContentPack, Prototype};

/// The stock catalog: silicon, transistor and a handful of example tiles.
#[derive(Debug, Clone, Copy, Default)]
pub struct Builtin;

impl Builtin {
    /// Light colors offered as pixels, with their unlit shades.
    const PIXELS: [(&'static str, &'static str, Rgb, Rgb); 3] = [
        ("Red Pixel", "RPXL", Rgb(255, 40, 40), Rgb(70, 12, 12)),
        ("Green Pixel", "GPXL", Rgb(40, 255, 40), Rgb(12, 70, 12)),
        ("Blue Pixel", "BPXL", Rgb(40, 80, 255), Rgb(12, 22, 70)),
    ];
}

impl ContentPack for Builtin {
    fn name(&self) -> &str {
        "builtin"
    }

    fn prototypes(&self) -> Vec<Prototype> {
        let origin = CellPos::new(0, 0);
        let mut out = vec![
            Prototype::new(Tile::n_silicon(origin)),
            Prototype::new(Tile::p_silicon(origin)),
            Prototype::new(Tile::transistor(origin)),
            Prototype::new(Tile::logic_gate(origin, "Buffer Gate", "BUFG", Rgb(40, 200, 90))),
            Prototype::new(Tile::conductor(origin, "Copper Wire", "CPPR", Rgb(184, 115, 51))),
            Prototype::new(Tile::static_block(origin, "Insulator", "INSL", Rgb(70, 70, 70))),
        ];
        out.extend(
            Self::PIXELS
                .into_iter()
                .map(|(name, short, on, off)| Prototype::new(Tile::pixel(origin, name, short, on, off))),
        );
        out
    }
}
