use std::fmt;

use asct_common::CellPos;
use asct_kernel::{GameMap, Tile, TileKind};

/// Read-only queries against a map for debugging and tooling.
pub struct MapInspector;

impl MapInspector {
    pub fn summary(map: &GameMap) -> MapSummary {
        let tiles = map.layers().iter().flat_map(|l| l.iter());
        let mut summary = MapSummary {
            tick: map.tick(),
            seed: map.seed(),
            layers: map.layer_count(),
            current_layer: map.current_layer(),
            tiles: 0,
            powered: 0,
            refractory: 0,
            molten: 0,
            vias: 0,
            max_temperature: None,
        };
        for tile in tiles {
            summary.tiles += 1;
            summary.powered += usize::from(tile.is_powered());
            summary.refractory += usize::from(tile.power().is_some() && !tile.is_receptive());
            summary.molten += usize::from(tile.thermal.is_molten());
            summary.vias += usize::from(tile.via().is_some());
            let t = tile.temperature();
            summary.max_temperature = Some(summary.max_temperature.map_or(t, |m: f32| m.max(t)));
        }
        // Each link is held by both ends.
        summary.vias /= 2;
        summary
    }

    pub fn inspect_cell(map: &GameMap, layer: usize, pos: CellPos) -> Option<CellInfo> {
        map.tile(layer, pos).map(|tile| CellInfo::of(layer, tile))
    }

    /// Count of tiles per kind across every layer.
    pub fn census(map: &GameMap) -> Vec<(TileKind, usize)> {
        let mut counts: std::collections::BTreeMap<TileKind, usize> = Default::default();
        for tile in map.layers().iter().flat_map(|l| l.iter()) {
            *counts.entry(tile.kind()).or_default() += 1;
        }
        counts.into_iter().collect()
    }
}

/// Aggregate state of a map.
#[derive(Debug, Clone, PartialEq)]
pub struct MapSummary {
    pub tick: u64,
    pub seed: u64,
    pub layers: usize,
    pub current_layer: usize,
    pub tiles: usize,
    pub powered: usize,
    pub refractory: usize,
    pub molten: usize,
    pub vias: usize,
    /// Hottest tile, if there are any tiles.
    pub max_temperature: Option<f32>,
}

impl fmt::Display for MapSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Map: tick={} seed={} layers={} current={} tiles={} powered={} refractory={} molten={} vias={}",
            self.tick,
            self.seed,
            self.layers,
            self.current_layer,
            self.tiles,
            self.powered,
            self.refractory,
            self.molten,
            self.vias
        )?;
        if let Some(t) = self.max_temperature {
            write!(f, " max_temp={t:.1}")?;
        }
        Ok(())
    }
}

/// Everything worth knowing about one occupied cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CellInfo {
    pub layer: usize,
    pub pos: CellPos,
    pub name: String,
    pub kind: TileKind,
    pub temperature: f32,
    pub powered: bool,
    pub receptive: bool,
    pub conductive: bool,
    pub via: Option<usize>,
}

impl CellInfo {
    fn of(layer: usize, tile: &Tile) -> Self {
        Self {
            layer,
            pos: tile.pos(),
            name: tile.name().to_string(),
            kind: tile.kind(),
            temperature: tile.temperature(),
            powered: tile.is_powered(),
            receptive: tile.is_receptive(),
            conductive: tile.is_conductive(),
            via: tile.via(),
        }
    }
}

impl fmt::Display for CellInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{:?}] layer={} at {} temp={:.1} powered={} receptive={}",
            self.name, self.kind, self.layer, self.pos, self.temperature, self.powered, self.receptive
        )?;
        if self.conductive {
            write!(f, " conductive")?;
        }
        if let Some(partner) = self.via {
            write!(f, " via->{partner}")?;
        }
        Ok(())
    }
}
