use std::collections::BTreeSet;

use asct_common::CellPos;
use rand::Rng;

use crate::config::MAX_LAYER_SIDE;
use crate::error::MapError;
use crate::physics;
use crate::tile::{RenderState, Tile};

/// A via cut by a molten tile falling away from its partner. The map clears
/// the partner's side of the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeveredVia {
    /// Where the moving tile was, which is where the partner still sits.
    pub pos: CellPos,
    pub partner_layer: usize,
}

/// One depth plane: a dense `side * side` grid of optional tiles addressed
/// by `x + y * side`.
///
/// Occupied slots are also indexed in a sorted set so ticks walk tiles in
/// storage order without scanning empty cells.
#[derive(Debug, Clone)]
pub struct Layer {
    side: u32,
    cells: Vec<Option<Box<Tile>>>,
    occupied: BTreeSet<usize>,
}

impl Layer {
    /// Create an empty layer. Tiles are added through the map so vias stay
    /// paired.
    pub fn new(side: u32) -> Result<Self, MapError> {
        if side == 0 || side > MAX_LAYER_SIDE {
            return Err(MapError::InvalidSide(side));
        }
        let len = side as usize * side as usize;
        Ok(Self {
            side,
            cells: (0..len).map(|_| None).collect(),
            occupied: BTreeSet::new(),
        })
    }

    pub fn side(&self) -> u32 {
        self.side
    }

    /// Number of occupied cells.
    pub fn len(&self) -> usize {
        self.occupied.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occupied.is_empty()
    }

    pub fn contains(&self, pos: CellPos) -> bool {
        pos.x < self.side && pos.y < self.side
    }

    fn index(&self, pos: CellPos) -> Result<usize, MapError> {
        if !self.contains(pos) {
            return Err(MapError::OutOfBounds {
                pos,
                side: self.side,
            });
        }
        Ok(pos.x as usize + pos.y as usize * self.side as usize)
    }

    fn pos_of(&self, index: usize) -> CellPos {
        let side = self.side as usize;
        CellPos::new((index % side) as u32, (index / side) as u32)
    }

    /// Lookup that treats out-of-range positions as empty.
    pub fn tile(&self, pos: CellPos) -> Option<&Tile> {
        let index = self.index(pos).ok()?;
        self.cells[index].as_deref()
    }

    pub fn tile_mut(&mut self, pos: CellPos) -> Option<&mut Tile> {
        let index = self.index(pos).ok()?;
        self.cells[index].as_deref_mut()
    }

    /// Addressed read that reports out-of-range positions.
    pub fn tile_at(&self, pos: CellPos) -> Result<Option<&Tile>, MapError> {
        let index = self.index(pos)?;
        Ok(self.cells[index].as_deref())
    }

    /// Put `tile` at its own position, returning whatever was there.
    pub(crate) fn insert(&mut self, tile: Tile) -> Result<Option<Tile>, MapError> {
        let index = self.index(tile.pos())?;
        self.occupied.insert(index);
        Ok(self.cells[index].replace(Box::new(tile)).map(|b| *b))
    }

    /// Empty the cell at `pos`. Via teardown across layers is the map's job.
    pub(crate) fn remove(&mut self, pos: CellPos) -> Result<Option<Tile>, MapError> {
        let index = self.index(pos)?;
        self.occupied.remove(&index);
        Ok(self.cells[index].take().map(|b| *b))
    }

    /// Exchange the contents of two cells, keeping each tile's stored
    /// position in sync with its new slot.
    pub(crate) fn swap(&mut self, a: CellPos, b: CellPos) -> Result<(), MapError> {
        let ia = self.index(a)?;
        let ib = self.index(b)?;
        self.cells.swap(ia, ib);
        for (index, pos) in [(ia, a), (ib, b)] {
            match self.cells[index].as_deref_mut() {
                Some(tile) => {
                    tile.set_pos(pos);
                    self.occupied.insert(index);
                }
                None => {
                    self.occupied.remove(&index);
                }
            }
        }
        Ok(())
    }

    /// Drop every via on this layer. Used when a layer joins a map, since
    /// links only mean something inside the map that made them.
    pub(crate) fn clear_vias(&mut self) {
        for &index in &self.occupied {
            if let Some(tile) = self.cells[index].as_deref_mut() {
                tile.set_via(None);
            }
        }
    }

    /// Occupied tiles in storage order.
    pub fn iter(&self) -> impl Iterator<Item = &Tile> {
        self.occupied
            .iter()
            .filter_map(|&i| self.cells[i].as_deref())
    }

    /// Positions of every occupied cell, in storage order.
    pub fn occupied_positions(&self) -> Vec<CellPos> {
        self.occupied.iter().map(|&i| self.pos_of(i)).collect()
    }

    /// Propagation snapshot: cells that are powered or are spreading pixels,
    /// in storage order, taken before any propagation runs this tick.
    pub fn active_cells(&self) -> Vec<CellPos> {
        self.occupied
            .iter()
            .filter(|&&i| {
                self.cells[i]
                    .as_deref()
                    .is_some_and(|t| t.is_powered() || t.is_spreading())
            })
            .map(|&i| self.pos_of(i))
            .collect()
    }

    /// Physical phase: run gravity, heat diffusion and timers for every
    /// occupied cell exactly once, in storage order.
    pub fn update_physics<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Vec<SeveredVia> {
        let mut severed = Vec::new();
        for pos in self.occupied_positions() {
            if let Some(cut) = physics::update_cell(self, pos, rng) {
                severed.push(cut);
            }
        }
        severed
    }

    /// Render state of every occupied cell.
    pub fn render_states(&self) -> impl Iterator<Item = (CellPos, RenderState)> + '_ {
        self.iter().map(|t| (t.pos(), t.render_state()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asct_common::Rgb;

    fn wire(x: u32, y: u32) -> Tile {
        Tile::conductor(CellPos::new(x, y), "Copper", "CPPR", Rgb(184, 115, 51))
    }

    #[test]
    fn insert_and_lookup() {
        let mut layer = Layer::new(8).unwrap();
        assert!(layer.insert(wire(2, 3)).unwrap().is_none());
        assert_eq!(layer.len(), 1);
        assert!(layer.tile(CellPos::new(2, 3)).is_some());
        assert!(layer.tile(CellPos::new(3, 2)).is_none());
    }

    #[test]
    fn insert_replaces() {
        let mut layer = Layer::new(8).unwrap();
        layer.insert(wire(1, 1)).unwrap();
        let old = layer.insert(Tile::n_silicon(CellPos::new(1, 1))).unwrap();
        assert_eq!(old.map(|t| t.name().to_string()), Some("Copper".to_string()));
        assert_eq!(layer.len(), 1);
    }

    #[test]
    fn out_of_range_writes_are_errors() {
        let mut layer = Layer::new(4).unwrap();
        let err = layer.insert(wire(4, 0)).unwrap_err();
        assert_eq!(
            err,
            MapError::OutOfBounds {
                pos: CellPos::new(4, 0),
                side: 4
            }
        );
        assert!(layer.remove(CellPos::new(0, 4)).is_err());
        assert!(layer.tile_at(CellPos::new(9, 9)).is_err());
        assert!(layer.swap(CellPos::new(0, 0), CellPos::new(0, 4)).is_err());
    }

    #[test]
    fn last_cell_is_addressable() {
        let mut layer = Layer::new(4).unwrap();
        layer.insert(wire(3, 3)).unwrap();
        assert!(layer.tile_at(CellPos::new(3, 3)).unwrap().is_some());
        assert!(layer.remove(CellPos::new(3, 3)).unwrap().is_some());
        assert!(layer.is_empty());
    }

    #[test]
    fn bad_sides_are_errors() {
        assert!(matches!(Layer::new(0), Err(MapError::InvalidSide(0))));
        let too_big = MAX_LAYER_SIDE + 1;
        assert!(matches!(Layer::new(too_big), Err(MapError::InvalidSide(s)) if s == too_big));
        assert_eq!(Layer::new(1).unwrap().side(), 1);
    }

    #[test]
    fn out_of_range_lookup_is_empty() {
        let layer = Layer::new(4).unwrap();
        assert!(layer.tile(CellPos::new(100, 0)).is_none());
    }

    #[test]
    fn swap_keeps_positions_in_sync() {
        let mut layer = Layer::new(4).unwrap();
        layer.insert(wire(1, 1)).unwrap();
        layer.swap(CellPos::new(1, 1), CellPos::new(1, 2)).unwrap();
        assert!(layer.tile(CellPos::new(1, 1)).is_none());
        let moved = layer.tile(CellPos::new(1, 2)).unwrap();
        assert_eq!(moved.pos(), CellPos::new(1, 2));
        assert_eq!(layer.occupied_positions(), vec![CellPos::new(1, 2)]);
    }

    #[test]
    fn storage_order_is_row_major() {
        let mut layer = Layer::new(4).unwrap();
        layer.insert(wire(0, 2)).unwrap();
        layer.insert(wire(3, 0)).unwrap();
        layer.insert(wire(1, 2)).unwrap();
        assert_eq!(
            layer.occupied_positions(),
            vec![CellPos::new(3, 0), CellPos::new(0, 2), CellPos::new(1, 2)]
        );
    }

    #[test]
    fn active_cells_are_powered_or_spreading() {
        let mut layer = Layer::new(4).unwrap();
        layer.insert(wire(0, 0)).unwrap();
        let mut lit = wire(1, 0);
        lit.try_set_powered(true, None);
        layer.insert(lit).unwrap();
        layer
            .insert(Tile::pixel(
                CellPos::new(2, 0),
                "LED",
                "LED",
                Rgb(255, 0, 0),
                Rgb(40, 0, 0),
            ))
            .unwrap();
        assert_eq!(
            layer.active_cells(),
            vec![CellPos::new(1, 0), CellPos::new(2, 0)]
        );
    }
}
