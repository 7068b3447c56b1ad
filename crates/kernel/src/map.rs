use asct_common::CellPos;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::SimConfig;
use crate::error::MapError;
use crate::layer::Layer;
use crate::propagation;
use crate::tile::{RenderState, Tile};

/// The whole world: an ordered stack of layers plus a viewing cursor.
///
/// Stack order is the tick order and the editing order. The cursor only
/// selects what is shown or edited; every step advances every layer.
///
/// Stepping is reproducible: the seed is advanced with splitmix64 each step
/// and feeds the generator used for gravity, so the same seed and the same
/// edits produce the same map.
#[derive(Debug, Clone)]
pub struct GameMap {
    layers: Vec<Layer>,
    current_layer: usize,
    tick: u64,
    seed: u64,
}

impl GameMap {
    /// Create a map from existing layers (possibly none) with seed 0.
    pub fn new(layers: Vec<Layer>) -> Self {
        Self::with_seed(layers, 0)
    }

    /// Create a map with a specific seed for deterministic replay. Vias
    /// carried in by the layers are dropped.
    pub fn with_seed(mut layers: Vec<Layer>, seed: u64) -> Self {
        for layer in &mut layers {
            layer.clear_vias();
        }
        Self {
            layers,
            current_layer: 0,
            tick: 0,
            seed,
        }
    }

    /// Create `config.layer_count` empty layers of `config.layer_side`.
    pub fn from_config(config: &SimConfig) -> Result<Self, MapError> {
        config.validate()?;
        let layers = (0..config.layer_count)
            .map(|_| Layer::new(config.layer_side))
            .collect::<Result<_, _>>()?;
        Ok(Self::with_seed(layers, config.seed))
    }

    /// Steps taken so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Restore the step counter and seed (used by snapshot restore).
    pub fn set_clock(&mut self, tick: u64, seed: u64) {
        self.tick = tick;
        self.seed = seed;
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    fn checked_layer(&self, index: usize) -> Result<&Layer, MapError> {
        self.layers.get(index).ok_or(MapError::NoSuchLayer(index))
    }

    fn checked_layer_mut(&mut self, index: usize) -> Result<&mut Layer, MapError> {
        self.layers.get_mut(index).ok_or(MapError::NoSuchLayer(index))
    }

    /// Append a layer on top of the stack and return its index. Vias carried
    /// in by the layer are dropped.
    pub fn add_layer(&mut self, mut layer: Layer) -> usize {
        layer.clear_vias();
        self.layers.push(layer);
        self.layers.len() - 1
    }

    // --- cursor ---

    pub fn current_layer(&self) -> usize {
        self.current_layer
    }

    pub fn current(&self) -> Option<&Layer> {
        self.layers.get(self.current_layer)
    }

    pub fn set_current_layer(&mut self, index: usize) -> Result<(), MapError> {
        self.checked_layer(index)?;
        self.current_layer = index;
        Ok(())
    }

    /// Move the cursor up one layer, wrapping to the bottom.
    pub fn increase_layer(&mut self) {
        if self.current_layer + 1 < self.layers.len() {
            self.current_layer += 1;
        } else {
            self.current_layer = 0;
        }
    }

    /// Move the cursor down one layer, wrapping to the top.
    pub fn decrease_layer(&mut self) {
        if self.current_layer > 0 {
            self.current_layer -= 1;
        } else {
            self.current_layer = self.layers.len().saturating_sub(1);
        }
    }

    // --- tiles ---

    pub fn tile(&self, layer: usize, pos: CellPos) -> Option<&Tile> {
        self.layers.get(layer)?.tile(pos)
    }

    pub fn tile_mut(&mut self, layer: usize, pos: CellPos) -> Option<&mut Tile> {
        self.layers.get_mut(layer)?.tile_mut(pos)
    }

    /// Addressed read that reports bad layers and positions.
    pub fn tile_at(&self, layer: usize, pos: CellPos) -> Result<Option<&Tile>, MapError> {
        self.checked_layer(layer)?.tile_at(pos)
    }

    /// Place `tile` at its own position on `layer`, replacing (and unlinking)
    /// whatever was there. The placed tile starts without a via.
    pub fn place_tile(&mut self, layer: usize, tile: Tile) -> Result<Option<Tile>, MapError> {
        let pos = tile.pos();
        let tile = tile.placed_at(pos);
        let replaced = self.checked_layer_mut(layer)?.insert(tile)?;
        Ok(replaced.map(|old| self.detach(layer, old)))
    }

    /// Remove the tile at `pos`, tearing down any via it holds.
    pub fn remove_tile(&mut self, layer: usize, pos: CellPos) -> Result<Option<Tile>, MapError> {
        let removed = self.checked_layer_mut(layer)?.remove(pos)?;
        Ok(removed.map(|old| self.detach(layer, old)))
    }

    /// Swap two cells of one layer. Tiles that move lose their vias.
    pub fn swap_tiles(&mut self, layer: usize, a: CellPos, b: CellPos) -> Result<(), MapError> {
        let plane = self.checked_layer(layer)?;
        plane.tile_at(a)?;
        plane.tile_at(b)?;
        if a == b {
            return Ok(());
        }
        self.unlink_via(layer, a);
        self.unlink_via(layer, b);
        self.checked_layer_mut(layer)?.swap(a, b)
    }

    fn detach(&mut self, layer: usize, mut tile: Tile) -> Tile {
        if let Some(partner) = tile.via() {
            tile.set_via(None);
            self.clear_partner(partner, tile.pos(), layer);
        }
        tile
    }

    fn clear_partner(&mut self, partner_layer: usize, pos: CellPos, from_layer: usize) {
        if let Some(partner) = self.tile_mut(partner_layer, pos) {
            if partner.via() == Some(from_layer) {
                partner.set_via(None);
            }
        }
    }

    /// Power a tile directly, bypassing gates and pixel source rules.
    /// Returns whether it accepted the value.
    pub fn set_powered(&mut self, layer: usize, pos: CellPos, value: bool) -> Result<bool, MapError> {
        let plane = self.checked_layer_mut(layer)?;
        plane.tile_at(pos)?;
        Ok(plane
            .tile_mut(pos)
            .is_some_and(|t| t.try_set_powered(value, None)))
    }

    // --- vias ---

    /// Link two power-capable tiles on different layers at the same
    /// position. Malformed requests (different coordinates, same tile,
    /// missing or non power-capable endpoints) are ignored and return
    /// `false`. Existing links on either end are replaced.
    pub fn link_via(&mut self, a: (usize, CellPos), b: (usize, CellPos)) -> bool {
        let ((la, pa), (lb, pb)) = (a, b);
        if pa != pb || la == lb {
            return false;
        }
        let capable = |map: &Self, l: usize, p: CellPos| {
            map.tile(l, p)
                .is_some_and(|t| t.kind().is_power_capable())
        };
        if !capable(self, la, pa) || !capable(self, lb, pb) {
            return false;
        }
        self.unlink_via(la, pa);
        self.unlink_via(lb, pb);
        if let Some(t) = self.tile_mut(la, pa) {
            t.set_via(Some(lb));
        }
        if let Some(t) = self.tile_mut(lb, pb) {
            t.set_via(Some(la));
        }
        tracing::debug!(pos = %pa, from = la, to = lb, "via linked");
        true
    }

    /// Clear the via on the tile at `pos` and on its partner. Returns whether
    /// a link existed.
    pub fn unlink_via(&mut self, layer: usize, pos: CellPos) -> bool {
        let Some(partner) = self.tile(layer, pos).and_then(|t| t.via()) else {
            return false;
        };
        if let Some(t) = self.tile_mut(layer, pos) {
            t.set_via(None);
        }
        self.clear_partner(partner, pos, layer);
        tracing::debug!(%pos, layer, partner, "via unlinked");
        true
    }

    // --- stepping ---

    /// Advance the whole map by one tick using the map's own seed.
    pub fn step(&mut self) {
        self.seed = splitmix64(self.seed);
        let mut rng = StdRng::seed_from_u64(self.seed);
        self.step_with(&mut rng);
    }

    /// Advance the whole map by one tick drawing randomness from `rng`.
    /// Layers are processed in stack order.
    pub fn step_with<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let _span = tracing::debug_span!("map_tick", tick = self.tick + 1).entered();
        for index in 0..self.layers.len() {
            self.tick_layer(index, rng);
        }
        self.tick += 1;
    }

    /// Two-phase update of one layer: propagate from the cells that were
    /// active when the phase began, then run physics on every tile.
    fn tick_layer<R: Rng + ?Sized>(&mut self, index: usize, rng: &mut R) {
        let active = self.layers[index].active_cells();
        tracing::trace!(layer = index, active = active.len(), "propagation phase");
        for pos in active {
            propagation::propagate(&mut self.layers, index, pos);
        }

        let severed = self.layers[index].update_physics(rng);
        for cut in severed {
            self.clear_partner(cut.partner_layer, cut.pos, index);
            tracing::debug!(pos = %cut.pos, layer = index, "via severed by falling tile");
        }
    }

    /// Render states for every occupied cell of `layer`.
    pub fn render_states(&self, layer: usize) -> Result<Vec<(CellPos, RenderState)>, MapError> {
        Ok(self.checked_layer(layer)?.render_states().collect())
    }
}

/// Splitmix64: advances the map seed each step in a platform-independent way.
fn splitmix64(mut state: u64) -> u64 {
    state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use asct_common::Rgb;

    fn wire(x: u32, y: u32) -> Tile {
        Tile::conductor(CellPos::new(x, y), "Copper", "CPPR", Rgb(184, 115, 51))
    }

    fn two_layers() -> GameMap {
        GameMap::new(vec![Layer::new(8).unwrap(), Layer::new(8).unwrap()])
    }

    #[test]
    fn map_starts_at_tick_zero() {
        let map = GameMap::new(Vec::new());
        assert_eq!(map.tick(), 0);
        assert_eq!(map.layer_count(), 0);
        assert!(map.current().is_none());
    }

    #[test]
    fn from_config_builds_layers() {
        let cfg = SimConfig {
            layer_side: 16,
            layer_count: 3,
            seed: 5,
        };
        let map = GameMap::from_config(&cfg).unwrap();
        assert_eq!(map.layer_count(), 3);
        assert_eq!(map.seed(), 5);
        assert_eq!(map.layer(2).unwrap().side(), 16);
    }

    #[test]
    fn step_advances_tick_and_seed() {
        let mut map = two_layers();
        map.step();
        map.step();
        assert_eq!(map.tick(), 2);
        assert_ne!(map.seed(), 0);
    }

    #[test]
    fn cursor_wraps_both_ways() {
        let layers = (0..3).map(|_| Layer::new(2).unwrap()).collect();
        let mut map = GameMap::new(layers);
        map.decrease_layer();
        assert_eq!(map.current_layer(), 2);
        map.increase_layer();
        assert_eq!(map.current_layer(), 0);
        map.increase_layer();
        assert_eq!(map.current_layer(), 1);
    }

    #[test]
    fn cursor_on_empty_map_stays_at_zero() {
        let mut map = GameMap::new(Vec::new());
        map.increase_layer();
        assert_eq!(map.current_layer(), 0);
        map.decrease_layer();
        assert_eq!(map.current_layer(), 0);
    }

    #[test]
    fn set_current_layer_checks_range() {
        let mut map = two_layers();
        assert!(map.set_current_layer(1).is_ok());
        assert_eq!(map.set_current_layer(2), Err(MapError::NoSuchLayer(2)));
        assert_eq!(map.current_layer(), 1);
    }

    #[test]
    fn bad_addresses_are_errors() {
        let mut map = two_layers();
        assert_eq!(map.place_tile(5, wire(0, 0)), Err(MapError::NoSuchLayer(5)));
        assert!(matches!(
            map.place_tile(0, wire(8, 0)),
            Err(MapError::OutOfBounds { .. })
        ));
        assert!(map.remove_tile(0, CellPos::new(0, 8)).is_err());
        assert!(map.set_powered(0, CellPos::new(99, 0), true).is_err());
    }

    #[test]
    fn link_is_symmetric() {
        let mut map = two_layers();
        let pos = CellPos::new(3, 3);
        map.place_tile(0, wire(3, 3)).unwrap();
        map.place_tile(1, wire(3, 3)).unwrap();
        assert!(map.link_via((0, pos), (1, pos)));
        assert_eq!(map.tile(0, pos).unwrap().via(), Some(1));
        assert_eq!(map.tile(1, pos).unwrap().via(), Some(0));

        assert!(map.unlink_via(1, pos));
        assert_eq!(map.tile(0, pos).unwrap().via(), None);
        assert_eq!(map.tile(1, pos).unwrap().via(), None);
    }

    #[test]
    fn malformed_links_are_ignored() {
        let mut map = two_layers();
        map.place_tile(0, wire(3, 3)).unwrap();
        map.place_tile(1, wire(3, 4)).unwrap();
        map.place_tile(
            1,
            Tile::static_block(CellPos::new(3, 3), "Stone", "STNE", Rgb(90, 90, 90)),
        )
        .unwrap();
        let p = CellPos::new(3, 3);
        assert!(!map.link_via((0, p), (1, CellPos::new(3, 4))));
        assert!(!map.link_via((0, p), (0, p)));
        assert!(!map.link_via((0, p), (1, p)));
        assert!(!map.link_via((0, CellPos::new(1, 1)), (1, CellPos::new(1, 1))));
        assert_eq!(map.tile(0, p).unwrap().via(), None);
    }

    #[test]
    fn removing_a_tile_clears_its_partner() {
        let mut map = two_layers();
        let pos = CellPos::new(1, 1);
        map.place_tile(0, wire(1, 1)).unwrap();
        map.place_tile(1, wire(1, 1)).unwrap();
        map.link_via((0, pos), (1, pos));
        let removed = map.remove_tile(0, pos).unwrap().unwrap();
        assert_eq!(removed.via(), None);
        assert_eq!(map.tile(1, pos).unwrap().via(), None);
    }

    #[test]
    fn tile_placed_after_removal_is_not_fed_by_old_link() {
        let mut map = two_layers();
        let pos = CellPos::new(3, 3);
        map.place_tile(0, wire(3, 3)).unwrap();
        map.place_tile(1, wire(3, 3)).unwrap();
        assert!(map.link_via((0, pos), (1, pos)));

        map.remove_tile(1, pos).unwrap();
        map.place_tile(1, wire(3, 3)).unwrap();
        assert_eq!(map.tile(0, pos).unwrap().via(), None);
        assert_eq!(map.tile(1, pos).unwrap().via(), None);

        map.set_powered(0, pos, true).unwrap();
        map.step();
        let fresh = map.tile(1, pos).unwrap();
        assert!(!fresh.is_powered());
        assert!(fresh.is_receptive());
    }

    #[test]
    fn layers_moved_between_maps_lose_their_vias() {
        let mut map = two_layers();
        let pos = CellPos::new(2, 2);
        map.place_tile(0, wire(2, 2)).unwrap();
        map.place_tile(1, wire(2, 2)).unwrap();
        assert!(map.link_via((0, pos), (1, pos)));

        let copied = map.layer(0).unwrap().clone();
        let mut other = GameMap::new(vec![copied.clone()]);
        assert_eq!(other.tile(0, pos).unwrap().via(), None);
        let index = other.add_layer(copied);
        assert_eq!(other.tile(index, pos).unwrap().via(), None);
        assert_eq!(map.tile(0, pos).unwrap().via(), Some(1));
    }

    #[test]
    fn from_config_rejects_zero_side() {
        let cfg = SimConfig {
            layer_side: 0,
            ..SimConfig::default()
        };
        assert_eq!(
            GameMap::from_config(&cfg).map(|m| m.layer_count()),
            Err(MapError::InvalidSide(0))
        );
    }

    #[test]
    fn replacing_a_tile_clears_its_partner() {
        let mut map = two_layers();
        let pos = CellPos::new(1, 1);
        map.place_tile(0, wire(1, 1)).unwrap();
        map.place_tile(1, wire(1, 1)).unwrap();
        map.link_via((0, pos), (1, pos));
        map.place_tile(0, Tile::n_silicon(pos)).unwrap();
        assert_eq!(map.tile(1, pos).unwrap().via(), None);
        assert_eq!(map.tile(0, pos).unwrap().via(), None);
    }

    #[test]
    fn swap_moves_tiles_and_drops_vias() {
        let mut map = two_layers();
        let pos = CellPos::new(1, 1);
        map.place_tile(0, wire(1, 1)).unwrap();
        map.place_tile(1, wire(1, 1)).unwrap();
        map.link_via((0, pos), (1, pos));
        map.swap_tiles(0, pos, CellPos::new(2, 1)).unwrap();
        let moved = map.tile(0, CellPos::new(2, 1)).unwrap();
        assert_eq!(moved.pos(), CellPos::new(2, 1));
        assert_eq!(moved.via(), None);
        assert_eq!(map.tile(1, pos).unwrap().via(), None);
    }

    #[test]
    fn falling_tile_severs_via() {
        let mut map = two_layers();
        let pos = CellPos::new(1, 1);
        let mut hot = wire(1, 1);
        hot.set_temperature(5000.0);
        hot.thermal.fall_threshold = 1;
        map.place_tile(0, hot).unwrap();
        map.place_tile(1, wire(1, 1)).unwrap();
        map.link_via((0, pos), (1, pos));
        map.step();
        assert!(map.tile(0, pos).is_none());
        assert_eq!(map.tile(0, CellPos::new(1, 2)).unwrap().via(), None);
        assert_eq!(map.tile(1, pos).unwrap().via(), None);
    }

    #[test]
    fn set_powered_on_empty_cell_is_false() {
        let mut map = two_layers();
        assert_eq!(map.set_powered(0, CellPos::new(0, 0), true), Ok(false));
    }

    #[test]
    fn render_states_follow_power() {
        let mut map = two_layers();
        map.place_tile(0, wire(0, 0)).unwrap();
        map.set_powered(0, CellPos::new(0, 0), true).unwrap();
        let states = map.render_states(0).unwrap();
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].1.color, Rgb::POWERED);
        assert!(map.render_states(4).is_err());
    }

    #[test]
    fn same_seed_same_result() {
        let build = || {
            let mut map = GameMap::with_seed(vec![Layer::new(8).unwrap()], 42);
            let mut hot = wire(4, 0);
            hot.set_temperature(5000.0);
            map.place_tile(0, hot).unwrap();
            map
        };
        let mut a = build();
        let mut b = build();
        for _ in 0..10 {
            a.step();
            b.step();
        }
        assert_eq!(a.seed(), b.seed());
        assert_eq!(
            a.layer(0).unwrap().occupied_positions(),
            b.layer(0).unwrap().occupied_positions()
        );
    }
}
