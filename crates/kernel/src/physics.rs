//! Per-cell physical update: molten gravity, heat diffusion and timers.

use asct_common::{AMBIENT_TEMPERATURE, CellPos};
use rand::Rng;

use crate::layer::{Layer, SeveredVia};

/// Update the tile at `pos` once. Returns the via it had to drop if it fell.
pub(crate) fn update_cell<R: Rng + ?Sized>(
    layer: &mut Layer,
    pos: CellPos,
    rng: &mut R,
) -> Option<SeveredVia> {
    let (pos, severed) = apply_gravity(layer, pos, rng);
    diffuse_heat(layer, pos);
    if let Some(tile) = layer.tile_mut(pos) {
        tile.advance_timers();
    }
    severed
}

/// Move a molten tile down, or diagonally down when blocked. Returns the
/// tile's position after the update.
fn apply_gravity<R: Rng + ?Sized>(
    layer: &mut Layer,
    pos: CellPos,
    rng: &mut R,
) -> (CellPos, Option<SeveredVia>) {
    let Some(tile) = layer.tile_mut(pos) else {
        return (pos, None);
    };
    if !tile.thermal.is_molten() {
        return (pos, None);
    }
    tile.thermal.fall_ticks = tile.thermal.fall_ticks.saturating_add(1);
    if tile.thermal.fall_ticks < tile.thermal.fall_threshold {
        return (pos, None);
    }
    let viscosity = tile.thermal.viscosity;

    let mut at = pos;
    let mut severed = None;
    if let Some(dest) = fall_target(layer, pos, rng) {
        if layer.swap(pos, dest).is_ok() {
            at = dest;
            if let Some(tile) = layer.tile_mut(dest) {
                if let Some(partner_layer) = tile.via() {
                    tile.set_via(None);
                    severed = Some(SeveredVia { pos, partner_layer });
                }
            }
        }
    }

    let threshold = rng.random_range(viscosity.saturating_sub(2)..=viscosity.saturating_add(2));
    if let Some(tile) = layer.tile_mut(at) {
        tile.thermal.fall_ticks = 0;
        tile.thermal.fall_threshold = threshold;
    }
    (at, severed)
}

fn fall_target<R: Rng + ?Sized>(layer: &Layer, pos: CellPos, rng: &mut R) -> Option<CellPos> {
    let free = |p: Option<CellPos>| p.filter(|&p| layer.contains(p) && layer.tile(p).is_none());

    if let Some(below) = free(pos.offset(0, 1)) {
        return Some(below);
    }
    let left = pos.offset(-1, 1);
    let right = pos.offset(1, 1);
    let (first, second) = if rng.random_bool(0.5) {
        (left, right)
    } else {
        (right, left)
    };
    free(first).or_else(|| free(second))
}

/// Radiate heat to the four neighbors in left, right, up, down order.
///
/// Empty cells (and the grid border) are air: a sink that never warms and
/// never cools a tile below ambient. Colder tiles receive exactly what this
/// tile loses. Each step reads the temperature left by the previous one.
fn diffuse_heat(layer: &mut Layer, pos: CellPos) {
    for neighbor in pos.axis_neighbors() {
        let Some(tile) = layer.tile(pos) else {
            return;
        };
        let temperature = tile.thermal.temperature;
        if temperature <= AMBIENT_TEMPERATURE {
            return;
        }
        let irradiation = tile.thermal.irradiation_ratio;
        let air_irradiation = tile.thermal.air_irradiation_ratio;

        let target = neighbor.filter(|&p| layer.tile(p).is_some());
        match target {
            None => {
                if let Some(tile) = layer.tile_mut(pos) {
                    let cooled = temperature - temperature * air_irradiation;
                    tile.thermal.temperature = cooled.max(AMBIENT_TEMPERATURE);
                }
            }
            Some(target) => {
                let colder = layer
                    .tile(target)
                    .is_some_and(|t| t.thermal.temperature < temperature);
                if !colder {
                    continue;
                }
                let amount = temperature * irradiation;
                if let Some(other) = layer.tile_mut(target) {
                    other.thermal.temperature += amount;
                }
                if let Some(tile) = layer.tile_mut(pos) {
                    tile.thermal.temperature -= amount;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::Tile;
    use approx::assert_relative_eq;
    use asct_common::Rgb;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn block(x: u32, y: u32) -> Tile {
        Tile::static_block(CellPos::new(x, y), "Stone", "STNE", Rgb(90, 90, 90))
    }

    fn molten(x: u32, y: u32) -> Tile {
        let mut t = block(x, y);
        t.set_temperature(1000.0);
        t.thermal.air_irradiation_ratio = 0.0;
        t.thermal.irradiation_ratio = 0.0;
        t.thermal.fall_threshold = 1;
        t
    }

    #[test]
    fn air_cooling_from_every_side() {
        let mut layer = Layer::new(5).unwrap();
        let mut t = block(2, 2);
        t.set_temperature(100.0);
        layer.insert(t).unwrap();
        diffuse_heat(&mut layer, CellPos::new(2, 2));
        let expected = 100.0 * 0.985_f32.powi(4);
        assert_relative_eq!(
            layer.tile(CellPos::new(2, 2)).unwrap().temperature(),
            expected,
            epsilon = 1e-3
        );
    }

    #[test]
    fn air_never_cools_below_ambient() {
        let mut layer = Layer::new(3).unwrap();
        let mut t = block(1, 1);
        t.set_temperature(27.2);
        layer.insert(t).unwrap();
        for _ in 0..10 {
            diffuse_heat(&mut layer, CellPos::new(1, 1));
        }
        assert_eq!(layer.tile(CellPos::new(1, 1)).unwrap().temperature(), 27.0);
    }

    #[test]
    fn ambient_tile_is_untouched() {
        let mut layer = Layer::new(3).unwrap();
        layer.insert(block(1, 1)).unwrap();
        diffuse_heat(&mut layer, CellPos::new(1, 1));
        assert_eq!(layer.tile(CellPos::new(1, 1)).unwrap().temperature(), 27.0);
    }

    #[test]
    fn transfer_to_colder_neighbor_is_conserved() {
        let mut layer = Layer::new(3).unwrap();
        let mut hot = block(0, 0);
        hot.set_temperature(100.0);
        hot.thermal.air_irradiation_ratio = 0.0;
        layer.insert(hot).unwrap();
        layer.insert(block(1, 0)).unwrap();
        diffuse_heat(&mut layer, CellPos::new(0, 0));
        let a = layer.tile(CellPos::new(0, 0)).unwrap().temperature();
        let b = layer.tile(CellPos::new(1, 0)).unwrap().temperature();
        assert_relative_eq!(a, 97.5, epsilon = 1e-4);
        assert_relative_eq!(b, 29.5, epsilon = 1e-4);
        assert_relative_eq!(a + b, 127.0, epsilon = 1e-4);
    }

    #[test]
    fn later_neighbors_see_reduced_temperature() {
        // Left and right neighbors: the right one receives 2.5% of the
        // already-reduced temperature, so it ends slightly cooler.
        let mut layer = Layer::new(3).unwrap();
        let mut hot = block(1, 0);
        hot.set_temperature(100.0);
        hot.thermal.air_irradiation_ratio = 0.0;
        layer.insert(hot).unwrap();
        layer.insert(block(0, 0)).unwrap();
        layer.insert(block(2, 0)).unwrap();
        diffuse_heat(&mut layer, CellPos::new(1, 0));
        let left = layer.tile(CellPos::new(0, 0)).unwrap().temperature();
        let right = layer.tile(CellPos::new(2, 0)).unwrap().temperature();
        assert_relative_eq!(left, 29.5, epsilon = 1e-4);
        assert_relative_eq!(right, 27.0 + 97.5 * 0.025, epsilon = 1e-4);
        assert!(left > right);
    }

    #[test]
    fn hotter_neighbor_gets_nothing() {
        let mut layer = Layer::new(3).unwrap();
        let mut warm = block(0, 0);
        warm.set_temperature(50.0);
        warm.thermal.air_irradiation_ratio = 0.0;
        let mut hot = block(1, 0);
        hot.set_temperature(80.0);
        layer.insert(warm).unwrap();
        layer.insert(hot).unwrap();
        diffuse_heat(&mut layer, CellPos::new(0, 0));
        assert_eq!(layer.tile(CellPos::new(1, 0)).unwrap().temperature(), 80.0);
        assert_eq!(layer.tile(CellPos::new(0, 0)).unwrap().temperature(), 50.0);
    }

    #[test]
    fn molten_tile_falls_straight_down() {
        let mut layer = Layer::new(4).unwrap();
        layer.insert(molten(1, 0)).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let (at, severed) = apply_gravity(&mut layer, CellPos::new(1, 0), &mut rng);
        assert_eq!(at, CellPos::new(1, 1));
        assert!(severed.is_none());
        assert!(layer.tile(CellPos::new(1, 0)).is_none());
        let t = layer.tile(at).unwrap();
        assert_eq!(t.pos(), at);
        assert_eq!(t.thermal.fall_ticks, 0);
        assert!(t.thermal.fall_threshold <= 4);
    }

    #[test]
    fn blocked_below_slides_diagonally() {
        let mut layer = Layer::new(4).unwrap();
        layer.insert(molten(1, 0)).unwrap();
        layer.insert(block(1, 1)).unwrap();
        layer.insert(block(0, 1)).unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        let (at, _) = apply_gravity(&mut layer, CellPos::new(1, 0), &mut rng);
        assert_eq!(at, CellPos::new(2, 1));
    }

    #[test]
    fn fully_blocked_stays_put() {
        let mut layer = Layer::new(4).unwrap();
        layer.insert(molten(1, 0)).unwrap();
        for x in 0..3 {
            layer.insert(block(x, 1)).unwrap();
        }
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            let (at, _) = apply_gravity(&mut layer, CellPos::new(1, 0), &mut rng);
            assert_eq!(at, CellPos::new(1, 0));
        }
    }

    #[test]
    fn floor_holds_molten_tiles() {
        let mut layer = Layer::new(2).unwrap();
        layer.insert(molten(0, 1)).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let (at, _) = apply_gravity(&mut layer, CellPos::new(0, 1), &mut rng);
        assert_eq!(at, CellPos::new(0, 1));
    }

    #[test]
    fn zero_threshold_falls_next_tick() {
        let mut layer = Layer::new(4).unwrap();
        let mut t = molten(0, 0);
        t.thermal.fall_threshold = 0;
        layer.insert(t).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let (at, _) = apply_gravity(&mut layer, CellPos::new(0, 0), &mut rng);
        assert_eq!(at, CellPos::new(0, 1));
    }

    #[test]
    fn extreme_viscosity_rerolls_without_overflow() {
        let mut layer = Layer::new(4).unwrap();
        let mut t = molten(1, 0);
        t.thermal.viscosity = u32::MAX;
        t.thermal.fall_ticks = u32::MAX;
        layer.insert(t).unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        let (at, _) = apply_gravity(&mut layer, CellPos::new(1, 0), &mut rng);
        assert_eq!(at, CellPos::new(1, 1));
        assert!(layer.tile(at).unwrap().thermal.fall_threshold >= u32::MAX - 2);
    }

    #[test]
    fn solid_tile_does_not_move() {
        let mut layer = Layer::new(4).unwrap();
        layer.insert(block(1, 0)).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let (at, _) = apply_gravity(&mut layer, CellPos::new(1, 0), &mut rng);
        assert_eq!(at, CellPos::new(1, 0));
        assert_eq!(layer.tile(at).unwrap().thermal.fall_ticks, 0);
    }
}
