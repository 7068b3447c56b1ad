//! Power propagation strategies.
//!
//! Conductors spread to type-filtered axis neighbors and across vias; pixels
//! flood their powered value to same-colored pixels. The two are kept apart
//! on purpose: they share a shape but not a rule.

use asct_common::CellPos;

use crate::layer::Layer;
use crate::tile::TileKind;

/// Run the propagation step of the tile at `pos` on `layers[layer]`.
pub(crate) fn propagate(layers: &mut [Layer], layer: usize, pos: CellPos) {
    let Some(kind) = layers
        .get(layer)
        .and_then(|l| l.tile(pos))
        .map(|t| t.kind())
    else {
        return;
    };
    match kind {
        TileKind::Pixel => flood_pixel(&mut layers[layer], pos),
        k if k.is_conductor_family() => spread_conductor(layers, layer, pos),
        _ => {}
    }
}

/// Forward a powered conductor's value to its valid neighbors and its via
/// partner, then drop its own power.
fn spread_conductor(layers: &mut [Layer], layer: usize, pos: CellPos) {
    let Some((kind, value, via)) = layers[layer]
        .tile(pos)
        .filter(|t| t.is_powered())
        .map(|t| (t.kind(), t.is_powered(), t.via()))
    else {
        return;
    };

    let plane = &mut layers[layer];
    for neighbor in pos.axis_neighbors().into_iter().flatten() {
        if let Some(target) = plane.tile_mut(neighbor) {
            if target.kind().is_power_capable() && kind.forwards_to(target.kind()) {
                target.try_set_powered(value, Some(kind));
            }
        }
    }

    if let Some(partner) = via.and_then(|l| layers.get_mut(l)).and_then(|l| l.tile_mut(pos)) {
        partner.try_set_powered(value, Some(kind));
    }

    if let Some(tile) = layers[layer].tile_mut(pos) {
        tile.finish_spread();
    }
}

/// One flood hop: push this pixel's powered value to adjacent pixels with
/// the identical base color.
fn flood_pixel(layer: &mut Layer, pos: CellPos) {
    let Some((value, color)) = layer
        .tile(pos)
        .filter(|t| t.is_spreading())
        .map(|t| (t.is_powered(), t.base_color()))
    else {
        return;
    };

    for neighbor in pos.axis_neighbors().into_iter().flatten() {
        if let Some(target) = layer.tile_mut(neighbor) {
            if target.kind() == TileKind::Pixel && target.base_color() == color {
                target.try_set_powered(value, None);
            }
        }
    }

    if let Some(tile) = layer.tile_mut(pos) {
        tile.finish_flood();
    }
}
