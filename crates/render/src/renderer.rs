use asct_common::CellPos;
use asct_kernel::{GameMap, Layer, Tile, TileKind};

/// Which layer and which window of it to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderView {
    /// Layer to draw; `None` follows the map's cursor.
    pub layer: Option<usize>,
    /// Top-left cell of the window.
    pub origin: CellPos,
    /// Window size in cells, clipped to the layer.
    pub width: u32,
    pub height: u32,
}

impl Default for RenderView {
    fn default() -> Self {
        Self {
            layer: None,
            origin: CellPos::new(0, 0),
            width: 32,
            height: 16,
        }
    }
}

impl RenderView {
    /// A window starting at the origin.
    pub fn sized(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn on_layer(self, layer: usize) -> Self {
        Self {
            layer: Some(layer),
            ..self
        }
    }

    pub(crate) fn resolve<'a>(&self, map: &'a GameMap) -> Option<(usize, &'a Layer)> {
        let index = self.layer.unwrap_or(map.current_layer());
        map.layer(index).map(|l| (index, l))
    }

    /// Visible `(columns, rows)` once clipped against a layer of `side`.
    pub(crate) fn extent(&self, side: u32) -> (u32, u32) {
        let cols = side.saturating_sub(self.origin.x).min(self.width);
        let rows = side.saturating_sub(self.origin.y).min(self.height);
        (cols, rows)
    }
}

/// Renderer-agnostic interface.
///
/// A renderer reads the map and a view and produces output. It never
/// mutates the map.
pub trait Renderer {
    type Output;

    fn render(&self, map: &GameMap, view: &RenderView) -> Self::Output;
}

/// Plain text dump of one layer window, one glyph per cell.
///
/// Glyphs are lowercase while unpowered and uppercase while powered; an
/// armed transistor shows as `T` too. Empty cells are `.`.
#[derive(Debug, Default)]
pub struct DebugTextRenderer;

impl DebugTextRenderer {
    pub fn new() -> Self {
        Self
    }

    pub fn glyph(tile: &Tile) -> char {
        let base = match tile.kind() {
            TileKind::Static => return '#',
            TileKind::Conductor => 'w',
            TileKind::NType => 'n',
            TileKind::PType => 'p',
            TileKind::Transistor => 't',
            TileKind::LogicGate => 'g',
            TileKind::Pixel => 'o',
        };
        let lit = tile.is_powered() || (tile.kind() == TileKind::Transistor && tile.is_conductive());
        if lit { base.to_ascii_uppercase() } else { base }
    }
}

impl Renderer for DebugTextRenderer {
    type Output = String;

    fn render(&self, map: &GameMap, view: &RenderView) -> String {
        let mut out = format!(
            "=== Map (tick={}, seed={}) ===\n",
            map.tick(),
            map.seed()
        );
        let Some((index, layer)) = view.resolve(map) else {
            out.push_str("(no layer)\n");
            return out;
        };
        out.push_str(&format!(
            "Layer {}/{} side={} tiles={}\n",
            index + 1,
            map.layer_count(),
            layer.side(),
            layer.len()
        ));

        let (cols, rows) = view.extent(layer.side());
        for y in 0..rows {
            let line: String = (0..cols)
                .map(|x| {
                    let pos = CellPos::new(view.origin.x + x, view.origin.y + y);
                    layer.tile(pos).map_or('.', Self::glyph)
                })
                .collect();
            out.push_str(&line);
            out.push('\n');
        }
        out
    }
}
