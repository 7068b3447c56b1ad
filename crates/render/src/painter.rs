use asct_common::{CellPos, Rgb};
use asct_kernel::{GameMap, RenderState};

use crate::renderer::{RenderView, Renderer};

/// Edge length of one cell in pixels.
pub const TILE_SIZE: u32 = 4;

/// Backdrop for empty cells.
pub const BACKGROUND: Rgb = Rgb(0, 0, 0);

/// Minimal raster target.
pub trait Canvas {
    fn fill_rect(&mut self, x: u32, y: u32, w: u32, h: u32, color: Rgb);

    /// One-pixel outline of a `w` by `h` box.
    fn stroke_rect(&mut self, x: u32, y: u32, w: u32, h: u32, color: Rgb) {
        if w == 0 || h == 0 {
            return;
        }
        self.fill_rect(x, y, w, 1, color);
        self.fill_rect(x, y + h - 1, w, 1, color);
        self.fill_rect(x, y, 1, h, color);
        self.fill_rect(x + w - 1, y, 1, h, color);
    }
}

/// In-memory RGB image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    pixels: Vec<Rgb>,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32, fill: Rgb) -> Self {
        Self {
            width,
            height,
            pixels: vec![fill; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[x as usize + y as usize * self.width as usize])
    }

    /// Binary PPM (P6) encoding.
    pub fn to_ppm(&self) -> Vec<u8> {
        let mut out = format!("P6\n{} {}\n255\n", self.width, self.height).into_bytes();
        out.reserve(self.pixels.len() * 3);
        for Rgb(r, g, b) in &self.pixels {
            out.extend_from_slice(&[*r, *g, *b]);
        }
        out
    }
}

impl Canvas for PixelBuffer {
    fn fill_rect(&mut self, x: u32, y: u32, w: u32, h: u32, color: Rgb) {
        let x_end = x.saturating_add(w).min(self.width);
        let y_end = y.saturating_add(h).min(self.height);
        for py in y.min(y_end)..y_end {
            let row = py as usize * self.width as usize;
            for px in x.min(x_end)..x_end {
                self.pixels[row + px as usize] = color;
            }
        }
    }
}

/// Draw one cell at window-relative `(col, row)`: the display color, a via
/// outline, then the logic gate inset.
pub fn paint_cell<C: Canvas + ?Sized>(canvas: &mut C, col: u32, row: u32, state: &RenderState) {
    let x = col * TILE_SIZE;
    let y = row * TILE_SIZE;
    canvas.fill_rect(x, y, TILE_SIZE, TILE_SIZE, state.color);
    if state.via {
        canvas.stroke_rect(x, y, TILE_SIZE, TILE_SIZE, Rgb::VIA_MARKER);
    }
    if let Some(inner) = state.inner {
        canvas.fill_rect(x + 1, y + 1, TILE_SIZE - 2, TILE_SIZE - 2, inner);
    }
}

/// Rasterizes a layer window at [`TILE_SIZE`] pixels per cell.
#[derive(Debug, Default)]
pub struct TilePainter;

impl Renderer for TilePainter {
    type Output = PixelBuffer;

    fn render(&self, map: &GameMap, view: &RenderView) -> PixelBuffer {
        let Some((_, layer)) = view.resolve(map) else {
            return PixelBuffer::new(0, 0, BACKGROUND);
        };
        let (cols, rows) = view.extent(layer.side());
        let mut buffer = PixelBuffer::new(cols * TILE_SIZE, rows * TILE_SIZE, BACKGROUND);
        for tile in layer.iter() {
            let CellPos { x, y } = tile.pos();
            let (Some(col), Some(row)) = (x.checked_sub(view.origin.x), y.checked_sub(view.origin.y))
            else {
                continue;
            };
            if col < cols && row < rows {
                paint_cell(&mut buffer, col, row, &tile.render_state());
            }
        }
        buffer
    }
}
