//! Rendering adapter: renderer-agnostic views of a [`GameMap`](asct_kernel::GameMap).
//!
//! # Invariants
//! - Renderers read the map; they never mutate it.
//! - What is drawn derives only from per-cell render states and the view.
//!
//! Two renderers ship here: a text dump for terminals and tests, and a
//! painter that rasterizes a layer at 4 pixels per cell onto any [`Canvas`].

mod painter;
mod renderer;

pub use painter::{BACKGROUND, Canvas, PixelBuffer, TILE_SIZE, TilePainter, paint_cell};
pub use renderer::{DebugTextRenderer, RenderView, Renderer};
