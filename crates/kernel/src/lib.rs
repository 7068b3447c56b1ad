//! Simulation kernel: tiles, layers and the tick pipeline.
//!
//! # Invariants
//! - A layer tick snapshots its active cells before any propagation, and
//!   finishes propagation before any physics. Power advances one cell per
//!   tick except across vias into later layers.
//! - Every occupied cell gets exactly one physical update per tick.
//! - Randomness only comes from the generator handed to the step, so a
//!   fixed seed reproduces a run.
//! - Vias always link two tiles at the same position on different layers,
//!   and both ends agree.

pub mod config;
pub mod error;
pub mod layer;
pub mod map;
mod physics;
mod propagation;
pub mod tile;

pub use config::{DEFAULT_LAYER_SIDE, MAX_LAYER_SIDE, SimConfig};
pub use error::MapError;
pub use layer::{Layer, SeveredVia};
pub use map::GameMap;
pub use tile::{
    GateState, PixelState, PowerState, RenderState, SWITCHING_HEAT, Thermal, Tile, TileKind,
};
