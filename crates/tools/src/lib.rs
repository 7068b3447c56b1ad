//! Developer tooling: map inspector.
//!
//! # Invariants
//! - Tools only read the map.

mod inspector;

pub use inspector::{CellInfo, MapInspector, MapSummary};
