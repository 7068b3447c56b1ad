//! Shared types used by every ASCT crate.

mod types;

pub use types::{AMBIENT_TEMPERATURE, CellPos, Rgb};
