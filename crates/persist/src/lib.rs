//! Persistence: hashed map snapshots and a file-backed snapshot store.
//!
//! # Invariants
//! - A snapshot restores every tile counter, the cursor, the tick and the seed.
//! - Vias come back linked on both ends or not at all.
//! - Stored files are hash-chained; a mismatch refuses to load.

pub mod snapshot;
pub mod store;

pub use snapshot::{LayerSnapshot, MapSnapshot, SnapshotError};
pub use store::{IntegrityManifest, ManifestEntry, MapMeta, MapStore, StoreError};
