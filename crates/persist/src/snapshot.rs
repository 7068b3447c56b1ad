use asct_common::CellPos;
use asct_kernel::{GameMap, Layer, MapError, Tile};
use serde::{Deserialize, Serialize};

/// Errors from rebuilding a map out of a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot hash mismatch: stored {stored:#018x}, computed {computed:#018x}")]
    HashMismatch { stored: u64, computed: u64 },
    #[error("layer {layer}: invalid side {side}")]
    InvalidSide { layer: usize, side: u32 },
    #[error("snapshot encoding: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Map(#[from] MapError),
}

/// One layer as a sparse list of complete tile states in storage order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSnapshot {
    pub side: u32,
    pub tiles: Vec<Tile>,
}

/// Full map state at a specific tick, with a content hash for corruption
/// detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapSnapshot {
    pub tick: u64,
    /// Seed at snapshot time, so stepping continues identically.
    pub seed: u64,
    pub current_layer: usize,
    pub layers: Vec<LayerSnapshot>,
    /// FNV-1a over the JSON encoding of every other field.
    pub hash: u64,
}

/// The hashed part of a snapshot, borrowed.
#[derive(Serialize)]
struct Body<'a> {
    tick: u64,
    seed: u64,
    current_layer: usize,
    layers: &'a [LayerSnapshot],
}

impl MapSnapshot {
    pub fn capture(map: &GameMap) -> Result<Self, SnapshotError> {
        let layers: Vec<LayerSnapshot> = map
            .layers()
            .iter()
            .map(|layer| LayerSnapshot {
                side: layer.side(),
                tiles: layer.iter().cloned().collect(),
            })
            .collect();
        let mut snapshot = Self {
            tick: map.tick(),
            seed: map.seed(),
            current_layer: map.current_layer(),
            layers,
            hash: 0,
        };
        snapshot.hash = snapshot.content_hash()?;
        Ok(snapshot)
    }

    fn content_hash(&self) -> Result<u64, SnapshotError> {
        let body = Body {
            tick: self.tick,
            seed: self.seed,
            current_layer: self.current_layer,
            layers: &self.layers,
        };
        Ok(fnv1a_hash(&serde_json::to_vec(&body)?))
    }

    /// Recompute the hash and compare it with the stored one. A snapshot
    /// that cannot be encoded does not verify.
    pub fn verify(&self) -> bool {
        self.content_hash().is_ok_and(|h| h == self.hash)
    }

    pub fn tile_count(&self) -> usize {
        self.layers.iter().map(|l| l.tiles.len()).sum()
    }

    /// Rebuild the map, keeping every tile's counters and re-linking vias on
    /// both ends. A via whose partner does not point back is dropped.
    pub fn restore(&self) -> Result<GameMap, SnapshotError> {
        let computed = self.content_hash()?;
        if computed != self.hash {
            return Err(SnapshotError::HashMismatch {
                stored: self.hash,
                computed,
            });
        }

        let mut map = GameMap::with_seed(Vec::new(), self.seed);
        let mut vias: Vec<(usize, CellPos, usize)> = Vec::new();
        for (index, saved) in self.layers.iter().enumerate() {
            let fresh = Layer::new(saved.side).map_err(|_| SnapshotError::InvalidSide {
                layer: index,
                side: saved.side,
            })?;
            let layer = map.add_layer(fresh);
            for tile in &saved.tiles {
                if let Some(partner) = tile.via() {
                    vias.push((layer, tile.pos(), partner));
                }
                map.place_tile(layer, tile.clone())?;
            }
        }

        for &(layer, pos, partner) in &vias {
            let reciprocal = layer != partner && vias.contains(&(partner, pos, layer));
            if !reciprocal {
                tracing::warn!(%pos, layer, partner, "dropping one-sided via from snapshot");
                continue;
            }
            if layer < partner && !map.link_via((layer, pos), (partner, pos)) {
                tracing::warn!(%pos, layer, partner, "dropping unlinkable via from snapshot");
            }
        }

        if !self.layers.is_empty() {
            map.set_current_layer(self.current_layer)?;
        }
        map.set_clock(self.tick, self.seed);
        Ok(map)
    }
}

/// FNV-1a, enough to catch accidental corruption.
fn fnv1a_hash(data: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &byte in data {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}
