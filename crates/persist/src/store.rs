//! File-backed map persistence.
//!
//! Layout inside the store directory:
//! ```text
//! map.meta.json                - metadata and schema version
//! snapshots/
//!   000001.snapshot.cbor.zst   - CBOR+zstd compressed snapshots
//! integrity/
//!   manifest.json              - hash chain manifest
//! ```

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use asct_kernel::GameMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::snapshot::{MapSnapshot, SnapshotError};

const MAP_SCHEMA_VERSION: u32 = 1;

/// Errors from file-backed persistence operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CBOR serialization error: {0}")]
    CborEncode(String),
    #[error("CBOR deserialization error: {0}")]
    CborDecode(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("integrity check failed: expected {expected}, got {actual}")]
    IntegrityMismatch { expected: String, actual: String },
    #[error("schema version mismatch: file has v{file_version}, expected v{expected_version}")]
    SchemaMismatch {
        file_version: u32,
        expected_version: u32,
    },
    #[error("no snapshots found")]
    NoSnapshots,
    #[error("snapshot {0} does not exist")]
    NoSuchSnapshot(u32),
    #[error("snapshot {0} is not listed in the manifest")]
    Unlisted(String),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// Contents of `map.meta.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapMeta {
    pub schema_version: u32,
    pub snapshot_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub filename: String,
    pub sha256: String,
    pub prev_hash: Option<String>,
}

/// Every snapshot file's hash, each entry chained to the previous one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntegrityManifest {
    pub entries: Vec<ManifestEntry>,
}

/// Directory of numbered map snapshots with schema and integrity checks.
/// Anything that does not check out is refused rather than loaded.
pub struct MapStore {
    root: PathBuf,
    meta: MapMeta,
    manifest: IntegrityManifest,
}

impl MapStore {
    /// Open the store at `path`, creating it if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = path.as_ref().to_path_buf();
        std::fs::create_dir_all(root.join("snapshots"))?;
        std::fs::create_dir_all(root.join("integrity"))?;

        let meta_path = root.join("map.meta.json");
        let manifest_path = root.join("integrity").join("manifest.json");

        let (meta, manifest) = if meta_path.exists() {
            let meta: MapMeta = serde_json::from_reader(std::fs::File::open(&meta_path)?)?;
            if meta.schema_version != MAP_SCHEMA_VERSION {
                return Err(StoreError::SchemaMismatch {
                    file_version: meta.schema_version,
                    expected_version: MAP_SCHEMA_VERSION,
                });
            }
            let manifest = if manifest_path.exists() {
                serde_json::from_reader(std::fs::File::open(&manifest_path)?)?
            } else {
                IntegrityManifest::default()
            };
            (meta, manifest)
        } else {
            let meta = MapMeta {
                schema_version: MAP_SCHEMA_VERSION,
                snapshot_count: 0,
            };
            let manifest = IntegrityManifest::default();
            serde_json::to_writer_pretty(std::fs::File::create(&meta_path)?, &meta)?;
            serde_json::to_writer_pretty(std::fs::File::create(&manifest_path)?, &manifest)?;
            tracing::info!(root = %root.display(), "created map store");
            (meta, manifest)
        };

        Ok(Self {
            root,
            meta,
            manifest,
        })
    }

    /// Write a snapshot of `map` and return its 1-based index.
    pub fn save_snapshot(&mut self, map: &GameMap) -> Result<u32, StoreError> {
        let snap = MapSnapshot::capture(map)?;
        let index = self.meta.snapshot_count + 1;
        let filename = snapshot_filename(index);

        let compressed = zstd_compress(&cbor_serialize(&snap)?)?;
        let sha256 = sha256_hex(&compressed);
        let prev_hash = self.manifest.entries.last().map(|e| e.sha256.clone());

        std::fs::write(self.root.join("snapshots").join(&filename), &compressed)?;

        self.manifest.entries.push(ManifestEntry {
            filename,
            sha256,
            prev_hash,
        });
        self.meta.snapshot_count = index;
        self.save_meta()?;
        self.save_manifest()?;

        tracing::info!(
            index,
            tick = snap.tick,
            tiles = snap.tile_count(),
            bytes = compressed.len(),
            "saved map snapshot"
        );
        Ok(index)
    }

    /// Rebuild the map from the newest snapshot.
    pub fn load_latest(&self) -> Result<GameMap, StoreError> {
        if self.meta.snapshot_count == 0 {
            return Err(StoreError::NoSnapshots);
        }
        self.load(self.meta.snapshot_count)
    }

    /// Rebuild the map from snapshot `index`.
    pub fn load(&self, index: u32) -> Result<GameMap, StoreError> {
        let snap = self.load_snapshot(index)?;
        let map = snap.restore()?;
        tracing::info!(index, tick = snap.tick, "loaded map snapshot");
        Ok(map)
    }

    /// Walk the manifest, checking the hash chain and every file's hash.
    pub fn verify_integrity(&self) -> Result<(), StoreError> {
        let mut prev_hash: Option<String> = None;
        for entry in &self.manifest.entries {
            if entry.prev_hash != prev_hash {
                return Err(StoreError::IntegrityMismatch {
                    expected: prev_hash.unwrap_or_else(|| "None".into()),
                    actual: entry.prev_hash.clone().unwrap_or_else(|| "None".into()),
                });
            }
            let data = std::fs::read(self.root.join("snapshots").join(&entry.filename))?;
            let actual = sha256_hex(&data);
            if actual != entry.sha256 {
                return Err(StoreError::IntegrityMismatch {
                    expected: entry.sha256.clone(),
                    actual,
                });
            }
            prev_hash = Some(entry.sha256.clone());
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn meta(&self) -> &MapMeta {
        &self.meta
    }

    fn load_snapshot(&self, index: u32) -> Result<MapSnapshot, StoreError> {
        if index == 0 || index > self.meta.snapshot_count {
            return Err(StoreError::NoSuchSnapshot(index));
        }
        let filename = snapshot_filename(index);
        let compressed = std::fs::read(self.root.join("snapshots").join(&filename))?;
        self.verify_file_hash(&filename, &compressed)?;
        cbor_deserialize(&zstd_decompress(&compressed)?)
    }

    fn verify_file_hash(&self, filename: &str, data: &[u8]) -> Result<(), StoreError> {
        let Some(entry) = self.manifest.entries.iter().find(|e| e.filename == filename) else {
            return Err(StoreError::Unlisted(filename.to_string()));
        };
        let actual = sha256_hex(data);
        if entry.sha256 != actual {
            return Err(StoreError::IntegrityMismatch {
                expected: entry.sha256.clone(),
                actual,
            });
        }
        Ok(())
    }

    fn save_meta(&self) -> Result<(), StoreError> {
        let path = self.root.join("map.meta.json");
        serde_json::to_writer_pretty(std::fs::File::create(path)?, &self.meta)?;
        Ok(())
    }

    fn save_manifest(&self) -> Result<(), StoreError> {
        let path = self.root.join("integrity").join("manifest.json");
        serde_json::to_writer_pretty(std::fs::File::create(path)?, &self.manifest)?;
        Ok(())
    }
}

fn snapshot_filename(index: u32) -> String {
    format!("{index:06}.snapshot.cbor.zst")
}

fn cbor_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, StoreError> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| StoreError::CborEncode(e.to_string()))?;
    Ok(buf)
}

fn cbor_deserialize<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, StoreError> {
    ciborium::from_reader(data).map_err(|e| StoreError::CborDecode(e.to_string()))
}

fn zstd_compress(data: &[u8]) -> Result<Vec<u8>, StoreError> {
    let mut encoder = zstd::Encoder::new(Vec::new(), 3)?;
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn zstd_decompress(data: &[u8]) -> Result<Vec<u8>, StoreError> {
    let mut decoder = zstd::Decoder::new(data)?;
    let mut buf = Vec::new();
    decoder.read_to_end(&mut buf)?;
    Ok(buf)
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
