//! Immutable index snapshots and their on-disk layout.
//!
//! Layout of an index directory:
//! - `snapshot-<generation>.bin`: bincode-serialized [`PersistedSnapshot`]
//! - `CURRENT`: generation number of the live snapshot
//!
//! Both are written temp file → fsync → rename, and `CURRENT` is only
//! replaced after its snapshot file is complete. A crash at any point leaves
//! the previous snapshot readable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::hnsw::HnswGraph;
use crate::core::error::{EngineError, Result};
use crate::core::record::JobRecord;

/// Bumped when [`PersistedSnapshot`] changes shape
pub const FORMAT_VERSION: u32 = 1;

const CURRENT_FILE: &str = "CURRENT";

/// Serialized form of a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedSnapshot {
    pub format_version: u32,
    pub dimension: usize,
    pub embedder_version: String,
    pub generation: u64,
    pub built_at: DateTime<Utc>,
    /// Unit-length vectors, parallel to `records`
    pub vectors: Vec<Vec<f32>>,
    pub records: Vec<JobRecord>,
}

/// A point-in-time view of the whole index. Never mutated once published.
#[derive(Debug)]
pub struct IndexSnapshot {
    generation: u64,
    dimension: usize,
    embedder_version: String,
    built_at: DateTime<Utc>,
    records: Vec<JobRecord>,
    vectors: Vec<Vec<f32>>,
    positions: HashMap<String, usize>,
    graph: Option<HnswGraph>,
}

impl IndexSnapshot {
    pub(crate) fn new(
        generation: u64,
        dimension: usize,
        embedder_version: String,
        records: Vec<JobRecord>,
        vectors: Vec<Vec<f32>>,
        with_graph: bool,
    ) -> Self {
        let persisted = PersistedSnapshot {
            format_version: FORMAT_VERSION,
            dimension,
            embedder_version,
            generation,
            built_at: Utc::now(),
            vectors,
            records,
        };
        Self::assemble(persisted, with_graph)
    }

    fn assemble(persisted: PersistedSnapshot, with_graph: bool) -> Self {
        let positions = persisted
            .records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.clone(), i))
            .collect();

        let graph = with_graph.then(|| {
            let ids: Vec<&str> = persisted.records.iter().map(|r| r.id.as_str()).collect();
            HnswGraph::build(&ids, &persisted.vectors)
        });

        Self {
            generation: persisted.generation,
            dimension: persisted.dimension,
            embedder_version: persisted.embedder_version,
            built_at: persisted.built_at,
            records: persisted.records,
            vectors: persisted.vectors,
            positions,
            graph,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn embedder_version(&self) -> &str {
        &self.embedder_version
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[JobRecord] {
        &self.records
    }

    pub(crate) fn vectors(&self) -> &[Vec<f32>] {
        &self.vectors
    }

    pub(crate) fn graph(&self) -> Option<&HnswGraph> {
        self.graph.as_ref()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    pub fn record(&self, id: &str) -> Option<&JobRecord> {
        self.positions.get(id).map(|&i| &self.records[i])
    }

    /// Stored unit vector for a record
    pub fn vector(&self, id: &str) -> Option<&[f32]> {
        self.positions.get(id).map(|&i| self.vectors[i].as_slice())
    }

    pub(crate) fn to_persisted(&self) -> PersistedSnapshot {
        PersistedSnapshot {
            format_version: FORMAT_VERSION,
            dimension: self.dimension,
            embedder_version: self.embedder_version.clone(),
            generation: self.generation,
            built_at: self.built_at,
            vectors: self.vectors.clone(),
            records: self.records.clone(),
        }
    }
}

/// Snapshot files in one index directory
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn snapshot_path(&self, generation: u64) -> PathBuf {
        self.dir.join(format!("snapshot-{}.bin", generation))
    }

    /// Generation named by `CURRENT`, if any
    pub fn current_generation(&self) -> Result<Option<u64>> {
        let path = self.dir.join(CURRENT_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path)?;
        text.trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| EngineError::Storage(format!("corrupt {} pointer: {}", CURRENT_FILE, e)))
    }

    /// Persist a snapshot and make it current. Keeps the previous snapshot
    /// file and removes older ones.
    pub fn publish(&self, snapshot: &IndexSnapshot) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            EngineError::Storage(format!("failed to create {}: {}", self.dir.display(), e))
        })?;

        let bytes = bincode::serialize(&snapshot.to_persisted())
            .map_err(|e| EngineError::Storage(format!("failed to serialize snapshot: {}", e)))?;

        let path = self.snapshot_path(snapshot.generation());
        write_atomic(&path, &bytes)?;
        write_atomic(
            &self.dir.join(CURRENT_FILE),
            snapshot.generation().to_string().as_bytes(),
        )?;

        self.prune(snapshot.generation());
        Ok(path)
    }

    /// Load the current snapshot. `Ok(None)` when nothing was ever published.
    pub fn load_current(&self, with_graph: bool) -> Result<Option<IndexSnapshot>> {
        let Some(generation) = self.current_generation()? else {
            return Ok(None);
        };

        let path = self.snapshot_path(generation);
        let bytes = fs::read(&path)?;
        let persisted: PersistedSnapshot = bincode::deserialize(&bytes).map_err(|e| {
            EngineError::Storage(format!("failed to read {}: {}", path.display(), e))
        })?;

        if persisted.format_version != FORMAT_VERSION {
            return Err(EngineError::Storage(format!(
                "unsupported snapshot format {} (expected {})",
                persisted.format_version, FORMAT_VERSION
            )));
        }
        if persisted.vectors.len() != persisted.records.len() {
            return Err(EngineError::Storage(format!(
                "snapshot {} has {} vectors for {} records",
                generation,
                persisted.vectors.len(),
                persisted.records.len()
            )));
        }
        if let Some(bad) = persisted.vectors.iter().find(|v| v.len() != persisted.dimension) {
            return Err(EngineError::DimensionMismatch {
                expected: persisted.dimension,
                actual: bad.len(),
            });
        }

        Ok(Some(IndexSnapshot::assemble(persisted, with_graph)))
    }

    /// Remove snapshot files other than `current` and the one before it.
    fn prune(&self, current: u64) {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return;
        };

        let mut generations: Vec<u64> = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let name = e.file_name().to_string_lossy().to_string();
                name.strip_prefix("snapshot-")?
                    .strip_suffix(".bin")?
                    .parse::<u64>()
                    .ok()
            })
            .filter(|g| *g < current)
            .collect();
        generations.sort_unstable();
        generations.pop(); // previous stays

        for generation in generations {
            let path = self.snapshot_path(generation);
            if let Err(e) = fs::remove_file(&path) {
                tracing::warn!("could not remove old snapshot {}: {}", path.display(), e);
            }
        }
    }
}

/// Write bytes atomically (temp file → fsync → rename). Failures name the
/// file that could not be written.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp_path = path.with_extension("tmp");
    let storage = |target: &Path, e: std::io::Error| {
        EngineError::Storage(format!("failed to write {}: {}", target.display(), e))
    };

    let mut file = File::create(&tmp_path).map_err(|e| storage(&tmp_path, e))?;
    file.write_all(bytes).map_err(|e| storage(&tmp_path, e))?;
    file.sync_all().map_err(|e| storage(&tmp_path, e))?;
    drop(file);

    fs::rename(&tmp_path, path).map_err(|e| storage(path, e))?;
    Ok(())
}
