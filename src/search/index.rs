//! Embedding index: one unit vector per job record, served from an
//! immutable snapshot.
//!
//! Writers (build, append) are serialized by a writer lock and publish a new
//! snapshot by swapping one `Arc`. Readers clone the `Arc` and never wait for
//! a build: they keep answering from the previous snapshot until the swap.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;

use super::embedder::Embedder;
use super::embedding::{dot, normalize};
use super::snapshot::{IndexSnapshot, SnapshotStore};
use crate::core::config::{IndexConfig, QueryStrategy};
use crate::core::error::{EngineError, Result};
use crate::core::record::JobRecord;

/// Query strategy settings
#[derive(Debug, Clone, Copy)]
pub struct IndexOptions {
    pub strategy: QueryStrategy,
    pub ef_search: usize,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            strategy: QueryStrategy::Exact,
            ef_search: 50,
        }
    }
}

impl From<&IndexConfig> for IndexOptions {
    fn from(config: &IndexConfig) -> Self {
        Self {
            strategy: config.strategy,
            ef_search: config.ef_search,
        }
    }
}

/// Outcome of a build or append
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub indexed: usize,
    /// Records whose vector was unusable
    pub skipped: usize,
    /// Records whose id was already present
    pub duplicates: usize,
    pub generation: u64,
    pub duration_ms: u128,
}

/// Read-only introspection
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub count: usize,
    pub generation: u64,
    pub dimension: usize,
    pub embedder_version: String,
    pub built_at: Option<DateTime<Utc>>,
}

/// One nearest-neighbour hit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Neighbor {
    pub id: String,
    pub similarity: f32,
}

pub struct EmbeddingIndex {
    embedder: Arc<dyn Embedder>,
    store: Option<SnapshotStore>,
    options: IndexOptions,
    current: RwLock<Option<Arc<IndexSnapshot>>>,
    /// Writer lock; holds the last generation handed out
    writer: Mutex<u64>,
}

impl EmbeddingIndex {
    /// Index that lives only in memory
    pub fn in_memory(embedder: Arc<dyn Embedder>, options: IndexOptions) -> Self {
        Self {
            embedder,
            store: None,
            options,
            current: RwLock::new(None),
            writer: Mutex::new(0),
        }
    }

    /// Open (or prepare) an on-disk index. Loads the current snapshot if one
    /// exists; it must have been built with the same embedder version.
    pub fn open(
        dir: &Path,
        embedder: Arc<dyn Embedder>,
        options: IndexOptions,
    ) -> Result<Self> {
        let store = SnapshotStore::new(dir);
        let with_graph = options.strategy == QueryStrategy::Hnsw;

        let snapshot = store.load_current(with_graph)?;
        if let Some(snap) = &snapshot {
            if snap.embedder_version() != embedder.version() {
                return Err(EngineError::EmbedderMismatch {
                    index: snap.embedder_version().to_string(),
                    embedder: embedder.version().to_string(),
                });
            }
            if snap.dimension() != embedder.dimension() {
                return Err(EngineError::DimensionMismatch {
                    expected: snap.dimension(),
                    actual: embedder.dimension(),
                });
            }
            tracing::debug!(
                "opened index generation {} ({} records)",
                snap.generation(),
                snap.len()
            );
        }

        let last_generation = match &snapshot {
            Some(snap) => snap.generation(),
            None => store.current_generation()?.unwrap_or(0),
        };

        Ok(Self {
            embedder,
            store: Some(store),
            options,
            current: RwLock::new(snapshot.map(Arc::new)),
            writer: Mutex::new(last_generation),
        })
    }

    /// Open an on-disk index for a full rebuild without loading the current
    /// snapshot, so a model change can be recovered from. Generations keep
    /// counting from the stored pointer.
    pub fn open_for_rebuild(
        dir: &Path,
        embedder: Arc<dyn Embedder>,
        options: IndexOptions,
    ) -> Result<Self> {
        let store = SnapshotStore::new(dir);
        let last_generation = store.current_generation()?.unwrap_or(0);
        Ok(Self {
            embedder,
            store: Some(store),
            options,
            current: RwLock::new(None),
            writer: Mutex::new(last_generation),
        })
    }

    pub fn embedder(&self) -> Arc<dyn Embedder> {
        Arc::clone(&self.embedder)
    }

    pub fn options(&self) -> IndexOptions {
        self.options
    }

    /// Current snapshot, if any was ever built
    pub fn snapshot(&self) -> Option<Arc<IndexSnapshot>> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Replace the whole index with `records`.
    ///
    /// An embedder error aborts the build and leaves the current snapshot in
    /// place. Unusable vectors are skipped and counted.
    pub fn build(&self, records: Vec<JobRecord>) -> Result<BuildReport> {
        let start = Instant::now();
        let mut last_generation = self.lock_writer()?;

        let (records, duplicates) = dedup_by_id(records, &HashSet::new());
        let (records, vectors, skipped) = self.embed_records(records)?;
        let indexed = records.len();

        let generation = self.commit(&mut last_generation, records, vectors)?;

        tracing::info!(
            "built index generation {}: {} indexed, {} skipped",
            generation,
            indexed,
            skipped
        );
        Ok(BuildReport {
            indexed,
            skipped,
            duplicates,
            generation,
            duration_ms: start.elapsed().as_millis(),
        })
    }

    /// Add records not yet in the index. Existing ids are never patched.
    /// On a never-built index this is a full build.
    pub fn append(&self, records: Vec<JobRecord>) -> Result<BuildReport> {
        let start = Instant::now();
        let mut last_generation = self.lock_writer()?;

        let base = self.snapshot();
        let existing: HashSet<String> = base
            .as_ref()
            .map(|snap| snap.records().iter().map(|r| r.id.clone()).collect())
            .unwrap_or_default();

        let (fresh, duplicates) = dedup_by_id(records, &existing);
        let (fresh, fresh_vectors, skipped) = self.embed_records(fresh)?;
        let indexed = fresh.len();

        let (mut all_records, mut all_vectors) = match &base {
            Some(snap) => (snap.records().to_vec(), snap.vectors().to_vec()),
            None => (Vec::new(), Vec::new()),
        };
        all_records.extend(fresh);
        all_vectors.extend(fresh_vectors);

        let generation = self.commit(&mut last_generation, all_records, all_vectors)?;

        tracing::info!(
            "appended to index generation {}: {} new, {} duplicate, {} skipped",
            generation,
            indexed,
            duplicates,
            skipped
        );
        Ok(BuildReport {
            indexed,
            skipped,
            duplicates,
            generation,
            duration_ms: start.elapsed().as_millis(),
        })
    }

    /// Up to `k` nearest records by cosine similarity, highest first, ties by
    /// id ascending.
    pub fn query(&self, vector: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        let snapshot = self.snapshot().ok_or(EngineError::EmptyIndex)?;
        search_snapshot(&snapshot, vector, k, self.options)
    }

    /// Embed `text` with the index's embedder, then query.
    pub fn query_text(&self, text: &str, k: usize) -> Result<Vec<Neighbor>> {
        let vector = self.embedder.embed(text)?;
        self.query(&vector, k)
    }

    pub fn stats(&self) -> IndexStats {
        match self.snapshot() {
            Some(snap) => IndexStats {
                count: snap.len(),
                generation: snap.generation(),
                dimension: snap.dimension(),
                embedder_version: snap.embedder_version().to_string(),
                built_at: Some(snap.built_at()),
            },
            None => IndexStats {
                count: 0,
                generation: 0,
                dimension: self.embedder.dimension(),
                embedder_version: self.embedder.version().to_string(),
                built_at: None,
            },
        }
    }

    fn lock_writer(&self) -> Result<std::sync::MutexGuard<'_, u64>> {
        self.writer
            .lock()
            .map_err(|_| EngineError::Storage("index writer lock poisoned".into()))
    }

    /// Embed composed texts; drop records whose vectors are unusable.
    fn embed_records(
        &self,
        records: Vec<JobRecord>,
    ) -> Result<(Vec<JobRecord>, Vec<Vec<f32>>, usize)> {
        if records.is_empty() {
            return Ok((Vec::new(), Vec::new(), 0));
        }

        let texts: Vec<String> = records.iter().map(JobRecord::compose_text).collect();
        let text_refs: Vec<&str> = texts.iter().map(String::as_str).collect();

        let raw = self
            .embedder
            .embed_batch(&text_refs)
            .map_err(|e| match e {
                e @ EngineError::EmbeddingFailed(_) => e,
                other => EngineError::EmbeddingFailed(other.to_string()),
            })?;
        if raw.len() != records.len() {
            return Err(EngineError::EmbeddingFailed(format!(
                "embedder returned {} vectors for {} texts",
                raw.len(),
                records.len()
            )));
        }

        let dimension = self.embedder.dimension();
        let mut kept_records = Vec::with_capacity(records.len());
        let mut kept_vectors = Vec::with_capacity(records.len());
        let mut skipped = 0;

        for (record, vector) in records.into_iter().zip(raw) {
            if vector.len() != dimension {
                tracing::warn!(
                    "skipping '{}': vector has dimension {}, expected {}",
                    record.id,
                    vector.len(),
                    dimension
                );
                skipped += 1;
                continue;
            }
            match normalize(&vector) {
                Some(unit) => {
                    kept_records.push(record);
                    kept_vectors.push(unit);
                }
                None => {
                    tracing::warn!("skipping '{}': vector is zero or non-finite", record.id);
                    skipped += 1;
                }
            }
        }

        Ok((kept_records, kept_vectors, skipped))
    }

    /// Persist and publish a new snapshot. Nothing becomes visible unless
    /// persistence succeeded.
    fn commit(
        &self,
        last_generation: &mut u64,
        records: Vec<JobRecord>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<u64> {
        let generation = *last_generation + 1;
        let snapshot = IndexSnapshot::new(
            generation,
            self.embedder.dimension(),
            self.embedder.version().to_string(),
            records,
            vectors,
            self.options.strategy == QueryStrategy::Hnsw,
        );

        if let Some(store) = &self.store {
            let path = store.publish(&snapshot)?;
            tracing::debug!("persisted snapshot to {}", path.display());
        }

        let snapshot = Arc::new(snapshot);
        match self.current.write() {
            Ok(mut guard) => *guard = Some(snapshot),
            Err(poisoned) => *poisoned.into_inner() = Some(snapshot),
        }
        *last_generation = generation;
        Ok(generation)
    }
}

/// Query one snapshot. Callers holding a snapshot use this so metadata and
/// hits come from the same generation.
pub fn search_snapshot(
    snapshot: &IndexSnapshot,
    vector: &[f32],
    k: usize,
    options: IndexOptions,
) -> Result<Vec<Neighbor>> {
    if snapshot.is_empty() {
        return Err(EngineError::EmptyIndex);
    }
    if vector.len() != snapshot.dimension() {
        return Err(EngineError::DimensionMismatch {
            expected: snapshot.dimension(),
            actual: vector.len(),
        });
    }
    let query = normalize(vector)
        .ok_or_else(|| EngineError::InvalidQuery("query vector is zero or non-finite".into()))?;
    if k == 0 {
        return Ok(Vec::new());
    }

    let vectors = snapshot.vectors();
    let candidates: Vec<usize> = match (options.strategy, snapshot.graph()) {
        (QueryStrategy::Hnsw, Some(graph)) => {
            graph.search(&query, options.ef_search.max(k), vectors)
        }
        _ => (0..vectors.len()).collect(),
    };

    let records = snapshot.records();
    let mut hits: Vec<(usize, f32)> = candidates
        .into_iter()
        .map(|i| (i, dot(&query, &vectors[i])))
        .collect();
    hits.sort_by(|a, b| {
        b.1.total_cmp(&a.1)
            .then_with(|| records[a.0].id.cmp(&records[b.0].id))
    });
    hits.truncate(k);

    tracing::debug!("query returned {} of {} records", hits.len(), records.len());
    Ok(hits
        .into_iter()
        .map(|(i, similarity)| Neighbor {
            id: records[i].id.clone(),
            similarity,
        })
        .collect())
}

/// Drop records whose id is in `existing` or repeats earlier in the batch.
fn dedup_by_id(records: Vec<JobRecord>, existing: &HashSet<String>) -> (Vec<JobRecord>, usize) {
    let mut seen = HashSet::new();
    let mut duplicates = 0;
    let kept = records
        .into_iter()
        .filter(|r| {
            if existing.contains(&r.id) || !seen.insert(r.id.clone()) {
                duplicates += 1;
                false
            } else {
                true
            }
        })
        .collect();
    (kept, duplicates)
}
