//! Embedding index for job records
//!
//! Embedders turn composed record text into vectors; the index keeps one
//! unit vector per record in an immutable, versioned snapshot.

pub mod cache;
pub mod embedder;
pub mod embedding;
pub mod hnsw;
pub mod index;
pub mod snapshot;

pub use cache::CachedEmbedder;
pub use embedder::{create_embedder, Embedder, HtpEmbedder, Model2VecEmbedder};
pub use index::{search_snapshot, BuildReport, EmbeddingIndex, IndexOptions, IndexStats, Neighbor};
pub use snapshot::{IndexSnapshot, SnapshotStore};
