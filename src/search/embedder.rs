//! Embedder trait and implementations
//!
//! Provides abstraction over different embedding functions:
//! - HtpEmbedder: Harmonic Token Projection (built-in, no model file)
//! - Model2VecEmbedder: Neural network based (requires model download)
//!
//! Every embedder reports a version string. Vectors from different versions
//! must never share one index.

use model2vec::Model2Vec;
use std::path::Path;

use super::embedding;
use crate::core::config::EmbeddingConfig;
use crate::core::error::{EngineError, Result};

/// Embedding function abstraction
pub trait Embedder: Send + Sync {
    /// Generate embedding for a single text
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Get embedding dimension
    fn dimension(&self) -> usize;

    /// Version identifier recorded in every snapshot built with this embedder
    fn version(&self) -> &str;
}

// ============================================================================
// HTP Embedder
// ============================================================================

/// HTP (Harmonic Token Projection) Embedder
#[derive(Debug, Clone, Copy, Default)]
pub struct HtpEmbedder;

impl HtpEmbedder {
    pub fn new() -> Self {
        Self
    }
}

impl Embedder for HtpEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(embedding::embed_text(text))
    }

    fn dimension(&self) -> usize {
        embedding::EMBEDDING_DIM
    }

    fn version(&self) -> &str {
        embedding::HTP_VERSION
    }
}

// ============================================================================
// Model2Vec Embedder
// ============================================================================

/// Model2Vec based embedder
pub struct Model2VecEmbedder {
    model: Model2Vec,
    dimension: usize,
    version: String,
}

impl Model2VecEmbedder {
    /// Load model from local path
    pub fn from_path(path: &Path) -> Result<Self> {
        Self::load(path.to_string_lossy().as_ref())
    }

    /// Load model from HuggingFace Hub
    pub fn from_pretrained(model_id: &str) -> Result<Self> {
        Self::load(model_id)
    }

    fn load(source: &str) -> Result<Self> {
        let model = Model2Vec::from_pretrained(source, None, None).map_err(|e| {
            EngineError::EmbeddingFailed(format!("failed to load Model2Vec from {}: {}", source, e))
        })?;

        let probe = model
            .encode(&["probe"])
            .map_err(|e| EngineError::EmbeddingFailed(format!("model probe failed: {}", e)))?;
        let dimension = probe.row(0).len();

        Ok(Self {
            model,
            dimension,
            version: format!("model2vec:{}:{}", source, dimension),
        })
    }
}

impl Embedder for Model2VecEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self
            .model
            .encode(&[text])
            .map_err(|e| EngineError::EmbeddingFailed(format!("failed to encode text: {}", e)))?;
        Ok(embeddings.row(0).to_vec())
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let embeddings = self
            .model
            .encode(texts)
            .map_err(|e| EngineError::EmbeddingFailed(format!("failed to encode texts: {}", e)))?;
        Ok(embeddings.rows().into_iter().map(|r| r.to_vec()).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn version(&self) -> &str {
        &self.version
    }
}

// ============================================================================
// Factory function
// ============================================================================

/// Create embedder based on configuration
pub fn create_embedder(
    config: &EmbeddingConfig,
    model_path: Option<&Path>,
) -> Result<Box<dyn Embedder>> {
    if !config.use_advanced {
        return Ok(Box::new(HtpEmbedder::new()));
    }

    let embedder = match model_path {
        Some(path) => Model2VecEmbedder::from_path(path)?,
        None => Model2VecEmbedder::from_pretrained(&config.model_id)?,
    };
    tracing::info!("loaded embedder {}", embedder.version());
    Ok(Box::new(embedder))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_htp_embedder() {
        let embedder = HtpEmbedder::new();

        let emb = embedder.embed("hello world").unwrap();
        assert_eq!(emb.len(), embedder.dimension());
        assert_eq!(embedder.version(), "htp-384-v1");
    }

    #[test]
    fn test_default_batch_matches_single() {
        let embedder = HtpEmbedder::new();
        let batch = embedder.embed_batch(&["rust", "go"]).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[1], embedder.embed("go").unwrap());
    }

    #[test]
    fn test_create_embedder_htp() {
        let config = EmbeddingConfig::default();
        let embedder = create_embedder(&config, None).unwrap();

        assert_eq!(embedder.dimension(), 384);
        assert_eq!(embedder.version(), "htp-384-v1");
    }

    #[test]
    #[ignore] // Requires model download
    fn test_model2vec_embedder() {
        let embedder = Model2VecEmbedder::from_pretrained("minishlab/potion-base-8M").unwrap();
        let emb = embedder.embed("machine learning engineer").unwrap();
        assert_eq!(emb.len(), embedder.dimension());
        assert!(embedder.version().starts_with("model2vec:"));
    }
}
