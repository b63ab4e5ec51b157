//! Semantic similarity between seeker text and job text.
//!
//! Raw cosine lies in [-1, 1]. The combined score uses
//! `clamp(cosine, 0, 1)`: dissimilar texts contribute nothing rather than a
//! penalty.

use serde::Serialize;
use std::sync::Arc;

use crate::core::error::Result;
use crate::search::embedder::Embedder;
use crate::search::embedding::{cosine_similarity, normalize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SemanticScore {
    /// Cosine similarity as computed
    pub raw: f64,
    /// Value in [0, 1] fed into ranking
    pub score: f64,
}

impl SemanticScore {
    pub fn from_cosine(raw: f32) -> Self {
        let raw = f64::from(raw);
        let score = if raw.is_finite() { raw.clamp(0.0, 1.0) } else { 0.0 };
        Self { raw, score }
    }

    pub fn zero() -> Self {
        Self { raw: 0.0, score: 0.0 }
    }
}

pub struct SemanticScorer {
    embedder: Arc<dyn Embedder>,
}

impl SemanticScorer {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder }
    }

    pub fn embedder_version(&self) -> &str {
        self.embedder.version()
    }

    /// Unit vector for `text`, `None` when the text carries no signal.
    pub fn embed(&self, text: &str) -> Result<Option<Vec<f32>>> {
        Ok(normalize(&self.embedder.embed(text)?))
    }

    pub fn score(&self, seeker_text: &str, job_text: &str) -> Result<SemanticScore> {
        let (Some(a), Some(b)) = (self.embed(seeker_text)?, self.embed(job_text)?) else {
            return Ok(SemanticScore::zero());
        };
        Ok(Self::score_vectors(&a, &b))
    }

    pub fn score_vectors(a: &[f32], b: &[f32]) -> SemanticScore {
        SemanticScore::from_cosine(cosine_similarity(a, b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::embedder::HtpEmbedder;

    #[test]
    fn test_negative_cosine_clamped() {
        let s = SemanticScore::from_cosine(-0.4);
        assert_eq!(s.score, 0.0);
        assert!((s.raw + 0.4).abs() < 1e-6);

        assert_eq!(SemanticScore::from_cosine(f32::NAN).score, 0.0);
        assert_eq!(SemanticScore::from_cosine(1.0000001).score, 1.0);
    }

    #[test]
    fn test_identical_text_scores_one() {
        let scorer = SemanticScorer::new(Arc::new(HtpEmbedder::new()));
        let s = scorer.score("rust backend", "rust backend").unwrap();
        assert!((s.score - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_empty_text_scores_zero() {
        let scorer = SemanticScorer::new(Arc::new(HtpEmbedder::new()));
        let s = scorer.score("", "rust backend").unwrap();
        assert_eq!(s, SemanticScore::zero());
    }

    #[test]
    fn test_opposite_vectors() {
        let s = SemanticScorer::score_vectors(&[1.0, 0.0], &[-1.0, 0.0]);
        assert_eq!(s.score, 0.0);
        assert!((s.raw + 1.0).abs() < 1e-6);
    }
}
