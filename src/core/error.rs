//! Error taxonomy for the matching and retrieval engine.
//!
//! Messages are stable and safe to show to users. No API keys appear in any
//! variant.

use super::record::SourceTag;

/// Errors produced by the engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A source row could not be turned into a job record. Logged and skipped
    /// by batch operations, never fatal to the batch.
    #[error("malformed {origin} record{}: {reason}", .key.as_deref().map(|k| format!(" '{k}'")).unwrap_or_default())]
    MalformedRecord {
        origin: SourceTag,
        key: Option<String>,
        reason: String,
    },

    /// Query against an index that has no snapshot or an empty one.
    #[error("index is empty: build it before querying")]
    EmptyIndex,

    /// Vector dimension disagrees with the index.
    #[error("dimension mismatch: index has {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The snapshot was produced by a different embedding function version.
    #[error("embedder mismatch: index built with '{index}', active embedder is '{embedder}'")]
    EmbedderMismatch { index: String, embedder: String },

    /// Seeker carries neither skills nor free text.
    #[error("invalid seeker: {0}")]
    InvalidSeeker(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The external generation call failed or timed out.
    #[error("generation unavailable: {0}")]
    GenerationUnavailable(String),

    /// The embedding function itself failed (aborts an index build).
    #[error("embedding failed: {0}")]
    EmbeddingFailed(String),

    #[error("source error: {0}")]
    Source(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

impl EngineError {
    pub fn malformed(origin: SourceTag, key: Option<&str>, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            origin,
            key: key.map(String::from),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_malformed_with_key() {
        let err = EngineError::malformed(SourceTag::Spreadsheet, Some("42"), "missing title");
        assert_eq!(
            err.to_string(),
            "malformed spreadsheet record '42': missing title"
        );
    }

    #[test]
    fn test_display_malformed_without_key() {
        let err = EngineError::malformed(SourceTag::Database, None, "missing identity key");
        assert_eq!(
            err.to_string(),
            "malformed database record: missing identity key"
        );
    }

    #[test]
    fn test_display_dimension_mismatch() {
        let err = EngineError::DimensionMismatch {
            expected: 384,
            actual: 256,
        };
        assert_eq!(err.to_string(), "dimension mismatch: index has 384, got 256");
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<EngineError>();
    }
}
