//! Hybrid job matching and retrieval engine.
//!
//! - [`sources`] turns database rows and spreadsheet exports into canonical
//!   [`JobRecord`]s
//! - [`search`] embeds records into a versioned, atomically swapped index
//! - [`matching`] ranks jobs for a seeker or a CV
//! - [`rag`] retrieves context and composes prompts for a generation backend

pub mod core;
pub mod logging;
pub mod matching;
pub mod rag;
pub mod search;
pub mod sources;

pub use crate::core::config::Config;
pub use crate::core::error::{EngineError, Result};
pub use crate::core::record::{JobRecord, SkillSet, SourceTag};
pub use matching::{MatchResult, RankingEngine, Seeker};
pub use rag::{Answer, Orchestrator, RetrievalContext};
pub use search::{EmbeddingIndex, IndexSnapshot};
