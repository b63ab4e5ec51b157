//! CLI subcommands and the setup they share.

pub mod ask;
pub mod index;
pub mod init;
pub mod match_cv;
pub mod recommend;
pub mod search;

use anyhow::{Context, Result};
use std::sync::Arc;

use jobmatch::core::paths::DataPaths;
use jobmatch::search::{create_embedder, Embedder, EmbeddingIndex, IndexOptions, IndexSnapshot};
use jobmatch::sources::{load_sheet, normalize, JobDatabase, NormalizeReport, SourceRecord};

/// Loaded config plus the opened index
pub struct Workspace {
    pub data: DataPaths,
    pub index: Arc<EmbeddingIndex>,
}

impl Workspace {
    pub fn open() -> Result<Self> {
        Self::open_with(false)
    }

    /// Like `open`, but skips loading the stored snapshot so an index built
    /// with another embedder can be replaced.
    pub fn open_for_rebuild() -> Result<Self> {
        Self::open_with(true)
    }

    fn open_with(rebuild: bool) -> Result<Self> {
        let data = DataPaths::new().context("failed to resolve data root")?;
        let embedder: Arc<dyn Embedder> = create_embedder(
            &data.config.embedding,
            data.paths.model_path.as_deref(),
        )
        .context("failed to create embedder")?
        .into();

        let dir = &data.paths.index_dir;
        let options = IndexOptions::from(&data.config.index);
        let opened = if rebuild {
            EmbeddingIndex::open_for_rebuild(dir, embedder, options)
        } else {
            EmbeddingIndex::open(dir, embedder, options)
        };
        let index = opened.with_context(|| format!("failed to open index at {}", dir.display()))?;

        Ok(Self {
            data,
            index: Arc::new(index),
        })
    }

    /// Current snapshot, or an error telling the user to build one
    pub fn require_snapshot(&self) -> Result<Arc<IndexSnapshot>> {
        self.index
            .snapshot()
            .filter(|snap| !snap.is_empty())
            .context("index is empty: run `jobmatch index` first")
    }

    pub fn database(&self) -> Result<JobDatabase> {
        let path = self
            .data
            .paths
            .database
            .as_deref()
            .context("no database configured (sources.database in .jobmatch.json)")?;
        JobDatabase::open(path).with_context(|| format!("failed to open {}", path.display()))
    }

    /// Read every configured origin and normalize the rows
    pub fn load_records(&self) -> Result<NormalizeReport> {
        let mut rows = Vec::new();

        if self.data.paths.database.is_some() {
            let db = self.database()?;
            let jobs = db.load_jobs().context("failed to read job posts")?;
            rows.extend(jobs.into_iter().map(SourceRecord::Database));
        }
        for sheet in &self.data.paths.sheets {
            let sheet_rows =
                load_sheet(sheet).with_context(|| format!("failed to read {}", sheet.display()))?;
            rows.extend(sheet_rows.into_iter().map(SourceRecord::Spreadsheet));
        }

        if rows.is_empty() {
            tracing::warn!("no source rows found; configure sources in .jobmatch.json");
        }
        Ok(normalize(rows))
    }
}

/// Shorten for one-line display (char-aware for Unicode)
pub fn preview(text: &str, max_chars: usize) -> String {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.chars().count() > max_chars {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview() {
        assert_eq!(preview("short  text", 20), "short text");
        assert_eq!(preview("Lập trình viên Python", 9), "Lập trình...");
    }
}
