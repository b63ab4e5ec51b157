//! Retrieval context: rendered job snippets under an item and character
//! budget.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;

use super::location::fold;
use crate::core::record::{truncate_chars, JobRecord};

/// Separator between snippets in the context block; counts toward the budget
pub const SNIPPET_SEPARATOR: &str = "\n";

/// One rendered job in the context
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextItem {
    pub job_id: String,
    pub similarity: f32,
    pub text: String,
}

/// What is handed to the generation step
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalContext {
    /// Highest similarity first
    pub items: Vec<ContextItem>,
    /// Snapshot generation the items came from
    pub generation: u64,
    pub built_at: DateTime<Utc>,
    /// Snapshot is older than the configured maximum age
    pub stale: bool,
    /// City detected in the query, if any
    pub location: Option<String>,
}

impl RetrievalContext {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Snippets joined with [`SNIPPET_SEPARATOR`]
    pub fn block(&self) -> String {
        self.items
            .iter()
            .map(|item| item.text.as_str())
            .collect::<Vec<_>>()
            .join(SNIPPET_SEPARATOR)
    }

    pub fn total_chars(&self) -> usize {
        packed_len(&self.items)
    }
}

/// Render one record as a self-contained snippet. The description is cut
/// to `description_chars`; the snippet itself is never cut afterwards.
pub fn render_snippet(record: &JobRecord, description_chars: usize) -> String {
    let mut out = format!("--- Job {} ---\nTitle: {}\n", record.id, record.title);
    let optional = [
        ("Company", record.company.as_deref()),
        ("Location", record.location.as_deref()),
        ("Salary", record.salary.as_deref()),
    ];
    for (label, value) in optional {
        if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
            out.push_str(&format!("{label}: {value}\n"));
        }
    }
    if !record.skills.is_empty() {
        out.push_str(&format!("Skills: {}\n", record.skills.joined()));
    }
    let description = record.description.trim();
    let cut = truncate_chars(description, description_chars);
    out.push_str("Description: ");
    out.push_str(cut);
    if cut.len() < description.len() {
        out.push_str("...");
    }
    out.push('\n');
    out
}

/// Keep the first (most similar) record of each (title, company, location)
/// group. Input must already be ordered by similarity.
pub fn dedup<'a>(hits: Vec<(&'a JobRecord, f32)>) -> Vec<(&'a JobRecord, f32)> {
    let mut seen = HashSet::new();
    hits.into_iter()
        .filter(|(record, _)| seen.insert(posting_key(record)))
        .collect()
}

fn posting_key(record: &JobRecord) -> (String, String, String) {
    let norm = |s: Option<&str>| {
        fold(s.unwrap_or(""))
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    };
    (
        norm(Some(record.title.as_str())),
        norm(record.company.as_deref()),
        norm(record.location.as_deref()),
    )
}

/// Order by similarity, cap at `max_items`, then drop the least similar
/// snippets until the joined block fits in `max_chars`.
pub fn pack(mut items: Vec<ContextItem>, max_items: usize, max_chars: usize) -> Vec<ContextItem> {
    items.sort_by(|a, b| {
        b.similarity
            .total_cmp(&a.similarity)
            .then_with(|| a.job_id.cmp(&b.job_id))
    });
    items.truncate(max_items);

    while packed_len(&items) > max_chars {
        if let Some(dropped) = items.pop() {
            tracing::debug!("dropping '{}' from context: over budget", dropped.job_id);
        }
    }
    items
}

fn packed_len(items: &[ContextItem]) -> usize {
    let text: usize = items.iter().map(|i| i.text.chars().count()).sum();
    text + items.len().saturating_sub(1) * SNIPPET_SEPARATOR.chars().count()
}
