//! Retrieval-augmented prompt construction.
//!
//! One request reads one snapshot: hits, records and the generation number
//! reported back all come from the same `Arc`, even if a rebuild publishes
//! a new snapshot halfway through.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use super::context::{dedup, pack, render_snippet, ContextItem, RetrievalContext};
use super::generator::Generator;
use super::location;
use crate::core::config::{EmbeddingConfig, RetrievalConfig};
use crate::core::error::{EngineError, Result};
use crate::core::record::JobRecord;
use crate::search::cache::{CacheStats, CachedEmbedder};
use crate::search::embedder::Embedder;
use crate::search::index::{search_snapshot, EmbeddingIndex};
use crate::search::snapshot::IndexSnapshot;

const SYSTEM_INSTRUCTION: &str = "You are a recruitment assistant for the job market in Vietnam. \
Help the user find and compare job openings using only the postings listed below.

When answering:
1. Reply in the language of the question, in a friendly and professional tone.
2. Base every statement on the listed postings; do not invent jobs, companies or salaries.
3. If nothing fits, say so politely and suggest broadening the search.
4. When several postings fit, summarise each one briefly.
5. Highlight position, company, location, salary and required skills.
6. If the question is about a specific skill, point to the postings that need it.";

const NO_RESULTS: &str = "No matching jobs were found in the index.";

/// Prompt plus the context it was built from
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub context: RetrievalContext,
    pub prompt: String,
}

/// Answer with the generation outcome attached. A failed generation still
/// carries the prompt and context for a retry.
#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub answer: Answer,
    pub generated: std::result::Result<String, String>,
}

/// A retrieved record with its similarity
#[derive(Debug, Clone, Serialize)]
pub struct Retrieved {
    pub similarity: f32,
    pub record: JobRecord,
}

pub struct Orchestrator {
    index: Arc<EmbeddingIndex>,
    embedder: CachedEmbedder,
    config: RetrievalConfig,
}

impl Orchestrator {
    pub fn new(
        index: Arc<EmbeddingIndex>,
        config: RetrievalConfig,
        cache: &EmbeddingConfig,
    ) -> Result<Self> {
        config.validate()?;
        let embedder = CachedEmbedder::new(
            index.embedder(),
            cache.cache_capacity,
            Duration::from_secs(cache.cache_ttl_secs),
        );
        Ok(Self {
            index,
            embedder,
            config,
        })
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.embedder.stats()
    }

    /// Retrieve context for `query` and compose the generation prompt.
    /// Does not call any generation backend.
    pub fn answer(&self, query: &str, k: usize) -> Result<Answer> {
        let query = query.trim();
        let context = self.retrieve_context(query, k)?;
        let prompt = build_prompt(query, &context);
        Ok(Answer { context, prompt })
    }

    /// `answer`, then hand the prompt to `generator`.
    pub fn chat(&self, query: &str, k: usize, generator: &dyn Generator) -> Result<ChatReply> {
        let answer = self.answer(query, k)?;
        let generated = match generator.generate(&answer.prompt) {
            Ok(text) => Ok(text),
            Err(e) => {
                tracing::warn!("generation via {} failed: {}", generator.name(), e);
                Err(e.to_string())
            }
        };
        Ok(ChatReply { answer, generated })
    }

    /// Top records for `query` without building a prompt
    pub fn search(&self, query: &str, k: usize) -> Result<Vec<Retrieved>> {
        let snapshot = self.snapshot()?;
        let (hits, _) = self.retrieve(&snapshot, query.trim(), k)?;
        Ok(hits
            .into_iter()
            .map(|(record, similarity)| Retrieved {
                similarity,
                record: record.clone(),
            })
            .collect())
    }

    fn snapshot(&self) -> Result<Arc<IndexSnapshot>> {
        let snapshot = self.index.snapshot().ok_or(EngineError::EmptyIndex)?;
        if snapshot.embedder_version() != self.embedder.version() {
            return Err(EngineError::EmbedderMismatch {
                index: snapshot.embedder_version().to_string(),
                embedder: self.embedder.version().to_string(),
            });
        }
        Ok(snapshot)
    }

    fn retrieve_context(&self, query: &str, k: usize) -> Result<RetrievalContext> {
        let snapshot = self.snapshot()?;
        let (hits, city) = self.retrieve(&snapshot, query, k)?;

        let items = hits
            .into_iter()
            .map(|(record, similarity)| ContextItem {
                job_id: record.id.clone(),
                similarity,
                text: render_snippet(record, self.config.snippet_chars),
            })
            .collect();
        let items = pack(items, self.config.max_items, self.config.max_chars);

        let stale = self.is_stale(&snapshot);
        if stale {
            tracing::warn!(
                "index generation {} was built at {} and is older than {}h",
                snapshot.generation(),
                snapshot.built_at(),
                self.config.max_index_age_hours
            );
        }

        Ok(RetrievalContext {
            items,
            generation: snapshot.generation(),
            built_at: snapshot.built_at(),
            stale,
            location: city.map(String::from),
        })
    }

    /// Ranked, deduplicated hits, narrowed to the city named in the query
    /// when any hit is located there.
    fn retrieve<'s>(
        &self,
        snapshot: &'s IndexSnapshot,
        query: &str,
        k: usize,
    ) -> Result<(Vec<(&'s JobRecord, f32)>, Option<&'static str>)> {
        if query.is_empty() {
            return Err(EngineError::InvalidQuery("query is empty".into()));
        }
        let vector = self.embedder.embed(query)?;

        let city = location::detect(query);
        let pool = match city {
            Some(_) => k
                .saturating_mul(self.config.location_pool_factor)
                .max(k.saturating_add(5)),
            None => k,
        };

        let neighbors = search_snapshot(snapshot, &vector, pool, self.index.options())?;
        let hits: Vec<(&JobRecord, f32)> = neighbors
            .iter()
            .filter_map(|n| snapshot.record(&n.id).map(|r| (r, n.similarity)))
            .collect();
        let hits = dedup(hits);

        let mut hits = match city {
            Some(city) => {
                let local: Vec<_> = hits
                    .iter()
                    .copied()
                    .filter(|(record, _)| location::matches(record.location.as_deref(), city))
                    .collect();
                if local.is_empty() {
                    tracing::debug!("no hits located in {}, keeping unfiltered ranking", city);
                    hits
                } else {
                    local
                }
            }
            None => hits,
        };
        hits.truncate(k);

        tracing::debug!("retrieved {} records for query (pool {})", hits.len(), pool);
        Ok((hits, city))
    }

    fn is_stale(&self, snapshot: &IndexSnapshot) -> bool {
        let max_age = self.config.max_index_age_hours;
        if max_age == 0 {
            return false;
        }
        let age_secs = Utc::now()
            .signed_duration_since(snapshot.built_at())
            .num_seconds();
        u64::try_from(age_secs).is_ok_and(|age| age > max_age.saturating_mul(3600))
    }
}

/// System instruction, retrieved postings, then the question
pub fn build_prompt(query: &str, context: &RetrievalContext) -> String {
    let mut prompt = String::new();
    prompt.push_str(SYSTEM_INSTRUCTION);
    prompt.push_str("\n\n=== RELATED JOB POSTINGS ===\n");
    if context.is_empty() {
        prompt.push_str(NO_RESULTS);
        prompt.push('\n');
    } else {
        prompt.push_str(&context.block());
    }
    prompt.push_str("\n=== QUESTION ===\n");
    prompt.push_str(query);
    prompt.push_str("\n\n=== ANSWER ===\n");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::{SkillSet, SourceTag};
    use crate::search::embedder::HtpEmbedder;
    use crate::search::index::IndexOptions;

    fn job(id: &str, title: &str, location: &str, skills: &str) -> JobRecord {
        JobRecord {
            id: id.to_string(),
            title: title.to_string(),
            company: Some(format!("Company {id}")),
            location: Some(location.to_string()),
            salary: None,
            description: format!("{title} working with {skills}"),
            requirements: None,
            skills: SkillSet::from_comma_list(skills),
            source: SourceTag::Database,
        }
    }

    fn corpus() -> Vec<JobRecord> {
        vec![
            job("1", "Python Developer", "Hà Nội", "python, django"),
            job("2", "Python Developer", "Hồ Chí Minh", "python, flask"),
            job("3", "Java Developer", "Đà Nẵng", "java, spring"),
            job("4", "Accountant", "Hà Nội", "excel"),
            job("5", "Data Analyst", "Hồ Chí Minh", "sql, python"),
        ]
    }

    fn orchestrator(records: Vec<JobRecord>, config: RetrievalConfig) -> Orchestrator {
        let index =
            EmbeddingIndex::in_memory(Arc::new(HtpEmbedder::new()), IndexOptions::default());
        index.build(records).unwrap();
        Orchestrator::new(Arc::new(index), config, &EmbeddingConfig::default()).unwrap()
    }

    struct EchoGenerator;

    impl Generator for EchoGenerator {
        fn generate(&self, prompt: &str) -> Result<String> {
            Ok(format!("{} chars", prompt.chars().count()))
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    struct DownGenerator;

    impl Generator for DownGenerator {
        fn generate(&self, _prompt: &str) -> Result<String> {
            Err(EngineError::GenerationUnavailable("timed out".into()))
        }

        fn name(&self) -> &str {
            "down"
        }
    }

    #[test]
    fn test_answer_builds_prompt_in_order() {
        let orch = orchestrator(corpus(), RetrievalConfig::default());
        let answer = orch.answer("  python developer  ", 3).unwrap();

        assert!(!answer.context.is_empty());
        assert!(answer.context.items.len() <= 3);
        let p = &answer.prompt;
        let system = p.find("recruitment assistant").unwrap();
        let context = p.find("=== RELATED JOB POSTINGS ===").unwrap();
        let question = p.find("=== QUESTION ===\npython developer\n").unwrap();
        let tail = p.find("=== ANSWER ===").unwrap();
        assert!(system < context && context < question && question < tail);
        assert!(p.contains(&answer.context.block()));
    }

    #[test]
    fn test_context_sorted_by_similarity() {
        let orch = orchestrator(corpus(), RetrievalConfig::default());
        let answer = orch.answer("data analyst sql", 5).unwrap();
        let sims: Vec<f32> = answer.context.items.iter().map(|i| i.similarity).collect();
        assert!(sims.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(answer.context.generation, 1);
        assert!(!answer.context.stale);
    }

    #[test]
    fn test_location_filter() {
        let orch = orchestrator(corpus(), RetrievalConfig::default());
        let answer = orch.answer("python jobs in Saigon", 2).unwrap();
        assert_eq!(answer.context.location.as_deref(), Some("ho chi minh"));
        let ids: Vec<&str> = answer.context.items.iter().map(|i| i.job_id.as_str()).collect();
        assert!(!ids.is_empty());
        assert!(ids.iter().all(|id| *id == "2" || *id == "5"));
    }

    #[test]
    fn test_huge_k_with_location() {
        let orch = orchestrator(corpus(), RetrievalConfig::default());
        let hits = orch.search("python jobs in hanoi", usize::MAX / 2).unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.record.id.as_str()).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"1") && ids.contains(&"4"));

        let answer = orch.answer("python jobs in hanoi", usize::MAX).unwrap();
        assert_eq!(answer.context.location.as_deref(), Some("ha noi"));
        assert!(!answer.context.is_empty());
    }

    #[test]
    fn test_location_without_matches_falls_back() {
        let orch = orchestrator(corpus(), RetrievalConfig::default());
        let hits = orch.search("python in Cần Thơ", 2).unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_tiny_budget_gives_empty_context() {
        let config = RetrievalConfig {
            max_chars: 10,
            ..RetrievalConfig::default()
        };
        let orch = orchestrator(corpus(), config);
        let answer = orch.answer("python developer", 3).unwrap();
        assert!(answer.context.is_empty());
        assert!(answer.prompt.contains(NO_RESULTS));
    }

    #[test]
    fn test_duplicate_postings_collapsed() {
        let mut records = corpus();
        records.push(job("6", "Python Developer", "Ha Noi", "python, django"));
        let orch = orchestrator(records, RetrievalConfig::default());
        let hits = orch.search("python developer django", 6).unwrap();
        let hanoi_python = hits
            .iter()
            .filter(|h| {
                h.record.title == "Python Developer"
                    && h.record.company.as_deref() != Some("Company 2")
            })
            .count();
        // "1" and "6" differ in company, so both stay
        assert_eq!(hanoi_python, 2);

        let mut records = corpus();
        let mut repost = job("6", "Python Developer", "Ha Noi", "python, django");
        repost.company = Some("company 1".to_string());
        records.push(repost);
        let orch = orchestrator(records, RetrievalConfig::default());
        let hits = orch.search("python developer django", 6).unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.record.id.as_str()).collect();
        assert!(ids.contains(&"1") != ids.contains(&"6"));
    }

    #[test]
    fn test_empty_index_and_empty_query() {
        let index =
            EmbeddingIndex::in_memory(Arc::new(HtpEmbedder::new()), IndexOptions::default());
        let orch = Orchestrator::new(
            Arc::new(index),
            RetrievalConfig::default(),
            &EmbeddingConfig::default(),
        )
        .unwrap();
        assert!(matches!(orch.answer("python", 3), Err(EngineError::EmptyIndex)));

        let orch = orchestrator(corpus(), RetrievalConfig::default());
        assert!(matches!(orch.answer("   ", 3), Err(EngineError::InvalidQuery(_))));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let index =
            EmbeddingIndex::in_memory(Arc::new(HtpEmbedder::new()), IndexOptions::default());
        let config = RetrievalConfig {
            max_items: 0,
            ..RetrievalConfig::default()
        };
        assert!(Orchestrator::new(Arc::new(index), config, &EmbeddingConfig::default()).is_err());
    }

    #[test]
    fn test_repeated_query_hits_cache() {
        let orch = orchestrator(corpus(), RetrievalConfig::default());
        let first = orch.search("java spring", 2).unwrap();
        let second = orch.search("java spring", 2).unwrap();
        assert_eq!(first.len(), second.len());
        assert_eq!(orch.cache_stats().hits, 1);
    }

    #[test]
    fn test_chat_keeps_prompt_when_generation_fails() {
        let orch = orchestrator(corpus(), RetrievalConfig::default());

        let ok = orch.chat("python", 2, &EchoGenerator).unwrap();
        assert!(ok.generated.is_ok());

        let down = orch.chat("python", 2, &DownGenerator).unwrap();
        assert!(down.generated.unwrap_err().contains("generation unavailable"));
        assert!(down.answer.prompt.contains("=== QUESTION ===\npython"));
    }
}
