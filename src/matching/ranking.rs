//! Ranking engine: skill overlap + semantic similarity → ordered matches.
//!
//! `final = 0.6 * skill + 0.4 * semantic`, sorted descending, ties broken by
//! job id ascending. Identical inputs always give identical output.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use super::semantic::{SemanticScore, SemanticScorer};
use super::skill::skill_score;
use crate::core::error::{EngineError, Result};
use crate::core::record::{JobRecord, SkillSet};
use crate::search::embedder::Embedder;
use crate::search::embedding::normalize;
use crate::search::snapshot::IndexSnapshot;

pub const SKILL_WEIGHT: f64 = 0.6;
pub const SEMANTIC_WEIGHT: f64 = 0.4;

/// A job seeker as seen by the scorer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "SeekerFields")]
pub struct Seeker {
    pub id: String,
    #[serde(default)]
    pub skills: SkillSet,
    /// Endorsement count per normalized skill token
    #[serde(default)]
    pub endorsements: HashMap<String, u32>,
    #[serde(default)]
    pub bio: Option<String>,
}

/// Wire shape of a seeker; endorsement keys are normalized on conversion.
#[derive(Deserialize)]
struct SeekerFields {
    id: String,
    #[serde(default)]
    skills: SkillSet,
    #[serde(default)]
    endorsements: HashMap<String, u32>,
    #[serde(default)]
    bio: Option<String>,
}

impl From<SeekerFields> for Seeker {
    fn from(fields: SeekerFields) -> Self {
        let mut endorsements = HashMap::new();
        for (name, count) in fields.endorsements {
            if let Some(token) = SkillSet::normalize_token(&name) {
                let entry = endorsements.entry(token).or_insert(0u32);
                *entry = entry.saturating_add(count);
            }
        }
        Self {
            id: fields.id,
            skills: fields.skills,
            endorsements,
            bio: fields.bio,
        }
    }
}

impl Seeker {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn add_skill(&mut self, name: &str, endorsements: u32) {
        if let Some(token) = SkillSet::normalize_token(name) {
            self.skills.insert(&token);
            let entry = self.endorsements.entry(token).or_insert(0);
            *entry = entry.saturating_add(endorsements);
        }
    }

    pub fn endorsement(&self, skill: &str) -> u32 {
        SkillSet::normalize_token(skill)
            .and_then(|token| self.endorsements.get(&token).copied())
            .unwrap_or(0)
    }

    /// Bio followed by skill names; `None` when both are empty
    pub fn text(&self) -> Option<String> {
        let bio = self.bio.as_deref().map(str::trim).unwrap_or("");
        let text = match (bio.is_empty(), self.skills.is_empty()) {
            (true, true) => return None,
            (false, true) => bio.to_string(),
            (true, false) => self.skills.joined(),
            (false, false) => format!("{}\n{}", bio, self.skills.joined()),
        };
        Some(text)
    }
}

/// Score breakdown of one match
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentScores {
    pub jaccard: f64,
    pub weighted: f64,
    pub skill: f64,
    /// Cosine before clamping
    pub semantic_raw: f64,
    pub semantic: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub job_id: String,
    pub title: String,
    pub score: f64,
    pub components: ComponentScores,
    pub matched_skills: Vec<String>,
}

pub fn final_score(skill: f64, semantic: f64) -> f64 {
    SKILL_WEIGHT * skill + SEMANTIC_WEIGHT * semantic
}

/// Descending score, then ascending job id
fn by_rank(a: &MatchResult, b: &MatchResult) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.job_id.cmp(&b.job_id))
}

pub struct RankingEngine {
    scorer: SemanticScorer,
}

impl RankingEngine {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            scorer: SemanticScorer::new(embedder),
        }
    }

    /// Rank `jobs` for `seeker`, embedding each job's composed text.
    pub fn rank(
        &self,
        seeker: &Seeker,
        jobs: &[JobRecord],
        top_n: usize,
    ) -> Result<Vec<MatchResult>> {
        let seeker_vector = self.seeker_vector(seeker)?;

        let mut results = Vec::with_capacity(jobs.len());
        for job in jobs {
            let job_vector = self.scorer.embed(&job.compose_text())?;
            results.push(self.score_job(
                seeker,
                seeker_vector.as_deref(),
                job,
                job_vector.as_deref(),
            ));
        }
        Ok(finish(results, top_n))
    }

    /// Rank every record of a snapshot, reusing its stored vectors.
    pub fn rank_indexed(
        &self,
        seeker: &Seeker,
        snapshot: &IndexSnapshot,
        top_n: usize,
    ) -> Result<Vec<MatchResult>> {
        if snapshot.embedder_version() != self.scorer.embedder_version() {
            return Err(EngineError::EmbedderMismatch {
                index: snapshot.embedder_version().to_string(),
                embedder: self.scorer.embedder_version().to_string(),
            });
        }
        let seeker_vector = self.seeker_vector(seeker)?;

        let results = snapshot
            .records()
            .iter()
            .map(|job| {
                let vector = snapshot.vector(&job.id);
                self.score_job(seeker, seeker_vector.as_deref(), job, vector)
            })
            .collect();
        Ok(finish(results, top_n))
    }

    /// Rank snapshot records against CV text and the skills found in it.
    /// CVs carry no endorsements.
    pub fn rank_cv(
        &self,
        cv_text: &str,
        cv_skills: &SkillSet,
        snapshot: &IndexSnapshot,
        top_n: usize,
    ) -> Result<Vec<MatchResult>> {
        let seeker = Seeker {
            id: "cv".to_string(),
            skills: cv_skills.clone(),
            endorsements: HashMap::new(),
            bio: Some(cv_text.to_string()),
        };
        self.rank_indexed(&seeker, snapshot, top_n)
    }

    fn seeker_vector(&self, seeker: &Seeker) -> Result<Option<Vec<f32>>> {
        let text = seeker.text().ok_or_else(|| {
            EngineError::InvalidSeeker(format!("seeker '{}' has no skills and no bio", seeker.id))
        })?;
        self.scorer.embed(&text)
    }

    fn score_job(
        &self,
        seeker: &Seeker,
        seeker_vector: Option<&[f32]>,
        job: &JobRecord,
        job_vector: Option<&[f32]>,
    ) -> MatchResult {
        let skill = skill_score(&seeker.skills, &job.skills, &seeker.endorsements);

        let semantic = match (seeker_vector, job_vector.and_then(normalize)) {
            (Some(a), Some(b)) => SemanticScorer::score_vectors(a, &b),
            _ => SemanticScore::zero(),
        };

        MatchResult {
            job_id: job.id.clone(),
            title: job.title.clone(),
            score: final_score(skill.score, semantic.score),
            components: ComponentScores {
                jaccard: skill.jaccard,
                weighted: skill.weighted,
                skill: skill.score,
                semantic_raw: semantic.raw,
                semantic: semantic.score,
            },
            matched_skills: skill.matched,
        }
    }
}

fn finish(mut results: Vec<MatchResult>, top_n: usize) -> Vec<MatchResult> {
    results.sort_by(by_rank);
    results.truncate(top_n);
    results
}
