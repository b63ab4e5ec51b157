//! Seeker-to-job matching
//!
//! Skill overlap and semantic similarity are scored separately, then
//! combined into one ranking. CV text goes through [`cv`] first to recover
//! a skill set.

pub mod cv;
pub mod ranking;
pub mod semantic;
pub mod skill;

pub use cv::{analyze, CvAnalysis, EducationLevel};
pub use ranking::{final_score, ComponentScores, MatchResult, RankingEngine, Seeker};
pub use semantic::{SemanticScore, SemanticScorer};
pub use skill::{skill_score, SkillScore};
