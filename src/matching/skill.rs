//! Skill overlap scoring.
//!
//! `skill_score = 0.7 * jaccard + 0.3 * weighted`, where `weighted` is the
//! share of the seeker's endorsements that land on matched skills.

use serde::Serialize;
use std::collections::HashMap;

use crate::core::record::SkillSet;

pub const JACCARD_WEIGHT: f64 = 0.7;
pub const ENDORSEMENT_WEIGHT: f64 = 0.3;

/// Components of one skill comparison
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillScore {
    pub jaccard: f64,
    pub weighted: f64,
    pub score: f64,
    /// Skills present on both sides, ascending
    pub matched: Vec<String>,
}

/// `|A ∩ B| / |A ∪ B|`, 0 when both are empty
pub fn jaccard(a: &SkillSet, b: &SkillSet) -> f64 {
    let union = a.union_len(b);
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// Matched endorsements over all endorsements on the seeker's own skills.
///
/// Endorsements for skills the seeker does not list are ignored. Always in
/// [0, 1]; 0 with no intersection or no endorsements.
pub fn endorsement_ratio(
    seeker_skills: &SkillSet,
    job_skills: &SkillSet,
    endorsements: &HashMap<String, u32>,
) -> f64 {
    let weight = |skill: &str| u64::from(endorsements.get(skill).copied().unwrap_or(0));

    let total: u64 = seeker_skills.iter().map(weight).sum();
    if total == 0 {
        return 0.0;
    }
    let matched: u64 = seeker_skills.intersection(job_skills).map(weight).sum();
    matched as f64 / total as f64
}

pub fn skill_score(
    seeker_skills: &SkillSet,
    job_skills: &SkillSet,
    endorsements: &HashMap<String, u32>,
) -> SkillScore {
    let jaccard = jaccard(seeker_skills, job_skills);
    let weighted = endorsement_ratio(seeker_skills, job_skills, endorsements);
    SkillScore {
        jaccard,
        weighted,
        score: JACCARD_WEIGHT * jaccard + ENDORSEMENT_WEIGHT * weighted,
        matched: seeker_skills
            .intersection(job_skills)
            .map(String::from)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(tokens: &[&str]) -> SkillSet {
        tokens.iter().collect()
    }

    #[test]
    fn test_jaccard_symmetric() {
        let pairs = [
            (set(&["python", "sql"]), set(&["python", "docker"])),
            (set(&["a"]), set(&[])),
            (set(&["rust", "go", "c"]), set(&["go"])),
        ];
        for (a, b) in &pairs {
            assert_eq!(jaccard(a, b), jaccard(b, a));
        }
    }

    #[test]
    fn test_jaccard_self_is_one() {
        let a = set(&["python", "sql", "docker"]);
        assert_eq!(jaccard(&a, &a), 1.0);
        assert_eq!(jaccard(&SkillSet::new(), &SkillSet::new()), 0.0);
    }

    #[test]
    fn test_worked_example() {
        let seeker = set(&["python", "sql"]);
        let job = set(&["python", "docker"]);
        let endorsements = HashMap::from([("python".to_string(), 5), ("sql".to_string(), 2)]);

        let result = skill_score(&seeker, &job, &endorsements);
        assert!((result.jaccard - 1.0 / 3.0).abs() < 1e-9);
        assert!((result.weighted - 5.0 / 7.0).abs() < 1e-9);
        let expected = 0.7 / 3.0 + 0.3 * 5.0 / 7.0;
        assert!((result.score - expected).abs() < 1e-9);
        assert_eq!(result.matched, vec!["python"]);
    }

    #[test]
    fn test_empty_intersection_has_zero_weighted() {
        let seeker = set(&["sales"]);
        let job = set(&["rust"]);
        let endorsements = HashMap::from([("sales".to_string(), 10)]);
        let result = skill_score(&seeker, &job, &endorsements);
        assert_eq!(result.weighted, 0.0);
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn test_foreign_endorsements_ignored() {
        let seeker = set(&["python"]);
        let job = set(&["python"]);
        let endorsements = HashMap::from([("python".to_string(), 1), ("cobol".to_string(), 99)]);
        assert_eq!(endorsement_ratio(&seeker, &job, &endorsements), 1.0);
    }

    #[test]
    fn test_score_bounded() {
        let seeker = set(&["a", "b", "c"]);
        for job in [set(&[]), set(&["a"]), set(&["a", "b", "c"]), set(&["x", "y"])] {
            let endorsements = HashMap::from([("a".to_string(), u32::MAX), ("b".to_string(), 3)]);
            let result = skill_score(&seeker, &job, &endorsements);
            assert!((0.0..=1.0).contains(&result.score));
        }
    }
}
