//! Advisory hints pulled from plain CV text.
//!
//! Only the skill list feeds scoring. Experience and education are reported
//! to the caller as-is.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;

use crate::core::record::{truncate_chars, JobRecord, SkillSet};

/// Characters of CV text kept in [`CvAnalysis::preview`]
pub const PREVIEW_CHARS: usize = 1000;

lazy_static! {
    static ref EXPERIENCE_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(\d+)\+?\s*(?:years?|năm)\s+(?:of\s+)?(?:experience|kinh nghiệm)").unwrap(),
        Regex::new(r"(?:experience|kinh nghiệm).*?(\d+)\+?\s*(?:years?|năm)").unwrap(),
        Regex::new(r"(\d+)\+?\s*(?:years?|năm)").unwrap(),
    ];
}

/// Highest education level mentioned, checked from the top down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EducationLevel {
    Phd,
    Master,
    Bachelor,
    College,
    HighSchool,
    NotSpecified,
}

const EDUCATION_KEYWORDS: &[(EducationLevel, &[&str])] = &[
    (EducationLevel::Phd, &["phd", "tiến sĩ", "doctorate"]),
    (EducationLevel::Master, &["master", "thạc sĩ", "mba"]),
    (
        EducationLevel::Bachelor,
        &["bachelor", "cử nhân", "đại học", "university degree"],
    ),
    (EducationLevel::College, &["college", "cao đẳng"]),
    (EducationLevel::HighSchool, &["high school", "trung học"]),
];

#[derive(Debug, Clone, Serialize)]
pub struct CvAnalysis {
    pub skills: SkillSet,
    pub experience_years: u32,
    pub education: EducationLevel,
    pub preview: String,
}

pub fn analyze<'a, I>(text: &str, vocabulary: I) -> CvAnalysis
where
    I: IntoIterator<Item = &'a str>,
{
    CvAnalysis {
        skills: extract_skills(text, vocabulary),
        experience_years: experience_years(text),
        education: education_level(text),
        preview: truncate_chars(text, PREVIEW_CHARS).to_string(),
    }
}

/// Skills from `vocabulary` that appear in `text` as whole words.
///
/// A match must not touch a letter or digit on either side, so `java` does
/// not match inside `javascript` while `c++` and `node.js` still match.
pub fn extract_skills<'a, I>(text: &str, vocabulary: I) -> SkillSet
where
    I: IntoIterator<Item = &'a str>,
{
    let haystack = text.to_lowercase();
    vocabulary
        .into_iter()
        .filter(|skill| {
            SkillSet::normalize_token(skill)
                .map(|needle| contains_word(&haystack, &needle))
                .unwrap_or(false)
        })
        .collect()
}

pub(crate) fn contains_word(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

/// Largest "N years" figure in the text, 0 if none
pub fn experience_years(text: &str) -> u32 {
    let lower = text.to_lowercase();
    EXPERIENCE_PATTERNS
        .iter()
        .flat_map(|re| re.captures_iter(&lower))
        .filter_map(|caps| caps.get(1)?.as_str().parse::<u32>().ok())
        .max()
        .unwrap_or(0)
}

pub fn education_level(text: &str) -> EducationLevel {
    let lower = text.to_lowercase();
    EDUCATION_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(level, _)| *level)
        .unwrap_or(EducationLevel::NotSpecified)
}

/// Every skill token used by at least one record
pub fn vocabulary(records: &[JobRecord]) -> BTreeSet<&str> {
    records.iter().flat_map(|r| r.skills.iter()).collect()
}
