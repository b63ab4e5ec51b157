//! Canonical job record shape shared by every engine component.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Maximum description characters included in the embedding text
pub const DESCRIPTION_EMBED_CHARS: usize = 500;
/// Maximum requirements characters included in the embedding text
pub const REQUIREMENTS_EMBED_CHARS: usize = 300;

/// Which origin produced a record.
///
/// Variant order is the deduplication priority: earlier wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceTag {
    /// Authoritative relational store
    Database,
    /// Auxiliary spreadsheet export
    Spreadsheet,
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceTag::Database => write!(f, "database"),
            SourceTag::Spreadsheet => write!(f, "spreadsheet"),
        }
    }
}

/// Set of normalized skill tokens.
///
/// Tokens are trimmed, case-folded and whitespace-collapsed. Normalization is
/// idempotent: building a set from an existing set's tokens yields the same set.
/// Deserialized sets go through the same normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>")]
pub struct SkillSet(BTreeSet<String>);

impl SkillSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize a single raw token. Returns `None` for blank input.
    pub fn normalize_token(raw: &str) -> Option<String> {
        let token = raw
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        if token.is_empty() {
            None
        } else {
            Some(token)
        }
    }

    /// Parse a comma-separated list ("Python, SQL , docker")
    pub fn from_comma_list(list: &str) -> Self {
        list.split(',').collect()
    }

    pub fn insert(&mut self, raw: &str) -> bool {
        match Self::normalize_token(raw) {
            Some(token) => self.0.insert(token),
            None => false,
        }
    }

    pub fn contains(&self, raw: &str) -> bool {
        Self::normalize_token(raw)
            .map(|t| self.0.contains(&t))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Tokens in ascending order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn intersection<'a>(&'a self, other: &'a SkillSet) -> impl Iterator<Item = &'a str> {
        self.0.intersection(&other.0).map(String::as_str)
    }

    pub fn union_len(&self, other: &SkillSet) -> usize {
        self.0.union(&other.0).count()
    }

    /// Comma-joined tokens, used in rendered text
    pub fn joined(&self) -> String {
        self.iter().collect::<Vec<_>>().join(", ")
    }
}

impl<S: AsRef<str>> FromIterator<S> for SkillSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = SkillSet::new();
        for raw in iter {
            set.insert(raw.as_ref());
        }
        set
    }
}

impl From<Vec<String>> for SkillSet {
    fn from(raw: Vec<String>) -> Self {
        raw.into_iter().collect()
    }
}

/// A job posting in canonical form.
///
/// Immutable once indexed: a re-index replaces records, never patches them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Identity key, stable across origins
    pub id: String,
    pub title: String,
    pub company: Option<String>,
    pub location: Option<String>,
    /// Free-form salary range as published ("15-20M VND", "$80k-$100k")
    pub salary: Option<String>,
    pub description: String,
    pub requirements: Option<String>,
    pub skills: SkillSet,
    pub source: SourceTag,
}

impl JobRecord {
    /// Compose the text that is embedded for this record.
    pub fn compose_text(&self) -> String {
        let mut parts = vec![format!("Title: {}", self.title)];

        if let Some(company) = non_empty(&self.company) {
            parts.push(format!("Company: {company}"));
        }
        if let Some(location) = non_empty(&self.location) {
            parts.push(format!("Location: {location}"));
        }
        if let Some(salary) = non_empty(&self.salary) {
            parts.push(format!("Salary: {salary}"));
        }
        if !self.skills.is_empty() {
            parts.push(format!("Skills: {}", self.skills.joined()));
        }
        parts.push(format!(
            "Description: {}",
            truncate_chars(&self.description, DESCRIPTION_EMBED_CHARS)
        ));
        if let Some(requirements) = non_empty(&self.requirements) {
            parts.push(format!(
                "Requirements: {}",
                truncate_chars(requirements, REQUIREMENTS_EMBED_CHARS)
            ));
        }

        parts.join("\n")
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Truncate on a char boundary (char-aware for Unicode)
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record(id: &str) -> JobRecord {
        JobRecord {
            id: id.to_string(),
            title: "Backend Engineer".to_string(),
            company: Some("Acme".to_string()),
            location: Some("Ha Noi".to_string()),
            salary: None,
            description: "Build APIs in Python".to_string(),
            requirements: None,
            skills: ["Python", "SQL"].into_iter().collect(),
            source: SourceTag::Database,
        }
    }

    #[test]
    fn test_skill_normalization() {
        let set: SkillSet = ["  Python ", "python", "Machine   Learning", "", "SQL"]
            .into_iter()
            .collect();
        let tokens: Vec<&str> = set.iter().collect();
        assert_eq!(tokens, vec!["machine learning", "python", "sql"]);
    }

    #[test]
    fn test_skill_normalization_idempotent() {
        let once: SkillSet = ["Rust", " GO ", "Node.JS"].into_iter().collect();
        let twice: SkillSet = once.iter().collect();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_deserialized_skills_are_normalized() {
        let set: SkillSet = serde_json::from_str(r#"["Python", " SQL ", "python", ""]"#).unwrap();
        let tokens: Vec<&str> = set.iter().collect();
        assert_eq!(tokens, vec!["python", "sql"]);
        assert!(set.contains("sql"));

        let again: SkillSet = set.iter().collect();
        assert_eq!(set, again);
    }

    #[test]
    fn test_skills_survive_serialization() {
        let set: SkillSet = ["Docker", "AWS"].into_iter().collect();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["aws","docker"]"#);
        assert_eq!(serde_json::from_str::<SkillSet>(&json).unwrap(), set);

        let bytes = bincode::serialize(&set).unwrap();
        assert_eq!(bincode::deserialize::<SkillSet>(&bytes).unwrap(), set);
    }

    #[test]
    fn test_from_comma_list() {
        let set = SkillSet::from_comma_list("Docker, kubernetes ,, AWS");
        assert_eq!(set.len(), 3);
        assert!(set.contains("docker"));
        assert!(set.contains("AWS"));
    }

    #[test]
    fn test_compose_text_contains_core_fields() {
        let record = sample_record("1");
        let text = record.compose_text();
        assert!(text.starts_with("Title: Backend Engineer"));
        assert!(text.contains("Skills: python, sql"));
        assert!(text.contains("Description: Build APIs in Python"));
        assert!(!text.contains("Salary"));
    }

    #[test]
    fn test_truncate_chars_unicode() {
        assert_eq!(truncate_chars("Hà Nội xin chào", 6), "Hà Nội");
        assert_eq!(truncate_chars("short", 100), "short");
    }

    #[test]
    fn test_source_priority_order() {
        assert!(SourceTag::Database < SourceTag::Spreadsheet);
    }
}
