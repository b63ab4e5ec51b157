//! Recommend command - rank indexed jobs for a job seeker

use anyhow::{bail, Context, Result};
use colored::Colorize;
use serde::Deserialize;
use std::path::Path;

use super::Workspace;
use jobmatch::matching::{MatchResult, RankingEngine, Seeker};

/// Seeker profile file (JSON or YAML)
#[derive(Debug, Deserialize)]
struct Profile {
    #[serde(default = "default_profile_id")]
    id: String,
    #[serde(default)]
    bio: Option<String>,
    #[serde(default)]
    skills: Vec<ProfileSkill>,
}

fn default_profile_id() -> String {
    "profile".to_string()
}

/// `"python"` or `{ name: python, endorsements: 5 }`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProfileSkill {
    Name(String),
    Endorsed {
        name: String,
        #[serde(default)]
        endorsements: u32,
    },
}

impl From<Profile> for Seeker {
    fn from(profile: Profile) -> Self {
        let mut seeker = Seeker::new(profile.id);
        seeker.bio = profile.bio;
        for skill in profile.skills {
            match skill {
                ProfileSkill::Name(name) => seeker.add_skill(&name, 0),
                ProfileSkill::Endorsed { name, endorsements } => {
                    seeker.add_skill(&name, endorsements)
                }
            }
        }
        seeker
    }
}

fn load_profile(path: &Path) -> Result<Seeker> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let profile: Profile = if is_yaml {
        serde_yaml::from_str(&content)?
    } else {
        serde_json::from_str(&content)?
    };
    Ok(profile.into())
}

pub fn run(
    seeker_id: Option<String>,
    profile: Option<String>,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    let workspace = Workspace::open()?;

    let seeker = match (seeker_id, profile) {
        (Some(id), None) => workspace
            .database()?
            .load_seeker(&id)?
            .with_context(|| format!("job seeker '{id}' not found"))?,
        (None, Some(path)) => load_profile(Path::new(&path))?,
        _ => bail!("pass exactly one of --seeker-id or --profile"),
    };

    let snapshot = workspace.require_snapshot()?;
    let limit = limit.unwrap_or(workspace.data.config.ranking.top_n);
    let engine = RankingEngine::new(workspace.index.embedder());
    let results = engine.rank_indexed(&seeker, &snapshot, limit)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "seeker_id": seeker.id,
                "generation": snapshot.generation(),
                "results": results,
            }))?
        );
        return Ok(());
    }

    println!(
        "{} Top {} jobs for {} ({} skills)",
        "→".dimmed(),
        results.len(),
        seeker.id.cyan(),
        seeker.skills.len()
    );
    println!();
    print_matches(&results);

    Ok(())
}

/// Shared by `recommend` and `match-cv`
pub(crate) fn print_matches(results: &[MatchResult]) {
    if results.is_empty() {
        println!("{} No matching jobs", "→".dimmed());
        return;
    }

    for (i, result) in results.iter().enumerate() {
        let score_str = format!("{:.1}%", result.score * 100.0);
        let score_colored = if result.score > 0.6 {
            score_str.green()
        } else if result.score > 0.3 {
            score_str.yellow()
        } else {
            score_str.dimmed()
        };

        println!(
            "{}. [{}] {} {}",
            (i + 1).to_string().bold(),
            score_colored,
            result.title.cyan(),
            format!("({})", result.job_id).dimmed()
        );
        println!(
            "   skill {:.2} (jaccard {:.2}, endorsed {:.2}) | semantic {:.2}",
            result.components.skill,
            result.components.jaccard,
            result.components.weighted,
            result.components.semantic
        );
        if !result.matched_skills.is_empty() {
            println!("   matched: {}", result.matched_skills.join(", ").green());
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_skill_forms() {
        let profile: Profile = serde_json::from_str(
            r#"{"id":"u1","bio":"Data person","skills":["SQL",{"name":"Python","endorsements":4}]}"#,
        )
        .unwrap();
        let seeker = Seeker::from(profile);
        assert_eq!(seeker.id, "u1");
        assert_eq!(seeker.skills.len(), 2);
        assert_eq!(seeker.endorsement("python"), 4);
        assert_eq!(seeker.endorsement("sql"), 0);
    }

    #[test]
    fn test_yaml_profile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("me.yaml");
        let yaml = "bio: Backend dev\nskills:\n  - rust\n  - name: go\n    endorsements: 2\n";
        std::fs::write(&path, yaml).unwrap();

        let seeker = load_profile(&path).unwrap();
        assert_eq!(seeker.id, "profile");
        assert!(seeker.skills.contains("rust"));
        assert_eq!(seeker.endorsement("go"), 2);
    }
}
