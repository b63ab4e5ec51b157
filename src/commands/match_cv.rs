//! Match-CV command - rank indexed jobs against a plain-text CV

use anyhow::{bail, Context, Result};
use colored::Colorize;
use std::path::Path;

use super::recommend::print_matches;
use super::Workspace;
use jobmatch::matching::cv::{self, EducationLevel};
use jobmatch::matching::RankingEngine;

pub fn run(path: &str, limit: Option<usize>, json: bool) -> Result<()> {
    let path = Path::new(path);
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read CV text from {}", path.display()))?;
    if text.trim().is_empty() {
        bail!("{} contains no text", path.display());
    }

    let workspace = Workspace::open()?;
    let snapshot = workspace.require_snapshot()?;
    let analysis = cv::analyze(&text, cv::vocabulary(snapshot.records()));

    let limit = limit.unwrap_or(workspace.data.config.ranking.top_n);
    let engine = RankingEngine::new(workspace.index.embedder());
    let results = engine.rank_cv(&text, &analysis.skills, &snapshot, limit)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "analysis": analysis,
                "generation": snapshot.generation(),
                "results": results,
            }))?
        );
        return Ok(());
    }

    println!("{}", "CV Analysis".bold());
    println!();
    if analysis.skills.is_empty() {
        println!("  {} No known skills found", "!".yellow());
    } else {
        println!("  {} Skills: {}", "→".dimmed(), analysis.skills.joined().cyan());
    }
    if analysis.experience_years > 0 {
        println!("  {} Experience: {} years", "→".dimmed(), analysis.experience_years);
    }
    if analysis.education != EducationLevel::NotSpecified {
        println!("  {} Education: {:?}", "→".dimmed(), analysis.education);
    }
    println!();
    print_matches(&results);

    Ok(())
}
