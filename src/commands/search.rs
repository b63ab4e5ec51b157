//! Search command - nearest job postings for a free-text query

use anyhow::Result;
use colored::Colorize;

use super::{preview, Workspace};
use jobmatch::rag::Orchestrator;

pub fn run(query: &str, limit: Option<usize>, json: bool) -> Result<()> {
    let workspace = Workspace::open()?;
    let config = &workspace.data.config;
    let limit = limit.unwrap_or(config.retrieval.top_k);

    let orchestrator = Orchestrator::new(
        workspace.index.clone(),
        config.retrieval.clone(),
        &config.embedding,
    )?;
    let results = orchestrator.search(query, limit)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("{} No results found for: {}", "→".dimmed(), query.cyan());
        return Ok(());
    }

    println!(
        "{} {} results for: {}",
        "→".dimmed(),
        results.len(),
        query.cyan()
    );
    println!();

    for (i, hit) in results.iter().enumerate() {
        let score_str = format!("{:.2}", hit.similarity);
        let score_colored = if hit.similarity > 0.8 {
            score_str.green()
        } else if hit.similarity > 0.6 {
            score_str.yellow()
        } else {
            score_str.dimmed()
        };

        let record = &hit.record;
        println!(
            "{}. [{}] {} {}",
            (i + 1).to_string().bold(),
            score_colored,
            record.title.cyan(),
            format!("({})", record.id).dimmed()
        );

        let details: Vec<&str> = [
            record.company.as_deref(),
            record.location.as_deref(),
            record.salary.as_deref(),
        ]
        .into_iter()
        .flatten()
        .filter(|s| !s.trim().is_empty())
        .collect();
        if !details.is_empty() {
            println!("   {}", details.join(" | "));
        }
        println!("   {}", preview(&record.description, 100).dimmed());
        println!();
    }

    Ok(())
}
