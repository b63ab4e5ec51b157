//! Index command - build or extend the job embedding index

use anyhow::{Context, Result};
use colored::Colorize;

use super::Workspace;

pub fn run(status_only: bool, rebuild: bool, json: bool) -> Result<()> {
    if status_only {
        return show_status(&Workspace::open()?, json);
    }
    let workspace = if rebuild {
        Workspace::open_for_rebuild()?
    } else {
        Workspace::open()?
    };

    if !json {
        println!("{} Reading job sources...", "→".dimmed());
    }
    let report = workspace.load_records()?;
    let rejected = report.rejected.len();
    let source_duplicates = report.duplicates;

    let full_build = rebuild || workspace.index.snapshot().is_none();
    let outcome = if full_build {
        if !json {
            println!("{} Building index from {} records...", "→".dimmed(), report.records.len());
        }
        workspace.index.build(report.records)
    } else {
        if !json {
            println!("{} Appending new records to the index...", "→".dimmed());
        }
        workspace.index.append(report.records)
    };
    let build = outcome.context("index build failed; the previous index is still in place")?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "mode": if full_build { "build" } else { "append" },
                "indexed": build.indexed,
                "skipped": build.skipped,
                "duplicates": build.duplicates,
                "rejected": rejected,
                "source_duplicates": source_duplicates,
                "generation": build.generation,
                "duration_ms": build.duration_ms,
            })
        );
        return Ok(());
    }

    println!();
    println!(
        "{} Indexed {} records in {:.2}s (generation {})",
        "✓".green().bold(),
        build.indexed.to_string().cyan(),
        build.duration_ms as f64 / 1000.0,
        build.generation
    );
    if build.duplicates > 0 {
        println!("  {} {} records already indexed", "→".dimmed(), build.duplicates);
    }
    if source_duplicates > 0 {
        println!(
            "  {} {} rows shadowed by a higher-priority source",
            "→".dimmed(),
            source_duplicates
        );
    }
    if build.skipped > 0 {
        println!("  {} {} records skipped (unusable vector)", "✗".red(), build.skipped);
    }
    if rejected > 0 {
        println!("  {} {} rows rejected (malformed)", "✗".red(), rejected);
    }
    println!(
        "  {} Index saved to: {}",
        "→".dimmed(),
        workspace.data.paths.index_dir.display()
    );

    Ok(())
}

fn show_status(workspace: &Workspace, json: bool) -> Result<()> {
    let stats = workspace.index.stats();

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    if stats.built_at.is_none() {
        println!(
            "{} Index not found. Run {} first.",
            "!".yellow().bold(),
            "jobmatch index".cyan()
        );
        return Ok(());
    }

    println!("{}", "Index Status".bold());
    println!();
    println!("  {} {} records indexed", "→".dimmed(), stats.count.to_string().cyan());
    println!("  {} Generation {}", "→".dimmed(), stats.generation);
    println!(
        "  {} Embedder {} ({} dims)",
        "→".dimmed(),
        stats.embedder_version,
        stats.dimension
    );
    if let Some(built_at) = stats.built_at {
        println!(
            "  {} Last built: {}",
            "→".dimmed(),
            built_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }

    Ok(())
}
