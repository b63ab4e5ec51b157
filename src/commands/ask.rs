//! Ask command - retrieval-augmented answer to a question about jobs

use anyhow::Result;
use colored::Colorize;

use super::Workspace;
use jobmatch::rag::{Answer, OpenAiGenerator, Orchestrator};

pub fn run(question: &str, k: Option<usize>, dry_run: bool, json: bool) -> Result<()> {
    let workspace = Workspace::open()?;
    let config = &workspace.data.config;
    let k = k.unwrap_or(config.retrieval.top_k);

    let orchestrator = Orchestrator::new(
        workspace.index.clone(),
        config.retrieval.clone(),
        &config.embedding,
    )?;

    if dry_run {
        let answer = orchestrator.answer(question, k)?;
        if json {
            println!("{}", serde_json::to_string_pretty(&answer)?);
        } else {
            print_context(&answer);
            println!("{}", "Prompt".bold());
            println!("{}", answer.prompt);
        }
        return Ok(());
    }

    // A missing key is reported like any other generation failure, after
    // retrieval has run, so the context is still shown.
    let reply = match OpenAiGenerator::from_config(&config.generation) {
        Ok(generator) => orchestrator.chat(question, k, &generator)?,
        Err(e) => {
            let answer = orchestrator.answer(question, k)?;
            jobmatch::rag::ChatReply {
                answer,
                generated: Err(e.to_string()),
            }
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&reply)?);
        return Ok(());
    }

    print_context(&reply.answer);
    match &reply.generated {
        Ok(text) => {
            println!("{}", "Answer".bold());
            println!("{}", text.trim());
        }
        Err(e) => {
            println!("{} {}", "✗".red(), e);
            println!(
                "  {} Use {} to print the prompt for another backend",
                "→".dimmed(),
                "--dry-run".cyan()
            );
        }
    }

    Ok(())
}

fn print_context(answer: &Answer) {
    let context = &answer.context;
    let ids: Vec<&str> = context.items.iter().map(|i| i.job_id.as_str()).collect();

    println!(
        "{} {} jobs in context (index generation {}){}",
        "→".dimmed(),
        ids.len(),
        context.generation,
        context
            .location
            .as_deref()
            .map(|l| format!(", location: {l}"))
            .unwrap_or_default()
    );
    if !ids.is_empty() {
        println!("  {} {}", "→".dimmed(), ids.join(", ").dimmed());
    }
    if context.stale {
        println!(
            "  {} index built {} is stale; run {}",
            "!".yellow().bold(),
            context.built_at.format("%Y-%m-%d %H:%M"),
            "jobmatch index".cyan()
        );
    }
    println!();
}
