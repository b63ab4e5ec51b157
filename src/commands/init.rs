//! Init command - write a default `.jobmatch.json`

use anyhow::Result;
use colored::*;

use jobmatch::core::config::{Config, CONFIG_FILE};
use jobmatch::core::paths::get_data_root;

pub fn run(database: Option<String>, sheets: Vec<String>) -> Result<()> {
    let root = get_data_root()?;
    let config_path = root.join(CONFIG_FILE);

    println!("{}", "Jobmatch Configuration".bold());
    println!("{}", "=".repeat(50));
    println!();

    let existed = config_path.exists();
    let mut config = if existed {
        println!("{} Loading existing config...", "→".blue());
        Config::load(&root)
    } else {
        Config::default()
    };

    if let Some(database) = database {
        config.sources.database = Some(database);
    }
    for sheet in sheets {
        if !config.sources.sheets.contains(&sheet) {
            config.sources.sheets.push(sheet);
        }
    }

    config.save(&root)?;

    if existed {
        println!("{} Updated {}", "✓".green(), config_path.display());
    } else {
        println!("{} Created {}", "✓".green(), config_path.display());
    }

    match &config.sources.database {
        Some(db) => println!("  {} database: {}", "→".dimmed(), db),
        None => println!("  {} database: {}", "→".dimmed(), "(none)".dimmed()),
    }
    for sheet in &config.sources.sheets {
        println!("  {} sheet: {}", "→".dimmed(), sheet);
    }
    println!();
    println!("Next: {}", "jobmatch index".cyan());

    Ok(())
}
