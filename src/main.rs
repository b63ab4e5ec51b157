mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "jobmatch")]
#[command(about = "Hybrid job matching and retrieval: skill + semantic ranking and RAG prompts", long_about = None)]
#[command(version)]
struct Cli {
    /// Verbose logging (-v debug for jobmatch, -vv everything)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or update .jobmatch.json
    Init {
        #[arg(long, help = "SQLite database with job_posts")]
        database: Option<String>,
        #[arg(long = "sheet", help = "Excel workbook or JSON/YAML export (repeatable)")]
        sheets: Vec<String>,
    },

    /// Build the job embedding index (appends new jobs unless --rebuild)
    Index {
        #[arg(long, help = "Show index status only")]
        status: bool,
        #[arg(long, help = "Force full rebuild")]
        rebuild: bool,
        #[arg(long, help = "JSON output")]
        json: bool,
    },

    /// Nearest job postings for a query
    Search {
        query: String,
        #[arg(short, long, help = "Number of results")]
        k: Option<usize>,
        #[arg(long, help = "JSON output")]
        json: bool,
    },

    /// Rank jobs for a seeker from the database or a profile file
    Recommend {
        #[arg(long, conflicts_with = "profile", help = "job_seeker_id in the database")]
        seeker_id: Option<String>,
        #[arg(long, help = "JSON/YAML profile with bio and skills")]
        profile: Option<String>,
        #[arg(short, long, help = "Limit results")]
        limit: Option<usize>,
        #[arg(long, help = "JSON output")]
        json: bool,
    },

    /// Rank jobs against a plain-text CV
    #[command(name = "match-cv")]
    MatchCv {
        /// Path to the CV as plain text
        file: String,
        #[arg(short, long, help = "Limit results")]
        limit: Option<usize>,
        #[arg(long, help = "JSON output")]
        json: bool,
    },

    /// Answer a question about jobs with retrieved context
    Ask {
        question: String,
        #[arg(short, long, help = "Jobs to retrieve")]
        k: Option<usize>,
        #[arg(long, help = "Print the prompt instead of calling the generator")]
        dry_run: bool,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    jobmatch::logging::init(cli.verbose);

    match cli.command {
        Commands::Init { database, sheets } => commands::init::run(database, sheets),
        Commands::Index {
            status,
            rebuild,
            json,
        } => commands::index::run(status, rebuild, json),
        Commands::Search { query, k, json } => commands::search::run(&query, k, json),
        Commands::Recommend {
            seeker_id,
            profile,
            limit,
            json,
        } => commands::recommend::run(seeker_id, profile, limit, json),
        Commands::MatchCv { file, limit, json } => commands::match_cv::run(&file, limit, json),
        Commands::Ask {
            question,
            k,
            dry_run,
            json,
        } => commands::ask::run(&question, k, dry_run, json),
    }
}
