//! # FileScout CLI (`scout`)
//!
//! Loads the file corpus from CSV, builds the similarity index, and runs
//! searches from the command line or serves them to an agent over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! scout --config ./config/scout.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `scout search "<query>"` | Similar-records search with optional constraints |
//! | `scout links "<query>"` | Most recent matching web link |
//! | `scout list` | Every record matching the metadata filter |
//! | `scout stats` | Record counts per source and file type |
//! | `scout tools` | Print the agent tool declarations as JSON |
//! | `scout serve` | Start the HTTP tool server |
//!
//! ## Examples
//!
//! ```bash
//! scout search "sales report and sprint planning" --source google_drive
//! scout search "roadmap" --start 2024-02-15 --end 2024-04-30 --limit 5 --json
//! scout links "pricing page"
//! RUST_LOG=debug scout serve
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use filescout::config;
use filescout::search::{self, SearchArgs};
use filescout::server;
use filescout::stats;
use filescout::tools::ToolRegistry;

/// FileScout: semantic file and link retrieval with exact metadata filtering.
#[derive(Parser)]
#[command(
    name = "scout",
    about = "FileScout — semantic file and link retrieval for conversational agents",
    version,
    long_about = "FileScout loads a corpus of file metadata and generated insights, ranks it \
    by semantic similarity, re-applies source, type, size and date constraints exactly, and \
    exposes the result through a CLI and an HTTP tool server."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/scout.toml`. See `config/scout.example.toml`.
    #[arg(long, global = true, default_value = "./config/scout.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for files similar to a query.
    ///
    /// Queries joined by "and" or "or" are split into sub-queries. Results
    /// are ordered oldest first and limited to the most recent matches.
    Search {
        /// The search query string.
        query: String,

        /// File source: any, web, google_drive, avoma.
        #[arg(long)]
        source: Option<String>,

        /// File type: any, "web link", pdf, docx, pptx, xlsx.
        #[arg(long)]
        extension: Option<String>,

        /// Size bound (MB), or "any".
        #[arg(long)]
        size: Option<String>,

        /// Maximum number of files to return.
        #[arg(long)]
        limit: Option<usize>,

        /// Earliest creation date (YYYY-MM-DD).
        #[arg(long)]
        start: Option<String>,

        /// Latest creation date (YYYY-MM-DD).
        #[arg(long)]
        end: Option<String>,

        /// Rank without the metadata pre-filter.
        #[arg(long)]
        contextual: bool,

        /// Print the full JSON response.
        #[arg(long)]
        json: bool,
    },

    /// Find the most recent web link matching a query.
    Links {
        query: String,

        /// Print the full JSON response.
        #[arg(long)]
        json: bool,
    },

    /// List records matching the metadata filter, unranked.
    List {
        #[arg(long)]
        source: Option<String>,

        #[arg(long)]
        extension: Option<String>,

        #[arg(long)]
        size: Option<String>,
    },

    /// Show corpus statistics.
    Stats,

    /// Print the tool declarations handed to the agent.
    Tools,

    /// Start the HTTP tool server.
    ///
    /// Binds to the address configured in `[server].bind`.
    Serve,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    // Needs no corpus.
    if let Commands::Tools = cli.command {
        let declarations = ToolRegistry::with_builtins().declarations();
        println!("{}", serde_json::to_string_pretty(&declarations)?);
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Search {
            query,
            source,
            extension,
            size,
            limit,
            start,
            end,
            contextual,
            json,
        } => {
            let args = SearchArgs {
                source,
                extension,
                size,
                limit,
                start,
                end,
                contextual,
                json,
            };
            search::run_search(&cfg, &query, args).await?;
        }
        Commands::Links { query, json } => {
            search::run_links(&cfg, &query, json).await?;
        }
        Commands::List {
            source,
            extension,
            size,
        } => {
            let constraints = search::parse_constraints(
                source.as_deref(),
                extension.as_deref(),
                size.as_deref(),
            )?;
            search::run_list(&cfg, &constraints).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg)?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Tools => {}
    }

    Ok(())
}
