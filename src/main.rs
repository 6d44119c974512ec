//! # Context AI CLI (`ctx-ai`)
//!
//! ## Usage
//!
//! ```bash
//! ctx-ai --config ./config/ctx-ai.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ctx-ai init` | Create the vector index database and upload directory |
//! | `ctx-ai ingest <file>` | Chunk, embed and index a PDF or DOCX file |
//! | `ctx-ai search "<query>"` | Show the closest indexed chunks |
//! | `ctx-ai ask "<question>"` | Answer a question from the indexed documents |
//! | `ctx-ai serve` | Start the HTTP upload/chat server |
//!
//! `ask` and `serve` need the language-model API key (`PPLX_API_KEY` by
//! default) in the environment or in a `.env` file.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use context_ai::config;
use context_ai::llm::require_api_key;
use context_ai::pipeline::RagPipeline;
use context_ai::server;
use context_ai::store::sqlite::SqliteStore;

/// Context AI: ask questions about your PDF and DOCX documents.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/ctx-ai.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "ctx-ai",
    about = "Context AI: retrieval-augmented answers over uploaded documents",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/ctx-ai.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the vector index and uploads directory. Idempotent.
    Init,

    /// Index a local PDF or DOCX file.
    ///
    /// The file is read in place; it is not copied into the uploads directory.
    Ingest {
        /// Path to a `.pdf` or `.docx` file.
        path: PathBuf,
    },

    /// Print the chunks closest to a query, with scores.
    Search {
        query: String,

        /// Number of results (defaults to `retrieval.k`).
        #[arg(long)]
        k: Option<usize>,
    },

    /// Answer a question using the indexed documents as context.
    Ask { question: String },

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let store = SqliteStore::open(&cfg.db.path).await?;
            store.close().await;
            std::fs::create_dir_all(&cfg.uploads.dir)?;
            println!("Vector index initialized at {}", cfg.db.path.display());
        }
        Commands::Ingest { path } => {
            let pipeline = RagPipeline::from_config(cfg).await?;
            let report = pipeline.ingest_path(&path).await?;
            println!("Indexed {} ({} chunks)", report.filename, report.chunks);
        }
        Commands::Search { query, k } => {
            let pipeline = RagPipeline::from_config(cfg).await?;
            let hits = pipeline.search(&query, k).await?;
            if hits.is_empty() {
                println!("No results.");
            }
            for (i, hit) in hits.iter().enumerate() {
                let page = hit
                    .metadata
                    .page
                    .map(|p| format!(" p.{}", p))
                    .unwrap_or_default();
                println!(
                    "{}. [{:.3}] {}{}",
                    i + 1,
                    hit.score,
                    hit.metadata.filename,
                    page
                );
                println!("   {}", hit.text.replace('\n', " "));
            }
        }
        Commands::Ask { question } => {
            require_api_key(&cfg.llm)?;
            let pipeline = RagPipeline::from_config(cfg).await?;
            let answer = pipeline.ask(&question).await?;
            println!("{}", answer.response);
            if !answer.source_docs.is_empty() {
                println!("\nSources:");
                for doc in &answer.source_docs {
                    match doc.page {
                        Some(p) => println!("  - {} (page {})", doc.filename, p),
                        None => println!("  - {}", doc.filename),
                    }
                }
            }
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
