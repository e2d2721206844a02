//! # Event Scout CLI (`evs`)
//!
//! The `evs` binary serves the recommendation HTTP API and offers
//! one-shot console access to the same pipeline.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `evs serve` | Load the catalog, embed it, and start the HTTP server |
//! | `evs query "<text>"` | Run one query through the pipeline and print the result |
//! | `evs catalog` | Load and summarize the catalog (rows, columns, months) |
//!
//! ## Examples
//!
//! ```bash
//! evs --config ./config/evs.toml catalog
//! evs --config ./config/evs.toml query "something fun in December"
//! evs --config ./config/evs.toml serve
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::error;
use tracing_subscriber::EnvFilter;

use event_scout::catalog::Catalog;
use event_scout::engine::{Engine, Outcome};
use event_scout::{config, server};

/// Event Scout — context-aware event recommendations over a fixed catalog.
#[derive(Parser)]
#[command(
    name = "evs",
    about = "Event Scout — context-aware event recommendations over a fixed catalog",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/evs.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the recommendation HTTP server.
    ///
    /// Loads the catalog, precomputes its embeddings, and binds to the
    /// address configured in `[server].bind`.
    Serve,

    /// Run a single query through the pipeline and print the result.
    Query {
        /// The query text, e.g. "something fun in December".
        text: String,
    },

    /// Load and summarize the catalog without starting the server.
    ///
    /// Useful for validating a workbook before deploying it.
    Catalog,
}

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(err) = run().await {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            let engine = Arc::new(Engine::bootstrap(&cfg).await?);
            server::run_server(&cfg, engine).await?;
        }
        Commands::Query { text } => {
            let engine = Engine::bootstrap(&cfg).await?;
            print_outcome(engine.recommend(&text).await?);
        }
        Commands::Catalog => {
            let catalog = Catalog::load(&cfg.catalog.path)?;
            print_catalog_summary(&catalog);
        }
    }

    Ok(())
}

fn print_outcome(outcome: Outcome) {
    match outcome {
        Outcome::NoEventsForMonth(month) => println!("No events found for {}.", month),
        Outcome::NoMatches => println!("No relevant events found."),
        Outcome::Events(events) => {
            for (i, event) in events.iter().enumerate() {
                println!(
                    "{}. [{:.3}] {} — {}",
                    i + 1,
                    event.score,
                    event.record.month,
                    event.record.description
                );
            }
        }
    }
}

fn print_catalog_summary(catalog: &Catalog) {
    println!("rows: {}", catalog.len());
    println!("columns: {}", catalog.columns().join(", "));

    let months: BTreeSet<&str> = catalog
        .records()
        .iter()
        .map(|r| r.month.as_str())
        .filter(|m| !m.is_empty())
        .collect();
    println!(
        "months: {}",
        months.into_iter().collect::<Vec<_>>().join(", ")
    );

    let missing_description = catalog
        .records()
        .iter()
        .filter(|r| r.description.is_empty())
        .count();
    if missing_description > 0 {
        println!("rows without description: {}", missing_description);
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
