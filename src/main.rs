//! CLI entry point for equipment-analytics.
//!
//! Ingests CSV uploads into a local SQLite store and prints query results as JSON.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use equipment_analytics::ingestion::TracingObserver;
use equipment_analytics::service::{AnalyticsService, ServiceOptions};
use equipment_analytics::store::SqliteStore;
use equipment_analytics::types::DatasetId;
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "equipment-analytics")]
#[command(about = "Ingest and compare equipment measurement datasets", long_about = None)]
struct Cli {
    /// SQLite database file
    #[arg(long, env = "EQUIPMENT_DB", default_value = "equipment.db", global = true)]
    db: PathBuf,

    /// Log filter directives (e.g. "debug" or "equipment_analytics=trace")
    #[arg(long, env = "RUST_LOG", default_value = "info", global = true)]
    log: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a CSV file and print the created dataset
    Ingest {
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },
    /// Print summary statistics (latest dataset if no id is given)
    Summary {
        #[arg(long)]
        id: Option<DatasetId>,
    },
    /// Print equipment records sorted by name (latest dataset if no id is given)
    Data {
        #[arg(long)]
        id: Option<DatasetId>,
    },
    /// List retained datasets, most recent first
    History,
    /// Print the report tables (latest dataset if no id is given)
    Report {
        #[arg(long)]
        id: Option<DatasetId>,
    },
    /// Compare two datasets by performance score
    Compare {
        #[arg(value_name = "ID_A")]
        a: DatasetId,
        #[arg(value_name = "ID_B")]
        b: DatasetId,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&cli.log).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let store = SqliteStore::open(&cli.db)
        .with_context(|| format!("failed to open dataset store at {}", cli.db.display()))?;
    let options = ServiceOptions {
        observer: Some(Arc::new(TracingObserver)),
        ..Default::default()
    };
    let service = AnalyticsService::with_options(store, options);
    service
        .enforce_retention()
        .context("failed to apply retention to existing datasets")?;
    debug!(db = %cli.db.display(), "service ready");

    match cli.command {
        Commands::Ingest { path } => {
            let dataset = service
                .ingest_path(&path)
                .with_context(|| format!("failed to ingest {}", path.display()))?;
            print_json(&dataset)
        }
        Commands::Summary { id } => print_json(&service.summary(id)?),
        Commands::Data { id } => print_json(&service.data(id)?),
        Commands::History => print_json(&service.history()?),
        Commands::Report { id } => print_json(&service.report(id)?),
        Commands::Compare { a, b } => print_json(&service.compare(a, b)?),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value)?;
    println!("{out}");
    Ok(())
}
