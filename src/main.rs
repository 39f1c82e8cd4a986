//! CLI entry point for the harvester tool.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use harvester_core::{Harvester, MemoryCache, Schema};
use tracing::{debug, info};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // Logs go to stderr; stdout carries the JSON result.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let schema = Schema::from_file(&args.schema)
        .with_context(|| format!("failed to load schema {}", args.schema.display()))?;
    let schema = Arc::new(schema);
    info!(schema = schema.name(), fields = schema.len(), "Schema loaded");

    let config = args.request_config()?;
    let source = args.source()?;

    let mut harvester = Harvester::http();
    if args.cache {
        debug!("resource cache enabled");
        harvester = harvester.with_cache(Arc::new(MemoryCache::default()));
    }

    let document = harvester.harvest(&schema, source, config).await?;
    info!(origin = ?document.origin(), "Harvest complete");

    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(())
}
