//! Catalog inspector.
//!
//! Loads a catalog file, fetches each WMS item's capabilities from local
//! files and prints the resolved items as JSON.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use catalog_cli::{build_session, inspect, read_catalog, FileCapabilitiesLoader};
use catalog_model::CatalogConfig;

#[derive(Parser, Debug)]
#[command(name = "catalog-cli")]
#[command(about = "Inspect a catalog offline using local capabilities documents")]
struct Args {
    /// Catalog file (JSON, or YAML with a .yaml/.yml extension)
    catalog: PathBuf,

    /// Directory that relative capabilities URLs are resolved against
    #[arg(short = 'd', long, default_value = ".", env = "CATALOG_CAPABILITIES_DIR")]
    capabilities_dir: PathBuf,

    /// Session configuration file; CATALOG_* variables are used when absent
    #[arg(short, long, env = "CATALOG_CONFIG")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Pretty-print the report
    #[arg(long)]
    pretty: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if args.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }

    let config = match &args.config {
        Some(path) => CatalogConfig::from_yaml(path)?,
        None => CatalogConfig::from_env()?,
    };
    info!(config = ?config, catalog = %args.catalog.display(), "Starting catalog inspection");

    let catalog = read_catalog(&args.catalog)?;
    let session = build_session(config, FileCapabilitiesLoader::new(&args.capabilities_dir));
    let reports = inspect(&session, &catalog).await?;

    let output = if args.pretty {
        serde_json::to_string_pretty(&reports)?
    } else {
        serde_json::to_string(&reports)?
    };
    println!("{output}");
    Ok(())
}
