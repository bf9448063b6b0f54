//! civdata-ingest - representative reconciliation batch job
//!
//! Reads a roster JSON array, runs the pipeline against the configured
//! sources, upserts the merged records into SQLite, and prints the run
//! summary as JSON on stdout.

use anyhow::{Context, Result};
use civdata_common::config::{load_toml_config, resolve_config_path};
use civdata_common::time::parse_loose_timestamp;
use civdata_ingest::config::IngestConfig;
use civdata_ingest::db::{self, SqliteCrosswalk, SqliteRepresentativeStore};
use civdata_ingest::types::RosterEntry;
use civdata_ingest::{Pipeline, PipelineConfig};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "civdata-ingest", version, about = "Reconcile representative records across civic data sources")]
struct Args {
    /// Roster JSON file (array of entries)
    #[arg(long)]
    roster: PathBuf,

    /// Config file (default: $CIVDATA_CONFIG, then the platform config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Evaluation date (YYYY-MM-DD or RFC 3339; default: now)
    #[arg(long)]
    now: Option<String>,

    /// SQLite database file
    #[arg(long, env = "CIVDATA_DATABASE")]
    database: Option<PathBuf>,

    /// Root of the offline people dataset
    #[arg(long, env = "CIVDATA_DATASET_ROOT")]
    dataset_root: Option<PathBuf>,

    /// Use an in-memory database; nothing is written to disk
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref());
    let mut toml = load_toml_config(config_path.as_deref())?;
    if let Some(database) = args.database.clone() {
        toml.paths.database = Some(database);
    }
    if let Some(root) = args.dataset_root.clone() {
        toml.paths.dataset_root = Some(root);
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&toml.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting civdata-ingest {}", env!("CARGO_PKG_VERSION"));

    let now = match args.now.as_deref() {
        Some(raw) => parse_loose_timestamp(raw)
            .with_context(|| format!("Unrecognized --now value: {raw}"))?,
        None => civdata_common::time::now(),
    };

    let roster_json = std::fs::read_to_string(&args.roster)
        .with_context(|| format!("Failed to read roster {}", args.roster.display()))?;
    let roster: Vec<RosterEntry> =
        serde_json::from_str(&roster_json).context("Roster is not a JSON array of entries")?;
    info!(entries = roster.len(), %now, "Roster loaded");

    let config = IngestConfig::from_toml(toml);

    let pool = if args.dry_run {
        info!("Dry run: using in-memory database");
        db::init_memory_pool().await?
    } else {
        info!("Database: {}", config.database_path.display());
        db::init_database_pool(&config.database_path).await?
    };

    let policy = Arc::new(config.eligibility_policy());
    let pipeline_config = PipelineConfig {
        dry_run: args.dry_run,
        ..config.pipeline_config()
    };

    let pipeline = Pipeline::new(pipeline_config)
        .with_eligibility(Arc::clone(&policy))
        .with_adapters(config.build_adapters(policy))
        .with_crosswalk(Arc::new(SqliteCrosswalk::new(pool.clone())))
        .with_store(Arc::new(SqliteRepresentativeStore::new(
            pool.clone(),
            config.persistence_policy(),
        )));

    let report = pipeline.run(&roster, now).await;

    info!(
        succeeded = report.summary.succeeded,
        failed = report.summary.failed,
        skipped = report.summary.skipped,
        "Run summary"
    );
    println!("{}", serde_json::to_string_pretty(&report.summary)?);

    pool.close().await;
    Ok(())
}
