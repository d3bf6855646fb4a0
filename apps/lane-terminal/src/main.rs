//! # Lane Terminal Entry Point
//!
//! Boots the Local Store and the sync engine for one checkout lane.
//!
//! ## Startup Sequence
//! 1. Initialize tracing (logging)
//! 2. Load sync config (defaults, `lane.toml`, `LANE_*` environment)
//! 3. Resolve the Local Store path and create its directory
//! 4. Open the database and apply migrations
//! 5. Start the sync orchestrator
//! 6. Run until Ctrl-C, then shut down in reverse order
//!
//! ## Usage
//! ```text
//! lane-terminal [--config <path>]
//! ```

use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing::{info, Subscriber};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use lane_db::{Database, DbConfig};
use lane_sync::{SyncConfig, SyncOrchestrator};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config_path = parse_args()?;
    info!("Starting Lane POS terminal");

    let config = SyncConfig::load(config_path).context("loading sync config")?;
    let db_path = config
        .database_path()
        .context("could not determine a data directory for the Local Store")?;

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    info!(?db_path, "Database path determined");

    let db = Database::new(DbConfig::new(db_path.clone()))
        .await
        .context("opening Local Store")?;
    info!("Database connected and migrations applied");

    let mut sync = SyncOrchestrator::new(config, db.clone())?;
    sync.start()?;

    let status = sync.status().await?;
    info!(
        online = status.online,
        pending = status.pending_transactions,
        last_catalog_sync = %status.last_catalog_sync,
        "Terminal ready"
    );

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;
    info!("Interrupt received");

    sync.shutdown().await;
    db.close().await;

    info!("Lane POS terminal stopped");
    Ok(())
}

fn parse_args() -> Result<Option<PathBuf>> {
    let mut args = env::args().skip(1);
    let mut config_path = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => match args.next() {
                Some(path) => config_path = Some(PathBuf::from(path)),
                None => bail!("--config requires a path"),
            },
            "--help" | "-h" => {
                println!("Lane POS terminal");
                println!();
                println!("Usage: lane-terminal [--config <path>]");
                println!();
                println!("Environment:");
                println!("  LANE_CONFIG         Config file path");
                println!("  LANE_CENTRAL_URL    Central service base URL");
                println!("  LANE_DB_PATH        Local Store database file");
                println!("  RUST_LOG            Log filter");
                std::process::exit(0);
            }
            other => bail!("unknown argument: {other}"),
        }
    }

    Ok(config_path)
}

/// Log filter used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "info,lane=debug,sqlx=warn";

/// Initializes the tracing subscriber.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=lane_sync=trace` - Trace the sync engine only
/// - Default: INFO, DEBUG for lane crates, WARN for sqlx
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    build_subscriber(filter).init();
}

fn build_subscriber(filter: EnvFilter) -> impl Subscriber + Send + Sync + 'static {
    tracing_subscriber::fmt().with_env_filter(filter).finish()
}
