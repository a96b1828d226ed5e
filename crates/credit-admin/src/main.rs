//! `credit-store`: operator commands for the credit store.
//!
//! Reads `credit-store.toml` (or the path given with `--config`) plus
//! `CREDIT_STORE_*` environment variables, then provisions, tears down or
//! probes the configured SQLite database.
//!
//! ```
//! credit-store provision
//! credit-store health --json
//! CREDIT_STORE_PATH=/var/lib/credit/credit_analyst.db credit-store status
//! credit-store teardown --confirm credit_analyst.db
//! ```

use std::{
  path::{Path, PathBuf},
  process::ExitCode,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use credit_store_sqlite::{Database, StoreConfig, TeardownConfirmation};
use serde::Serialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Credit store administration")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "credit-store.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Create every table, index and trigger that is missing.
  Provision,
  /// Drop every table. Irreversible.
  Teardown {
    /// File name of the database being dropped, repeated as confirmation.
    #[arg(long, value_name = "NAME")]
    confirm: String,
  },
  /// Probe the database; exits non-zero when it is unhealthy.
  Health {
    /// Print the report as JSON.
    #[arg(long)]
    json: bool,
  },
  /// Show schema version and pool occupancy.
  Status,
}

#[derive(Serialize)]
struct Status {
  database:    String,
  provisioned: bool,
  version:     i64,
  pool:        credit_store_sqlite::PoolStatus,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("CREDIT_STORE").try_parsing(true))
    .build()
    .context("failed to read config file")?;

  let mut store_cfg: StoreConfig = settings
    .try_deserialize()
    .context("failed to deserialise StoreConfig")?;
  store_cfg.path = expand_tilde(&store_cfg.path);

  let db = Database::connect(store_cfg.clone())
    .with_context(|| format!("failed to open store at {:?}", store_cfg.path))?;

  let outcome = run(&db, cli.command).await;
  db.close_all();
  outcome
}

async fn run(db: &Database, command: Command) -> anyhow::Result<ExitCode> {
  match command {
    Command::Provision => {
      let schema = db.schema();
      tokio::task::spawn_blocking(move || schema.provision())
        .await?
        .context("provisioning failed")?;
      Ok(ExitCode::SUCCESS)
    }

    Command::Teardown { confirm } => {
      let schema = db.schema();
      tokio::task::spawn_blocking(move || {
        schema.teardown(TeardownConfirmation::for_database(confirm))
      })
      .await?
      .context("teardown failed")?;
      Ok(ExitCode::SUCCESS)
    }

    Command::Health { json } => {
      let report = db.health().await;
      if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
      } else {
        match &report.error {
          None => println!("healthy ({:.1} ms)", report.latency.as_secs_f64() * 1_000.0),
          Some(error) => println!("unhealthy: {error}"),
        }
      }
      Ok(if report.is_healthy() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
    }

    Command::Status => {
      let handle = db.clone();
      let status = tokio::task::spawn_blocking(move || -> credit_store_sqlite::Result<Status> {
        let schema = handle.schema();
        Ok(Status {
          database:    handle.config().database_name(),
          provisioned: schema.is_provisioned()?,
          version:     schema.version()?,
          pool:        handle.pool_status(),
        })
      })
      .await?
      .context("failed to read store status")?;
      println!("{}", serde_json::to_string_pretty(&status)?);
      Ok(ExitCode::SUCCESS)
    }
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
