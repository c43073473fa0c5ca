//! `roster`: import roster workbooks and query the stored Ledger.
//!
//! # Usage
//!
//! ```text
//! roster preview workbook.xlsx
//! roster import workbook.xlsx --id-column "Sicil No"
//! roster monthly --year 2025
//! roster --config ~/.config/roster.toml status
//! ```
//!
//! Every command prints JSON on stdout; logs go to stderr.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use chrono::Datelike as _;
use clap::{Parser, Subcommand};
use roster_sheets::WorkbookCache;
use roster_store_sqlite::SqliteStore;
use roster_sync::{Importer, Settings, metrics};
use serde::Serialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "roster", version, about = "Roster workbook importer")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "roster.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Show sheets, columns, and sample rows without importing.
  Preview {
    file: PathBuf,

    /// Bypass the workbook cache.
    #[arg(long)]
    reload: bool,
  },

  /// Import every section of a workbook into the store.
  Import {
    file: PathBuf,

    /// Ledger column holding each person's external id.
    #[arg(long, default_value = "Sicil No")]
    id_column: String,

    #[arg(long)]
    reload: bool,
  },

  /// Cost per month of one year, January first.
  Monthly {
    /// Defaults to the current year.
    #[arg(long)]
    year: Option<i32>,
  },

  /// Totals and distinct counts over the stored Ledger.
  Summary,

  /// Row counts per entity.
  Status,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = Settings::load(&cli.config)
    .with_context(|| format!("failed to read config {:?}", cli.config))?;

  let store_path = settings.store_path();
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let importer = Importer::new(
    Arc::new(store),
    Arc::new(WorkbookCache::new(settings.cache_ttl())),
    settings.sheets.clone(),
  );

  match cli.command {
    Command::Preview { file, reload } => {
      let preview = importer
        .preview(&file, reload)
        .await
        .with_context(|| format!("failed to preview {file:?}"))?;
      print_json(&preview)
    }
    Command::Import { file, id_column, reload } => {
      let report = importer
        .import_all(&file, &id_column, reload)
        .await
        .with_context(|| format!("failed to import {file:?}"))?;
      if !report.errors.is_empty() {
        tracing::warn!(errors = report.errors.len(), "import finished with errors");
      }
      print_json(&report)
    }
    Command::Monthly { year } => {
      let year = year.unwrap_or_else(|| chrono::Local::now().year());
      let months = metrics::monthly_aggregate(importer.store(), &settings.metrics, year)
        .await
        .context("failed to read ledger rows")?;
      print_json(&months)
    }
    Command::Summary => {
      let summary = metrics::summary(importer.store(), &settings.metrics)
        .await
        .context("failed to read ledger rows")?;
      print_json(&summary)
    }
    Command::Status => {
      let counts = metrics::status(importer.store())
        .await
        .context("failed to read store counts")?;
      print_json(&counts)
    }
  }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("failed to encode output")?;
  println!("{json}");
  Ok(())
}
