//! `ri`: command-line front end for the restaurant inspection catalog.
//!
//! Reads `ri.toml` (or the path given with `--config`), opens the SQLite
//! store and runs one command. Results are printed to stdout as JSON; logs go
//! to stderr.
//!
//! ```
//! ri ingest inspections.jsonl
//! ri reconcile --blocking --threshold 0.85
//! ri mention --text "Great food at Joes Pizza" --lat 41.88 --long -87.63 --key t-1
//! ```

mod settings;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use ri_core::{feed::FeedRecord, restaurant::RestaurantId, store::RecordStore};
use ri_linkage::{LinkageError, Mention, ReconcileConfig, catalog};
use ri_store_sqlite::SqliteStore;
use serde::Serialize;
use settings::Settings;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(author, version, about = "Restaurant inspection catalog")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "ri.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Ingest feed rows from a JSON-lines file.
  Ingest { file: PathBuf },

  /// Run one reconciliation pass.
  Reconcile {
    /// Compare records only within their zip code.
    #[arg(long, conflicts_with = "no_blocking")]
    blocking:    bool,
    /// Compare across zip codes even if the config enables blocking.
    #[arg(long)]
    no_blocking: bool,
    /// Override the configured match threshold.
    #[arg(long)]
    threshold:   Option<f64>,
  },

  /// Match a mention against the catalog and record the matches.
  Mention {
    #[arg(long)]
    text: String,
    #[arg(long, allow_negative_numbers = true)]
    lat:  f64,
    #[arg(long, allow_negative_numbers = true)]
    long: f64,
    #[arg(long)]
    key:  String,
  },

  /// Show a restaurant and its inspections.
  Restaurant { id: RestaurantId },

  /// Show the record owning an inspection and the records it absorbed.
  Linked { inspection_id: String },

  /// Show the mentions matched to a restaurant.
  Mentions { restaurant_id: RestaurantId },

  /// List restaurants that have not been absorbed by a merge.
  List {
    #[arg(long)]
    zip:        Option<String>,
    /// Only records no pass has resolved yet.
    #[arg(long)]
    unresolved: bool,
  },

  /// Count stored inspections.
  Count,
}

/// Totals printed by `ri ingest`.
#[derive(Debug, Default, Serialize)]
struct IngestSummary {
  rows:                usize,
  restaurants_created: usize,
  inspections_created: usize,
  duplicates:          usize,
  rejected:            usize,
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
  let settings = Settings::load(&cli.config)?;

  let store = SqliteStore::open(&settings.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", settings.store_path))?;

  match cli.command {
    Command::Ingest { file } => print(&ingest(&store, &file).await?),

    Command::Reconcile { blocking, no_blocking, threshold } => {
      let config = reconcile_config(settings.reconcile, blocking, no_blocking, threshold);
      let report = ri_linkage::reconcile(&store, &config)
        .await
        .context("reconciliation failed")?;
      print(&report)
    }

    Command::Mention { text, lat, long, key } => {
      let mention = Mention { text, latitude: lat, longitude: long, key };
      let ids = ri_linkage::record_mention(&store, &mention).await?;
      print(&ids)
    }

    Command::Restaurant { id } => print(&catalog::restaurant_detail(&store, id).await?),

    Command::Linked { inspection_id } => {
      print(&catalog::linked_for_inspection(&store, &inspection_id).await?)
    }

    Command::Mentions { restaurant_id } => {
      print(&catalog::mentions_for(&store, restaurant_id).await?)
    }

    Command::List { zip, unresolved } => {
      let records = match (zip, unresolved) {
        (zip, true) => store.list_unresolved(zip.map(Some)).await?,
        (Some(zip), false) => store.list_restaurants_by_zip(Some(zip)).await?,
        (None, false) => store.list_restaurants().await?,
      };
      print(&records)
    }

    Command::Count => print(&catalog::count(&store).await?),
  }
}

// ─── Commands ────────────────────────────────────────────────────────────────

/// Ingest every non-blank line of `file`. Malformed or invalid rows are
/// logged and skipped; a store failure aborts the run.
async fn ingest(store: &SqliteStore, file: &std::path::Path) -> anyhow::Result<IngestSummary> {
  let raw = tokio::fs::read_to_string(file)
    .await
    .with_context(|| format!("reading {}", file.display()))?;

  let mut summary = IngestSummary::default();
  for (n, line) in raw.lines().enumerate().filter(|(_, l)| !l.trim().is_empty()) {
    summary.rows += 1;
    let line_no = n + 1;

    let record: FeedRecord = match serde_json::from_str(line) {
      Ok(record) => record,
      Err(err) => {
        warn!(line = line_no, error = %err, "malformed feed row");
        summary.rejected += 1;
        continue;
      }
    };

    match catalog::ingest(store, record).await {
      Ok(outcome) => {
        summary.restaurants_created += usize::from(outcome.restaurant_created);
        if outcome.inspection_created {
          summary.inspections_created += 1;
        } else {
          summary.duplicates += 1;
        }
      }
      Err(err @ LinkageError::Store(_)) => {
        return Err(err).with_context(|| format!("ingesting line {line_no}"));
      }
      Err(err) => {
        warn!(line = line_no, error = %err, "rejected feed row");
        summary.rejected += 1;
      }
    }
  }

  info!(
    rows = summary.rows,
    inspections = summary.inspections_created,
    rejected = summary.rejected,
    "ingest complete"
  );
  Ok(summary)
}

/// Apply command-line overrides on top of the configured pass settings.
fn reconcile_config(
  base: ReconcileConfig,
  blocking: bool,
  no_blocking: bool,
  threshold: Option<f64>,
) -> ReconcileConfig {
  ReconcileConfig {
    blocking:  match (blocking, no_blocking) {
      (true, _) => true,
      (_, true) => false,
      _ => base.blocking,
    },
    threshold: threshold.unwrap_or(base.threshold),
  }
}

fn print<T: Serialize>(value: &T) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}
