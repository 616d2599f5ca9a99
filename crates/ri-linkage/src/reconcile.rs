//! The reconciliation pass.
//!
//! Each cluster is committed in its own store transaction. A failing commit
//! aborts the pass: clusters committed before it stay merged, and a later pass
//! picks up whatever is still dirty.
//!
//! Blocks are disjoint, so their order does not affect the outcome. They are
//! processed one at a time: the SQLite store serializes writes on a single
//! connection, and a failing commit stops the pass at a block boundary.

use std::collections::HashMap;

use ri_core::{linkage::MergeOutcome, restaurant::RestaurantId, store::RecordStore};
use serde::Serialize;
use tracing::{Instrument as _, debug, info, info_span, warn};
use uuid::Uuid;

use crate::{
  LinkageError, ReconcileConfig, Result,
  blocking::{self, Block},
  canonical,
  cluster,
};

/// Summary of one reconciliation pass.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
  pub run_id:           Uuid,
  pub blocking:         bool,
  pub threshold:        f64,
  pub blocks:           usize,
  /// Records in the snapshot the pass worked on.
  pub population:       usize,
  pub comparisons:      usize,
  pub clusters_merged:  usize,
  /// Clusters whose canonical record could not be synthesized.
  pub clusters_skipped: usize,
  /// Dirty records that matched nothing and were marked clean as-is.
  pub records_resolved: usize,
  pub merges:           Vec<MergeOutcome>,
}

/// Run one reconciliation pass over `store`.
///
/// The population is snapshotted once at the start; records ingested while
/// the pass runs are left for the next one.
pub async fn reconcile<S>(store: &S, config: &ReconcileConfig) -> Result<ReconcileReport>
where
  S: RecordStore,
{
  config.validate()?;

  let run_id = Uuid::new_v4();
  let span = info_span!("reconcile", %run_id, blocking = config.blocking);
  run(store, config, run_id).instrument(span).await
}

async fn run<S>(store: &S, config: &ReconcileConfig, run_id: Uuid) -> Result<ReconcileReport>
where
  S: RecordStore,
{
  let population = store.list_restaurants().await.map_err(LinkageError::store)?;
  let blocks = blocking::partition(population, config.blocking);

  let mut report = ReconcileReport {
    run_id,
    blocking: config.blocking,
    threshold: config.threshold,
    blocks: blocks.len(),
    population: blocks.iter().map(|b| b.records.len()).sum(),
    comparisons: 0,
    clusters_merged: 0,
    clusters_skipped: 0,
    records_resolved: 0,
    merges: Vec::new(),
  };
  info!(population = report.population, blocks = report.blocks, "starting pass");

  for block in &blocks {
    reconcile_block(store, block, config.threshold, &mut report).await?;
  }

  info!(
    merged = report.clusters_merged,
    skipped = report.clusters_skipped,
    resolved = report.records_resolved,
    "pass complete"
  );
  Ok(report)
}

async fn reconcile_block<S>(
  store: &S,
  block: &Block,
  threshold: f64,
  report: &mut ReconcileReport,
) -> Result<()>
where
  S: RecordStore,
{
  let resolution = cluster::resolve_block(&block.records, threshold);
  debug!(
    block = %block.key,
    records = block.records.len(),
    clusters = resolution.clusters.len(),
    "resolved block"
  );
  report.comparisons += resolution.comparisons;

  let index: HashMap<RestaurantId, _> = block.records.iter().map(|r| (r.id, r)).collect();

  for cluster in &resolution.clusters {
    let commit = match canonical::synthesize(cluster, &index) {
      Ok(commit) => commit,
      Err(err) => {
        warn!(block = %block.key, error = %err, "skipping cluster");
        report.clusters_skipped += 1;
        continue;
      }
    };

    let outcome = store
      .commit_cluster(commit)
      .await
      .map_err(LinkageError::store)?;
    debug!(
      primary = %outcome.primary,
      originals = outcome.edges.len(),
      relinked = outcome.relinked_inspections,
      "merged cluster"
    );
    report.clusters_merged += 1;
    report.merges.push(outcome);
  }

  if !resolution.unmatched.is_empty() {
    report.records_resolved += resolution.unmatched.len();
    store
      .mark_resolved(resolution.unmatched)
      .await
      .map_err(LinkageError::store)?;
  }
  Ok(())
}
