//! Ingestion and read-side lookups over a [`RecordStore`].

use ri_core::{
  feed::FeedRecord,
  inspection::{IngestOutcome, Inspection},
  linkage::{LinkedView, MentionMatch},
  restaurant::{RestaurantId, RestaurantRecord},
  store::RecordStore,
};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::{LinkageError, Result};

/// A restaurant together with the inspections it currently owns.
#[derive(Debug, Clone, Serialize)]
pub struct RestaurantDetail {
  #[serde(flatten)]
  pub restaurant:  RestaurantRecord,
  pub inspections: Vec<Inspection>,
}

// ─── Ingestion ───────────────────────────────────────────────────────────────

/// Validate one feed row and record it. Re-ingesting a known inspection id is
/// a no-op that still reports the owning restaurant.
#[instrument(skip(store, record), fields(inspection = %record.inspection_id))]
pub async fn ingest<S>(store: &S, record: FeedRecord) -> Result<IngestOutcome>
where
  S: RecordStore,
{
  let (restaurant, inspection) = record.into_parts()?;
  let outcome = store
    .record_inspection(restaurant, inspection)
    .await
    .map_err(LinkageError::store)?;
  debug!(
    restaurant = %outcome.restaurant_id,
    restaurant_created = outcome.restaurant_created,
    inspection_created = outcome.inspection_created,
    "ingested"
  );
  Ok(outcome)
}

// ─── Lookups ─────────────────────────────────────────────────────────────────

pub async fn restaurant_detail<S>(store: &S, id: RestaurantId) -> Result<RestaurantDetail>
where
  S: RecordStore,
{
  let restaurant = require_restaurant(store, id).await?;
  let inspections = store.inspections_for(id).await.map_err(LinkageError::store)?;
  Ok(RestaurantDetail { restaurant, inspections })
}

/// The restaurant that currently owns an inspection.
pub async fn restaurant_for_inspection<S>(
  store: &S,
  inspection_id: &str,
) -> Result<RestaurantRecord>
where
  S: RecordStore,
{
  let inspection = require_inspection(store, inspection_id).await?;
  require_restaurant(store, inspection.restaurant_id).await
}

/// The record owning an inspection plus every record it absorbed.
pub async fn linked_for_inspection<S>(store: &S, inspection_id: &str) -> Result<LinkedView>
where
  S: RecordStore,
{
  let primary = restaurant_for_inspection(store, inspection_id).await?;
  let edges = store.linkage_for(primary.id).await.map_err(LinkageError::store)?;

  let mut linked = Vec::with_capacity(edges.len());
  for edge in &edges {
    linked.push(require_restaurant(store, edge.original).await?);
  }
  linked.sort_unstable_by_key(|r| r.id);
  let ids = linked.iter().map(|r| r.id).collect();

  Ok(LinkedView { primary, linked, ids })
}

/// Every mention associated with a restaurant. A restaurant with no mentions
/// is reported as [`LinkageError::NotFound`].
pub async fn mentions_for<S>(store: &S, id: RestaurantId) -> Result<Vec<MentionMatch>>
where
  S: RecordStore,
{
  let matches = store.mention_matches_for(id).await.map_err(LinkageError::store)?;
  if matches.is_empty() {
    return Err(LinkageError::NotFound(format!("mentions for restaurant {id}")));
  }
  Ok(matches)
}

/// Number of stored inspections.
pub async fn count<S>(store: &S) -> Result<u64>
where
  S: RecordStore,
{
  store.count_inspections().await.map_err(LinkageError::store)
}

async fn require_restaurant<S>(store: &S, id: RestaurantId) -> Result<RestaurantRecord>
where
  S: RecordStore,
{
  store
    .get_restaurant(id)
    .await
    .map_err(LinkageError::store)?
    .ok_or_else(|| LinkageError::NotFound(format!("restaurant {id}")))
}

async fn require_inspection<S>(store: &S, id: &str) -> Result<Inspection>
where
  S: RecordStore,
{
  store
    .get_inspection(id.to_owned())
    .await
    .map_err(LinkageError::store)?
    .ok_or_else(|| LinkageError::NotFound(format!("inspection {id}")))
}
