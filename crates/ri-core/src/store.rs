//! The `RecordStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `ri-store-sqlite`).
//! The linkage engine and the CLI depend on this abstraction, not on any
//! concrete backend.

use std::future::Future;

use crate::{
  inspection::{IngestOutcome, Inspection, NewInspection},
  linkage::{ClusterCommit, LinkageEdge, MentionMatch, MergeOutcome},
  restaurant::{NewRestaurant, RestaurantId, RestaurantRecord},
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// An inclusive latitude/longitude rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
  pub min_latitude:  f64,
  pub max_latitude:  f64,
  pub min_longitude: f64,
  pub max_longitude: f64,
}

impl BoundingBox {
  /// The box extending `lat_tolerance` / `long_tolerance` either side of a
  /// point.
  pub fn around(
    latitude: f64,
    longitude: f64,
    lat_tolerance: f64,
    long_tolerance: f64,
  ) -> Self {
    Self {
      min_latitude:  latitude - lat_tolerance,
      max_latitude:  latitude + lat_tolerance,
      min_longitude: longitude - long_tolerance,
      max_longitude: longitude + long_tolerance,
    }
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a restaurant catalog backend.
///
/// Linkage edges and inspections are never deleted. The only post-creation
/// mutations are the restaurant `clean` flag, an inspection's restaurant id
/// (through [`RecordStore::commit_cluster`]) and a mention match's kind.
///
/// All methods return `Send` futures so a store can be shared across tasks.
pub trait RecordStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Restaurants ───────────────────────────────────────────────────────

  /// Insert a restaurant and return the persisted record.
  fn insert_restaurant(
    &self,
    input: NewRestaurant,
  ) -> impl Future<Output = Result<RestaurantRecord, Self::Error>> + Send + '_;

  /// Retrieve a restaurant by id. Returns `None` if not found.
  fn get_restaurant(
    &self,
    id: RestaurantId,
  ) -> impl Future<Output = Result<Option<RestaurantRecord>, Self::Error>> + Send + '_;

  /// The comparison population: every restaurant not yet absorbed into a
  /// canonical record, ascending by id.
  fn list_restaurants(
    &self,
  ) -> impl Future<Output = Result<Vec<RestaurantRecord>, Self::Error>> + Send + '_;

  /// Unresolved (`clean = false`) restaurants, optionally restricted to one
  /// zip code. `Some(None)` selects records without a zip.
  fn list_unresolved(
    &self,
    zip: Option<Option<String>>,
  ) -> impl Future<Output = Result<Vec<RestaurantRecord>, Self::Error>> + Send + '_;

  /// Population members sharing a zip code (`None` selects records without
  /// one).
  fn list_restaurants_by_zip(
    &self,
    zip: Option<String>,
  ) -> impl Future<Output = Result<Vec<RestaurantRecord>, Self::Error>> + Send + '_;

  /// Set `clean = true` on each id. Unknown ids are ignored.
  fn mark_resolved(
    &self,
    ids: Vec<RestaurantId>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Inspections ───────────────────────────────────────────────────────

  /// Ingest one feed row: find the restaurant by exact (name, address) or
  /// insert it dirty, then insert the inspection. A row whose inspection id
  /// is already stored writes nothing and reports the inspection's owner.
  fn record_inspection(
    &self,
    restaurant: NewRestaurant,
    inspection: NewInspection,
  ) -> impl Future<Output = Result<IngestOutcome, Self::Error>> + Send + '_;

  fn get_inspection(
    &self,
    id: String,
  ) -> impl Future<Output = Result<Option<Inspection>, Self::Error>> + Send + '_;

  /// Inspections currently owned by a restaurant, ascending by id.
  fn inspections_for(
    &self,
    restaurant_id: RestaurantId,
  ) -> impl Future<Output = Result<Vec<Inspection>, Self::Error>> + Send + '_;

  fn count_inspections(
    &self,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Linkage ───────────────────────────────────────────────────────────

  /// Apply one cluster merge as a single transaction: insert the canonical
  /// record, append one linkage edge per original, relink the originals'
  /// inspections and mark the originals clean. On error nothing is visible.
  fn commit_cluster(
    &self,
    commit: ClusterCommit,
  ) -> impl Future<Output = Result<MergeOutcome, Self::Error>> + Send + '_;

  /// Edges owned by a primary record, ascending by original id.
  fn linkage_for(
    &self,
    primary: RestaurantId,
  ) -> impl Future<Output = Result<Vec<LinkageEdge>, Self::Error>> + Send + '_;

  // ── Mentions ──────────────────────────────────────────────────────────

  /// Ids of restaurants whose lower-cased name equals any lower-cased
  /// candidate. Each id appears once.
  fn restaurants_named(
    &self,
    candidates: Vec<String>,
  ) -> impl Future<Output = Result<Vec<RestaurantId>, Self::Error>> + Send + '_;

  /// Ids of restaurants whose coordinates fall inside `bounds`. Each id
  /// appears once.
  fn restaurants_within(
    &self,
    bounds: BoundingBox,
  ) -> impl Future<Output = Result<Vec<RestaurantId>, Self::Error>> + Send + '_;

  /// Upsert mention matches in one transaction. An existing row for the same
  /// (restaurant, mention key) keeps its kind if the evidence is the same and
  /// is widened to `both` otherwise. Returns the rows as stored.
  fn record_mention_matches(
    &self,
    matches: Vec<MentionMatch>,
  ) -> impl Future<Output = Result<Vec<MentionMatch>, Self::Error>> + Send + '_;

  /// Mention matches for a restaurant, ascending by mention key.
  fn mention_matches_for(
    &self,
    restaurant_id: RestaurantId,
  ) -> impl Future<Output = Result<Vec<MentionMatch>, Self::Error>> + Send + '_;
}
