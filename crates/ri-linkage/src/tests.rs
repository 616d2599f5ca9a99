//! Engine tests against an in-memory `SqliteStore`.

use std::sync::atomic::{AtomicUsize, Ordering};

use ri_core::{
  feed::FeedRecord,
  inspection::{IngestOutcome, Inspection, NewInspection},
  linkage::{ClusterCommit, LinkageEdge, MatchKind, MentionMatch, MergeOutcome},
  restaurant::{NewRestaurant, RestaurantId, RestaurantRecord},
  store::{BoundingBox, RecordStore},
};
use ri_store_sqlite::SqliteStore;

use crate::{
  LinkageError, Mention, ReconcileConfig, catalog, reconcile, record_mention,
};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn row(inspection_id: &str, name: &str, address: &str, zip: &str) -> FeedRecord {
  FeedRecord {
    inspection_id: inspection_id.into(),
    name:          name.into(),
    facility_type: Some("Restaurant".into()),
    address:       address.into(),
    city:          Some("CHICAGO".into()),
    state:         Some("IL".into()),
    zip:           Some(zip.into()),
    risk:          Some("Risk 1 (High)".into()),
    date:          Some("01/24/2020".into()),
    results:       Some("Pass".into()),
    ..FeedRecord::default()
  }
}

fn restaurant(name: &str, address: &str) -> NewRestaurant {
  NewRestaurant {
    city:  Some("CHICAGO".into()),
    state: Some("IL".into()),
    zip:   Some("60601".into()),
    ..NewRestaurant::new(name, address)
  }
}

fn located(name: &str, latitude: f64, longitude: f64) -> NewRestaurant {
  NewRestaurant {
    latitude:  Some(latitude),
    longitude: Some(longitude),
    ..restaurant(name, "1 Somewhere St")
  }
}

fn ids(v: &[i64]) -> Vec<RestaurantId> { v.iter().copied().map(RestaurantId).collect() }

// ─── Reconciliation ──────────────────────────────────────────────────────────

#[tokio::test]
async fn near_duplicates_merge_into_canonical_record() {
  let s = store().await;
  let a = catalog::ingest(&s, row("100", "Joe's Pizza", "123 N Main St", "60601"))
    .await
    .unwrap();
  let b = catalog::ingest(&s, row("101", "Joes Pizza", "123 Main St", "60601"))
    .await
    .unwrap();
  assert!(a.restaurant_created && b.restaurant_created);

  let report = reconcile(&s, &ReconcileConfig::default()).await.unwrap();
  assert_eq!(report.clusters_merged, 1);
  assert_eq!(report.clusters_skipped, 0);
  assert_eq!(report.records_resolved, 0);

  let merge = &report.merges[0];
  assert_eq!(merge.relinked_inspections, 2);
  assert_eq!(
    merge.edges.iter().map(|e| e.original).collect::<Vec<_>>(),
    vec![a.restaurant_id, b.restaurant_id]
  );

  let canonical = s.get_restaurant(merge.primary).await.unwrap().unwrap();
  assert_eq!(canonical.name, "Joes Pizza");
  assert_eq!(canonical.address, "123 N Main St");
  assert!(canonical.clean);
  assert!(canonical.zip.is_none());

  // Originals survive, clean, but drop out of the population.
  let original = s.get_restaurant(a.restaurant_id).await.unwrap().unwrap();
  assert!(original.clean);
  assert!(s.inspections_for(a.restaurant_id).await.unwrap().is_empty());
  let population: Vec<_> = s
    .list_restaurants()
    .await
    .unwrap()
    .into_iter()
    .map(|r| r.id)
    .collect();
  assert_eq!(population, vec![merge.primary]);

  let view = catalog::linked_for_inspection(&s, "101").await.unwrap();
  assert_eq!(view.primary.id, merge.primary);
  assert_eq!(view.ids, vec![a.restaurant_id, b.restaurant_id]);
  assert_eq!(view.linked[0].name, "Joe's Pizza");

  let detail = catalog::restaurant_detail(&s, merge.primary).await.unwrap();
  let inspection_ids: Vec<_> = detail.inspections.iter().map(|i| i.id.as_str()).collect();
  assert_eq!(inspection_ids, vec!["100", "101"]);
}

#[tokio::test]
async fn second_pass_is_a_no_op() {
  let s = store().await;
  catalog::ingest(&s, row("100", "Joe's Pizza", "123 N Main St", "60601")).await.unwrap();
  catalog::ingest(&s, row("101", "Joes Pizza", "123 Main St", "60601")).await.unwrap();
  catalog::ingest(&s, row("102", "Birrieria Zaragoza", "4852 S Pulaski Rd", "60632"))
    .await
    .unwrap();

  let first = reconcile(&s, &ReconcileConfig::default()).await.unwrap();
  assert_eq!(first.clusters_merged, 1);
  assert_eq!(first.records_resolved, 1);

  let second = reconcile(&s, &ReconcileConfig::default()).await.unwrap();
  assert_eq!(second.clusters_merged, 0);
  assert_eq!(second.records_resolved, 0);
  assert_eq!(second.comparisons, 0);
  assert_ne!(first.run_id, second.run_id);
}

#[tokio::test]
async fn feed_rows_for_absorbed_records_land_on_the_canonical_record() {
  let s = store().await;
  catalog::ingest(&s, row("100", "Joe's Pizza", "123 N Main St", "60601")).await.unwrap();
  catalog::ingest(&s, row("101", "Joes Pizza", "123 Main St", "60601")).await.unwrap();
  let report = reconcile(&s, &ReconcileConfig::default()).await.unwrap();
  let primary = report.merges[0].primary;

  let outcome = catalog::ingest(&s, row("200", "Joe's Pizza", "123 N Main St", "60601"))
    .await
    .unwrap();
  assert_eq!(
    outcome,
    IngestOutcome {
      restaurant_id:      primary,
      restaurant_created: false,
      inspection_created: true,
    }
  );
}

#[tokio::test]
async fn blocking_keeps_zip_codes_apart() {
  let blocked = store().await;
  let open = store().await;
  for s in [&blocked, &open] {
    catalog::ingest(s, row("100", "Joe's Pizza", "123 N Main St", "60601")).await.unwrap();
    catalog::ingest(s, row("101", "Joes Pizza", "123 Main St", "60602")).await.unwrap();
  }

  let report = reconcile(&blocked, &ReconcileConfig { blocking: true, ..Default::default() })
    .await
    .unwrap();
  assert_eq!(report.blocks, 2);
  assert_eq!(report.clusters_merged, 0);
  assert_eq!(report.records_resolved, 2);

  let report = reconcile(&open, &ReconcileConfig::default()).await.unwrap();
  assert_eq!(report.blocks, 1);
  assert_eq!(report.clusters_merged, 1);
}

#[tokio::test]
async fn unmatched_records_are_marked_clean() {
  let s = store().await;
  let outcome = catalog::ingest(&s, row("100", "Birrieria Zaragoza", "4852 S Pulaski Rd", "60632"))
    .await
    .unwrap();

  let report = reconcile(&s, &ReconcileConfig::default()).await.unwrap();
  assert_eq!(report.records_resolved, 1);
  assert!(s.list_unresolved(None).await.unwrap().is_empty());

  let record = s.get_restaurant(outcome.restaurant_id).await.unwrap().unwrap();
  assert!(record.clean);
  assert!(s.linkage_for(outcome.restaurant_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn late_duplicate_joins_a_resolved_record() {
  let s = store().await;
  let first = s
    .insert_restaurant(restaurant("Golden Dragon", "2234 S Wentworth Ave"))
    .await
    .unwrap();
  reconcile(&s, &ReconcileConfig::default()).await.unwrap();

  let late = s
    .insert_restaurant(restaurant("Golden Dragon", "2234 S Wentworth Ave"))
    .await
    .unwrap();
  let report = reconcile(&s, &ReconcileConfig::default()).await.unwrap();

  assert_eq!(report.clusters_merged, 1);
  let originals: Vec<_> = report.merges[0].edges.iter().map(|e| e.original).collect();
  assert_eq!(originals, vec![first.id, late.id]);
}

#[tokio::test]
async fn cluster_with_blank_name_is_skipped() {
  let s = store().await;
  let a = s.insert_restaurant(restaurant(" ", "2234 S Wentworth Ave")).await.unwrap();
  let b = s.insert_restaurant(restaurant(" ", "2234 S Wentworth Ave")).await.unwrap();

  let report = reconcile(&s, &ReconcileConfig::default()).await.unwrap();
  assert_eq!(report.clusters_merged, 0);
  assert_eq!(report.clusters_skipped, 1);
  assert_eq!(report.records_resolved, 0);

  // Nothing was written; both records wait for the next pass.
  let unresolved: Vec<_> = s
    .list_unresolved(None)
    .await
    .unwrap()
    .into_iter()
    .map(|r| r.id)
    .collect();
  assert_eq!(unresolved, vec![a.id, b.id]);
  assert!(s.linkage_for(a.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn reused_inspection_id_creates_no_restaurant() {
  let s = store().await;
  let first = catalog::ingest(&s, row("100", "Joe's Pizza", "123 N Main St", "60601"))
    .await
    .unwrap();
  let reused = catalog::ingest(&s, row("100", "Golden Dragon", "2234 S Wentworth Ave", "60616"))
    .await
    .unwrap();

  assert_eq!(
    reused,
    IngestOutcome {
      restaurant_id:      first.restaurant_id,
      restaurant_created: false,
      inspection_created: false,
    }
  );
  assert_eq!(s.list_restaurants().await.unwrap().len(), 1);

  let report = reconcile(&s, &ReconcileConfig::default()).await.unwrap();
  assert_eq!(report.population, 1);
}

#[tokio::test]
async fn threshold_is_validated_before_any_work() {
  let s = store().await;
  for threshold in [1.5, -0.1, f64::NAN] {
    let err = reconcile(&s, &ReconcileConfig { threshold, ..Default::default() })
      .await
      .unwrap_err();
    assert!(matches!(err, LinkageError::InvalidThreshold(_)), "{err}");
  }
}

// ─── Failure injection ───────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
enum FlakyError {
  #[error(transparent)]
  Store(#[from] ri_store_sqlite::Error),
  #[error("injected commit failure")]
  Injected,
}

/// Delegates to a `SqliteStore` but fails the `fail_on`-th cluster commit
/// (1-based).
struct FlakyStore {
  inner:   SqliteStore,
  commits: AtomicUsize,
  fail_on: usize,
}

impl RecordStore for FlakyStore {
  type Error = FlakyError;

  async fn insert_restaurant(&self, input: NewRestaurant) -> Result<RestaurantRecord, FlakyError> {
    Ok(self.inner.insert_restaurant(input).await?)
  }

  async fn get_restaurant(&self, id: RestaurantId) -> Result<Option<RestaurantRecord>, FlakyError> {
    Ok(self.inner.get_restaurant(id).await?)
  }

  async fn list_restaurants(&self) -> Result<Vec<RestaurantRecord>, FlakyError> {
    Ok(self.inner.list_restaurants().await?)
  }

  async fn list_unresolved(
    &self,
    zip: Option<Option<String>>,
  ) -> Result<Vec<RestaurantRecord>, FlakyError> {
    Ok(self.inner.list_unresolved(zip).await?)
  }

  async fn list_restaurants_by_zip(
    &self,
    zip: Option<String>,
  ) -> Result<Vec<RestaurantRecord>, FlakyError> {
    Ok(self.inner.list_restaurants_by_zip(zip).await?)
  }

  async fn mark_resolved(&self, ids: Vec<RestaurantId>) -> Result<(), FlakyError> {
    Ok(self.inner.mark_resolved(ids).await?)
  }

  async fn record_inspection(
    &self,
    restaurant: NewRestaurant,
    inspection: NewInspection,
  ) -> Result<IngestOutcome, FlakyError> {
    Ok(self.inner.record_inspection(restaurant, inspection).await?)
  }

  async fn get_inspection(&self, id: String) -> Result<Option<Inspection>, FlakyError> {
    Ok(self.inner.get_inspection(id).await?)
  }

  async fn inspections_for(&self, id: RestaurantId) -> Result<Vec<Inspection>, FlakyError> {
    Ok(self.inner.inspections_for(id).await?)
  }

  async fn count_inspections(&self) -> Result<u64, FlakyError> {
    Ok(self.inner.count_inspections().await?)
  }

  async fn commit_cluster(&self, commit: ClusterCommit) -> Result<MergeOutcome, FlakyError> {
    let n = self.commits.fetch_add(1, Ordering::SeqCst) + 1;
    if n == self.fail_on {
      return Err(FlakyError::Injected);
    }
    Ok(self.inner.commit_cluster(commit).await?)
  }

  async fn linkage_for(&self, primary: RestaurantId) -> Result<Vec<LinkageEdge>, FlakyError> {
    Ok(self.inner.linkage_for(primary).await?)
  }

  async fn restaurants_named(&self, candidates: Vec<String>) -> Result<Vec<RestaurantId>, FlakyError> {
    Ok(self.inner.restaurants_named(candidates).await?)
  }

  async fn restaurants_within(&self, bounds: BoundingBox) -> Result<Vec<RestaurantId>, FlakyError> {
    Ok(self.inner.restaurants_within(bounds).await?)
  }

  async fn record_mention_matches(
    &self,
    matches: Vec<MentionMatch>,
  ) -> Result<Vec<MentionMatch>, FlakyError> {
    Ok(self.inner.record_mention_matches(matches).await?)
  }

  async fn mention_matches_for(&self, id: RestaurantId) -> Result<Vec<MentionMatch>, FlakyError> {
    Ok(self.inner.mention_matches_for(id).await?)
  }
}

#[tokio::test]
async fn failed_commit_aborts_pass_but_keeps_earlier_clusters() {
  let inner = store().await;
  for (name, address) in [
    ("Joe's Pizza", "123 N Main St"),
    ("Joes Pizza", "123 Main St"),
    ("Golden Dragon", "2234 S Wentworth Ave"),
    ("Golden Dragon", "2234 S Wentworth Ave"),
    ("Birrieria Zaragoza", "4852 S Pulaski Rd"),
    ("Birrieria Zaragoza", "4852 S Pulaski Rd"),
  ] {
    inner.insert_restaurant(restaurant(name, address)).await.unwrap();
  }

  let flaky = FlakyStore { inner: inner.clone(), commits: AtomicUsize::new(0), fail_on: 2 };
  let err = reconcile(&flaky, &ReconcileConfig::default()).await.unwrap_err();
  assert!(matches!(err, LinkageError::Store(_)), "{err}");

  // The first cluster is committed; the failed one left no trace.
  let population: Vec<_> = inner
    .list_restaurants()
    .await
    .unwrap()
    .into_iter()
    .map(|r| r.id)
    .collect();
  assert_eq!(population, ids(&[3, 4, 5, 6, 7]));
  assert_eq!(inner.linkage_for(RestaurantId(7)).await.unwrap().len(), 2);
  assert_eq!(inner.list_unresolved(None).await.unwrap().len(), 4);

  // A later pass finishes the job.
  let report = reconcile(&inner, &ReconcileConfig::default()).await.unwrap();
  assert_eq!(report.clusters_merged, 2);
  assert!(inner.list_unresolved(None).await.unwrap().is_empty());
}

// ─── Mentions ────────────────────────────────────────────────────────────────

fn mention(text: &str, latitude: f64, longitude: f64, key: &str) -> Mention {
  Mention { text: text.into(), latitude, longitude, key: key.into() }
}

#[tokio::test]
async fn mention_matches_by_name_and_location() {
  let s = store().await;
  let dragon = s.insert_restaurant(located("Golden Dragon", 41.8500, -87.6320)).await.unwrap();
  let pho = s.insert_restaurant(located("Pho 777", 41.8510, -87.6330)).await.unwrap();
  let far = s.insert_restaurant(located("GOLDEN DRAGON", 42.0, -88.0)).await.unwrap();
  s.insert_restaurant(restaurant("Sushi Place", "9 Elm St")).await.unwrap();

  let found = record_mention(
    &s,
    &mention("Dim sum at Golden Dragon tonight!", 41.8505, -87.6325, "m-1"),
  )
  .await
  .unwrap();
  assert_eq!(found, vec![dragon.id, dragon.id, pho.id, far.id]);

  assert_eq!(kinds(&s, dragon.id).await, vec![MatchKind::Both]);
  assert_eq!(kinds(&s, pho.id).await, vec![MatchKind::Geo]);
  assert_eq!(kinds(&s, far.id).await, vec![MatchKind::Name]);
}

async fn kinds(s: &SqliteStore, id: RestaurantId) -> Vec<MatchKind> {
  catalog::mentions_for(s, id)
    .await
    .unwrap()
    .into_iter()
    .map(|m| m.kind)
    .collect()
}

#[tokio::test]
async fn punctuated_mention_matches_name_and_location() {
  let s = store().await;
  let joes = s.insert_restaurant(located("Joes Pizza", 41.8800, -87.6300)).await.unwrap();

  let found = record_mention(
    &s,
    &mention("Great food at Joe's Pizza", 41.8810, -87.6290, "t-1"),
  )
  .await
  .unwrap();
  assert_eq!(found, vec![joes.id, joes.id]);
  assert_eq!(kinds(&s, joes.id).await, vec![MatchKind::Both]);
}

#[tokio::test]
async fn repeated_mention_is_deduplicated_and_widened() {
  let s = store().await;
  let pho = s.insert_restaurant(located("Pho 777", 41.8510, -87.6330)).await.unwrap();

  let first = mention("nice soup around here", 41.8510, -87.6330, "m-1");
  record_mention(&s, &first).await.unwrap();
  record_mention(&s, &first).await.unwrap();
  let stored = catalog::mentions_for(&s, pho.id).await.unwrap();
  assert_eq!(stored.len(), 1);
  assert_eq!(stored[0].kind, MatchKind::Geo);

  // Same key, new evidence: the row is widened, not duplicated.
  record_mention(&s, &mention("Pho 777 again", 0.0, 0.0, "m-1")).await.unwrap();
  let stored = catalog::mentions_for(&s, pho.id).await.unwrap();
  assert_eq!(stored.len(), 1);
  assert_eq!(stored[0].kind, MatchKind::Both);
  assert_eq!(stored[0].mention_key, "m-1");
}

#[tokio::test]
async fn mention_without_matches_writes_nothing() {
  let s = store().await;
  let pho = s.insert_restaurant(located("Pho 777", 41.8510, -87.6330)).await.unwrap();

  let found = record_mention(&s, &mention("", 0.0, 0.0, "m-9")).await.unwrap();
  assert!(found.is_empty());
  assert!(matches!(
    catalog::mentions_for(&s, pho.id).await,
    Err(LinkageError::NotFound(_))
  ));
}

#[tokio::test]
async fn absorbed_records_are_not_mention_candidates() {
  let s = store().await;
  let a = s.insert_restaurant(located("Golden Dragon", 41.85, -87.632)).await.unwrap();
  let b = s.insert_restaurant(located("Golden Dragon", 41.85, -87.632)).await.unwrap();
  let report = reconcile(&s, &ReconcileConfig::default()).await.unwrap();
  let primary = report.merges[0].primary;
  assert_eq!(report.merges[0].edges.len(), 2);

  // The canonical record has no coordinates, so only the name matches.
  let found = record_mention(&s, &mention("Golden Dragon", 41.85, -87.632, "m-2"))
    .await
    .unwrap();
  assert_eq!(found, vec![primary]);
  assert!(!found.contains(&a.id) && !found.contains(&b.id));
}

// ─── Validation and lookups ──────────────────────────────────────────────────

#[tokio::test]
async fn blank_inputs_are_rejected_without_writes() {
  let s = store().await;

  let err = catalog::ingest(&s, row("100", "  ", "123 N Main St", "60601"))
    .await
    .unwrap_err();
  assert!(matches!(err, LinkageError::InputMissing("name")), "{err}");

  let err = catalog::ingest(&s, FeedRecord { date: Some("soon".into()), ..row("1", "A", "B", "1") })
    .await
    .unwrap_err();
  assert!(matches!(err, LinkageError::Feed(_)), "{err}");

  let err = record_mention(&s, &mention("Golden Dragon", 41.85, -87.632, ""))
    .await
    .unwrap_err();
  assert!(matches!(err, LinkageError::InputMissing("key")), "{err}");

  assert_eq!(catalog::count(&s).await.unwrap(), 0);
  assert!(s.list_restaurants().await.unwrap().is_empty());
}

#[tokio::test]
async fn lookups_report_missing_entities() {
  let s = store().await;
  assert!(matches!(
    catalog::restaurant_detail(&s, RestaurantId(1)).await,
    Err(LinkageError::NotFound(_))
  ));
  assert!(matches!(
    catalog::linked_for_inspection(&s, "nope").await,
    Err(LinkageError::NotFound(_))
  ));

  let outcome = catalog::ingest(&s, row("100", "Golden Dragon", "2234 S Wentworth Ave", "60616"))
    .await
    .unwrap();
  let owner = catalog::restaurant_for_inspection(&s, "100").await.unwrap();
  assert_eq!(owner.id, outcome.restaurant_id);

  let view = catalog::linked_for_inspection(&s, "100").await.unwrap();
  assert!(view.linked.is_empty() && view.ids.is_empty());
  assert_eq!(catalog::count(&s).await.unwrap(), 1);
}
