//! Association of social-media mentions with restaurants.
//!
//! A mention matches a restaurant by name when one of its word n-grams
//! (n = 1..=4) equals the restaurant's name ignoring case, and by location
//! when its coordinates fall in a small box around the restaurant.

use std::collections::BTreeSet;

use ri_core::{
  linkage::{MatchKind, MentionMatch},
  restaurant::RestaurantId,
  store::{BoundingBox, RecordStore},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{LinkageError, Result};

/// Latitude half-width of the match box.
pub const LATITUDE_TOLERANCE: f64 = 0.00225001;
/// Longitude half-width of the match box.
pub const LONGITUDE_TOLERANCE: f64 = 0.00302190;
/// Longest word sequence tried as a restaurant name.
pub const MAX_NGRAM: usize = 4;

/// An incoming mention event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mention {
  pub text:      String,
  pub latitude:  f64,
  pub longitude: f64,
  /// Idempotency key of the mention itself.
  pub key:       String,
}

impl Mention {
  fn validate(&self) -> Result<()> {
    if self.key.trim().is_empty() {
      return Err(LinkageError::InputMissing("key"));
    }
    if !self.latitude.is_finite() {
      return Err(LinkageError::InputMissing("latitude"));
    }
    if !self.longitude.is_finite() {
      return Err(LinkageError::InputMissing("longitude"));
    }
    Ok(())
  }
}

/// Word n-grams of `text` with ASCII punctuation removed.
pub fn ngrams(text: &str, n: usize) -> Vec<String> {
  let stripped: String = text.chars().filter(|c| !c.is_ascii_punctuation()).collect();
  let words: Vec<&str> = stripped.split_whitespace().collect();
  if n == 0 {
    return Vec::new();
  }
  words.windows(n).map(|w| w.join(" ")).collect()
}

/// Every n-gram for n = 1..=[`MAX_NGRAM`], shortest first.
pub fn candidate_names(text: &str) -> Vec<String> {
  (1..=MAX_NGRAM).flat_map(|n| ngrams(text, n)).collect()
}

/// One match row per restaurant, with the kind derived from which evidence
/// lists it appears in. Rows are ascending by restaurant id.
pub fn classify(
  key: &str,
  name_ids: &[RestaurantId],
  geo_ids: &[RestaurantId],
) -> Vec<MentionMatch> {
  let by_name: BTreeSet<_> = name_ids.iter().copied().collect();
  let by_geo: BTreeSet<_> = geo_ids.iter().copied().collect();

  by_name
    .union(&by_geo)
    .map(|&id| {
      let kind = match (by_name.contains(&id), by_geo.contains(&id)) {
        (true, true) => MatchKind::Both,
        (true, false) => MatchKind::Name,
        _ => MatchKind::Geo,
      };
      MentionMatch { restaurant_id: id, mention_key: key.to_owned(), kind }
    })
    .collect()
}

/// Match a mention, persist one row per matched restaurant and return the
/// combined evidence list.
///
/// The returned ids are sorted ascending and a restaurant matched by both name
/// and location appears twice, once per evidence list.
#[instrument(skip(store, mention), fields(key = %mention.key))]
pub async fn record_mention<S>(store: &S, mention: &Mention) -> Result<Vec<RestaurantId>>
where
  S: RecordStore,
{
  mention.validate()?;

  let name_ids = store
    .restaurants_named(candidate_names(&mention.text))
    .await
    .map_err(LinkageError::store)?;

  let bounds = BoundingBox::around(
    mention.latitude,
    mention.longitude,
    LATITUDE_TOLERANCE,
    LONGITUDE_TOLERANCE,
  );
  let geo_ids = store
    .restaurants_within(bounds)
    .await
    .map_err(LinkageError::store)?;

  debug!(by_name = name_ids.len(), by_geo = geo_ids.len(), "mention evidence");

  let rows = classify(&mention.key, &name_ids, &geo_ids);
  store
    .record_mention_matches(rows)
    .await
    .map_err(LinkageError::store)?;

  let mut all: Vec<RestaurantId> = name_ids.into_iter().chain(geo_ids).collect();
  all.sort_unstable();
  Ok(all)
}
