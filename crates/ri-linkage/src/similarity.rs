//! Weighted multi-field similarity between two restaurant records.
//!
//! ```text
//! score = 0.45 * jaro_winkler(name)
//!       + 0.40 * jaccard(address tokens)
//!       + 0.09 * normalized_levenshtein(city)
//!       + 0.06 * (state equal)
//! ```
//!
//! The weights and the similarity functions are fixed policy.

use std::collections::BTreeSet;

use ri_core::restaurant::RestaurantRecord;

pub const NAME_WEIGHT: f64 = 0.45;
pub const ADDRESS_WEIGHT: f64 = 0.40;
pub const CITY_WEIGHT: f64 = 0.09;
pub const STATE_WEIGHT: f64 = 0.06;

/// Composite score at or above which two records are linked by default.
pub const DEFAULT_THRESHOLD: f64 = 0.8;

/// Similarity of `candidate` to `other` in `[0, 1]`.
///
/// Returns `None` when both are the same record, which is not the same as a
/// score of zero. `score(a, b) == score(b, a)` holds exactly.
pub fn score(candidate: &RestaurantRecord, other: &RestaurantRecord) -> Option<f64> {
  if candidate.id == other.id {
    return None;
  }

  let name = name_similarity(&candidate.name, &other.name);
  let address = address_similarity(&candidate.address, &other.address);
  let city = city_similarity(candidate.city.as_deref(), other.city.as_deref());
  let state = if candidate.state == other.state { 1.0 } else { 0.0 };

  let total = NAME_WEIGHT * name
    + ADDRESS_WEIGHT * address
    + CITY_WEIGHT * city
    + STATE_WEIGHT * state;
  Some(total.clamp(0.0, 1.0))
}

/// Jaro-Winkler over the full name strings.
pub fn name_similarity(a: &str, b: &str) -> f64 {
  // Jaro's greedy matching is not guaranteed symmetric; fix the argument
  // order so the score is.
  let (a, b) = ordered(a, b);
  strsim::jaro_winkler(a, b)
}

/// Jaccard similarity over whitespace-separated address tokens.
pub fn address_similarity(a: &str, b: &str) -> f64 {
  let left: BTreeSet<&str> = a.split_whitespace().collect();
  let right: BTreeSet<&str> = b.split_whitespace().collect();
  let union = left.union(&right).count();
  if union == 0 {
    return 1.0;
  }
  left.intersection(&right).count() as f64 / union as f64
}

/// Normalized Levenshtein similarity; a missing city compares as empty.
pub fn city_similarity(a: Option<&str>, b: Option<&str>) -> f64 {
  let (a, b) = ordered(a.unwrap_or_default(), b.unwrap_or_default());
  strsim::normalized_levenshtein(a, b)
}

fn ordered<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
  if a <= b { (a, b) } else { (b, a) }
}
