//! Restaurant records, the entities the linkage engine reconciles.
//!
//! A record is inserted dirty (`clean = false`) by ingestion and becomes clean
//! once a reconciliation pass has either merged it into a canonical record or
//! seen it without finding a match.

use std::{fmt, num::ParseIntError, str::FromStr};

use serde::{Deserialize, Serialize};

// ─── Identity ────────────────────────────────────────────────────────────────

/// Store-assigned restaurant identity. Ordered so that cluster members and
/// mention results can be enumerated deterministically.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RestaurantId(pub i64);

impl fmt::Display for RestaurantId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl FromStr for RestaurantId {
  type Err = ParseIntError;

  fn from_str(s: &str) -> Result<Self, Self::Err> { s.trim().parse().map(Self) }
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// A persisted restaurant row.
///
/// Canonical records synthesized by the linkage engine carry only `name` and
/// `address`; every other descriptive field is left unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestaurantRecord {
  pub id:            RestaurantId,
  pub name:          String,
  pub facility_type: Option<String>,
  pub address:       String,
  pub city:          Option<String>,
  pub state:         Option<String>,
  pub zip:           Option<String>,
  pub latitude:      Option<f64>,
  pub longitude:     Option<f64>,
  /// Whether a reconciliation pass has resolved this record.
  pub clean:         bool,
}

// ─── NewRestaurant ───────────────────────────────────────────────────────────

/// Input to [`crate::store::RecordStore::insert_restaurant`]. The id is always
/// assigned by the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewRestaurant {
  pub name:          String,
  pub facility_type: Option<String>,
  pub address:       String,
  pub city:          Option<String>,
  pub state:         Option<String>,
  pub zip:           Option<String>,
  pub latitude:      Option<f64>,
  pub longitude:     Option<f64>,
  pub clean:         bool,
}

impl NewRestaurant {
  /// A dirty record as produced by ingestion.
  pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
    Self { name: name.into(), address: address.into(), ..Self::default() }
  }

  /// A canonical record: name and address only, already resolved.
  pub fn canonical(name: impl Into<String>, address: impl Into<String>) -> Self {
    Self { clean: true, ..Self::new(name, address) }
  }
}
