//! Linkage edges, mention matches and the unit of work for one merged
//! cluster.
//!
//! Both tables are append-only from the engine's point of view. The single
//! exception is a mention match whose evidence kind is widened to
//! [`MatchKind::Both`].

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
  Error,
  restaurant::{NewRestaurant, RestaurantId, RestaurantRecord},
};

// ─── Linkage ─────────────────────────────────────────────────────────────────

/// Records that `original` was absorbed into the canonical `primary`.
/// An id appears as `original` in at most one edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkageEdge {
  pub primary:  RestaurantId,
  pub original: RestaurantId,
}

/// Everything that must be written atomically for one resolved cluster.
#[derive(Debug, Clone)]
pub struct ClusterCommit {
  /// The synthesized canonical record; inserted with `clean = true`.
  pub canonical: NewRestaurant,
  /// Cluster members in enumeration order. Each receives a linkage edge and
  /// has its inspections relinked to the canonical record.
  pub originals: Vec<RestaurantId>,
}

/// What [`crate::store::RecordStore::commit_cluster`] wrote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeOutcome {
  pub primary:              RestaurantId,
  pub edges:                Vec<LinkageEdge>,
  pub relinked_inspections: usize,
}

/// The primary record owning an inspection, with the records it absorbed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedView {
  pub primary: RestaurantRecord,
  pub linked:  Vec<RestaurantRecord>,
  /// Ids of the absorbed records, ascending.
  pub ids:     Vec<RestaurantId>,
}

// ─── Mentions ────────────────────────────────────────────────────────────────

/// Which evidence associated a mention with a restaurant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
  Name,
  Geo,
  Both,
}

impl MatchKind {
  /// Combine two pieces of evidence for the same (restaurant, mention) pair.
  pub fn merge(self, other: Self) -> Self {
    if self == other { self } else { Self::Both }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Name => "name",
      Self::Geo => "geo",
      Self::Both => "both",
    }
  }
}

impl fmt::Display for MatchKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for MatchKind {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "name" => Ok(Self::Name),
      "geo" => Ok(Self::Geo),
      "both" => Ok(Self::Both),
      other => Err(Error::UnknownMatchKind(other.to_owned())),
    }
  }
}

/// Provenance of a mention → restaurant association. Unique per
/// (`restaurant_id`, `mention_key`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentionMatch {
  pub restaurant_id: RestaurantId,
  pub mention_key:   String,
  pub kind:          MatchKind,
}
