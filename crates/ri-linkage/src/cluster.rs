//! Cluster resolution inside one block.
//!
//! Every dirty record is scored against every other record of its block. A
//! dirty record and each of its candidates are unioned in a disjoint-set
//! forest, so the resulting clusters are the transitive closure of the
//! candidate relation and do not depend on the order records are visited in.

use std::collections::BTreeMap;

use petgraph::unionfind::UnionFind;
use ri_core::restaurant::{RestaurantId, RestaurantRecord};
use serde::Serialize;

use crate::similarity;

/// A closed set of records judged to be the same restaurant, ascending by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cluster {
  pub members: Vec<RestaurantId>,
}

/// The outcome of resolving one block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockResolution {
  /// Clusters of two or more records, ordered by their smallest id.
  pub clusters:    Vec<Cluster>,
  /// Dirty records that matched nothing. They are resolved as-is.
  pub unmatched:   Vec<RestaurantId>,
  /// Number of scored pairs.
  pub comparisons: usize,
}

/// The candidate set of one dirty record: ids in `records` scoring at or
/// above `threshold` against it.
pub fn candidates(
  dirty: &RestaurantRecord,
  records: &[RestaurantRecord],
  threshold: f64,
) -> Vec<RestaurantId> {
  records
    .iter()
    .filter(|other| {
      similarity::score(dirty, other).is_some_and(|score| score >= threshold)
    })
    .map(|other| other.id)
    .collect()
}

/// Resolve a block into clusters. Dirty records are the ones with
/// `clean = false`; the whole block is the comparison population.
pub fn resolve_block(records: &[RestaurantRecord], threshold: f64) -> BlockResolution {
  let position: BTreeMap<RestaurantId, usize> =
    records.iter().enumerate().map(|(i, r)| (r.id, i)).collect();

  let mut forest = UnionFind::<usize>::new(records.len());
  let mut matched = vec![false; records.len()];
  let mut comparisons = 0;

  for (i, dirty) in records.iter().enumerate().filter(|(_, r)| !r.clean) {
    comparisons += records.len().saturating_sub(1);
    for candidate in candidates(dirty, records, threshold) {
      let j = position[&candidate];
      forest.union(i, j);
      matched[i] = true;
      matched[j] = true;
    }
  }

  let mut groups: BTreeMap<usize, Vec<RestaurantId>> = BTreeMap::new();
  for (i, record) in records.iter().enumerate() {
    groups.entry(forest.find_mut(i)).or_default().push(record.id);
  }

  let mut clusters: Vec<Cluster> = groups
    .into_values()
    .filter(|members| members.len() >= 2)
    .map(|mut members| {
      members.sort_unstable();
      Cluster { members }
    })
    .collect();
  clusters.sort_unstable_by_key(|c| c.members[0]);

  let mut unmatched: Vec<RestaurantId> = records
    .iter()
    .zip(&matched)
    .filter(|(r, matched)| !r.clean && !**matched)
    .map(|(r, _)| r.id)
    .collect();
  unmatched.sort_unstable();

  BlockResolution { clusters, unmatched, comparisons }
}
