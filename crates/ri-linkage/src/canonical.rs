//! Canonical record synthesis for a resolved cluster.

use std::collections::HashMap;

use ri_core::{
  linkage::ClusterCommit,
  restaurant::{NewRestaurant, RestaurantId, RestaurantRecord},
};
use thiserror::Error;

use crate::cluster::Cluster;

/// Why a cluster could not be turned into a canonical record. Local to one
/// cluster: the pass logs it and moves on.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SynthesisError {
  #[error("cluster {members:?} has {resolved} resolvable members, need at least 2")]
  TooFewMembers {
    members:  Vec<RestaurantId>,
    resolved: usize,
  },

  /// The elected name or address is blank; a canonical record needs both.
  #[error("cluster {members:?} elects a blank {field}")]
  BlankField {
    members: Vec<RestaurantId>,
    field:   &'static str,
  },
}

/// Build the commit for `cluster`, looking members up in `index`.
///
/// The canonical name is the lexicographically greatest name among the first
/// two members only; the canonical address is the greatest address across
/// all members. Members are enumerated in ascending id order.
pub fn synthesize(
  cluster: &Cluster,
  index: &HashMap<RestaurantId, &RestaurantRecord>,
) -> Result<ClusterCommit, SynthesisError> {
  let members: Vec<&RestaurantRecord> = cluster
    .members
    .iter()
    .filter_map(|id| index.get(id).copied())
    .collect();

  let [first, second, ..] = members.as_slice() else {
    return Err(SynthesisError::TooFewMembers {
      members:  cluster.members.clone(),
      resolved: members.len(),
    });
  };

  // TODO: decide whether the name election should consider every member;
  // members past the second are ignored for compatibility with existing
  // catalogs.
  let name = first.name.as_str().max(second.name.as_str());
  let address = members
    .iter()
    .map(|r| r.address.as_str())
    .max()
    .unwrap_or_default();

  for (field, value) in [("name", name), ("address", address)] {
    if value.trim().is_empty() {
      return Err(SynthesisError::BlankField { members: cluster.members.clone(), field });
    }
  }

  Ok(ClusterCommit {
    canonical: NewRestaurant::canonical(name, address),
    originals: members.iter().map(|r| r.id).collect(),
  })
}
