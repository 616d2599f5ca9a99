//! Partitioning of the restaurant population into comparison blocks.
//!
//! Records are only ever compared within their block, so blocks bound the
//! quadratic comparison cost and clusters never span two blocks.

use std::{collections::BTreeMap, fmt};

use ri_core::restaurant::RestaurantRecord;

/// Identifies a block.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum BlockKey {
  /// Blocking disabled: the whole population.
  All,
  /// Every record sharing this zip code; `None` groups records without one.
  Zip(Option<String>),
}

impl fmt::Display for BlockKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::All => f.write_str("all"),
      Self::Zip(Some(zip)) => write!(f, "zip {zip}"),
      Self::Zip(None) => f.write_str("no zip"),
    }
  }
}

#[derive(Debug, Clone)]
pub struct Block {
  pub key:     BlockKey,
  pub records: Vec<RestaurantRecord>,
}

/// Split `population` into disjoint blocks covering every record.
///
/// With blocking disabled there is exactly one block. With blocking enabled
/// there is one block per zip code, ordered by key; record order inside a
/// block follows `population`.
pub fn partition(population: Vec<RestaurantRecord>, blocking: bool) -> Vec<Block> {
  if !blocking {
    return vec![Block { key: BlockKey::All, records: population }];
  }

  let mut by_zip: BTreeMap<Option<String>, Vec<RestaurantRecord>> = BTreeMap::new();
  for record in population {
    by_zip.entry(record.zip.clone()).or_default().push(record);
  }

  by_zip
    .into_iter()
    .map(|(zip, records)| Block { key: BlockKey::Zip(zip), records })
    .collect()
}
