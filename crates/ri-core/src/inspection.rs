//! Inspection rows and the ingestion outcome.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::restaurant::RestaurantId;

/// A persisted inspection. The id is the upstream feed's natural key; only
/// `restaurant_id` ever changes after creation (when a cluster is relinked).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inspection {
  pub id:              String,
  pub risk:            Option<String>,
  pub date:            Option<NaiveDate>,
  pub inspection_type: Option<String>,
  pub results:         Option<String>,
  pub violations:      Option<String>,
  pub restaurant_id:   RestaurantId,
}

/// Input to [`crate::store::RecordStore::record_inspection`]. The owning
/// restaurant is resolved (or created) by the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewInspection {
  pub id:              String,
  pub risk:            Option<String>,
  pub date:            Option<NaiveDate>,
  pub inspection_type: Option<String>,
  pub results:         Option<String>,
  pub violations:      Option<String>,
}

/// Result of ingesting one feed row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestOutcome {
  pub restaurant_id:      RestaurantId,
  /// A new restaurant row was inserted for this feed row.
  pub restaurant_created: bool,
  /// The inspection id was new; `false` on idempotent re-ingestion.
  pub inspection_created: bool,
}
