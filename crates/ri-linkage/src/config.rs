//! Per-invocation reconciliation settings.

use serde::{Deserialize, Serialize};

use crate::{LinkageError, Result, similarity::DEFAULT_THRESHOLD};

/// Passed explicitly to every [`crate::reconcile`] call; there is no
/// process-wide reconciliation state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
  /// Partition the population by zip code and compare only within a zip.
  pub blocking:  bool,
  /// Minimum composite similarity for two records to be linked.
  pub threshold: f64,
}

impl Default for ReconcileConfig {
  fn default() -> Self { Self { blocking: false, threshold: DEFAULT_THRESHOLD } }
}

impl ReconcileConfig {
  pub fn validate(&self) -> Result<()> {
    if !(0.0..=1.0).contains(&self.threshold) {
      return Err(LinkageError::InvalidThreshold(self.threshold));
    }
    Ok(())
  }
}
