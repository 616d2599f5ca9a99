//! Error type for `ri-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] ri_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date parse error: {0}")]
  DateParse(String),

  /// A cluster commit named no original records.
  #[error("cluster commit has no original records")]
  EmptyCluster,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
