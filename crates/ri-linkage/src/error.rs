//! Error type for `ri-linkage`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LinkageError {
  /// A required input was blank; nothing was written.
  #[error("required field missing: {0}")]
  InputMissing(&'static str),

  /// A lookup by id found nothing; nothing was written.
  #[error("not found: {0}")]
  NotFound(String),

  #[error("match threshold {0} is outside [0, 1]")]
  InvalidThreshold(f64),

  #[error("invalid feed record: {0}")]
  Feed(#[source] ri_core::Error),

  /// The backing store failed. The in-flight cluster was rolled back.
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl LinkageError {
  pub(crate) fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(err))
  }
}

impl From<ri_core::Error> for LinkageError {
  fn from(err: ri_core::Error) -> Self {
    match err {
      ri_core::Error::InputMissing(field) => Self::InputMissing(field),
      other => Self::Feed(other),
    }
  }
}

pub type Result<T, E = LinkageError> = std::result::Result<T, E>;
