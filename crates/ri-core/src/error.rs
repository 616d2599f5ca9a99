//! Error types for `ri-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("required field missing: {0}")]
  InputMissing(&'static str),

  #[error("invalid inspection date: {0:?}")]
  InvalidDate(String),

  #[error("unknown match kind: {0:?}")]
  UnknownMatchKind(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
