//! Error type for `classbook-store-sqlite`.

use classbook_core::{NotFound, store::StoreError, validate::ValidationErrors};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Validation, not-found and precondition failures.
  #[error(transparent)]
  Core(#[from] classbook_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored column held a value the domain types cannot represent.
  #[error("invalid value in column {column}: {value}")]
  Decode {
    column: &'static str,
    value:  String,
  },
}

impl From<NotFound> for Error {
  fn from(nf: NotFound) -> Self { Error::Core(nf.into()) }
}

impl From<ValidationErrors> for Error {
  fn from(errs: ValidationErrors) -> Self { Error::Core(errs.into()) }
}

impl StoreError for Error {
  fn domain(&self) -> Option<&classbook_core::Error> {
    match self {
      Error::Core(e) => Some(e),
      _ => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
