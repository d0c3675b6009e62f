//! Error type for `ktm-store-sqlite`.

use ktm_core::{FieldError, store::StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] ktm_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("schema version {found} is newer than supported version {supported}")]
  UnsupportedSchema { found: i64, supported: i64 },
}

impl StoreError for Error {
  fn invalid_fields(&self) -> Option<&[FieldError]> {
    match self {
      Error::Core(ktm_core::Error::Validation(fields)) => Some(fields),
      _ => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
