//! Error types for `ktm-core`.

use serde::Serialize;
use thiserror::Error;

/// A single rejected input field, reported back to the submitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
  pub field:   &'static str,
  pub message: String,
}

impl FieldError {
  pub fn new(field: &'static str, message: impl Into<String>) -> Self {
    Self { field, message: message.into() }
  }
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid fields: {}", describe(.0))]
  Validation(Vec<FieldError>),
}

fn describe(fields: &[FieldError]) -> String {
  fields
    .iter()
    .map(|f| format!("{}: {}", f.field, f.message))
    .collect::<Vec<_>>()
    .join("; ")
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
