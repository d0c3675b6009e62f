//! Report: a citizen-submitted field observation, optionally about a
//! project. Reports are immutable once stored.

use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, FieldError, Result};

/// Channel recorded when the submitter does not name one.
pub const DEFAULT_CHANNEL: &str = "app";

pub const RATING_RANGE: RangeInclusive<i64> = 1..=5;

/// A stored report. Listings return this flat shape; nothing is nested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
  pub id:            Uuid,
  pub project_id:    Option<Uuid>,
  pub created_at:    DateTime<Utc>,
  pub status_flag:   Option<String>,
  pub rating:        Option<i64>,
  pub text:          Option<String>,
  pub photo_urls:    Option<Vec<String>>,
  pub lat:           Option<f64>,
  pub lng:           Option<f64>,
  pub ward:          Option<String>,
  pub district:      Option<String>,
  pub channel:       String,
  /// Pseudonymous submitter identifier; never a raw identity.
  pub reporter_hash: Option<String>,
}

/// A report submission. The store assigns `id` and `created_at`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NewReport {
  pub project_id:    Option<Uuid>,
  pub status_flag:   Option<String>,
  pub rating:        Option<i64>,
  pub text:          Option<String>,
  pub photo_urls:    Option<Vec<String>>,
  pub lat:           Option<f64>,
  pub lng:           Option<f64>,
  pub ward:          Option<String>,
  pub district:      Option<String>,
  pub channel:       Option<String>,
  pub reporter_hash: Option<String>,
}

impl NewReport {
  /// Check every field and report all offenders together.
  pub fn validate(&self) -> Result<()> {
    let mut errors = Vec::new();

    if let Some(rating) = self.rating
      && !RATING_RANGE.contains(&rating)
    {
      errors.push(FieldError::new(
        "rating",
        format!(
          "must be between {} and {}",
          RATING_RANGE.start(),
          RATING_RANGE.end()
        ),
      ));
    }
    check_coordinate(&mut errors, "lat", self.lat, 90.0);
    check_coordinate(&mut errors, "lng", self.lng, 180.0);

    if errors.is_empty() { Ok(()) } else { Err(Error::Validation(errors)) }
  }

  pub fn channel_or_default(&self) -> &str {
    self.channel.as_deref().unwrap_or(DEFAULT_CHANNEL)
  }
}

fn check_coordinate(
  errors: &mut Vec<FieldError>,
  field: &'static str,
  value: Option<f64>,
  bound: f64,
) {
  match value {
    Some(v) if !v.is_finite() => {
      errors.push(FieldError::new(field, "must be a finite number"));
    }
    Some(v) if !(-bound..=bound).contains(&v) => {
      errors.push(FieldError::new(
        field,
        format!("must be between -{bound} and {bound}"),
      ));
    }
    _ => {}
  }
}
