//! Project: a planned or awarded infrastructure work item.
//!
//! Projects are created only by the ingestion job and are read-only
//! afterwards.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, FieldError, Result, agency::Agency};

/// A stored project with its agency resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
  pub id:                      Uuid,
  pub ocid:                    Option<String>,
  pub title:                   String,
  pub sector:                  Option<String>,
  pub district:                Option<String>,
  pub ward:                    Option<String>,
  pub planned_budget_amount:   Option<f64>,
  pub planned_budget_currency: Option<String>,
  pub award_start:             Option<NaiveDateTime>,
  pub award_end:               Option<NaiveDateTime>,
  pub tender_date:             Option<NaiveDateTime>,
  pub source_ref:              Option<String>,
  pub agency_id:               Option<i64>,
  /// `None` when the project has no agency.
  pub agency:                  Option<Agency>,
}

/// Input to [`TransparencyStore::insert_project`](crate::store::TransparencyStore::insert_project).
/// The store assigns the id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewProject {
  pub ocid:                    Option<String>,
  pub title:                   String,
  pub sector:                  Option<String>,
  pub district:                Option<String>,
  pub ward:                    Option<String>,
  pub planned_budget_amount:   Option<f64>,
  pub planned_budget_currency: Option<String>,
  pub award_start:             Option<NaiveDateTime>,
  pub award_end:               Option<NaiveDateTime>,
  pub tender_date:             Option<NaiveDateTime>,
  pub source_ref:              Option<String>,
  pub agency_id:               Option<i64>,
}

impl NewProject {
  pub fn validate(&self) -> Result<()> {
    if self.title.trim().is_empty() {
      return Err(Error::Validation(vec![FieldError::new(
        "title",
        "must not be empty",
      )]));
    }
    Ok(())
  }
}
