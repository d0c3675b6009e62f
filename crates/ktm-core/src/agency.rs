//! Agency: the government body responsible for projects.

use serde::{Deserialize, Serialize};

/// Label substituted when a source row names no agency.
pub const UNKNOWN_AGENCY: &str = "Unknown Agency";

/// A government body. `name` is the natural key used when ingesting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agency {
  pub id:          i64,
  pub name:        String,
  pub contact:     Option<String>,
  pub district:    Option<String>,
  pub agency_type: Option<String>,
}

/// The `{id, name}` pair returned by agency listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgencySummary {
  pub id:   i64,
  pub name: String,
}

