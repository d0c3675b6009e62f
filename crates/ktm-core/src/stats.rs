//! Result shapes for the aggregation reads.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Echoed as `district` when a summary is not scoped to one district.
pub const ALL_DISTRICTS: &str = "ALL";

/// Bucket for reports without a `status_flag`.
pub const UNKNOWN_STATUS: &str = "unknown";

/// Bucket for projects without a `sector`.
pub const UNCATEGORIZED_SECTOR: &str = "Other/Uncategorized";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryStats {
  pub district:         String,
  pub projects:         u64,
  pub reports:          u64,
  pub status_breakdown: BTreeMap<String, u64>,
}

impl SummaryStats {
  /// The label echoed back for `district`: the filter as given, or
  /// [`ALL_DISTRICTS`] when absent or empty.
  pub fn district_label(district: Option<&str>) -> String {
    district
      .filter(|d| !d.is_empty())
      .unwrap_or(ALL_DISTRICTS)
      .to_owned()
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorCount {
  pub sector: String,
  pub count:  u64,
}

/// Projects tendered in one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyCount {
  pub year:  i32,
  pub month: u32,
  pub count: u64,
}
