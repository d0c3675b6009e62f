//! Case-folding and the typed predicates that list and aggregate reads are
//! built from.
//!
//! Predicates carry already-folded needles. Backends translate each variant
//! into their native query form; they never see raw user input.

use uuid::Uuid;

/// Normalise free text for comparison. All categorical and free-text
/// matching in this crate goes through this function.
pub fn fold(s: &str) -> String { s.to_lowercase() }

/// A string that has been passed through [`fold`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Folded(String);

impl Folded {
  pub fn new(raw: &str) -> Self { Self(fold(raw)) }

  /// `None` for an absent or empty filter value; filters with no value are
  /// not applied.
  pub fn non_empty(raw: Option<&str>) -> Option<Self> {
    raw.filter(|s| !s.is_empty()).map(Self::new)
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

// ─── Predicates ──────────────────────────────────────────────────────────────

/// A condition on a project row (joined with its optional agency).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectPredicate {
  /// `fold(project.district) == needle`.
  DistrictEq(Folded),
  /// `needle` is a substring of `fold(project.title)` or of
  /// `fold(agency.name)`. A project without an agency can only match on its
  /// title.
  TextContains(Folded),
  /// `project.tender_date` is set.
  HasTenderDate,
}

/// A condition on a report row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportPredicate {
  /// `fold(report.district) == needle`.
  DistrictEq(Folded),
  ProjectIdEq(Uuid),
}

/// The optional district scope shared by every aggregation.
pub fn district_scope(district: Option<&str>) -> Option<Folded> {
  Folded::non_empty(district)
}

// ─── Pagination ──────────────────────────────────────────────────────────────

pub const DEFAULT_LIMIT: u32 = 50;

/// Offset/limit window applied after filtering and ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
  pub limit:  u32,
  pub offset: u32,
}

impl Default for Page {
  fn default() -> Self { Self { limit: DEFAULT_LIMIT, offset: 0 } }
}

impl Page {
  pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
    Self {
      limit:  limit.unwrap_or(DEFAULT_LIMIT),
      offset: offset.unwrap_or(0),
    }
  }
}
