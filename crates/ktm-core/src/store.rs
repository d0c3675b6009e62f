//! The `TransparencyStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `ktm-store-sqlite`).
//! Higher layers (`ktm-api`, `ktm-ingest`) depend on this abstraction, not
//! on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  FieldError,
  agency::{Agency, AgencySummary},
  filter::{Folded, Page, ProjectPredicate, ReportPredicate},
  project::{NewProject, Project},
  report::{NewReport, Report},
  stats::{MonthlyCount, SectorCount, SummaryStats},
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Parameters for [`TransparencyStore::list_projects`].
#[derive(Debug, Clone, Default)]
pub struct ProjectQuery {
  /// Substring matched against project title or agency name.
  pub text:     Option<String>,
  pub district: Option<String>,
  pub page:     Page,
}

impl ProjectQuery {
  pub fn predicates(&self) -> Vec<ProjectPredicate> {
    let mut preds = Vec::new();
    if let Some(d) = Folded::non_empty(self.district.as_deref()) {
      preds.push(ProjectPredicate::DistrictEq(d));
    }
    if let Some(q) = Folded::non_empty(self.text.as_deref()) {
      preds.push(ProjectPredicate::TextContains(q));
    }
    preds
  }
}

/// Parameters for [`TransparencyStore::list_reports`].
#[derive(Debug, Clone, Default)]
pub struct ReportQuery {
  pub district:   Option<String>,
  pub project_id: Option<Uuid>,
  pub page:       Page,
}

impl ReportQuery {
  pub fn predicates(&self) -> Vec<ReportPredicate> {
    let mut preds = Vec::new();
    if let Some(d) = Folded::non_empty(self.district.as_deref()) {
      preds.push(ReportPredicate::DistrictEq(d));
    }
    if let Some(id) = self.project_id {
      preds.push(ReportPredicate::ProjectIdEq(id));
    }
    preds
  }
}

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Backend error types expose whether a failure was the caller's fault.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  /// The rejected input fields, if the operation failed on invalid input
  /// rather than on the backend itself.
  fn invalid_fields(&self) -> Option<&[FieldError]>;
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a transparency store backend.
///
/// Projects and agencies are written only by ingestion; reports only by
/// [`create_report`](Self::create_report). Nothing is ever updated or
/// deleted.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait TransparencyStore: Send + Sync {
  type Error: StoreError;

  // ── Projects ──────────────────────────────────────────────────────────

  /// Filtered projects, newest tender first; projects with no tender date
  /// come last.
  fn list_projects<'a>(
    &'a self,
    query: &'a ProjectQuery,
  ) -> impl Future<Output = Result<Vec<Project>, Self::Error>> + Send + 'a;

  /// Retrieve a project by id. Returns `None` if not found.
  fn get_project(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Project>, Self::Error>> + Send + '_;

  /// Distinct non-empty project districts, ascending, case-sensitive.
  fn list_districts(
    &self,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;

  // ── Agencies ──────────────────────────────────────────────────────────

  /// Every agency, or only those with at least one project in `district`.
  /// Each agency appears once, ordered by id.
  fn list_agencies(
    &self,
    district: Option<String>,
  ) -> impl Future<Output = Result<Vec<AgencySummary>, Self::Error>> + Send + '_;

  // ── Reports ───────────────────────────────────────────────────────────

  /// Filtered reports, newest first.
  fn list_reports<'a>(
    &'a self,
    query: &'a ReportQuery,
  ) -> impl Future<Output = Result<Vec<Report>, Self::Error>> + Send + 'a;

  /// Persist a new report atomically and return it with its generated id
  /// and `created_at`. The input is validated first; nothing is written if
  /// validation fails or `project_id` names an unknown project.
  fn create_report(
    &self,
    input: NewReport,
  ) -> impl Future<Output = Result<Report, Self::Error>> + Send + '_;

  // ── Aggregations ──────────────────────────────────────────────────────

  fn summary_stats(
    &self,
    district: Option<String>,
  ) -> impl Future<Output = Result<SummaryStats, Self::Error>> + Send + '_;

  /// Project counts per sector, largest first, ties by sector name.
  fn sector_breakdown(
    &self,
    district: Option<String>,
  ) -> impl Future<Output = Result<Vec<SectorCount>, Self::Error>> + Send + '_;

  /// Project counts per tender month, chronological. Projects with no
  /// tender date are excluded.
  fn monthly_timeline(
    &self,
    district: Option<String>,
  ) -> impl Future<Output = Result<Vec<MonthlyCount>, Self::Error>> + Send + '_;

  // ── Ingestion writes ──────────────────────────────────────────────────

  /// Return the agency whose name equals `name` exactly, creating it if
  /// none exists.
  fn get_or_create_agency(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Agency, Self::Error>> + Send + '_;

  fn insert_project(
    &self,
    input: NewProject,
  ) -> impl Future<Output = Result<Project, Self::Error>> + Send + '_;
}
