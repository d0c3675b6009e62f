//! Batch ingestion of project records from the tabular source file.
//!
//! Rows are processed in order. A row that cannot be decoded, has no title,
//! or fails to persist is logged and skipped; the run continues and reports
//! how many rows were inserted and skipped.

use std::io;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use ktm_core::{agency::UNKNOWN_AGENCY, project::NewProject, store::TransparencyStore};
use serde::Deserialize;
use thiserror::Error;

/// Columns that must be present in the header.
const REQUIRED_COLUMNS: &[&str] = &["title"];

#[derive(Debug, Error)]
pub enum IngestError {
  #[error("csv error: {0}")]
  Csv(#[from] csv::Error),

  #[error("source file has no {0:?} column")]
  MissingColumn(&'static str),
}

/// Why a single row was skipped.
#[derive(Debug, Error)]
enum RowError {
  #[error("undecodable row: {0}")]
  Decode(#[from] csv::Error),

  #[error("row has no title")]
  MissingTitle,

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Outcome of one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
  pub inserted: usize,
  pub skipped:  usize,
}

/// One line of the source file. Every column is optional at this stage.
#[derive(Debug, Default, Deserialize)]
struct SourceRow {
  ocid:                    Option<String>,
  title:                   Option<String>,
  agency:                  Option<String>,
  sector:                  Option<String>,
  district:                Option<String>,
  planned_budget_amount:   Option<String>,
  planned_budget_currency: Option<String>,
  award_start:             Option<String>,
  award_end:               Option<String>,
  tender_date:             Option<String>,
  source_ref:              Option<String>,
}

/// Read CSV records from `reader` and insert one project per row.
pub async fn ingest<S, R>(store: &S, reader: R) -> Result<IngestSummary, IngestError>
where
  S: TransparencyStore,
  R: io::Read,
{
  let mut rdr = csv::ReaderBuilder::new()
    .trim(csv::Trim::All)
    .flexible(true)
    .from_reader(reader);

  let headers = rdr.headers()?.clone();
  for &column in REQUIRED_COLUMNS {
    if !headers.iter().any(|h| h == column) {
      return Err(IngestError::MissingColumn(column));
    }
  }

  let mut summary = IngestSummary::default();
  for (idx, record) in rdr.deserialize::<SourceRow>().enumerate() {
    // Line 1 is the header.
    let line = idx + 2;
    match ingest_row(store, record, line).await {
      Ok(()) => summary.inserted += 1,
      Err(e) => {
        tracing::warn!(line, error = %e, "skipping row");
        summary.skipped += 1;
      }
    }
  }

  tracing::info!(
    inserted = summary.inserted,
    skipped = summary.skipped,
    "ingest complete"
  );
  Ok(summary)
}

async fn ingest_row<S>(
  store: &S,
  record: Result<SourceRow, csv::Error>,
  line: usize,
) -> Result<(), RowError>
where
  S: TransparencyStore,
{
  let row = record?;
  let title = clean(row.title).ok_or(RowError::MissingTitle)?;

  let agency_name = clean(row.agency).unwrap_or_else(|| UNKNOWN_AGENCY.to_owned());
  let agency = store
    .get_or_create_agency(agency_name)
    .await
    .map_err(|e| RowError::Store(Box::new(e)))?;

  let project = NewProject {
    ocid: clean(row.ocid),
    title,
    sector: clean(row.sector),
    district: clean(row.district),
    ward: None,
    planned_budget_amount: amount_field(row.planned_budget_amount, line),
    planned_budget_currency: clean(row.planned_budget_currency),
    award_start: date_field(row.award_start, "award_start", line),
    award_end: date_field(row.award_end, "award_end", line),
    tender_date: date_field(row.tender_date, "tender_date", line),
    source_ref: clean(row.source_ref),
    agency_id: Some(agency.id),
  };

  store
    .insert_project(project)
    .await
    .map_err(|e| RowError::Store(Box::new(e)))?;
  Ok(())
}

// ─── Field normalisation ─────────────────────────────────────────────────────

/// Trimmed text, or `None` when blank.
fn clean(s: Option<String>) -> Option<String> {
  s.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
}

fn date_field(raw: Option<String>, column: &str, line: usize) -> Option<NaiveDateTime> {
  let raw = clean(raw)?;
  let parsed = parse_date(&raw);
  if parsed.is_none() {
    tracing::debug!(line, column, value = %raw, "unparseable date, leaving empty");
  }
  parsed
}

fn amount_field(raw: Option<String>, line: usize) -> Option<f64> {
  let raw = clean(raw)?;
  let parsed = parse_amount(&raw);
  if parsed.is_none() {
    tracing::warn!(line, value = %raw, "unparseable budget amount, leaving empty");
  }
  parsed
}

const DATETIME_FORMATS: &[&str] = &[
  "%Y-%m-%d %H:%M:%S%.f",
  "%Y-%m-%dT%H:%M:%S%.f",
  "%Y-%m-%d %H:%M",
  "%Y-%m-%dT%H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Parse a source date. Offsets are dropped, keeping the wall-clock time
/// they were written in. Anything unrecognised yields `None`.
pub fn parse_date(raw: &str) -> Option<NaiveDateTime> {
  let raw = raw.trim();
  if raw.is_empty() {
    return None;
  }
  if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
    return Some(dt.naive_local());
  }
  DATETIME_FORMATS
    .iter()
    .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
    .or_else(|| {
      DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(raw, f).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    })
}

/// Parse a budget figure, ignoring thousands separators.
pub fn parse_amount(raw: &str) -> Option<f64> {
  let digits: String = raw.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect();
  digits.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
  use chrono::Timelike as _;
  use ktm_core::store::ProjectQuery;
  use ktm_store_sqlite::SqliteStore;

  use super::*;

  fn ymd(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
  }

  #[test]
  fn parse_date_accepts_common_forms() {
    assert_eq!(parse_date("2023-04-05"), Some(ymd(2023, 4, 5)));
    assert_eq!(parse_date("2023/04/05"), Some(ymd(2023, 4, 5)));
    assert_eq!(parse_date("04/05/2023"), Some(ymd(2023, 4, 5)));
    assert_eq!(parse_date("2023-04-05 00:00:00"), Some(ymd(2023, 4, 5)));
    assert_eq!(parse_date("2023-04-05T00:00"), Some(ymd(2023, 4, 5)));
  }

  #[test]
  fn parse_date_keeps_wall_time_of_offset() {
    let dt = parse_date("2023-04-05T10:15:00+05:45").unwrap();
    assert_eq!((dt.hour(), dt.minute()), (10, 15));
  }

  #[test]
  fn parse_date_rejects_garbage() {
    assert_eq!(parse_date(""), None);
    assert_eq!(parse_date("n/a"), None);
    assert_eq!(parse_date("2023-13-40"), None);
  }

  #[test]
  fn parse_amount_strips_separators() {
    assert_eq!(parse_amount("1,250,000.50"), Some(1_250_000.5));
    assert_eq!(parse_amount("42"), Some(42.0));
    assert_eq!(parse_amount("TBD"), None);
    assert_eq!(parse_amount("inf"), None);
  }

  const SOURCE: &str = "\
ocid,title,agency,sector,district,planned_budget_amount,planned_budget_currency,award_start,award_end,tender_date,source_ref
ocds-1,Ring Road widening,Department of Roads,Roads,Kathmandu,\"1,000,000\",NPR,2023-01-10,2024-01-10,2022-12-01,src-1
ocds-2,Bagmati bridge,Department of Roads,,Lalitpur,bad,NPR,,,not a date,src-2
ocds-3,,Department of Roads,Roads,Lalitpur,,,,,,
ocds-4,School roof,,Education,Bhaktapur,,,,,2023-03-15,
";

  #[tokio::test]
  async fn ingest_inserts_rows_and_skips_untitled() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let summary = ingest(&store, SOURCE.as_bytes()).await.unwrap();
    assert_eq!(summary, IngestSummary { inserted: 3, skipped: 1 });

    let projects = store.list_projects(&ProjectQuery::default()).await.unwrap();
    assert_eq!(projects.len(), 3);

    let ring = projects.iter().find(|p| p.ocid.as_deref() == Some("ocds-1")).unwrap();
    assert_eq!(ring.planned_budget_amount, Some(1_000_000.0));
    assert_eq!(ring.tender_date, Some(ymd(2022, 12, 1)));
    assert_eq!(ring.award_end, Some(ymd(2024, 1, 10)));

    let bridge = projects.iter().find(|p| p.ocid.as_deref() == Some("ocds-2")).unwrap();
    assert_eq!(bridge.sector, None);
    assert_eq!(bridge.planned_budget_amount, None);
    assert_eq!(bridge.tender_date, None);
    assert_eq!(bridge.agency_id, ring.agency_id);

    let school = projects.iter().find(|p| p.ocid.as_deref() == Some("ocds-4")).unwrap();
    assert_eq!(school.agency.as_ref().unwrap().name, "Unknown Agency");

    let agencies = store.list_agencies(None).await.unwrap();
    assert_eq!(agencies.len(), 2);
  }

  #[tokio::test]
  async fn ingest_tolerates_missing_optional_columns() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let summary = ingest(&store, "title,district\nCanal lining,Lalitpur\n".as_bytes())
      .await
      .unwrap();
    assert_eq!(summary.inserted, 1);

    let projects = store.list_projects(&ProjectQuery::default()).await.unwrap();
    assert_eq!(projects[0].district.as_deref(), Some("Lalitpur"));
    assert_eq!(projects[0].agency.as_ref().unwrap().name, "Unknown Agency");
  }

  #[tokio::test]
  async fn ingest_requires_title_column() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let err = ingest(&store, "ocid,agency\nx,y\n".as_bytes()).await.unwrap_err();
    assert!(matches!(err, IngestError::MissingColumn("title")));
  }

  #[tokio::test]
  async fn ingest_skips_undecodable_row_and_continues() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let mut source = b"title,district\nCanal lining,Lalitpur\n".to_vec();
    source.extend_from_slice(b"Bad \xff\xfe bytes,Kathmandu\n");
    source.extend_from_slice(b"Library annex,Bhaktapur\n");

    let summary = ingest(&store, source.as_slice()).await.unwrap();
    assert_eq!(summary, IngestSummary { inserted: 2, skipped: 1 });

    let mut titles: Vec<_> = store
      .list_projects(&ProjectQuery::default())
      .await
      .unwrap()
      .into_iter()
      .map(|p| p.title)
      .collect();
    titles.sort();
    assert_eq!(titles, ["Canal lining", "Library annex"]);
  }
}
