//! [`SqliteStore`]: the SQLite implementation of [`TransparencyStore`].

use std::path::Path;

use chrono::{SubsecRound as _, Utc};
use rusqlite::{
  OptionalExtension as _,
  functions::FunctionFlags,
  params_from_iter,
  types::{Value, ValueRef},
};
use uuid::Uuid;

use ktm_core::{
  FieldError,
  agency::{Agency, AgencySummary},
  filter::{Page, ProjectPredicate, ReportPredicate, district_scope},
  project::{NewProject, Project},
  report::{NewReport, Report},
  stats::{
    MonthlyCount, SectorCount, SummaryStats, UNCATEGORIZED_SECTOR,
    UNKNOWN_STATUS,
  },
  store::{ProjectQuery, ReportQuery, TransparencyStore},
};

use crate::{
  Error, Result,
  encode::{
    PROJECT_COLUMNS, REPORT_COLUMNS, RawProject, RawReport, encode_dt,
    encode_naive, encode_urls, encode_uuid,
  },
  schema::{SCHEMA_V1, SCHEMA_VERSION},
  sql::Conditions,
};

/// Projects joined with their (optional) agency.
const PROJECT_FROM: &str =
  "projects p LEFT JOIN agencies a ON a.id = p.agency_id";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A transparency store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path`. The schema is left untouched; call
  /// [`migrate`](Self::migrate) to set it up.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.configure().await?;
    Ok(store)
  }

  /// Open a migrated in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.configure().await?;
    store.migrate().await?;
    Ok(store)
  }

  /// Per-connection settings and the `fold(text)` SQL function.
  async fn configure(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(
          "PRAGMA journal_mode = WAL;
           PRAGMA foreign_keys = ON;",
        )?;
        conn.create_scalar_function(
          "fold",
          1,
          FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
          |ctx| match ctx.get_raw(0) {
            ValueRef::Text(bytes) => std::str::from_utf8(bytes)
              .map(|s| Some(ktm_core::fold(s)))
              .map_err(|e| rusqlite::Error::UserFunctionError(Box::new(e))),
            _ => Ok(None),
          },
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// The `user_version` recorded in the database; 0 for a fresh file.
  pub async fn schema_version(&self) -> Result<i64> {
    let version: i64 = self
      .conn
      .call(|conn| {
        Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
      })
      .await?;
    Ok(version)
  }

  /// Bring the schema up to [`SCHEMA_VERSION`]. Idempotent.
  pub async fn migrate(&self) -> Result<()> {
    let found = self.schema_version().await?;
    if found > SCHEMA_VERSION {
      return Err(Error::UnsupportedSchema { found, supported: SCHEMA_VERSION });
    }
    if found == SCHEMA_VERSION {
      tracing::debug!(version = found, "schema already current");
      return Ok(());
    }

    self
      .conn
      .call(|conn| {
        let tx = conn.transaction()?;
        tx.execute_batch(SCHEMA_V1)?;
        tx.commit()?;
        Ok(())
      })
      .await?;

    tracing::info!(from = found, to = SCHEMA_VERSION, "migrated schema");
    Ok(())
  }

  /// Project count, report count and per-status report counts, read inside
  /// one transaction so the three agree with each other. Absent statuses
  /// land under [`UNKNOWN_STATUS`].
  async fn summary_counts(
    &self,
    project_preds: &[ProjectPredicate],
    report_preds: &[ReportPredicate],
  ) -> Result<(u64, u64, Vec<(String, u64)>)> {
    let project_conds = Conditions::projects(project_preds);
    let project_sql = format!(
      "SELECT COUNT(*) FROM {PROJECT_FROM} {}",
      project_conds.where_clause()
    );
    let project_params = project_conds.into_params();

    let report_conds = Conditions::reports(report_preds);
    let report_sql = format!(
      "SELECT COUNT(*) FROM reports r {}",
      report_conds.where_clause()
    );
    let status_sql = format!(
      "SELECT COALESCE(NULLIF(r.status_flag, ''), {}) AS bucket, COUNT(*)
       FROM reports r
       {}
       GROUP BY bucket",
      literal(UNKNOWN_STATUS),
      report_conds.where_clause()
    );
    let report_params = report_conds.into_params();

    let (projects, reports, statuses) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let projects: i64 = tx.query_row(
          &project_sql,
          params_from_iter(project_params.iter()),
          |row| row.get(0),
        )?;
        let reports: i64 = tx.query_row(
          &report_sql,
          params_from_iter(report_params.iter()),
          |row| row.get(0),
        )?;
        let statuses = {
          let mut stmt = tx.prepare(&status_sql)?;
          stmt
            .query_map(params_from_iter(report_params.iter()), |row| {
              Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        tx.commit()?;
        Ok((projects, reports, statuses))
      })
      .await?;

    Ok((
      to_count(projects),
      to_count(reports),
      statuses.into_iter().map(|(k, n)| (k, to_count(n))).collect(),
    ))
  }
}

/// Quote a fixed label as an SQL string literal.
fn literal(s: &str) -> String { format!("'{}'", s.replace('\'', "''")) }

fn to_count(n: i64) -> u64 { u64::try_from(n).unwrap_or_default() }

fn page_params(page: Page) -> [Value; 2] {
  [
    Value::Integer(i64::from(page.limit)),
    Value::Integer(i64::from(page.offset)),
  ]
}

fn unknown_project(id: Uuid) -> Error {
  Error::Core(ktm_core::Error::Validation(vec![FieldError::new(
    "project_id",
    format!("no project with id {id}"),
  )]))
}

// ─── TransparencyStore impl ──────────────────────────────────────────────────

impl TransparencyStore for SqliteStore {
  type Error = Error;

  // ── Projects ──────────────────────────────────────────────────────────────

  async fn list_projects(&self, query: &ProjectQuery) -> Result<Vec<Project>> {
    let conds = Conditions::projects(&query.predicates());
    let sql = format!(
      "SELECT {PROJECT_COLUMNS}
       FROM {PROJECT_FROM}
       {}
       ORDER BY p.tender_date DESC NULLS LAST, p.id
       LIMIT ? OFFSET ?",
      conds.where_clause()
    );
    let params = conds.with_params(page_params(query.page)).into_params();

    let raws: Vec<RawProject> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(params_from_iter(params.iter()), RawProject::read)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawProject::into_project).collect()
  }

  async fn get_project(&self, id: Uuid) -> Result<Option<Project>> {
    let id_str = encode_uuid(id);
    let sql = format!("SELECT {PROJECT_COLUMNS} FROM {PROJECT_FROM} WHERE p.id = ?1");

    let raw: Option<RawProject> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str], RawProject::read)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawProject::into_project).transpose()
  }

  async fn list_districts(&self) -> Result<Vec<String>> {
    let districts = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT DISTINCT district FROM projects
           WHERE district IS NOT NULL AND district <> ''
           ORDER BY district",
        )?;
        let rows = stmt
          .query_map([], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(districts)
  }

  // ── Agencies ──────────────────────────────────────────────────────────────

  async fn list_agencies(
    &self,
    district: Option<String>,
  ) -> Result<Vec<AgencySummary>> {
    let scope = district_scope(district.as_deref());

    let agencies = self
      .conn
      .call(move |conn| {
        let read = |row: &rusqlite::Row<'_>| -> rusqlite::Result<AgencySummary> {
          Ok(AgencySummary { id: row.get(0)?, name: row.get(1)? })
        };
        let rows = if let Some(d) = scope {
          let mut stmt = conn.prepare(
            "SELECT DISTINCT a.id, a.name
             FROM agencies a
             JOIN projects p ON p.agency_id = a.id
             WHERE fold(p.district) = ?1
             ORDER BY a.id",
          )?;
          stmt
            .query_map(rusqlite::params![d.as_str()], read)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt =
            conn.prepare("SELECT id, name FROM agencies ORDER BY id")?;
          stmt
            .query_map([], read)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;
    Ok(agencies)
  }

  // ── Reports ───────────────────────────────────────────────────────────────

  async fn list_reports(&self, query: &ReportQuery) -> Result<Vec<Report>> {
    let conds = Conditions::reports(&query.predicates());
    let sql = format!(
      "SELECT {REPORT_COLUMNS}
       FROM reports r
       {}
       ORDER BY r.created_at DESC, r.id
       LIMIT ? OFFSET ?",
      conds.where_clause()
    );
    let params = conds.with_params(page_params(query.page)).into_params();

    let raws: Vec<RawReport> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(params_from_iter(params.iter()), RawReport::read)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawReport::into_report).collect()
  }

  async fn create_report(&self, input: NewReport) -> Result<Report> {
    input.validate()?;

    let report = Report {
      id:            Uuid::new_v4(),
      project_id:    input.project_id,
      created_at:    Utc::now().trunc_subsecs(6),
      status_flag:   input.status_flag.clone(),
      rating:        input.rating,
      text:          input.text.clone(),
      photo_urls:    input.photo_urls.clone(),
      lat:           input.lat,
      lng:           input.lng,
      ward:          input.ward.clone(),
      district:      input.district.clone(),
      channel:       input.channel_or_default().to_owned(),
      reporter_hash: input.reporter_hash.clone(),
    };

    let id_str         = encode_uuid(report.id);
    let project_id_str = report.project_id.map(encode_uuid);
    let created_str    = encode_dt(report.created_at);
    let urls_str       = report.photo_urls.as_deref().map(encode_urls).transpose()?;
    let row            = report.clone();

    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if let Some(pid) = &project_id_str {
          let exists = tx
            .query_row(
              "SELECT 1 FROM projects WHERE id = ?1",
              rusqlite::params![pid],
              |_| Ok(()),
            )
            .optional()?
            .is_some();
          if !exists {
            return Ok(false);
          }
        }
        tx.execute(
          "INSERT INTO reports (
             id, project_id, created_at, reporter_hash, channel, status_flag,
             rating, text, photo_urls, lat, lng, ward, district
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
          rusqlite::params![
            id_str,
            project_id_str,
            created_str,
            row.reporter_hash,
            row.channel,
            row.status_flag,
            row.rating,
            row.text,
            urls_str,
            row.lat,
            row.lng,
            row.ward,
            row.district,
          ],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    match (inserted, report.project_id) {
      (false, Some(pid)) => Err(unknown_project(pid)),
      _ => Ok(report),
    }
  }

  // ── Aggregations ──────────────────────────────────────────────────────────

  async fn summary_stats(&self, district: Option<String>) -> Result<SummaryStats> {
    let scope = district_scope(district.as_deref());
    let project_preds: Vec<_> =
      scope.iter().cloned().map(ProjectPredicate::DistrictEq).collect();
    let report_preds: Vec<_> =
      scope.into_iter().map(ReportPredicate::DistrictEq).collect();

    let (projects, reports, statuses) =
      self.summary_counts(&project_preds, &report_preds).await?;
    let status_breakdown = statuses.into_iter().collect();

    Ok(SummaryStats {
      district: SummaryStats::district_label(district.as_deref()),
      projects,
      reports,
      status_breakdown,
    })
  }

  async fn sector_breakdown(
    &self,
    district: Option<String>,
  ) -> Result<Vec<SectorCount>> {
    let preds: Vec<_> = district_scope(district.as_deref())
      .into_iter()
      .map(ProjectPredicate::DistrictEq)
      .collect();
    let conds = Conditions::projects(&preds);
    let sql = format!(
      "SELECT COALESCE(NULLIF(p.sector, ''), {}) AS bucket, COUNT(*) AS n
       FROM {PROJECT_FROM}
       {}
       GROUP BY bucket
       ORDER BY n DESC, bucket ASC",
      literal(UNCATEGORIZED_SECTOR),
      conds.where_clause()
    );
    let params = conds.into_params();

    let rows: Vec<(String, i64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(params_from_iter(params.iter()), |row| {
            Ok((row.get(0)?, row.get(1)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(
      rows
        .into_iter()
        .map(|(sector, n)| SectorCount { sector, count: to_count(n) })
        .collect(),
    )
  }

  async fn monthly_timeline(
    &self,
    district: Option<String>,
  ) -> Result<Vec<MonthlyCount>> {
    let mut preds = vec![ProjectPredicate::HasTenderDate];
    preds.extend(
      district_scope(district.as_deref()).map(ProjectPredicate::DistrictEq),
    );
    let conds = Conditions::projects(&preds);
    let sql = format!(
      "SELECT CAST(strftime('%Y', p.tender_date) AS INTEGER) AS y,
              CAST(strftime('%m', p.tender_date) AS INTEGER) AS m,
              COUNT(*)
       FROM {PROJECT_FROM}
       {}
       GROUP BY y, m
       ORDER BY y, m",
      conds.where_clause()
    );
    let params = conds.into_params();

    let rows: Vec<(i32, u32, i64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(params_from_iter(params.iter()), |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(
      rows
        .into_iter()
        .map(|(year, month, n)| MonthlyCount { year, month, count: to_count(n) })
        .collect(),
    )
  }

  // ── Ingestion writes ──────────────────────────────────────────────────────

  async fn get_or_create_agency(&self, name: String) -> Result<Agency> {
    let agency = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let existing = tx
          .query_row(
            "SELECT id, name, contact, district, agency_type
             FROM agencies WHERE name = ?1
             ORDER BY id LIMIT 1",
            rusqlite::params![name],
            |row| {
              Ok(Agency {
                id:          row.get(0)?,
                name:        row.get(1)?,
                contact:     row.get(2)?,
                district:    row.get(3)?,
                agency_type: row.get(4)?,
              })
            },
          )
          .optional()?;

        let agency = match existing {
          Some(a) => a,
          None => {
            tx.execute(
              "INSERT INTO agencies (name) VALUES (?1)",
              rusqlite::params![name],
            )?;
            Agency {
              id:          tx.last_insert_rowid(),
              name,
              contact:     None,
              district:    None,
              agency_type: None,
            }
          }
        };
        tx.commit()?;
        Ok(agency)
      })
      .await?;
    Ok(agency)
  }

  async fn insert_project(&self, input: NewProject) -> Result<Project> {
    input.validate()?;

    let id_str      = encode_uuid(Uuid::new_v4());
    let award_start = input.award_start.map(encode_naive);
    let award_end   = input.award_end.map(encode_naive);
    let tender_date = input.tender_date.map(encode_naive);
    let select_sql  =
      format!("SELECT {PROJECT_COLUMNS} FROM {PROJECT_FROM} WHERE p.id = ?1");

    let raw: RawProject = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO projects (
             id, ocid, title, agency_id, sector, district, ward,
             planned_budget_amount, planned_budget_currency,
             award_start, award_end, tender_date, source_ref
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
          rusqlite::params![
            id_str,
            input.ocid,
            input.title,
            input.agency_id,
            input.sector,
            input.district,
            input.ward,
            input.planned_budget_amount,
            input.planned_budget_currency,
            award_start,
            award_end,
            tender_date,
            input.source_ref,
          ],
        )?;
        let raw =
          tx.query_row(&select_sql, rusqlite::params![id_str], RawProject::read)?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.into_project()
  }
}
