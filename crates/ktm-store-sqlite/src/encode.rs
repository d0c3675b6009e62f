//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! `created_at` is stored as RFC 3339 UTC with a fixed microsecond precision
//! so that text order equals time order. Project dates are naive and stored
//! as ISO 8601 without an offset, also at microsecond precision. UUIDs are stored as hyphenated lowercase
//! strings; `photo_urls` as a JSON array.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use ktm_core::{agency::Agency, project::Project, report::Report};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc>
// ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDateTime
// ────────────────────────────────────────────────────────────

const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

pub fn encode_naive(dt: NaiveDateTime) -> String {
  dt.format(NAIVE_FORMAT).to_string()
}

pub fn decode_naive(s: &str) -> Result<NaiveDateTime> {
  NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Photo URLs ──────────────────────────────────────────────────────────────

pub fn encode_urls(urls: &[String]) -> Result<String> {
  Ok(serde_json::to_string(urls)?)
}

pub fn decode_urls(s: &str) -> Result<Vec<String>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawProject::read`]. Expects `projects p` left-joined
/// with `agencies a`.
pub const PROJECT_COLUMNS: &str = "
  p.id, p.ocid, p.title, p.sector, p.district, p.ward,
  p.planned_budget_amount, p.planned_budget_currency,
  p.award_start, p.award_end, p.tender_date, p.source_ref,
  p.agency_id, a.name, a.contact, a.district, a.agency_type";

/// Raw values read from a `projects` row joined with its agency.
pub struct RawProject {
  pub id:                      String,
  pub ocid:                    Option<String>,
  pub title:                   String,
  pub sector:                  Option<String>,
  pub district:                Option<String>,
  pub ward:                    Option<String>,
  pub planned_budget_amount:   Option<f64>,
  pub planned_budget_currency: Option<String>,
  pub award_start:             Option<String>,
  pub award_end:               Option<String>,
  pub tender_date:             Option<String>,
  pub source_ref:              Option<String>,
  pub agency_id:               Option<i64>,
  pub agency_name:             Option<String>,
  pub agency_contact:          Option<String>,
  pub agency_district:         Option<String>,
  pub agency_type:             Option<String>,
}

impl RawProject {
  pub fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                      row.get(0)?,
      ocid:                    row.get(1)?,
      title:                   row.get(2)?,
      sector:                  row.get(3)?,
      district:                row.get(4)?,
      ward:                    row.get(5)?,
      planned_budget_amount:   row.get(6)?,
      planned_budget_currency: row.get(7)?,
      award_start:             row.get(8)?,
      award_end:               row.get(9)?,
      tender_date:             row.get(10)?,
      source_ref:              row.get(11)?,
      agency_id:               row.get(12)?,
      agency_name:             row.get(13)?,
      agency_contact:          row.get(14)?,
      agency_district:         row.get(15)?,
      agency_type:             row.get(16)?,
    })
  }

  pub fn into_project(self) -> Result<Project> {
    let decode_opt =
      |s: Option<String>| s.as_deref().map(decode_naive).transpose();

    let agency = match (self.agency_id, self.agency_name) {
      (Some(id), Some(name)) => Some(Agency {
        id,
        name,
        contact: self.agency_contact,
        district: self.agency_district,
        agency_type: self.agency_type,
      }),
      _ => None,
    };

    Ok(Project {
      id: decode_uuid(&self.id)?,
      ocid: self.ocid,
      title: self.title,
      sector: self.sector,
      district: self.district,
      ward: self.ward,
      planned_budget_amount: self.planned_budget_amount,
      planned_budget_currency: self.planned_budget_currency,
      award_start: decode_opt(self.award_start)?,
      award_end: decode_opt(self.award_end)?,
      tender_date: decode_opt(self.tender_date)?,
      source_ref: self.source_ref,
      agency_id: self.agency_id,
      agency,
    })
  }
}

/// Column list matching [`RawReport::read`].
pub const REPORT_COLUMNS: &str = "
  id, project_id, created_at, status_flag, rating, text, photo_urls,
  lat, lng, ward, district, channel, reporter_hash";

/// Raw values read directly from a `reports` row.
pub struct RawReport {
  pub id:            String,
  pub project_id:    Option<String>,
  pub created_at:    String,
  pub status_flag:   Option<String>,
  pub rating:        Option<i64>,
  pub text:          Option<String>,
  pub photo_urls:    Option<String>,
  pub lat:           Option<f64>,
  pub lng:           Option<f64>,
  pub ward:          Option<String>,
  pub district:      Option<String>,
  pub channel:       String,
  pub reporter_hash: Option<String>,
}

impl RawReport {
  pub fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      project_id:    row.get(1)?,
      created_at:    row.get(2)?,
      status_flag:   row.get(3)?,
      rating:        row.get(4)?,
      text:          row.get(5)?,
      photo_urls:    row.get(6)?,
      lat:           row.get(7)?,
      lng:           row.get(8)?,
      ward:          row.get(9)?,
      district:      row.get(10)?,
      channel:       row.get(11)?,
      reporter_hash: row.get(12)?,
    })
  }

  pub fn into_report(self) -> Result<Report> {
    Ok(Report {
      id:            decode_uuid(&self.id)?,
      project_id:    self.project_id.as_deref().map(decode_uuid).transpose()?,
      created_at:    decode_dt(&self.created_at)?,
      status_flag:   self.status_flag,
      rating:        self.rating,
      text:          self.text,
      photo_urls:    self.photo_urls.as_deref().map(decode_urls).transpose()?,
      lat:           self.lat,
      lng:           self.lng,
      ward:          self.ward,
      district:      self.district,
      channel:       self.channel,
      reporter_hash: self.reporter_hash,
    })
  }
}
