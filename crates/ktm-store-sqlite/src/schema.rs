//! SQL schema for the transparency store.
//!
//! Applied explicitly through [`SqliteStore::migrate`](crate::SqliteStore::migrate)
//! and gated on `PRAGMA user_version`; opening a store never changes its
//! schema.

/// The schema version this crate reads and writes.
pub const SCHEMA_VERSION: i64 = 1;

/// Version 1 DDL, applied to a database whose `user_version` is 0.
pub const SCHEMA_V1: &str = "
CREATE TABLE IF NOT EXISTS agencies (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    contact     TEXT,
    district    TEXT,
    agency_type TEXT
);

-- Written only by ingestion.
CREATE TABLE IF NOT EXISTS projects (
    id                      TEXT PRIMARY KEY,
    ocid                    TEXT,
    title                   TEXT NOT NULL CHECK (length(trim(title)) > 0),
    agency_id               INTEGER REFERENCES agencies(id),
    sector                  TEXT,
    district                TEXT,
    ward                    TEXT,
    planned_budget_amount   REAL,
    planned_budget_currency TEXT,
    award_start             TEXT,   -- naive ISO 8601, no timezone
    award_end               TEXT,
    tender_date             TEXT,
    source_ref              TEXT
);

-- Reports are immutable; no UPDATE or DELETE is ever issued.
CREATE TABLE IF NOT EXISTS reports (
    id            TEXT PRIMARY KEY,
    project_id    TEXT REFERENCES projects(id),
    created_at    TEXT NOT NULL,   -- RFC 3339 UTC, microseconds
    reporter_hash TEXT,
    channel       TEXT NOT NULL DEFAULT 'app',
    status_flag   TEXT,
    rating        INTEGER,
    text          TEXT,
    photo_urls    TEXT,            -- JSON array or NULL
    lat           REAL,
    lng           REAL,
    ward          TEXT,
    district      TEXT
);

CREATE INDEX IF NOT EXISTS agencies_name_idx       ON agencies(name);
CREATE INDEX IF NOT EXISTS projects_agency_idx     ON projects(agency_id);
CREATE INDEX IF NOT EXISTS projects_district_idx   ON projects(district);
CREATE INDEX IF NOT EXISTS projects_tender_idx     ON projects(tender_date);
CREATE INDEX IF NOT EXISTS reports_district_idx    ON reports(district);
CREATE INDEX IF NOT EXISTS reports_project_idx     ON reports(project_id);
CREATE INDEX IF NOT EXISTS reports_created_idx     ON reports(created_at);

PRAGMA user_version = 1;
";
