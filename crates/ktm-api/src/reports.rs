//! Handlers for `/reports` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/reports` | Optional `district`, `project_id`, `limit` (50), `offset` (0) |
//! | `POST` | `/reports` | Body: [`NewReport`]; returns 201 + stored report |

use std::sync::Arc;

use axum::{
  Json,
  extract::{
    Query, State,
    rejection::{JsonRejection, QueryRejection},
  },
  http::StatusCode,
  response::IntoResponse,
};
use ktm_core::{
  filter::Page,
  report::{NewReport, Report},
  store::{ReportQuery, TransparencyStore},
};
use serde::{Deserialize, Deserializer};
use uuid::Uuid;

use crate::error::ApiError;

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub district:   Option<String>,
  /// An empty value means "any project".
  #[serde(default, deserialize_with = "empty_as_none")]
  pub project_id: Option<Uuid>,
  pub limit:      Option<u32>,
  pub offset:     Option<u32>,
}

fn empty_as_none<'de, D>(de: D) -> Result<Option<Uuid>, D::Error>
where
  D: Deserializer<'de>,
{
  let raw = Option::<String>::deserialize(de)?;
  match raw.as_deref().map(str::trim) {
    None | Some("") => Ok(None),
    Some(s) => Uuid::parse_str(s)
      .map(Some)
      .map_err(serde::de::Error::custom),
  }
}

/// `GET /reports[?district=...][&project_id=...][&limit=...][&offset=...]`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<Report>>, ApiError>
where
  S: TransparencyStore,
{
  let Query(params) = params?;
  let query = ReportQuery {
    district:   params.district,
    project_id: params.project_id,
    page:       Page::new(params.limit, params.offset),
  };

  let reports = store
    .list_reports(&query)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(reports))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /reports` returns 201 + the stored [`Report`].
pub async fn create<S>(
  State(store): State<Arc<S>>,
  body: Result<Json<NewReport>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: TransparencyStore,
{
  let Json(body) = body?;
  let report = store
    .create_report(body)
    .await
    .map_err(ApiError::from_store)?;
  tracing::info!(report_id = %report.id, project_id = ?report.project_id, "report created");
  Ok((StatusCode::CREATED, Json(report)))
}
