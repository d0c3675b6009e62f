//! Handlers for `/projects` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/projects` | Optional `q`, `district`, `limit` (50), `offset` (0) |
//! | `GET`  | `/projects/:id` | 404 if not found |

use std::sync::Arc;

use axum::{
  Json,
  extract::{
    Path, Query, State,
    rejection::{PathRejection, QueryRejection},
  },
};
use ktm_core::{
  filter::Page,
  project::Project,
  store::{ProjectQuery, TransparencyStore},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  /// Substring of the project title or agency name, any case.
  pub q:        Option<String>,
  pub district: Option<String>,
  pub limit:    Option<u32>,
  pub offset:   Option<u32>,
}

/// `GET /projects[?q=...][&district=...][&limit=...][&offset=...]`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<Project>>, ApiError>
where
  S: TransparencyStore,
{
  let Query(params) = params?;
  let query = ProjectQuery {
    text:     params.q,
    district: params.district,
    page:     Page::new(params.limit, params.offset),
  };

  let projects = store
    .list_projects(&query)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(projects))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /projects/:id`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Project>, ApiError>
where
  S: TransparencyStore,
{
  let Path(id) = id?;
  let project = store
    .get_project(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("project {id} not found")))?;
  Ok(Json(project))
}
