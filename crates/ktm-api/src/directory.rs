//! Lookup lists for filters: `/districts`, `/agencies`, plus `/health`.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State, rejection::QueryRejection},
};
use ktm_core::{agency::AgencySummary, store::TransparencyStore};
use serde_json::{Value, json};

use crate::{error::ApiError, stats::DistrictParams};

/// `GET /districts`
pub async fn districts<S>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<String>>, ApiError>
where
  S: TransparencyStore,
{
  let districts = store.list_districts().await.map_err(ApiError::from_store)?;
  Ok(Json(districts))
}

/// `GET /agencies[?district=...]`
pub async fn agencies<S>(
  State(store): State<Arc<S>>,
  params: Result<Query<DistrictParams>, QueryRejection>,
) -> Result<Json<Vec<AgencySummary>>, ApiError>
where
  S: TransparencyStore,
{
  let Query(params) = params?;
  let agencies = store
    .list_agencies(params.district)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(agencies))
}

/// `GET /health`
pub async fn health() -> Json<Value> { Json(json!({ "status": "ok" })) }
