//! Handlers for `/stats/*` endpoints. Each takes an optional `district`.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State, rejection::QueryRejection},
};
use ktm_core::{
  stats::{MonthlyCount, SectorCount, SummaryStats},
  store::TransparencyStore,
};
use serde::Deserialize;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct DistrictParams {
  pub district: Option<String>,
}

/// `GET /stats/summary[?district=...]`
pub async fn summary<S>(
  State(store): State<Arc<S>>,
  params: Result<Query<DistrictParams>, QueryRejection>,
) -> Result<Json<SummaryStats>, ApiError>
where
  S: TransparencyStore,
{
  let Query(params) = params?;
  let stats = store
    .summary_stats(params.district)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(stats))
}

/// `GET /stats/sector[?district=...]`
pub async fn sector<S>(
  State(store): State<Arc<S>>,
  params: Result<Query<DistrictParams>, QueryRejection>,
) -> Result<Json<Vec<SectorCount>>, ApiError>
where
  S: TransparencyStore,
{
  let Query(params) = params?;
  let sectors = store
    .sector_breakdown(params.district)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(sectors))
}

/// `GET /stats/timeline[?district=...]`
pub async fn timeline<S>(
  State(store): State<Arc<S>>,
  params: Result<Query<DistrictParams>, QueryRejection>,
) -> Result<Json<Vec<MonthlyCount>>, ApiError>
where
  S: TransparencyStore,
{
  let Query(params) = params?;
  let months = store
    .monthly_timeline(params.district)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(months))
}
