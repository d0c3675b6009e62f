//! JSON REST API for the Kathmandu transparency service.
//!
//! Exposes an axum [`Router`] backed by any
//! [`ktm_core::store::TransparencyStore`]. CORS, TLS, and transport concerns
//! are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = ktm_api::api_router(Arc::new(store)).layer(cors);
//! ```

pub mod directory;
pub mod error;
pub mod projects;
pub mod reports;
pub mod stats;

use std::sync::Arc;

use axum::{Router, routing::get};
use ktm_core::store::TransparencyStore;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: TransparencyStore + 'static,
{
  Router::new()
    .route("/health", get(directory::health))
    // Lookups
    .route("/districts", get(directory::districts::<S>))
    .route("/agencies", get(directory::agencies::<S>))
    // Projects
    .route("/projects", get(projects::list::<S>))
    .route("/projects/{id}", get(projects::get_one::<S>))
    // Reports
    .route("/reports", get(reports::list::<S>).post(reports::create::<S>))
    // Aggregations
    .route("/stats/summary", get(stats::summary::<S>))
    .route("/stats/sector", get(stats::sector::<S>))
    .route("/stats/timeline", get(stats::timeline::<S>))
    .with_state(store)
}

// ─── Router tests ─────────────────────────────────────────────────────────────
