//! HTTP server assembly for the Kathmandu transparency API.
//!
//! Wraps [`ktm_api::api_router`] with the cross-origin allow-list and request
//! tracing, and loads the server configuration.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::{
  Router,
  http::{HeaderValue, Method, header},
};
use ktm_core::store::TransparencyStore;
use serde::Deserialize;
use thiserror::Error;
use tower_http::{
  cors::{AllowOrigin, CorsLayer},
  trace::TraceLayer,
};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and `KTM_*`
/// environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:         String,
  pub port:         u16,
  pub store_path:   PathBuf,
  /// Origins allowed to call the API from a browser.
  pub cors_origins: Vec<String>,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("configuration error: {0}")]
  Config(#[from] config::ConfigError),

  #[error("invalid CORS origin {0:?}")]
  InvalidOrigin(String),
}

impl ServerConfig {
  /// Layer defaults, the optional TOML file at `path`, and the environment.
  ///
  /// `KTM_CORS_ORIGINS` is a comma-separated list.
  pub fn load(path: &Path) -> Result<Self, Error> {
    let settings = config::Config::builder()
      .set_default("host", "127.0.0.1")?
      .set_default("port", 8000)?
      .set_default("store_path", "ktm.sqlite3")?
      .set_default("cors_origins", vec!["http://localhost:19006"])?
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("KTM")
          .try_parsing(true)
          .list_separator(",")
          .with_list_parse_key("cors_origins"),
      )
      .build()?;
    Ok(settings.try_deserialize()?)
  }

  /// `store_path` with a leading `~` expanded to the user's home directory.
  pub fn resolved_store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── CORS ─────────────────────────────────────────────────────────────────────

/// A CORS layer that admits only `origins` (surrounding whitespace ignored).
pub fn cors_layer(origins: &[String]) -> Result<CorsLayer, Error> {
  let origins = origins
    .iter()
    .map(|o| o.trim())
    .filter(|o| !o.is_empty())
    .map(|o| {
      HeaderValue::from_str(o).map_err(|_| Error::InvalidOrigin(o.to_owned()))
    })
    .collect::<Result<Vec<_>, _>>()?;

  Ok(
    CorsLayer::new()
      .allow_origin(AllowOrigin::list(origins))
      .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
      .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
      .allow_credentials(true),
  )
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The complete application: API routes, CORS, and request tracing.
pub fn app<S>(store: Arc<S>, config: &ServerConfig) -> Result<Router, Error>
where
  S: TransparencyStore + 'static,
{
  Ok(
    ktm_api::api_router(store)
      .layer(cors_layer(&config.cors_origins)?)
      .layer(TraceLayer::new_for_http()),
  )
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use ktm_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  fn config(origins: &[&str]) -> ServerConfig {
    ServerConfig {
      host:         "127.0.0.1".into(),
      port:         8000,
      store_path:   PathBuf::from(":memory:"),
      cors_origins: origins.iter().map(|o| o.to_string()).collect(),
    }
  }

  async fn health_from(origin: &str) -> axum::response::Response {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let app = app(store, &config(&["http://localhost:19006", " https://ktm.example "]))
      .unwrap();
    let req = Request::builder()
      .uri("/health")
      .header(header::ORIGIN, origin)
      .body(Body::empty())
      .unwrap();
    app.oneshot(req).await.unwrap()
  }

  #[tokio::test]
  async fn allowed_origin_gets_cors_headers() {
    let resp = health_from("https://ktm.example").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
      resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
      "https://ktm.example"
    );
  }

  #[tokio::test]
  async fn other_origins_get_no_cors_headers() {
    let resp = health_from("https://evil.example").await;
    assert!(resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
  }

  #[test]
  fn invalid_origin_is_rejected() {
    let err = cors_layer(&["http://bad\norigin".to_owned()]).unwrap_err();
    assert!(matches!(err, Error::InvalidOrigin(_)));
  }

  #[test]
  fn defaults_apply_without_config_file() {
    let cfg = ServerConfig::load(Path::new("does-not-exist.toml")).unwrap();
    assert_eq!(cfg.port, 8000);
    assert_eq!(cfg.cors_origins, ["http://localhost:19006"]);
  }

  #[test]
  fn tilde_expands_to_home() {
    if let Ok(home) = std::env::var("HOME") {
      assert_eq!(
        expand_tilde(Path::new("~/data/ktm.sqlite3")),
        PathBuf::from(home).join("data/ktm.sqlite3")
      );
    }
    assert_eq!(expand_tilde(Path::new("/abs")), PathBuf::from("/abs"));
  }
}
