//! HTTP server wiring for the Popolo entity store.
//!
//! Mounts the [`popit_api`] router behind Basic auth for writes and request
//! tracing, backed by any [`EntityStore`].

pub mod auth;
pub mod error;

pub use error::Error;

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::{Router, middleware::from_fn_with_state};
use popit_api::{ApiState, api_router};
use popit_core::{language::LanguageCode, store::EntityStore};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use auth::{AuthConfig, require_auth_for_writes};

// ─── Configuration ───────────────────────────────────────────────────────────

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("popit.db") }

/// Runtime server configuration, deserialised from `config.toml` and
/// `POPIT_*` environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:               String,
  #[serde(default = "default_port")]
  pub port:               u16,
  #[serde(default = "default_store_path")]
  pub store_path:         PathBuf,
  /// Language used when a request names none, and the read fallback.
  #[serde(default)]
  pub fallback_language:  LanguageCode,
  pub auth_username:      String,
  pub auth_password_hash: String,
}

impl ServerConfig {
  /// Read `path`, if it exists, with `POPIT_*` environment variables layered
  /// on top.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("POPIT"))
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn auth(&self) -> AuthConfig {
    AuthConfig {
      username:      self.auth_username.clone(),
      password_hash: self.auth_password_hash.clone(),
    }
  }
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state the server is built from.
pub struct AppState<S> {
  pub store:  Arc<S>,
  pub config: Arc<ServerConfig>,
  pub auth:   Arc<AuthConfig>,
}

impl<S> AppState<S> {
  pub fn new(store: S, config: ServerConfig) -> Self {
    let auth = config.auth();
    Self {
      store:  Arc::new(store),
      config: Arc::new(config),
      auth:   Arc::new(auth),
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the full application router.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: EntityStore + 'static,
{
  let api = ApiState::new(
    Arc::clone(&state.store),
    state.config.fallback_language.clone(),
  );
  api_router(api)
    .layer(from_fn_with_state(Arc::clone(&state.auth), require_auth_for_writes))
    .layer(TraceLayer::new_for_http())
}
