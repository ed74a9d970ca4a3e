//! HTTP server for Muster.
//!
//! Mounts the JSON API under `/api` behind HTTP Basic authentication and a
//! per-route permission check, with request tracing.

pub mod auth;
pub mod error;
pub mod permissions;

pub use error::Error;

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::{Router, middleware};
use muster_core::store::MusterStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 8080 }

/// Runtime server configuration, deserialised from `config.toml` and
/// `MUSTER_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  /// Public origin that linked-data IRIs are minted under.
  pub base_url:   String,
  pub store_path: PathBuf,
  #[serde(default)]
  pub users:      Vec<UserConfig>,
}

/// A user allowed to sign in, with the permissions they hold globally.
#[derive(Debug, Deserialize, Clone)]
pub struct UserConfig {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
  #[serde(default)]
  pub permissions:   Vec<String>,
}

impl UserConfig {
  pub fn has(&self, permission: &str) -> bool {
    self.permissions.iter().any(|p| p == permission)
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state for the permission middleware.
pub struct AppState<S> {
  pub store:  Arc<S>,
  pub config: Arc<ServerConfig>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), config: self.config.clone() }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: MusterStore + 'static,
{
  let api = muster_api::api_router(state.store.clone(), &state.config.base_url)
    .route_layer(middleware::from_fn_with_state(
      state.clone(),
      auth::authorize::<S>,
    ));

  Router::new()
    .nest("/api", api)
    .layer(TraceLayer::new_for_http())
}

// ─── Integration tests ────────────────────────────────────────────────────────
