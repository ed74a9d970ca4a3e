//! Handlers for the linked-data prefix table.

use axum::{
  Json,
  extract::{Path, State},
};
use muster_core::{
  form::{FieldErrors, REQUIRED},
  namespace::Namespace,
  store::MusterStore,
};
use serde::Deserialize;

use crate::{ApiState, error::ApiError};

/// `GET /namespaces`
pub async fn list<S: MusterStore>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Vec<Namespace>>, ApiError> {
  let namespaces = state.store.list_namespaces().await.map_err(ApiError::store)?;
  Ok(Json(namespaces))
}

#[derive(Debug, Deserialize)]
pub struct NamespaceBody {
  #[serde(default)]
  pub uri: String,
}

fn valid_prefix(prefix: &str) -> bool {
  let mut chars = prefix.chars();
  chars.next().is_some_and(|c| c.is_ascii_alphabetic())
    && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// `PUT /namespaces/:prefix`, body: `{"uri":"http://..."}`
pub async fn put_one<S: MusterStore>(
  State(state): State<ApiState<S>>,
  Path(prefix): Path<String>,
  Json(body): Json<NamespaceBody>,
) -> Result<Json<Namespace>, ApiError> {
  let mut errors = FieldErrors::default();
  if !valid_prefix(&prefix) {
    errors.add("prefix", "Enter a valid prefix.");
  }
  let uri = body.uri.trim();
  if uri.is_empty() {
    errors.add("uri", REQUIRED);
  } else if !muster_rdf::is_absolute_iri(uri) {
    errors.add("uri", "Enter a valid absolute IRI.");
  }
  if !errors.is_empty() {
    return Err(errors.into());
  }

  let namespace = state
    .store
    .put_namespace(Namespace::new(prefix, uri))
    .await
    .map_err(ApiError::store)?;
  tracing::info!(prefix = %namespace.prefix, uri = %namespace.uri, "namespace updated");
  Ok(Json(namespace))
}
