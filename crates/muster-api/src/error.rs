//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use muster_core::{
  error::{Classify, ErrorClass},
  form::FieldErrors,
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  /// Form validation failed; messages are reported per field.
  #[error("invalid input: {0}")]
  Invalid(FieldErrors),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("linked data error: {0}")]
  Rdf(#[from] muster_rdf::Error),

  #[error("store error: {source}")]
  Store {
    class:  ErrorClass,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },
}

impl ApiError {
  /// Wrap a store error, keeping its classification for the status code.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Classify + Send + Sync + 'static,
  {
    Self::Store { class: e.class(), source: Box::new(e) }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      Self::NotFound(_) => StatusCode::NOT_FOUND,
      Self::BadRequest(_) | Self::Invalid(_) => StatusCode::BAD_REQUEST,
      Self::Conflict(_) => StatusCode::CONFLICT,
      Self::Rdf(muster_rdf::Error::UnknownFormat(_)) => StatusCode::BAD_REQUEST,
      Self::Rdf(_) => StatusCode::INTERNAL_SERVER_ERROR,
      Self::Store { class, .. } => match class {
        ErrorClass::NotFound => StatusCode::NOT_FOUND,
        ErrorClass::Invalid => StatusCode::BAD_REQUEST,
        ErrorClass::Conflict => StatusCode::CONFLICT,
        ErrorClass::Internal => StatusCode::INTERNAL_SERVER_ERROR,
      },
    }
  }
}

impl From<FieldErrors> for ApiError {
  fn from(errors: FieldErrors) -> Self { Self::Invalid(errors) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }
    let body = match &self {
      Self::Invalid(fields) => json!({ "error": "invalid input", "fields": fields }),
      Self::Store { source, .. } => json!({ "error": source.to_string() }),
      other => json!({ "error": other.to_string() }),
    };
    (status, Json(body)).into_response()
  }
}
