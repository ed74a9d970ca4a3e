//! Handlers for `/records/:kind` endpoints.
//!
//! The kind segment is the snake_case record kind, e.g. `service_number`.
//! Bodies are [`RecordForm`]s: link columns plus the kind's value fields,
//! dates as raw `y-m-d` strings.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use muster_core::{
  form::RecordForm,
  permission::Model,
  record::{Record, RecordKind},
  store::MusterStore,
};
use uuid::Uuid;

use crate::{ApiState, CurrentActor, error::ApiError, grant_creator};

pub(crate) fn parse_kind(s: &str) -> Result<RecordKind, ApiError> {
  RecordKind::parse(s).map_err(|_| ApiError::NotFound(format!("no record kind {s:?}")))
}

pub(crate) async fn fetch<S: MusterStore>(
  store: &S,
  kind: RecordKind,
  id: Uuid,
) -> Result<Record, ApiError> {
  store
    .get_record(kind, id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("{kind} record {id} not found")))
}

/// `POST /records/:kind`
pub async fn create<S: MusterStore>(
  State(state): State<ApiState<S>>,
  actor: CurrentActor,
  Path(kind_name): Path<String>,
  Json(form): Json<RecordForm>,
) -> Result<impl IntoResponse, ApiError> {
  let kind = parse_kind(&kind_name)?;
  let input = form.clean(kind)?;
  let record = state
    .store
    .add_record(input, actor.username())
    .await
    .map_err(ApiError::store)?;
  grant_creator(&*state.store, &actor, Model::Record(kind), record.record_id).await?;
  Ok((StatusCode::CREATED, Json(record)))
}

/// `GET /records/:kind/:id`
pub async fn get_one<S: MusterStore>(
  State(state): State<ApiState<S>>,
  Path((kind_name, id)): Path<(String, Uuid)>,
) -> Result<Json<Record>, ApiError> {
  Ok(Json(fetch(&*state.store, parse_kind(&kind_name)?, id).await?))
}

/// `GET /records/:kind/:id/form`
pub async fn form<S: MusterStore>(
  State(state): State<ApiState<S>>,
  Path((kind_name, id)): Path<(String, Uuid)>,
) -> Result<Json<RecordForm>, ApiError> {
  let record = fetch(&*state.store, parse_kind(&kind_name)?, id).await?;
  let form = RecordForm::from_record(&record).map_err(ApiError::store)?;
  Ok(Json(form))
}

/// `PUT /records/:kind/:id`
pub async fn update<S: MusterStore>(
  State(state): State<ApiState<S>>,
  Path((kind_name, id)): Path<(String, Uuid)>,
  Json(form): Json<RecordForm>,
) -> Result<Json<Record>, ApiError> {
  let kind = parse_kind(&kind_name)?;
  let input = form.clean(kind)?;
  let record = state
    .store
    .update_record(kind, id, input)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(record))
}

/// `DELETE /records/:kind/:id`
pub async fn remove<S: MusterStore>(
  State(state): State<ApiState<S>>,
  Path((kind_name, id)): Path<(String, Uuid)>,
) -> Result<StatusCode, ApiError> {
  state
    .store
    .delete_record(parse_kind(&kind_name)?, id)
    .await
    .map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}
