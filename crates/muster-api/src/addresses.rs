//! Handlers for `/addresses`, the street addresses `person_address` records
//! point at.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use muster_core::{
  address::{Address, NewAddress},
  form::FieldErrors,
  store::MusterStore,
};
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

/// `POST /addresses`: at least one part must be given.
pub async fn create<S: MusterStore>(
  State(state): State<ApiState<S>>,
  Json(body): Json<NewAddress>,
) -> Result<impl IntoResponse, ApiError> {
  let given = [
    &body.building_name,
    &body.street_number,
    &body.street_name,
    &body.place_name,
  ]
  .into_iter()
  .flatten()
  .any(|s| !s.trim().is_empty());
  if !given {
    let mut errors = FieldErrors::default();
    errors.add("street_name", "Enter at least one part of the address.");
    return Err(errors.into());
  }

  let address = state.store.add_address(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(address)))
}

/// `GET /addresses/:id`
pub async fn get_one<S: MusterStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Address>, ApiError> {
  let address = state
    .store
    .get_address(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("address {id} not found")))?;
  Ok(Json(address))
}
