//! Handlers for `/organisations` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`/`POST` | `/organisations` | [`OrganisationQuery`] params / [`OrganisationForm`] body |
//! | `GET`/`PUT`/`DELETE` | `/organisations/:id` | |
//! | `GET`  | `/organisations/:id/form` | Form view |
//! | `POST` | `/organisations/:id/merge` | Body: `{"canonical":"<uuid>"}` |
//! | `GET`  | `/organisations/:id/records` | Optional `?kind=` |
//! | `GET`/`POST` | `/organisations/:id/stories` | Body: `{"story_id":"<uuid>"}` |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use muster_core::{
  form::OrganisationForm,
  merge::{MergeKind, MergeReport},
  organisation::Organisation,
  permission::Model,
  record::Record,
  store::{MusterStore, OrganisationQuery, Owner},
  story::Story,
};
use uuid::Uuid;

use crate::{
  ApiState, CurrentActor,
  error::ApiError,
  grant_creator,
  people::{LinkStoryBody, MergeBody, RecordParams},
};

pub(crate) async fn fetch<S: MusterStore>(
  store: &S,
  id: Uuid,
) -> Result<Organisation, ApiError> {
  store
    .get_organisation(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("organisation {id} not found")))
}

/// `GET /organisations[?name=..][&limit=..][&offset=..]`
pub async fn list<S: MusterStore>(
  State(state): State<ApiState<S>>,
  Query(query): Query<OrganisationQuery>,
) -> Result<Json<Vec<Organisation>>, ApiError> {
  let organisations = state
    .store
    .list_organisations(&query)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(organisations))
}

/// `POST /organisations`
pub async fn create<S: MusterStore>(
  State(state): State<ApiState<S>>,
  actor: CurrentActor,
  Json(form): Json<OrganisationForm>,
) -> Result<impl IntoResponse, ApiError> {
  let input = form.clean()?;
  let organisation = state
    .store
    .add_organisation(input, actor.username())
    .await
    .map_err(ApiError::store)?;
  grant_creator(
    &*state.store,
    &actor,
    Model::Organisation,
    organisation.organisation_id,
  )
  .await?;
  Ok((StatusCode::CREATED, Json(organisation)))
}

/// `GET /organisations/:id`
pub async fn get_one<S: MusterStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Organisation>, ApiError> {
  Ok(Json(fetch(&*state.store, id).await?))
}

/// `GET /organisations/:id/form`
pub async fn form<S: MusterStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<OrganisationForm>, ApiError> {
  let organisation = fetch(&*state.store, id).await?;
  Ok(Json(OrganisationForm::from(&organisation)))
}

/// `PUT /organisations/:id`
pub async fn update<S: MusterStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(form): Json<OrganisationForm>,
) -> Result<Json<Organisation>, ApiError> {
  let input = form.clean()?;
  let organisation = state
    .store
    .update_organisation(id, input)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(organisation))
}

/// `DELETE /organisations/:id`
pub async fn remove<S: MusterStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  state
    .store
    .delete_organisation(id)
    .await
    .map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}

/// `POST /organisations/:id/merge`
pub async fn merge<S: MusterStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<MergeBody>,
) -> Result<Json<MergeReport>, ApiError> {
  let report = state
    .store
    .merge(MergeKind::Organisation, id, body.canonical)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(report))
}

/// `GET /organisations/:id/records[?kind=..]`
pub async fn records<S: MusterStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Query(params): Query<RecordParams>,
) -> Result<Json<Vec<Record>>, ApiError> {
  fetch(&*state.store, id).await?;
  let records = state
    .store
    .list_records(Owner::organisation(id), params.kind)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(records))
}

/// `GET /organisations/:id/stories`
pub async fn stories<S: MusterStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Story>>, ApiError> {
  fetch(&*state.store, id).await?;
  let stories = state
    .store
    .stories_for(Owner::organisation(id))
    .await
    .map_err(ApiError::store)?;
  Ok(Json(stories))
}

/// `POST /organisations/:id/stories`
pub async fn link_story<S: MusterStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<LinkStoryBody>,
) -> Result<StatusCode, ApiError> {
  state
    .store
    .link_story(Owner::organisation(id), body.story_id)
    .await
    .map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}
