//! Handlers for `/people` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/people` | [`PersonQuery`] params; no merged or pending people unless asked for |
//! | `POST` | `/people` | Body: [`PersonForm`]; optional `?status=`, default `non_service` |
//! | `POST` | `/people/suggest` | Body: [`PersonForm`]; always `pending` |
//! | `GET`  | `/people/suggested` | Pending people, for approvers |
//! | `GET`/`PUT`/`DELETE` | `/people/:id` | |
//! | `GET`  | `/people/:id/form` | Form view with raw date strings |
//! | `POST` | `/people/:id/approve` | Body: `{"status":"confirmed"}` |
//! | `POST` | `/people/:id/merge` | Body: `{"canonical":"<uuid>"}` |
//! | `GET`  | `/people/:id/records` | Optional `?kind=` |
//! | `GET`/`POST` | `/people/:id/stories` | Body: `{"story_id":"<uuid>"}` |
//! | `GET`/`POST` | `/people/:id/images` | Body: `{"image_id":"<uuid>"}` |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use muster_core::{
  form::PersonForm,
  merge::{MergeKind, MergeReport},
  permission::Model,
  person::{Person, PersonStatus},
  record::{Record, RecordKind},
  store::{MusterStore, Owner, PersonQuery},
  story::Story,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiState, CurrentActor, error::ApiError, grant_creator};

pub(crate) async fn fetch<S: MusterStore>(store: &S, id: Uuid) -> Result<Person, ApiError> {
  store
    .get_person(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("person {id} not found")))
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /people[?status=..][&family_name=..][&limit=..][&offset=..]`
pub async fn list<S: MusterStore>(
  State(state): State<ApiState<S>>,
  Query(query): Query<PersonQuery>,
) -> Result<Json<Vec<Person>>, ApiError> {
  let people = state.store.list_people(&query).await.map_err(ApiError::store)?;
  Ok(Json(people))
}

#[derive(Debug, Default, Deserialize)]
pub struct Paging {
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

/// `GET /people/suggested`: the review queue.
pub async fn suggested<S: MusterStore>(
  State(state): State<ApiState<S>>,
  Query(paging): Query<Paging>,
) -> Result<Json<Vec<Person>>, ApiError> {
  let query = PersonQuery {
    status: Some(PersonStatus::Pending),
    limit: paging.limit,
    offset: paging.offset,
    ..PersonQuery::default()
  };
  let people = state.store.list_people(&query).await.map_err(ApiError::store)?;
  Ok(Json(people))
}

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct CreateParams {
  pub status: Option<PersonStatus>,
}

/// `POST /people[?status=..]`: editors add people directly.
pub async fn create<S: MusterStore>(
  State(state): State<ApiState<S>>,
  actor: CurrentActor,
  Query(params): Query<CreateParams>,
  Json(form): Json<PersonForm>,
) -> Result<impl IntoResponse, ApiError> {
  let input = form.clean()?;
  let status = params.status.unwrap_or_default();
  let person = state
    .store
    .add_person(input, status, actor.username())
    .await
    .map_err(ApiError::store)?;
  grant_creator(&*state.store, &actor, Model::Person, person.person_id).await?;
  Ok((StatusCode::CREATED, Json(person)))
}

/// `POST /people/suggest`: anyone may suggest a person for review.
pub async fn suggest<S: MusterStore>(
  State(state): State<ApiState<S>>,
  actor: CurrentActor,
  Json(form): Json<PersonForm>,
) -> Result<impl IntoResponse, ApiError> {
  let input = form.clean()?;
  let person = state
    .store
    .add_person(input, PersonStatus::Pending, actor.username())
    .await
    .map_err(ApiError::store)?;
  tracing::info!(person = %person.person_id, "person suggested");
  Ok((StatusCode::CREATED, Json(person)))
}

// ─── Read ─────────────────────────────────────────────────────────────────────

/// `GET /people/:id`
pub async fn get_one<S: MusterStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Person>, ApiError> {
  Ok(Json(fetch(&*state.store, id).await?))
}

/// `GET /people/:id/form`: the person as an edit form, dates as `y-m-d`.
pub async fn form<S: MusterStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<PersonForm>, ApiError> {
  let person = fetch(&*state.store, id).await?;
  Ok(Json(PersonForm::from(&person)))
}

// ─── Update / delete ──────────────────────────────────────────────────────────

/// `PUT /people/:id`, body: [`PersonForm`].
pub async fn update<S: MusterStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(form): Json<PersonForm>,
) -> Result<Json<Person>, ApiError> {
  let input = form.clean()?;
  let person = state.store.update_person(id, input).await.map_err(ApiError::store)?;
  Ok(Json(person))
}

/// `DELETE /people/:id`
pub async fn remove<S: MusterStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  state.store.delete_person(id).await.map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct ApproveBody {
  #[serde(default = "confirmed")]
  pub status: PersonStatus,
}

fn confirmed() -> PersonStatus { PersonStatus::Confirmed }

/// `POST /people/:id/approve`, body: `{"status":"confirmed"}`.
pub async fn approve<S: MusterStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<ApproveBody>,
) -> Result<Json<Person>, ApiError> {
  let person = state
    .store
    .set_person_status(id, body.status)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(person))
}

// ─── Merge ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct MergeBody {
  pub canonical: Uuid,
}

/// `POST /people/:id/merge`: retire `:id` in favour of `canonical`.
pub async fn merge<S: MusterStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<MergeBody>,
) -> Result<Json<MergeReport>, ApiError> {
  let report = state
    .store
    .merge(MergeKind::Person, id, body.canonical)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(report))
}

// ─── Owned rows ───────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct RecordParams {
  pub kind: Option<RecordKind>,
}

/// `GET /people/:id/records[?kind=..]`
pub async fn records<S: MusterStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Query(params): Query<RecordParams>,
) -> Result<Json<Vec<Record>>, ApiError> {
  fetch(&*state.store, id).await?;
  let records = state
    .store
    .list_records(Owner::person(id), params.kind)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(records))
}

#[derive(Debug, Deserialize)]
pub struct LinkStoryBody {
  pub story_id: Uuid,
}

/// `GET /people/:id/stories`
pub async fn stories<S: MusterStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Story>>, ApiError> {
  fetch(&*state.store, id).await?;
  let stories = state
    .store
    .stories_for(Owner::person(id))
    .await
    .map_err(ApiError::store)?;
  Ok(Json(stories))
}

/// `POST /people/:id/stories`
pub async fn link_story<S: MusterStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<LinkStoryBody>,
) -> Result<StatusCode, ApiError> {
  state
    .store
    .link_story(Owner::person(id), body.story_id)
    .await
    .map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct LinkImageBody {
  pub image_id: Uuid,
}

/// `GET /people/:id/images`: image catalogue ids.
pub async fn images<S: MusterStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Uuid>>, ApiError> {
  fetch(&*state.store, id).await?;
  let images = state.store.images_for(id).await.map_err(ApiError::store)?;
  Ok(Json(images))
}

/// `POST /people/:id/images`
pub async fn link_image<S: MusterStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<LinkImageBody>,
) -> Result<StatusCode, ApiError> {
  state
    .store
    .link_image(id, body.image_id)
    .await
    .map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}
