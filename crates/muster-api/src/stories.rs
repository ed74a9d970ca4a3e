//! Handlers for `/stories` endpoints.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use muster_core::{
  form::{FieldErrors, REQUIRED},
  store::MusterStore,
  story::{NewStory, Story},
};
use uuid::Uuid;

use crate::{ApiState, CurrentActor, error::ApiError};

pub(crate) async fn fetch<S: MusterStore>(store: &S, id: Uuid) -> Result<Story, ApiError> {
  store
    .get_story(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("story {id} not found")))
}

/// `GET /stories`
pub async fn list<S: MusterStore>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Vec<Story>>, ApiError> {
  let stories = state.store.list_stories().await.map_err(ApiError::store)?;
  Ok(Json(stories))
}

/// `POST /stories`, body: `{"title":"..","text":".."}`
pub async fn create<S: MusterStore>(
  State(state): State<ApiState<S>>,
  actor: CurrentActor,
  Json(mut body): Json<NewStory>,
) -> Result<impl IntoResponse, ApiError> {
  body.title = body.title.trim().to_owned();
  if body.title.is_empty() {
    let mut errors = FieldErrors::default();
    errors.add("title", REQUIRED);
    return Err(errors.into());
  }
  let story = state
    .store
    .add_story(body, actor.username())
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(story)))
}

/// `GET /stories/:id`
pub async fn get_one<S: MusterStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Story>, ApiError> {
  Ok(Json(fetch(&*state.store, id).await?))
}
