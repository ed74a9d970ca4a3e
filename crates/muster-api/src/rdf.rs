//! Linked-data views.
//!
//! Every handler takes an optional `?format=turtle|ntriples` (default Turtle)
//! and expands predicates through the store's current prefix table.

use axum::{
  extract::{Path, Query, State},
  http::header,
  response::{IntoResponse, Response},
};
use muster_core::store::{MusterStore, OrganisationQuery, Owner, PersonQuery};
use muster_rdf::{Format, Graph, Namespaces};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiState, error::ApiError, organisations, people, records, stories};

#[derive(Debug, Default, Deserialize)]
pub struct RdfParams {
  pub format: Option<String>,
}

impl RdfParams {
  fn format(&self) -> Result<Format, ApiError> {
    Ok(self.format.as_deref().map(Format::parse).transpose()?.unwrap_or_default())
  }
}

async fn graph<S: MusterStore>(store: &S) -> Result<Graph, ApiError> {
  let namespaces = store.list_namespaces().await.map_err(ApiError::store)?;
  Ok(Graph::new(Namespaces::new(namespaces)))
}

fn render(format: Format, graph: &Graph) -> Result<Response, ApiError> {
  let body = format.write(graph)?;
  Ok(([(header::CONTENT_TYPE, format.content_type())], body).into_response())
}

/// `GET /people/:id/rdf`
pub async fn person<S: MusterStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Query(params): Query<RdfParams>,
) -> Result<Response, ApiError> {
  let format = params.format()?;
  let store = &*state.store;
  let person = people::fetch(store, id).await?;
  let owner = Owner::person(id);
  let records = store.list_records(owner, None).await.map_err(ApiError::store)?;
  let stories = store.stories_for(owner).await.map_err(ApiError::store)?;

  let mut graph = graph(store).await?;
  muster_rdf::describe_person(&mut graph, &state.iris, &person, &records, &stories)?;
  render(format, &graph)
}

/// `GET /people/rdf`: summary triples for the same people `GET /people`
/// lists, so suggestions awaiting review are left out by default.
pub async fn all_people<S: MusterStore>(
  State(state): State<ApiState<S>>,
  Query(params): Query<RdfParams>,
  Query(query): Query<PersonQuery>,
) -> Result<Response, ApiError> {
  let format = params.format()?;
  let store = &*state.store;
  let all = store.list_people(&query).await.map_err(ApiError::store)?;

  let mut graph = graph(store).await?;
  muster_rdf::describe_people(&mut graph, &state.iris, &all)?;
  render(format, &graph)
}

/// `GET /organisations/:id/rdf`
pub async fn organisation<S: MusterStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Query(params): Query<RdfParams>,
) -> Result<Response, ApiError> {
  let format = params.format()?;
  let store = &*state.store;
  let organisation = organisations::fetch(store, id).await?;
  let stories = store
    .stories_for(Owner::organisation(id))
    .await
    .map_err(ApiError::store)?;

  let mut graph = graph(store).await?;
  muster_rdf::describe_organisation(&mut graph, &state.iris, &organisation, &stories)?;
  render(format, &graph)
}

/// `GET /organisations/rdf`
pub async fn all_organisations<S: MusterStore>(
  State(state): State<ApiState<S>>,
  Query(params): Query<RdfParams>,
) -> Result<Response, ApiError> {
  let format = params.format()?;
  let store = &*state.store;
  let all = store
    .list_organisations(&OrganisationQuery::default())
    .await
    .map_err(ApiError::store)?;

  let mut graph = graph(store).await?;
  muster_rdf::describe_organisations(&mut graph, &state.iris, &all)?;
  render(format, &graph)
}

/// `GET /stories/:id/rdf`
pub async fn story<S: MusterStore>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Query(params): Query<RdfParams>,
) -> Result<Response, ApiError> {
  let format = params.format()?;
  let store = &*state.store;
  let story = stories::fetch(store, id).await?;
  let owners = store.story_owners(id).await.map_err(ApiError::store)?;

  let mut graph = graph(store).await?;
  muster_rdf::describe_story(&mut graph, &state.iris, &story, &owners)?;
  render(format, &graph)
}

/// `GET /records/:kind/:id/rdf`
pub async fn record<S: MusterStore>(
  State(state): State<ApiState<S>>,
  Path((kind_name, id)): Path<(String, Uuid)>,
  Query(params): Query<RdfParams>,
) -> Result<Response, ApiError> {
  let format = params.format()?;
  let store = &*state.store;
  let record = records::fetch(store, records::parse_kind(&kind_name)?, id).await?;

  let mut graph = graph(store).await?;
  muster_rdf::describe_record(&mut graph, &state.iris, &record)?;
  render(format, &graph)
}
