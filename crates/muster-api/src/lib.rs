//! JSON REST API for Muster.
//!
//! Exposes an axum [`Router`] backed by any [`muster_core::store::MusterStore`].
//! Authentication and permission checks are the caller's responsibility; a
//! caller that authenticates a request inserts an
//! [`Actor`](muster_core::permission::Actor) into its extensions, and handlers
//! that create objects grant that actor change/delete permissions on them.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", muster_api::api_router(store.clone(), "https://muster.example"))
//! ```

pub mod actor;
pub mod addresses;
pub mod error;
pub mod namespaces;
pub mod organisations;
pub mod people;
pub mod rdf;
pub mod records;
pub mod stories;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use muster_core::{
  permission::{self, Model},
  store::MusterStore,
};
use muster_rdf::Iris;
use uuid::Uuid;

pub use actor::CurrentActor;
pub use error::ApiError;

/// Shared state threaded through all API handlers.
pub struct ApiState<S> {
  pub store: Arc<S>,
  pub iris:  Arc<Iris>,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), iris: self.iris.clone() }
  }
}

/// Build a fully-materialised API router for `store`.
///
/// `base_url` is the public origin linked-data IRIs are minted under. The
/// returned `Router<()>` can be nested into any parent router regardless of
/// its own state type.
pub fn api_router<S>(store: Arc<S>, base_url: &str) -> Router<()>
where
  S: MusterStore + 'static,
{
  let state = ApiState { store, iris: Arc::new(Iris::new(base_url)) };

  Router::new()
    // People
    .route("/people", get(people::list::<S>).post(people::create::<S>))
    .route("/people/suggest", post(people::suggest::<S>))
    .route("/people/suggested", get(people::suggested::<S>))
    .route("/people/rdf", get(rdf::all_people::<S>))
    .route(
      "/people/{id}",
      get(people::get_one::<S>)
        .put(people::update::<S>)
        .delete(people::remove::<S>),
    )
    .route("/people/{id}/form", get(people::form::<S>))
    .route("/people/{id}/approve", post(people::approve::<S>))
    .route("/people/{id}/merge", post(people::merge::<S>))
    .route("/people/{id}/records", get(people::records::<S>))
    .route(
      "/people/{id}/stories",
      get(people::stories::<S>).post(people::link_story::<S>),
    )
    .route(
      "/people/{id}/images",
      get(people::images::<S>).post(people::link_image::<S>),
    )
    .route("/people/{id}/rdf", get(rdf::person::<S>))
    // Organisations
    .route(
      "/organisations",
      get(organisations::list::<S>).post(organisations::create::<S>),
    )
    .route("/organisations/rdf", get(rdf::all_organisations::<S>))
    .route(
      "/organisations/{id}",
      get(organisations::get_one::<S>)
        .put(organisations::update::<S>)
        .delete(organisations::remove::<S>),
    )
    .route("/organisations/{id}/form", get(organisations::form::<S>))
    .route("/organisations/{id}/merge", post(organisations::merge::<S>))
    .route("/organisations/{id}/records", get(organisations::records::<S>))
    .route(
      "/organisations/{id}/stories",
      get(organisations::stories::<S>).post(organisations::link_story::<S>),
    )
    .route("/organisations/{id}/rdf", get(rdf::organisation::<S>))
    // Records
    .route("/records/{kind}", post(records::create::<S>))
    .route(
      "/records/{kind}/{id}",
      get(records::get_one::<S>)
        .put(records::update::<S>)
        .delete(records::remove::<S>),
    )
    .route("/records/{kind}/{id}/form", get(records::form::<S>))
    .route("/records/{kind}/{id}/rdf", get(rdf::record::<S>))
    // Stories
    .route("/stories", get(stories::list::<S>).post(stories::create::<S>))
    .route("/stories/{id}", get(stories::get_one::<S>))
    .route("/stories/{id}/rdf", get(rdf::story::<S>))
    // Addresses
    .route("/addresses", post(addresses::create::<S>))
    .route("/addresses/{id}", get(addresses::get_one::<S>))
    // Namespaces
    .route("/namespaces", get(namespaces::list::<S>))
    .route("/namespaces/{prefix}", put(namespaces::put_one::<S>))
    .with_state(state)
}

/// Give the creator of `id` the right to change and delete it later.
pub(crate) async fn grant_creator<S>(
  store: &S,
  actor: &CurrentActor,
  model: Model,
  id: Uuid,
) -> Result<(), ApiError>
where
  S: MusterStore,
{
  let Some(username) = actor.username() else {
    return Ok(());
  };
  for perm in [permission::change(model), permission::delete(model)] {
    store
      .grant_permission(username.clone(), perm, id)
      .await
      .map_err(ApiError::store)?;
  }
  Ok(())
}
