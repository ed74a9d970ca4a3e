//! The acting user, as established by whatever authenticates requests.

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};
use muster_core::permission::Actor;

/// The [`Actor`] stored in the request extensions, if any.
///
/// Anonymous requests (public suggestions) yield `None`.
#[derive(Debug, Clone, Default)]
pub struct CurrentActor(pub Option<Actor>);

impl CurrentActor {
  pub fn username(&self) -> Option<String> {
    self.0.as_ref().map(|a| a.username.clone())
  }
}

impl<S> FromRequestParts<S> for CurrentActor
where
  S: Send + Sync,
{
  type Rejection = Infallible;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &S,
  ) -> Result<Self, Self::Rejection> {
    Ok(Self(parts.extensions.get::<Actor>().cloned()))
  }
}
