//! HTTP Basic authentication and the permission middleware.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  extract::{MatchedPath, RawPathParams, Request, State},
  http::HeaderMap,
  middleware::Next,
  response::Response,
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use muster_core::{permission::Actor, store::MusterStore};

use crate::{
  AppState, UserConfig,
  error::Error,
  permissions::{self, Requirement},
};

/// Resolve the `Authorization` header against the configured users.
///
/// No header means an anonymous request (`Ok(None)`); a header that does not
/// verify is always rejected.
pub fn authenticate<'a>(
  headers: &HeaderMap,
  users: &'a [UserConfig],
) -> Result<Option<&'a UserConfig>, Error> {
  let Some(header_val) = headers.get(axum::http::header::AUTHORIZATION) else {
    return Ok(None);
  };
  let header_val = header_val.to_str().map_err(|_| Error::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(Error::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| Error::Unauthorized)?;
  let creds = std::str::from_utf8(&decoded).map_err(|_| Error::Unauthorized)?;

  let (username, password) = creds.split_once(':').ok_or(Error::Unauthorized)?;

  let user = users
    .iter()
    .find(|u| u.username == username)
    .ok_or(Error::Unauthorized)?;

  let parsed_hash =
    PasswordHash::new(&user.password_hash).map_err(|_| Error::Unauthorized)?;

  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| Error::Unauthorized)?;

  Ok(Some(user))
}

async fn permitted<S: MusterStore>(
  store: &S,
  user: &UserConfig,
  requirement: &Requirement,
) -> Result<bool, Error> {
  match requirement {
    Requirement::Public => Ok(true),
    Requirement::Denied => Ok(false),
    Requirement::Global(permission) => Ok(user.has(permission)),
    Requirement::Object { permission, id } => {
      if user.has(permission) {
        return Ok(true);
      }
      store
        .has_object_permission(user.username.clone(), permission.clone(), *id)
        .await
        .map_err(|e| Error::Store(Box::new(e)))
    }
  }
}

fn describe(requirement: &Requirement) -> String {
  match requirement {
    Requirement::Global(p) | Requirement::Object { permission: p, .. } => p.clone(),
    Requirement::Public => "nothing".to_owned(),
    Requirement::Denied => "an allowed method".to_owned(),
  }
}

/// Route-layer middleware: authenticate, check the route's permission, and
/// hand the [`Actor`] to the handler.
pub async fn authorize<S>(
  State(state): State<AppState<S>>,
  matched: MatchedPath,
  params: RawPathParams,
  mut req: Request,
  next: Next,
) -> Result<Response, Error>
where
  S: MusterStore + 'static,
{
  let user = authenticate(req.headers(), &state.config.users)?;

  let route = matched.as_str();
  let route = route.strip_prefix("/api").unwrap_or(route);
  let params: Vec<(&str, &str)> = params.iter().collect();
  let requirement = permissions::required(req.method().as_str(), route, &params, req.uri());

  if requirement != Requirement::Public {
    let user = user.ok_or(Error::Unauthorized)?;
    if !permitted(&*state.store, user, &requirement).await? {
      let needed = describe(&requirement);
      tracing::warn!(user = %user.username, route, permission = %needed, "permission denied");
      return Err(Error::Forbidden(needed));
    }
  }

  if let Some(user) = user {
    req.extensions_mut().insert(Actor::new(user.username.as_str()));
  }
  Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
  use argon2::{PasswordHasher, password_hash::SaltString};
  use axum::http::{HeaderValue, header};
  use rand_core::OsRng;

  use super::*;

  fn users(password: &str) -> Vec<UserConfig> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .unwrap()
      .to_string();
    vec![UserConfig {
      username:      "user".to_string(),
      password_hash: hash,
      permissions:   vec!["people.add_person".to_string()],
    }]
  }

  fn basic(user: &str, pass: &str) -> HeaderMap {
    let encoded = B64.encode(format!("{user}:{pass}"));
    let mut headers = HeaderMap::new();
    headers.insert(
      header::AUTHORIZATION,
      HeaderValue::from_str(&format!("Basic {encoded}")).unwrap(),
    );
    headers
  }

  #[test]
  fn correct_credentials() {
    let users = users("secret");
    let user = authenticate(&basic("user", "secret"), &users).unwrap().unwrap();
    assert!(user.has("people.add_person"));
    assert!(!user.has("people.delete_person"));
  }

  #[test]
  fn wrong_password() {
    let users = users("secret");
    assert!(matches!(
      authenticate(&basic("user", "wrong"), &users),
      Err(Error::Unauthorized)
    ));
    assert!(matches!(
      authenticate(&basic("someone", "secret"), &users),
      Err(Error::Unauthorized)
    ));
  }

  #[test]
  fn missing_header_is_anonymous() {
    let users = users("secret");
    assert!(authenticate(&HeaderMap::new(), &users).unwrap().is_none());
  }

  #[test]
  fn invalid_base64() {
    let users = users("secret");
    let mut headers = HeaderMap::new();
    headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic !!!not-base64!!!"));
    assert!(matches!(authenticate(&headers, &users), Err(Error::Unauthorized)));
  }
}
