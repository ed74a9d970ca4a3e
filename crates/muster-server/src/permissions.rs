//! Which permission each route needs.
//!
//! Reads are public, as are suggestions, except that people awaiting review
//! are only listed for users who may approve them. Every other route names
//! exactly one permission; routes that act on an existing object also accept a
//! grant on that object.

use axum::{extract::Query, http::Uri};
use muster_core::{
  merge::MergeKind,
  permission::{self, APPROVE_PERSON, CHANGE_NAMESPACE, Model},
  record::RecordKind,
  store::PersonQuery,
};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
  Public,
  /// The permission must be held globally.
  Global(String),
  /// The permission may be held globally or for `id`.
  Object { permission: String, id: Uuid },
  /// No permission unlocks this route.
  Denied,
}

fn param<'a>(params: &[(&str, &'a str)], name: &str) -> Option<&'a str> {
  params.iter().find(|(k, _)| *k == name).map(|(_, v)| *v)
}

fn on_object(permission: String, params: &[(&str, &str)]) -> Requirement {
  match param(params, "id").and_then(|s| s.parse().ok()) {
    Some(id) => Requirement::Object { permission, id },
    None => Requirement::Global(permission),
  }
}

/// Whether a people listing asks for pending suggestions. A query that does not
/// parse is left to the handler to reject.
fn lists_pending(uri: &Uri) -> bool {
  Query::<PersonQuery>::try_from_uri(uri).is_ok_and(|Query(q)| q.lists_pending())
}

/// The requirement for `method` on the matched route template.
pub fn required(
  method: &str,
  route: &str,
  params: &[(&str, &str)],
  uri: &Uri,
) -> Requirement {
  use Requirement::{Denied, Global, Public};

  let record_kind = || param(params, "kind").and_then(|k| RecordKind::parse(k).ok());

  match (method, route) {
    ("GET" | "HEAD", "/people/suggested") => Global(APPROVE_PERSON.to_owned()),
    ("GET" | "HEAD", "/people" | "/people/rdf") if lists_pending(uri) => {
      Global(APPROVE_PERSON.to_owned())
    }
    ("GET" | "HEAD", _) => Public,
    ("POST", "/people/suggest") => Public,

    ("POST", "/people") => Global(permission::add(Model::Person)),
    ("PUT", "/people/{id}") => on_object(permission::change(Model::Person), params),
    ("DELETE", "/people/{id}") => on_object(permission::delete(Model::Person), params),
    ("POST", "/people/{id}/approve") => Global(APPROVE_PERSON.to_owned()),
    ("POST", "/people/{id}/merge") => Global(permission::merge(MergeKind::Person)),
    ("POST", "/people/{id}/stories" | "/people/{id}/images") => {
      on_object(permission::change(Model::Person), params)
    }

    ("POST", "/organisations") => Global(permission::add(Model::Organisation)),
    ("PUT", "/organisations/{id}") => {
      on_object(permission::change(Model::Organisation), params)
    }
    ("DELETE", "/organisations/{id}") => {
      on_object(permission::delete(Model::Organisation), params)
    }
    ("POST", "/organisations/{id}/merge") => {
      Global(permission::merge(MergeKind::Organisation))
    }
    ("POST", "/organisations/{id}/stories") => {
      on_object(permission::change(Model::Organisation), params)
    }

    // An unknown kind is left to the handler, which answers 404.
    ("POST", "/records/{kind}") => match record_kind() {
      Some(kind) => Global(permission::add(Model::Record(kind))),
      None => Public,
    },
    ("PUT", "/records/{kind}/{id}") => match record_kind() {
      Some(kind) => on_object(permission::change(Model::Record(kind)), params),
      None => Public,
    },
    ("DELETE", "/records/{kind}/{id}") => match record_kind() {
      Some(kind) => on_object(permission::delete(Model::Record(kind)), params),
      None => Public,
    },

    ("POST", "/stories") => Global(permission::add(Model::Story)),
    ("POST", "/addresses") => Global(permission::add(Model::Address)),
    ("PUT", "/namespaces/{prefix}") => Global(CHANGE_NAMESPACE.to_owned()),

    _ => Denied,
  }
}
