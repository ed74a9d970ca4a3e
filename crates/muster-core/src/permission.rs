//! Named permissions and the acting user.
//!
//! Permissions are plain strings of the form `app.action_model`. A user holds
//! a permission either globally or for a single object; object grants are
//! made when a user creates something so they can later change or delete it.

use serde::{Deserialize, Serialize};

use crate::{merge::MergeKind, record::RecordKind};

pub const APPROVE_PERSON: &str = "people.approve_person";
pub const CHANGE_NAMESPACE: &str = "linkeddata.change_namespace";

/// The authenticated user a request acts for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
  pub username: String,
}

impl Actor {
  pub fn new(username: impl Into<String>) -> Self {
    Self { username: username.into() }
  }
}

/// The model half of a permission name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Model {
  Person,
  Organisation,
  Record(RecordKind),
  Story,
  Address,
}

impl Model {
  pub fn name(self) -> &'static str {
    match self {
      Self::Person => "person",
      Self::Organisation => "organisation",
      Self::Record(kind) => kind.into(),
      Self::Story => "story",
      Self::Address => "address",
    }
  }
}

impl From<MergeKind> for Model {
  fn from(kind: MergeKind) -> Self {
    match kind {
      MergeKind::Person => Self::Person,
      MergeKind::Organisation => Self::Organisation,
    }
  }
}

pub fn add(model: Model) -> String { format!("people.add_{}", model.name()) }

pub fn change(model: Model) -> String {
  format!("people.change_{}", model.name())
}

pub fn delete(model: Model) -> String {
  format!("people.delete_{}", model.name())
}

pub fn merge(kind: MergeKind) -> String {
  format!("people.merge_{}", Model::from(kind).name())
}
