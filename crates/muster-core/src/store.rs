//! The `MusterStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `muster-store-sqlite`).
//! Higher layers (`muster-api`, `muster-server`) depend on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  address::{Address, NewAddress},
  error::Classify,
  merge::{MergeKind, MergeReport},
  namespace::Namespace,
  organisation::{NewOrganisation, Organisation},
  person::{NewPerson, Person, PersonStatus},
  record::{NewRecord, Record, RecordKind},
  story::{NewStory, Story},
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Parameters for [`MusterStore::list_people`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonQuery {
  pub status:          Option<PersonStatus>,
  /// Case-insensitive prefix match on the family name.
  pub family_name:     Option<String>,
  /// Include records that have been merged away. Off unless asked for.
  #[serde(default)]
  pub include_merged:  bool,
  /// Include suggestions awaiting review when no `status` is given.
  #[serde(default)]
  pub include_pending: bool,
  pub limit:           Option<usize>,
  pub offset:          Option<usize>,
}

impl PersonQuery {
  /// Whether this query can return people still awaiting review.
  pub fn lists_pending(&self) -> bool {
    match self.status {
      Some(status) => status == PersonStatus::Pending,
      None => self.include_pending,
    }
  }
}

/// Parameters for [`MusterStore::list_organisations`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrganisationQuery {
  /// Case-insensitive prefix match on the name.
  pub name:           Option<String>,
  #[serde(default)]
  pub include_merged: bool,
  pub limit:          Option<usize>,
  pub offset:         Option<usize>,
}

/// A person or organisation that owns records and stories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Owner {
  pub kind: MergeKind,
  pub id:   Uuid,
}

impl Owner {
  pub fn person(id: Uuid) -> Self { Self { kind: MergeKind::Person, id } }

  pub fn organisation(id: Uuid) -> Self {
    Self { kind: MergeKind::Organisation, id }
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Muster store backend.
///
/// Every listing applies the active-record predicate: people and
/// organisations with `merged_into` set are hidden unless a query asks for
/// them. Merged records cannot be edited, linked to, or merged again.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait MusterStore: Send + Sync {
  type Error: std::error::Error + Classify + Send + Sync + 'static;

  // ── People ────────────────────────────────────────────────────────────

  /// Persist a new person with the given status.
  fn add_person(
    &self,
    input: NewPerson,
    status: PersonStatus,
    added_by: Option<String>,
  ) -> impl Future<Output = Result<Person, Self::Error>> + Send + '_;

  /// Retrieve a person by UUID, merged or not. Returns `None` if not found.
  fn get_person(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Person>, Self::Error>> + Send + '_;

  /// Replace a person's editable fields.
  fn update_person(
    &self,
    id: Uuid,
    input: NewPerson,
  ) -> impl Future<Output = Result<Person, Self::Error>> + Send + '_;

  fn set_person_status(
    &self,
    id: Uuid,
    status: PersonStatus,
  ) -> impl Future<Output = Result<Person, Self::Error>> + Send + '_;

  /// Delete a person with its records and collection memberships.
  ///
  /// Refused while other people are merged into this one.
  fn delete_person(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn list_people<'a>(
    &'a self,
    query: &'a PersonQuery,
  ) -> impl Future<Output = Result<Vec<Person>, Self::Error>> + Send + 'a;

  // ── Organisations ─────────────────────────────────────────────────────

  fn add_organisation(
    &self,
    input: NewOrganisation,
    added_by: Option<String>,
  ) -> impl Future<Output = Result<Organisation, Self::Error>> + Send + '_;

  fn get_organisation(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Organisation>, Self::Error>> + Send + '_;

  fn update_organisation(
    &self,
    id: Uuid,
    input: NewOrganisation,
  ) -> impl Future<Output = Result<Organisation, Self::Error>> + Send + '_;

  fn delete_organisation(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn list_organisations<'a>(
    &'a self,
    query: &'a OrganisationQuery,
  ) -> impl Future<Output = Result<Vec<Organisation>, Self::Error>> + Send + 'a;

  // ── Records ───────────────────────────────────────────────────────────

  /// Persist a record. Every linked person or organisation must exist and be
  /// active.
  fn add_record(
    &self,
    input: NewRecord,
    added_by: Option<String>,
  ) -> impl Future<Output = Result<Record, Self::Error>> + Send + '_;

  fn get_record(
    &self,
    kind: RecordKind,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Record>, Self::Error>> + Send + '_;

  /// Replace a record's links and value. The kind cannot change.
  fn update_record(
    &self,
    kind: RecordKind,
    id: Uuid,
    input: NewRecord,
  ) -> impl Future<Output = Result<Record, Self::Error>> + Send + '_;

  fn delete_record(
    &self,
    kind: RecordKind,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Records owned by `owner`, sorted by date then creation time.
  fn list_records(
    &self,
    owner: Owner,
    kind: Option<RecordKind>,
  ) -> impl Future<Output = Result<Vec<Record>, Self::Error>> + Send + '_;

  // ── Stories and images ────────────────────────────────────────────────

  fn add_story(
    &self,
    input: NewStory,
    created_by: Option<String>,
  ) -> impl Future<Output = Result<Story, Self::Error>> + Send + '_;

  fn get_story(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Story>, Self::Error>> + Send + '_;

  fn list_stories(
    &self,
  ) -> impl Future<Output = Result<Vec<Story>, Self::Error>> + Send + '_;

  /// Add a story to an owner's collection. Linking twice is a no-op.
  fn link_story(
    &self,
    owner: Owner,
    story_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn stories_for(
    &self,
    owner: Owner,
  ) -> impl Future<Output = Result<Vec<Story>, Self::Error>> + Send + '_;

  /// The people and organisations a story is linked to.
  fn story_owners(
    &self,
    story_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Owner>, Self::Error>> + Send + '_;

  /// Add an image from the image catalogue to a person's collection.
  fn link_image(
    &self,
    person_id: Uuid,
    image_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn images_for(
    &self,
    person_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Uuid>, Self::Error>> + Send + '_;

  // ── Addresses ─────────────────────────────────────────────────────────

  fn add_address(
    &self,
    input: NewAddress,
  ) -> impl Future<Output = Result<Address, Self::Error>> + Send + '_;

  fn get_address(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Address>, Self::Error>> + Send + '_;

  // ── Namespaces ────────────────────────────────────────────────────────

  fn list_namespaces(
    &self,
  ) -> impl Future<Output = Result<Vec<Namespace>, Self::Error>> + Send + '_;

  /// Insert or replace the URI bound to a prefix.
  fn put_namespace(
    &self,
    namespace: Namespace,
  ) -> impl Future<Output = Result<Namespace, Self::Error>> + Send + '_;

  // ── Object permissions ────────────────────────────────────────────────

  fn grant_permission(
    &self,
    username: String,
    permission: String,
    object_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn has_object_permission(
    &self,
    username: String,
    permission: String,
    object_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Merge ─────────────────────────────────────────────────────────────

  /// Retire `duplicate` in favour of `canonical`, re-pointing every relation.
  ///
  /// Atomic: either every relation moves and `duplicate.merged_into` is set,
  /// or nothing changes.
  fn merge(
    &self,
    kind: MergeKind,
    duplicate: Uuid,
    canonical: Uuid,
  ) -> impl Future<Output = Result<MergeReport, Self::Error>> + Send + '_;
}
