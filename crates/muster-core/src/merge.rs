//! Merge contract types.
//!
//! A merge retires a *duplicate* person or organisation in favour of a
//! *canonical* one: every relation is re-pointed at the canonical record and
//! the duplicate keeps only its `merged_into` pointer. The engine itself lives
//! in the storage backend because the set of relation tables is a storage
//! concern.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The top-level entity types the store tracks identity for.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntityKind {
  Person,
  Organisation,
  Record,
  Story,
  Address,
}

/// The entity types that can be merged.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MergeKind {
  Person,
  Organisation,
}

impl From<MergeKind> for EntityKind {
  fn from(kind: MergeKind) -> Self {
    match kind {
      MergeKind::Person => Self::Person,
      MergeKind::Organisation => Self::Organisation,
    }
  }
}

/// Rows re-pointed in one relation column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rewrite {
  pub table:  String,
  pub column: String,
  pub rows:   usize,
}

/// Members copied from the duplicate's side of a many-to-many collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Union {
  pub table:   String,
  /// Memberships the canonical record did not already have.
  pub added:   usize,
  /// Memberships removed from the duplicate.
  pub cleared: usize,
}

/// What a committed merge changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeReport {
  pub kind:      MergeKind,
  pub duplicate: Uuid,
  pub canonical: Uuid,
  pub rewrites:  Vec<Rewrite>,
  pub unions:    Vec<Union>,
  /// Earlier duplicates of `duplicate` now pointing at `canonical`.
  pub repointed: usize,
}

impl MergeReport {
  /// Total relation rows moved, collections excluded.
  pub fn rows_moved(&self) -> usize { self.rewrites.iter().map(|r| r.rows).sum() }
}

/// Reject a merge of a record with itself. Runs before any storage access.
pub fn check_distinct(duplicate: Uuid, canonical: Uuid) -> crate::Result<()> {
  if duplicate == canonical {
    return Err(crate::Error::SameRecord(duplicate));
  }
  Ok(())
}
