//! The record merge engine.
//!
//! A merge retires a duplicate person or organisation. Every table that can
//! point at the entity is rewritten to point at the canonical record, the
//! collection tables are unioned, earlier duplicates of the duplicate are
//! re-pointed, and finally the duplicate's `merged_into` is set. All of it
//! runs in one `BEGIN IMMEDIATE` transaction: SQLite takes its write lock up
//! front, so nothing can change either record's relations between the
//! existence checks and the commit.

use muster_core::{
  merge::{MergeKind, MergeReport, Rewrite, Union},
  record::RecordKind,
};
use rusqlite::{Connection, TransactionBehavior};
use uuid::Uuid;

use crate::{
  Result,
  encode::{encode_uuid, entity_table, link_column, record_table},
  store::require_active,
};

/// A many-to-many membership table keyed by `(owner, member)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collection {
  pub table:  &'static str,
  pub owner:  &'static str,
  pub member: &'static str,
}

const PERSON_COLLECTIONS: &[Collection] = &[
  Collection { table: "person_stories", owner: "person_id", member: "story_id" },
  Collection { table: "person_images", owner: "person_id", member: "image_id" },
];

const ORGANISATION_COLLECTIONS: &[Collection] = &[Collection {
  table:  "organisation_stories",
  owner:  "organisation_id",
  member: "story_id",
}];

/// Everything a merge of one entity kind touches.
#[derive(Debug, Clone)]
pub struct MergePlan {
  /// `(table, column)` pairs rewritten in place.
  pub rewrites:    Vec<(&'static str, &'static str)>,
  pub collections: &'static [Collection],
}

impl MergePlan {
  /// Derived from the record kinds so a new kind is merged as soon as it
  /// declares its links.
  pub fn for_kind(kind: MergeKind) -> Self {
    let rewrites = RecordKind::ALL
      .iter()
      .flat_map(|&record_kind| {
        record_kind
          .links()
          .iter()
          .filter(move |spec| spec.role.target() == kind)
          .map(move |spec| (record_table(record_kind), link_column(spec.role)))
      })
      .collect();
    let collections = match kind {
      MergeKind::Person => PERSON_COLLECTIONS,
      MergeKind::Organisation => ORGANISATION_COLLECTIONS,
    };
    Self { rewrites, collections }
  }
}

fn rewrite_failed(table: &str) -> impl FnOnce(rusqlite::Error) -> crate::Error + '_ {
  move |e| {
    muster_core::Error::RelationRewrite {
      table:  table.to_owned(),
      reason: e.to_string(),
    }
    .into()
  }
}

/// Run a merge on `conn`. The caller has already rejected `duplicate ==
/// canonical`.
pub fn run(
  conn: &mut Connection,
  kind: MergeKind,
  duplicate: Uuid,
  canonical: Uuid,
) -> Result<MergeReport> {
  let plan = MergePlan::for_kind(kind);
  let (entity, id_column) = entity_table(kind);
  let dup = encode_uuid(duplicate);
  let canon = encode_uuid(canonical);

  // Dropping `tx` without committing rolls back.
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

  require_active(&tx, kind, duplicate)?;
  require_active(&tx, kind, canonical)?;

  let mut rewrites = Vec::with_capacity(plan.rewrites.len());
  for (table, column) in plan.rewrites {
    let rows = tx
      .execute(
        &format!("UPDATE {table} SET {column} = ?1 WHERE {column} = ?2"),
        rusqlite::params![canon, dup],
      )
      .map_err(rewrite_failed(table))?;
    rewrites.push(Rewrite { table: table.to_owned(), column: column.to_owned(), rows });
  }

  let mut unions = Vec::with_capacity(plan.collections.len());
  for c in plan.collections {
    let added = tx
      .execute(
        &format!(
          "INSERT OR IGNORE INTO {t} ({o}, {m})
           SELECT ?1, {m} FROM {t} WHERE {o} = ?2",
          t = c.table,
          o = c.owner,
          m = c.member,
        ),
        rusqlite::params![canon, dup],
      )
      .map_err(rewrite_failed(c.table))?;
    let cleared = tx
      .execute(
        &format!("DELETE FROM {} WHERE {} = ?1", c.table, c.owner),
        rusqlite::params![dup],
      )
      .map_err(rewrite_failed(c.table))?;
    unions.push(Union { table: c.table.to_owned(), added, cleared });
  }

  let repointed = tx
    .execute(
      &format!("UPDATE {entity} SET merged_into = ?1 WHERE merged_into = ?2"),
      rusqlite::params![canon, dup],
    )
    .map_err(rewrite_failed(entity))?;

  tx.execute(
    &format!("UPDATE {entity} SET merged_into = ?1 WHERE {id_column} = ?2"),
    rusqlite::params![canon, dup],
  )
  .map_err(rewrite_failed(entity))?;

  tx.commit()?;

  Ok(MergeReport { kind, duplicate, canonical, rewrites, unions, repointed })
}

#[cfg(test)]
mod tests {
  use muster_core::record::LinkRole;

  use super::*;

  #[test]
  fn person_plan_covers_both_sides_of_person_people() {
    let plan = MergePlan::for_kind(MergeKind::Person);
    assert!(plan.rewrites.contains(&("person_people", "person_id")));
    assert!(plan.rewrites.contains(&("person_people", "associated_person_id")));
    assert!(plan.rewrites.contains(&("person_organisations", "person_id")));
    assert!(!plan.rewrites.iter().any(|(_, c)| *c == "organisation_id"));
  }

  #[test]
  fn organisation_plan() {
    let plan = MergePlan::for_kind(MergeKind::Organisation);
    let tables: Vec<_> = plan.rewrites.iter().map(|(t, _)| *t).collect();
    assert_eq!(
      tables,
      ["person_organisations", "organisation_sources", "memorial_organisations"]
    );
    assert_eq!(link_column(LinkRole::Organisation), "organisation_id");
    assert_eq!(plan.collections, ORGANISATION_COLLECTIONS);
  }
}
