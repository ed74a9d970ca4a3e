//! The SQLite implementation of [`MusterStore`].
//!
//! Each trait method gathers its owned inputs, then runs one synchronous
//! helper on the connection thread. The helpers take `&Connection` (or
//! `&mut Connection` when they open a transaction) and return this crate's
//! [`Result`], so domain checks and SQL share one error path.

use std::path::Path;

use chrono::{DateTime, Utc};
use muster_core::{
  address::{Address, NewAddress},
  merge::{EntityKind, MergeKind, MergeReport, check_distinct},
  namespace::Namespace,
  organisation::{NewOrganisation, Organisation},
  person::{NewPerson, Person, PersonStatus},
  record::{LinkRole, Links, NewRecord, Record, RecordKind, RecordValue},
  store::{MusterStore, OrganisationQuery, Owner, PersonQuery},
  story::{NewStory, Story},
};
use rusqlite::{Connection, OptionalExtension as _, params_from_iter, types::Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  Result,
  encode::{
    ADDRESS_COLUMNS, ORGANISATION_COLUMNS, PERSON_COLUMNS, RawAddress,
    RawOrganisation, RawPerson, RawRecord, RawStory, STORY_COLUMNS, decode_uuid,
    decode_opt_uuid, encode_date, encode_dt, encode_precision, encode_uuid,
    entity_table, link_column, record_columns, record_table,
  },
  merge,
  schema::SCHEMA,
};

/// Selects people and organisations that have not been merged away. Every
/// listing goes through this.
pub(crate) const ACTIVE: &str = "merged_into IS NULL";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Muster store backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` on the connection thread.
  async fn with_conn<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
  {
    self.conn.call(move |conn| Ok(f(conn))).await?
  }

  #[cfg(test)]
  pub(crate) fn connection(&self) -> &tokio_rusqlite::Connection { &self.conn }
}

// ─── Shared helpers ──────────────────────────────────────────────────────────

fn opt_text(v: Option<String>) -> Value { v.map_or(Value::Null, Value::Text) }

fn not_found(entity: EntityKind, id: Uuid) -> crate::Error {
  muster_core::Error::NotFound { entity, id }.into()
}

/// `None` if the entity does not exist, otherwise its `merged_into`.
fn merged_state(
  conn: &Connection,
  kind: MergeKind,
  id: Uuid,
) -> Result<Option<Option<Uuid>>> {
  let (table, column) = entity_table(kind);
  let row: Option<Option<String>> = conn
    .query_row(
      &format!("SELECT merged_into FROM {table} WHERE {column} = ?1"),
      [encode_uuid(id)],
      |r| r.get(0),
    )
    .optional()?;
  row.map(|m| decode_opt_uuid(m.as_deref())).transpose()
}

/// Fail unless the entity exists and has not been merged away.
pub(crate) fn require_active(conn: &Connection, kind: MergeKind, id: Uuid) -> Result<()> {
  match merged_state(conn, kind, id)? {
    None => Err(not_found(kind.into(), id)),
    Some(Some(into)) => Err(muster_core::Error::AlreadyMerged { id, into }.into()),
    Some(None) => Ok(()),
  }
}

/// Build ` LIMIT ?n OFFSET ?m`, pushing the values onto `params`.
fn paging(params: &mut Vec<Value>, limit: Option<usize>, offset: Option<usize>) -> String {
  let limit = limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));
  let offset = offset.map_or(0, |o| i64::try_from(o).unwrap_or(i64::MAX));
  params.push(Value::Integer(limit));
  params.push(Value::Integer(offset));
  format!(" LIMIT ?{} OFFSET ?{}", params.len() - 1, params.len())
}

/// `LIKE` pattern matching values that start with `prefix`.
fn prefix_pattern(prefix: &str) -> String {
  let escaped = prefix
    .replace('\\', "\\\\")
    .replace('%', "\\%")
    .replace('_', "\\_");
  format!("{escaped}%")
}

// ─── People ──────────────────────────────────────────────────────────────────

fn select_person(conn: &Connection, id: Uuid) -> Result<Option<Person>> {
  conn
    .query_row(
      &format!("SELECT {PERSON_COLUMNS} FROM people WHERE person_id = ?1"),
      [encode_uuid(id)],
      RawPerson::from_row,
    )
    .optional()?
    .map(RawPerson::into_person)
    .transpose()
}

fn fetch_person(conn: &Connection, id: Uuid) -> Result<Person> {
  select_person(conn, id)?.ok_or_else(|| not_found(EntityKind::Person, id))
}

fn write_person_fields(conn: &Connection, id: Uuid, input: &NewPerson) -> Result<()> {
  let [be, bl, de, dl] = [
    input.birth_earliest_date,
    input.birth_latest_date,
    input.death_earliest_date,
    input.death_latest_date,
  ]
  .map(encode_precision);

  conn.execute(
    "UPDATE people SET
       family_name = ?2, other_names = ?3, name_suffix = ?4, display_name = ?5,
       biography = ?6, notes = ?7, connection = ?8,
       birth_earliest_date = ?9,  birth_earliest_date_month_known = ?10, birth_earliest_date_day_known = ?11,
       birth_latest_date = ?12,   birth_latest_date_month_known = ?13,   birth_latest_date_day_known = ?14,
       death_earliest_date = ?15, death_earliest_date_month_known = ?16, death_earliest_date_day_known = ?17,
       death_latest_date = ?18,   death_latest_date_month_known = ?19,   death_latest_date_day_known = ?20
     WHERE person_id = ?1",
    rusqlite::params![
      encode_uuid(id),
      input.family_name,
      input.other_names,
      input.name_suffix,
      input.display_name,
      input.biography,
      input.notes,
      input.connection,
      be.0, be.1, be.2,
      bl.0, bl.1, bl.2,
      de.0, de.1, de.2,
      dl.0, dl.1, dl.2,
    ],
  )?;
  Ok(())
}

fn insert_person(
  conn: &mut Connection,
  id: Uuid,
  input: &NewPerson,
  status: PersonStatus,
  added_by: Option<String>,
  created_at: DateTime<Utc>,
) -> Result<Person> {
  let tx = conn.transaction()?;
  tx.execute(
    "INSERT INTO people (person_id, family_name, status, added_by, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5)",
    rusqlite::params![
      encode_uuid(id),
      input.family_name,
      status.as_ref(),
      added_by,
      encode_dt(created_at),
    ],
  )?;
  write_person_fields(&tx, id, input)?;
  let person = fetch_person(&tx, id)?;
  tx.commit()?;
  Ok(person)
}

fn query_people(conn: &Connection, q: &PersonQuery) -> Result<Vec<Person>> {
  let mut sql = format!("SELECT {PERSON_COLUMNS} FROM people WHERE 1 = 1");
  let mut params: Vec<Value> = Vec::new();
  if !q.include_merged {
    sql.push_str(&format!(" AND {ACTIVE}"));
  }
  if let Some(status) = q.status {
    params.push(Value::Text(status.to_string()));
    sql.push_str(&format!(" AND status = ?{}", params.len()));
  } else if !q.include_pending {
    params.push(Value::Text(PersonStatus::Pending.to_string()));
    sql.push_str(&format!(" AND status <> ?{}", params.len()));
  }
  if let Some(name) = q.family_name.as_deref().filter(|n| !n.is_empty()) {
    params.push(Value::Text(prefix_pattern(name)));
    sql.push_str(&format!(" AND family_name LIKE ?{} ESCAPE '\\'", params.len()));
  }
  sql.push_str(
    " ORDER BY family_name COLLATE NOCASE, other_names COLLATE NOCASE, created_at",
  );
  sql.push_str(&paging(&mut params, q.limit, q.offset));

  let mut stmt = conn.prepare(&sql)?;
  let rows = stmt
    .query_map(params_from_iter(params), RawPerson::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  rows.into_iter().map(RawPerson::into_person).collect()
}

/// Delete a person or organisation. Owned records and collection memberships
/// go with it through `ON DELETE CASCADE`; grants on the entity and on those
/// records are removed in the same transaction.
fn delete_entity(conn: &mut Connection, kind: MergeKind, id: Uuid) -> Result<()> {
  let (table, column) = entity_table(kind);
  if merged_state(conn, kind, id)?.is_none() {
    return Err(not_found(kind.into(), id));
  }
  let id_str = encode_uuid(id);
  let children: i64 = conn.query_row(
    &format!("SELECT COUNT(*) FROM {table} WHERE merged_into = ?1"),
    [&id_str],
    |r| r.get(0),
  )?;
  if children > 0 {
    return Err(muster_core::Error::HasMergedRecords(id).into());
  }

  let tx = conn.transaction()?;
  tx.execute("DELETE FROM object_permissions WHERE object_id = ?1", [&id_str])?;
  for record_kind in RecordKind::ALL {
    let owned_by = record_kind
      .links()
      .iter()
      .filter(|spec| spec.required && spec.role.target() == kind);
    for spec in owned_by {
      tx.execute(
        &format!(
          "DELETE FROM object_permissions WHERE object_id IN
             (SELECT record_id FROM {} WHERE {} = ?1)",
          record_table(record_kind),
          link_column(spec.role),
        ),
        [&id_str],
      )?;
    }
  }
  tx.execute(&format!("DELETE FROM {table} WHERE {column} = ?1"), [&id_str])?;
  tx.commit()?;
  Ok(())
}

// ─── Organisations ───────────────────────────────────────────────────────────

fn select_organisation(conn: &Connection, id: Uuid) -> Result<Option<Organisation>> {
  conn
    .query_row(
      &format!(
        "SELECT {ORGANISATION_COLUMNS} FROM organisations WHERE organisation_id = ?1"
      ),
      [encode_uuid(id)],
      RawOrganisation::from_row,
    )
    .optional()?
    .map(RawOrganisation::into_organisation)
    .transpose()
}

fn fetch_organisation(conn: &Connection, id: Uuid) -> Result<Organisation> {
  select_organisation(conn, id)?
    .ok_or_else(|| not_found(EntityKind::Organisation, id))
}

fn write_organisation_fields(
  conn: &Connection,
  id: Uuid,
  input: &NewOrganisation,
) -> Result<()> {
  conn.execute(
    "UPDATE organisations SET
       name = ?2, display_name = ?3, start_earliest_date = ?4, end_earliest_date = ?5
     WHERE organisation_id = ?1",
    rusqlite::params![
      encode_uuid(id),
      input.name,
      input.display_name,
      input.start_earliest_date.map(encode_date),
      input.end_earliest_date.map(encode_date),
    ],
  )?;
  Ok(())
}

fn query_organisations(
  conn: &Connection,
  q: &OrganisationQuery,
) -> Result<Vec<Organisation>> {
  let mut sql = format!("SELECT {ORGANISATION_COLUMNS} FROM organisations WHERE 1 = 1");
  let mut params: Vec<Value> = Vec::new();
  if !q.include_merged {
    sql.push_str(&format!(" AND {ACTIVE}"));
  }
  if let Some(name) = q.name.as_deref().filter(|n| !n.is_empty()) {
    params.push(Value::Text(prefix_pattern(name)));
    sql.push_str(&format!(" AND name LIKE ?{} ESCAPE '\\'", params.len()));
  }
  sql.push_str(" ORDER BY name COLLATE NOCASE, created_at");
  sql.push_str(&paging(&mut params, q.limit, q.offset));

  let mut stmt = conn.prepare(&sql)?;
  let rows = stmt
    .query_map(params_from_iter(params), RawOrganisation::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  rows.into_iter().map(RawOrganisation::into_organisation).collect()
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// Check the links a record is about to be written with: the right roles for
/// its kind, every target present and active, and any address it names.
fn check_links(conn: &Connection, input: &NewRecord) -> Result<()> {
  input.validate()?;
  for (role, id) in input.links.iter() {
    require_active(conn, role.target(), id)?;
  }
  if let RecordValue::PersonAddress(v) = &input.value {
    let exists = conn
      .query_row(
        "SELECT 1 FROM addresses WHERE address_id = ?1",
        [encode_uuid(v.address_id)],
        |_| Ok(()),
      )
      .optional()?
      .is_some();
    if !exists {
      return Err(not_found(EntityKind::Address, v.address_id));
    }
  }
  Ok(())
}

/// `(column, value)` for each link column the kind's table has.
fn link_values(kind: RecordKind, links: &Links) -> Vec<(&'static str, Value)> {
  kind
    .links()
    .iter()
    .map(|spec| {
      (link_column(spec.role), opt_text(links.get(spec.role).map(encode_uuid)))
    })
    .collect()
}

fn body_values(value: &RecordValue) -> Result<(Value, Value)> {
  let body = value.to_json()?.to_string();
  Ok((Value::Text(body), opt_text(value.sort_date().map(encode_date))))
}

fn select_record(conn: &Connection, kind: RecordKind, id: Uuid) -> Result<Option<Record>> {
  conn
    .query_row(
      &format!(
        "SELECT {} FROM {} WHERE record_id = ?1",
        record_columns(kind),
        record_table(kind)
      ),
      [encode_uuid(id)],
      RawRecord::from_row,
    )
    .optional()?
    .map(|raw| raw.into_record(kind))
    .transpose()
}

fn fetch_record(conn: &Connection, kind: RecordKind, id: Uuid) -> Result<Record> {
  select_record(conn, kind, id)?.ok_or_else(|| not_found(EntityKind::Record, id))
}

fn insert_record(
  conn: &Connection,
  id: Uuid,
  input: &NewRecord,
  added_by: Option<String>,
  created_at: DateTime<Utc>,
) -> Result<Record> {
  check_links(conn, input)?;
  let kind = input.kind();

  let mut columns = vec!["record_id"];
  let mut values = vec![Value::Text(encode_uuid(id))];
  for (column, value) in link_values(kind, &input.links) {
    columns.push(column);
    values.push(value);
  }
  let (body, sort_date) = body_values(&input.value)?;
  columns.extend(["body_json", "sort_date", "added_by", "created_at"]);
  values.extend([body, sort_date, opt_text(added_by), Value::Text(encode_dt(created_at))]);

  let placeholders = (1..=values.len())
    .map(|i| format!("?{i}"))
    .collect::<Vec<_>>()
    .join(", ");
  conn.execute(
    &format!(
      "INSERT INTO {} ({}) VALUES ({placeholders})",
      record_table(kind),
      columns.join(", ")
    ),
    params_from_iter(values),
  )?;
  fetch_record(conn, kind, id)
}

fn update_record_row(
  conn: &Connection,
  kind: RecordKind,
  id: Uuid,
  input: &NewRecord,
) -> Result<Record> {
  if input.kind() != kind {
    return Err(
      muster_core::Error::KindMismatch { expected: kind, found: input.kind() }.into(),
    );
  }
  if select_record(conn, kind, id)?.is_none() {
    return Err(not_found(EntityKind::Record, id));
  }
  check_links(conn, input)?;

  let mut sets = Vec::new();
  let mut values = Vec::new();
  for (column, value) in link_values(kind, &input.links) {
    values.push(value);
    sets.push(format!("{column} = ?{}", values.len()));
  }
  let (body, sort_date) = body_values(&input.value)?;
  values.push(body);
  sets.push(format!("body_json = ?{}", values.len()));
  values.push(sort_date);
  sets.push(format!("sort_date = ?{}", values.len()));
  values.push(Value::Text(encode_uuid(id)));

  conn.execute(
    &format!(
      "UPDATE {} SET {} WHERE record_id = ?{}",
      record_table(kind),
      sets.join(", "),
      values.len()
    ),
    params_from_iter(values),
  )?;
  fetch_record(conn, kind, id)
}

fn owner_role(owner: Owner) -> LinkRole {
  match owner.kind {
    MergeKind::Person => LinkRole::Person,
    MergeKind::Organisation => LinkRole::Organisation,
  }
}

fn records_for(
  conn: &Connection,
  owner: Owner,
  only: Option<RecordKind>,
) -> Result<Vec<Record>> {
  let role = owner_role(owner);
  let owner_id = encode_uuid(owner.id);
  let mut records = Vec::new();

  for kind in RecordKind::ALL {
    if only.is_some_and(|k| k != kind) || !kind.links().iter().any(|l| l.role == role)
    {
      continue;
    }
    let mut stmt = conn.prepare(&format!(
      "SELECT {} FROM {} WHERE {} = ?1",
      record_columns(kind),
      record_table(kind),
      link_column(role)
    ))?;
    let rows = stmt
      .query_map([&owner_id], RawRecord::from_row)?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    for raw in rows {
      records.push(raw.into_record(kind)?);
    }
  }

  // Undated records sort last.
  records.sort_by(|a, b| {
    (a.sort_date.is_none(), a.sort_date, a.created_at)
      .cmp(&(b.sort_date.is_none(), b.sort_date, b.created_at))
  });
  Ok(records)
}

// ─── Stories and images ──────────────────────────────────────────────────────

fn story_collection(kind: MergeKind) -> (&'static str, &'static str) {
  match kind {
    MergeKind::Person => ("person_stories", "person_id"),
    MergeKind::Organisation => ("organisation_stories", "organisation_id"),
  }
}

fn select_story(conn: &Connection, id: Uuid) -> Result<Option<Story>> {
  conn
    .query_row(
      &format!("SELECT {STORY_COLUMNS} FROM stories WHERE story_id = ?1"),
      [encode_uuid(id)],
      RawStory::from_row,
    )
    .optional()?
    .map(RawStory::into_story)
    .transpose()
}

fn query_stories(conn: &Connection, filter: &str, param: Option<String>) -> Result<Vec<Story>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {STORY_COLUMNS} FROM stories {filter} ORDER BY title COLLATE NOCASE, created_at"
  ))?;
  let rows = stmt
    .query_map(params_from_iter(param), RawStory::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  rows.into_iter().map(RawStory::into_story).collect()
}

fn link_story_row(conn: &Connection, owner: Owner, story_id: Uuid) -> Result<()> {
  require_active(conn, owner.kind, owner.id)?;
  if select_story(conn, story_id)?.is_none() {
    return Err(not_found(EntityKind::Story, story_id));
  }
  let (table, column) = story_collection(owner.kind);
  conn.execute(
    &format!("INSERT OR IGNORE INTO {table} ({column}, story_id) VALUES (?1, ?2)"),
    [encode_uuid(owner.id), encode_uuid(story_id)],
  )?;
  Ok(())
}

fn owners_of_story(conn: &Connection, story_id: Uuid) -> Result<Vec<Owner>> {
  let id = encode_uuid(story_id);
  let mut owners = Vec::new();
  for kind in [MergeKind::Person, MergeKind::Organisation] {
    let (table, column) = story_collection(kind);
    let mut stmt = conn.prepare(&format!(
      "SELECT {column} FROM {table} WHERE story_id = ?1 ORDER BY {column}"
    ))?;
    let ids = stmt
      .query_map([&id], |r| r.get::<_, String>(0))?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    for owner_id in ids {
      owners.push(Owner { kind, id: decode_uuid(&owner_id)? });
    }
  }
  Ok(owners)
}

// ─── MusterStore impl ────────────────────────────────────────────────────────

impl MusterStore for SqliteStore {
  type Error = crate::Error;

  // ── People ────────────────────────────────────────────────────────────────

  async fn add_person(
    &self,
    input: NewPerson,
    status: PersonStatus,
    added_by: Option<String>,
  ) -> Result<Person> {
    let id = Uuid::new_v4();
    let now = Utc::now();
    let person = self
      .with_conn(move |conn| insert_person(conn, id, &input, status, added_by, now))
      .await?;
    debug!(person_id = %id, %status, "added person");
    Ok(person)
  }

  async fn get_person(&self, id: Uuid) -> Result<Option<Person>> {
    self.with_conn(move |conn| select_person(conn, id)).await
  }

  async fn update_person(&self, id: Uuid, input: NewPerson) -> Result<Person> {
    self
      .with_conn(move |conn| {
        require_active(conn, MergeKind::Person, id)?;
        write_person_fields(conn, id, &input)?;
        fetch_person(conn, id)
      })
      .await
  }

  async fn set_person_status(&self, id: Uuid, status: PersonStatus) -> Result<Person> {
    let person = self
      .with_conn(move |conn| {
        require_active(conn, MergeKind::Person, id)?;
        conn.execute(
          "UPDATE people SET status = ?2 WHERE person_id = ?1",
          [encode_uuid(id), status.to_string()],
        )?;
        fetch_person(conn, id)
      })
      .await?;
    info!(person_id = %id, %status, "person status changed");
    Ok(person)
  }

  async fn delete_person(&self, id: Uuid) -> Result<()> {
    self
      .with_conn(move |conn| delete_entity(conn, MergeKind::Person, id))
      .await?;
    info!(person_id = %id, "deleted person");
    Ok(())
  }

  async fn list_people(&self, query: &PersonQuery) -> Result<Vec<Person>> {
    let query = query.clone();
    self.with_conn(move |conn| query_people(conn, &query)).await
  }

  // ── Organisations ─────────────────────────────────────────────────────────

  async fn add_organisation(
    &self,
    input: NewOrganisation,
    added_by: Option<String>,
  ) -> Result<Organisation> {
    let id = Uuid::new_v4();
    let now = Utc::now();
    let organisation = self
      .with_conn(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO organisations (organisation_id, name, added_by, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![encode_uuid(id), input.name, added_by, encode_dt(now)],
        )?;
        write_organisation_fields(&tx, id, &input)?;
        let organisation = fetch_organisation(&tx, id)?;
        tx.commit()?;
        Ok(organisation)
      })
      .await?;
    debug!(organisation_id = %id, "added organisation");
    Ok(organisation)
  }

  async fn get_organisation(&self, id: Uuid) -> Result<Option<Organisation>> {
    self.with_conn(move |conn| select_organisation(conn, id)).await
  }

  async fn update_organisation(
    &self,
    id: Uuid,
    input: NewOrganisation,
  ) -> Result<Organisation> {
    self
      .with_conn(move |conn| {
        require_active(conn, MergeKind::Organisation, id)?;
        write_organisation_fields(conn, id, &input)?;
        fetch_organisation(conn, id)
      })
      .await
  }

  async fn delete_organisation(&self, id: Uuid) -> Result<()> {
    self
      .with_conn(move |conn| delete_entity(conn, MergeKind::Organisation, id))
      .await?;
    info!(organisation_id = %id, "deleted organisation");
    Ok(())
  }

  async fn list_organisations(
    &self,
    query: &OrganisationQuery,
  ) -> Result<Vec<Organisation>> {
    let query = query.clone();
    self.with_conn(move |conn| query_organisations(conn, &query)).await
  }

  // ── Records ───────────────────────────────────────────────────────────────

  async fn add_record(
    &self,
    input: NewRecord,
    added_by: Option<String>,
  ) -> Result<Record> {
    let id = Uuid::new_v4();
    let now = Utc::now();
    let kind = input.kind();
    let record = self
      .with_conn(move |conn| insert_record(conn, id, &input, added_by, now))
      .await?;
    debug!(record_id = %id, %kind, "added record");
    Ok(record)
  }

  async fn get_record(&self, kind: RecordKind, id: Uuid) -> Result<Option<Record>> {
    self.with_conn(move |conn| select_record(conn, kind, id)).await
  }

  async fn update_record(
    &self,
    kind: RecordKind,
    id: Uuid,
    input: NewRecord,
  ) -> Result<Record> {
    self
      .with_conn(move |conn| update_record_row(conn, kind, id, &input))
      .await
  }

  async fn delete_record(&self, kind: RecordKind, id: Uuid) -> Result<()> {
    let rows = self
      .with_conn(move |conn| {
        let id = encode_uuid(id);
        conn.execute("DELETE FROM object_permissions WHERE object_id = ?1", [&id])?;
        Ok(conn.execute(
          &format!("DELETE FROM {} WHERE record_id = ?1", record_table(kind)),
          [&id],
        )?)
      })
      .await?;
    if rows == 0 {
      return Err(not_found(EntityKind::Record, id));
    }
    debug!(record_id = %id, %kind, "deleted record");
    Ok(())
  }

  async fn list_records(
    &self,
    owner: Owner,
    kind: Option<RecordKind>,
  ) -> Result<Vec<Record>> {
    self.with_conn(move |conn| records_for(conn, owner, kind)).await
  }

  // ── Stories and images ────────────────────────────────────────────────────

  async fn add_story(&self, input: NewStory, created_by: Option<String>) -> Result<Story> {
    let story = Story {
      story_id: Uuid::new_v4(),
      title: input.title,
      text: input.text,
      created_by,
      created_at: Utc::now(),
    };
    let row = story.clone();
    self
      .with_conn(move |conn| {
        conn.execute(
          &format!("INSERT INTO stories ({STORY_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5)"),
          rusqlite::params![
            encode_uuid(row.story_id),
            row.title,
            row.text,
            row.created_by,
            encode_dt(row.created_at),
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(story)
  }

  async fn get_story(&self, id: Uuid) -> Result<Option<Story>> {
    self.with_conn(move |conn| select_story(conn, id)).await
  }

  async fn list_stories(&self) -> Result<Vec<Story>> {
    self.with_conn(|conn| query_stories(conn, "", None)).await
  }

  async fn link_story(&self, owner: Owner, story_id: Uuid) -> Result<()> {
    self
      .with_conn(move |conn| link_story_row(conn, owner, story_id))
      .await
  }

  async fn stories_for(&self, owner: Owner) -> Result<Vec<Story>> {
    let (table, column) = story_collection(owner.kind);
    let filter =
      format!("WHERE story_id IN (SELECT story_id FROM {table} WHERE {column} = ?1)");
    self
      .with_conn(move |conn| query_stories(conn, &filter, Some(encode_uuid(owner.id))))
      .await
  }

  async fn story_owners(&self, story_id: Uuid) -> Result<Vec<Owner>> {
    self.with_conn(move |conn| owners_of_story(conn, story_id)).await
  }

  async fn link_image(&self, person_id: Uuid, image_id: Uuid) -> Result<()> {
    self
      .with_conn(move |conn| {
        require_active(conn, MergeKind::Person, person_id)?;
        conn.execute(
          "INSERT OR IGNORE INTO person_images (person_id, image_id) VALUES (?1, ?2)",
          [encode_uuid(person_id), encode_uuid(image_id)],
        )?;
        Ok(())
      })
      .await
  }

  async fn images_for(&self, person_id: Uuid) -> Result<Vec<Uuid>> {
    self
      .with_conn(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT image_id FROM person_images WHERE person_id = ?1 ORDER BY image_id",
        )?;
        let ids = stmt
          .query_map([encode_uuid(person_id)], |r| r.get::<_, String>(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        ids.iter().map(|s| decode_uuid(s)).collect()
      })
      .await
  }

  // ── Addresses ─────────────────────────────────────────────────────────────

  async fn add_address(&self, input: NewAddress) -> Result<Address> {
    let address = Address {
      address_id:    Uuid::new_v4(),
      building_name: input.building_name,
      street_number: input.street_number,
      street_name:   input.street_name,
      place_name:    input.place_name,
    };
    let row = address.clone();
    self
      .with_conn(move |conn| {
        conn.execute(
          &format!("INSERT INTO addresses ({ADDRESS_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5)"),
          rusqlite::params![
            encode_uuid(row.address_id),
            row.building_name,
            row.street_number,
            row.street_name,
            row.place_name,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(address)
  }

  async fn get_address(&self, id: Uuid) -> Result<Option<Address>> {
    self
      .with_conn(move |conn| {
        conn
          .query_row(
            &format!("SELECT {ADDRESS_COLUMNS} FROM addresses WHERE address_id = ?1"),
            [encode_uuid(id)],
            RawAddress::from_row,
          )
          .optional()?
          .map(RawAddress::into_address)
          .transpose()
      })
      .await
  }

  // ── Namespaces ────────────────────────────────────────────────────────────

  async fn list_namespaces(&self) -> Result<Vec<Namespace>> {
    self
      .with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT prefix, uri FROM namespaces ORDER BY prefix")?;
        let rows = stmt
          .query_map([], |r| Ok(Namespace { prefix: r.get(0)?, uri: r.get(1)? }))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
  }

  async fn put_namespace(&self, namespace: Namespace) -> Result<Namespace> {
    let row = namespace.clone();
    self
      .with_conn(move |conn| {
        conn.execute(
          "INSERT INTO namespaces (prefix, uri) VALUES (?1, ?2)
           ON CONFLICT (prefix) DO UPDATE SET uri = excluded.uri",
          [row.prefix, row.uri],
        )?;
        Ok(())
      })
      .await?;
    info!(prefix = %namespace.prefix, uri = %namespace.uri, "namespace bound");
    Ok(namespace)
  }

  // ── Object permissions ────────────────────────────────────────────────────

  async fn grant_permission(
    &self,
    username: String,
    permission: String,
    object_id: Uuid,
  ) -> Result<()> {
    self
      .with_conn(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO object_permissions (username, permission, object_id)
           VALUES (?1, ?2, ?3)",
          [username, permission, encode_uuid(object_id)],
        )?;
        Ok(())
      })
      .await
  }

  async fn has_object_permission(
    &self,
    username: String,
    permission: String,
    object_id: Uuid,
  ) -> Result<bool> {
    self
      .with_conn(move |conn| {
        Ok(conn.query_row(
          "SELECT EXISTS (
             SELECT 1 FROM object_permissions
             WHERE username = ?1 AND permission = ?2 AND object_id = ?3
           )",
          [username, permission, encode_uuid(object_id)],
          |r| r.get::<_, bool>(0),
        )?)
      })
      .await
  }

  // ── Merge ─────────────────────────────────────────────────────────────────

  async fn merge(
    &self,
    kind: MergeKind,
    duplicate: Uuid,
    canonical: Uuid,
  ) -> Result<MergeReport> {
    let result = match check_distinct(duplicate, canonical) {
      Ok(()) => {
        self
          .with_conn(move |conn| merge::run(conn, kind, duplicate, canonical))
          .await
      }
      Err(e) => Err(e.into()),
    };

    match &result {
      Ok(report) => info!(
        %kind,
        %duplicate,
        %canonical,
        rows = report.rows_moved(),
        repointed = report.repointed,
        "merged"
      ),
      Err(e) => warn!(%kind, %duplicate, %canonical, error = %e, "merge rejected"),
    }
    result
  }
}
