//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, calendar dates are ISO `YYYY-MM-DD`, and
//! UUIDs are hyphenated lowercase strings. Record payloads are compact JSON.

use std::str::FromStr as _;

use chrono::{DateTime, NaiveDate, Utc};
use muster_core::{
  address::Address,
  fuzzy_date::PrecisionDate,
  merge::MergeKind,
  organisation::Organisation,
  person::{Person, PersonStatus},
  record::{LinkRole, Links, Record, RecordKind, RecordValue},
  story::Story,
};
use rusqlite::Row;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn decode_opt_uuid(s: Option<&str>) -> Result<Option<Uuid>> {
  s.map(decode_uuid).transpose()
}

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("timestamp {s:?}: {e}")))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::Decode(format!("date {s:?}: {e}")))
}

pub fn decode_opt_date(s: Option<&str>) -> Result<Option<NaiveDate>> {
  s.map(decode_date).transpose()
}

/// `(date, month_known, day_known)` column triple for a partial date.
pub fn encode_precision(d: Option<PrecisionDate>) -> (Option<String>, bool, bool) {
  match d {
    Some(d) => (Some(encode_date(d.date)), d.month_known, d.day_known),
    None => (None, false, false),
  }
}

pub fn decode_precision(
  date: Option<&str>,
  month_known: bool,
  day_known: bool,
) -> Result<Option<PrecisionDate>> {
  Ok(decode_opt_date(date)?.map(|date| PrecisionDate { date, month_known, day_known }))
}

pub fn decode_status(s: &str) -> Result<PersonStatus> {
  PersonStatus::from_str(s).map_err(|_| Error::Decode(format!("unknown status: {s:?}")))
}

// ─── Table names ─────────────────────────────────────────────────────────────

pub fn record_table(kind: RecordKind) -> &'static str {
  match kind {
    RecordKind::AlternativeName => "alternative_names",
    RecordKind::LifeEvent => "life_events",
    RecordKind::Birth => "births",
    RecordKind::Death => "deaths",
    RecordKind::Rank => "ranks",
    RecordKind::ServiceNumber => "service_numbers",
    RecordKind::PersonAddress => "person_addresses",
    RecordKind::AssociatedPerson => "person_people",
    RecordKind::AssociatedOrganisation => "person_organisations",
    RecordKind::AssociatedSource => "person_sources",
    RecordKind::AssociatedPlace => "person_places",
    RecordKind::AssociatedEvent => "person_events",
    RecordKind::AssociatedObject => "person_objects",
    RecordKind::MemorialName => "memorial_names",
    RecordKind::MemorialPerson => "memorial_people",
    RecordKind::SourceCreator => "source_people",
    RecordKind::OrganisationSource => "organisation_sources",
    RecordKind::MemorialOrganisation => "memorial_organisations",
  }
}

/// Link column names match the JSON field names.
pub fn link_column(role: LinkRole) -> &'static str { role.field() }

/// `(table, id column)` of a mergeable entity.
pub fn entity_table(kind: MergeKind) -> (&'static str, &'static str) {
  match kind {
    MergeKind::Person => ("people", "person_id"),
    MergeKind::Organisation => ("organisations", "organisation_id"),
  }
}

/// The `SELECT` list read by [`RawRecord::from_row`]. Link columns a table
/// does not have are selected as `NULL` so every table decodes the same way.
pub fn record_columns(kind: RecordKind) -> String {
  let links = [LinkRole::Person, LinkRole::AssociatedPerson, LinkRole::Organisation]
    .map(|role| {
      if kind.links().iter().any(|l| l.role == role) {
        link_column(role).to_owned()
      } else {
        format!("NULL AS {}", link_column(role))
      }
    })
    .join(", ");
  format!("record_id, {links}, body_json, sort_date, added_by, created_at")
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `people` row.
pub struct RawPerson {
  pub person_id:    String,
  pub family_name:  String,
  pub other_names:  Option<String>,
  pub name_suffix:  Option<String>,
  pub display_name: Option<String>,
  pub status:       String,
  pub biography:    Option<String>,
  pub notes:        Option<String>,
  pub connection:   Option<String>,
  pub dates:        [(Option<String>, bool, bool); 4],
  pub merged_into:  Option<String>,
  pub added_by:     Option<String>,
  pub created_at:   String,
}

pub const PERSON_COLUMNS: &str = "person_id, family_name, other_names, \
  name_suffix, display_name, status, biography, notes, connection, \
  birth_earliest_date, birth_earliest_date_month_known, birth_earliest_date_day_known, \
  birth_latest_date, birth_latest_date_month_known, birth_latest_date_day_known, \
  death_earliest_date, death_earliest_date_month_known, death_earliest_date_day_known, \
  death_latest_date, death_latest_date_month_known, death_latest_date_day_known, \
  merged_into, added_by, created_at";

impl RawPerson {
  /// Read a row selected with [`PERSON_COLUMNS`].
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    let date = |i: usize| -> rusqlite::Result<(Option<String>, bool, bool)> {
      Ok((row.get(i)?, row.get(i + 1)?, row.get(i + 2)?))
    };
    Ok(Self {
      person_id:    row.get(0)?,
      family_name:  row.get(1)?,
      other_names:  row.get(2)?,
      name_suffix:  row.get(3)?,
      display_name: row.get(4)?,
      status:       row.get(5)?,
      biography:    row.get(6)?,
      notes:        row.get(7)?,
      connection:   row.get(8)?,
      dates:        [date(9)?, date(12)?, date(15)?, date(18)?],
      merged_into:  row.get(21)?,
      added_by:     row.get(22)?,
      created_at:   row.get(23)?,
    })
  }

  pub fn into_person(self) -> Result<Person> {
    let [be, bl, de, dl] = self.dates;
    let precision = |(d, m, day): (Option<String>, bool, bool)| {
      decode_precision(d.as_deref(), m, day)
    };
    Ok(Person {
      person_id:           decode_uuid(&self.person_id)?,
      family_name:         self.family_name,
      other_names:         self.other_names,
      name_suffix:         self.name_suffix,
      display_name:        self.display_name,
      status:              decode_status(&self.status)?,
      biography:           self.biography,
      notes:               self.notes,
      connection:          self.connection,
      birth_earliest_date: precision(be)?,
      birth_latest_date:   precision(bl)?,
      death_earliest_date: precision(de)?,
      death_latest_date:   precision(dl)?,
      merged_into:         decode_opt_uuid(self.merged_into.as_deref())?,
      added_by:            self.added_by,
      created_at:          decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from an `organisations` row.
pub struct RawOrganisation {
  pub organisation_id:     String,
  pub name:                String,
  pub display_name:        Option<String>,
  pub start_earliest_date: Option<String>,
  pub end_earliest_date:   Option<String>,
  pub merged_into:         Option<String>,
  pub added_by:            Option<String>,
  pub created_at:          String,
}

pub const ORGANISATION_COLUMNS: &str = "organisation_id, name, display_name, \
  start_earliest_date, end_earliest_date, merged_into, added_by, created_at";

impl RawOrganisation {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      organisation_id:     row.get(0)?,
      name:                row.get(1)?,
      display_name:        row.get(2)?,
      start_earliest_date: row.get(3)?,
      end_earliest_date:   row.get(4)?,
      merged_into:         row.get(5)?,
      added_by:            row.get(6)?,
      created_at:          row.get(7)?,
    })
  }

  pub fn into_organisation(self) -> Result<Organisation> {
    Ok(Organisation {
      organisation_id:     decode_uuid(&self.organisation_id)?,
      name:                self.name,
      display_name:        self.display_name,
      start_earliest_date: decode_opt_date(self.start_earliest_date.as_deref())?,
      end_earliest_date:   decode_opt_date(self.end_earliest_date.as_deref())?,
      merged_into:         decode_opt_uuid(self.merged_into.as_deref())?,
      added_by:            self.added_by,
      created_at:          decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read from any record table via [`record_columns`].
pub struct RawRecord {
  pub record_id:            String,
  pub person_id:            Option<String>,
  pub associated_person_id: Option<String>,
  pub organisation_id:      Option<String>,
  pub body_json:            String,
  pub sort_date:            Option<String>,
  pub added_by:             Option<String>,
  pub created_at:           String,
}

impl RawRecord {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      record_id:            row.get(0)?,
      person_id:            row.get(1)?,
      associated_person_id: row.get(2)?,
      organisation_id:      row.get(3)?,
      body_json:            row.get(4)?,
      sort_date:            row.get(5)?,
      added_by:             row.get(6)?,
      created_at:           row.get(7)?,
    })
  }

  pub fn into_record(self, kind: RecordKind) -> Result<Record> {
    let body: serde_json::Value = serde_json::from_str(&self.body_json)?;
    Ok(Record {
      record_id: decode_uuid(&self.record_id)?,
      kind,
      links: Links {
        person_id:            decode_opt_uuid(self.person_id.as_deref())?,
        associated_person_id: decode_opt_uuid(self.associated_person_id.as_deref())?,
        organisation_id:      decode_opt_uuid(self.organisation_id.as_deref())?,
      },
      value: RecordValue::from_parts(kind, body)?,
      sort_date: decode_opt_date(self.sort_date.as_deref())?,
      added_by: self.added_by,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `stories` row.
pub struct RawStory {
  pub story_id:   String,
  pub title:      String,
  pub text:       String,
  pub created_by: Option<String>,
  pub created_at: String,
}

pub const STORY_COLUMNS: &str = "story_id, title, text, created_by, created_at";

impl RawStory {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      story_id:   row.get(0)?,
      title:      row.get(1)?,
      text:       row.get(2)?,
      created_by: row.get(3)?,
      created_at: row.get(4)?,
    })
  }

  pub fn into_story(self) -> Result<Story> {
    Ok(Story {
      story_id:   decode_uuid(&self.story_id)?,
      title:      self.title,
      text:       self.text,
      created_by: self.created_by,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawAddress {
  pub address_id:    String,
  pub building_name: Option<String>,
  pub street_number: Option<String>,
  pub street_name:   Option<String>,
  pub place_name:    Option<String>,
}

pub const ADDRESS_COLUMNS: &str =
  "address_id, building_name, street_number, street_name, place_name";

impl RawAddress {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      address_id:    row.get(0)?,
      building_name: row.get(1)?,
      street_number: row.get(2)?,
      street_name:   row.get(3)?,
      place_name:    row.get(4)?,
    })
  }

  pub fn into_address(self) -> Result<Address> {
    Ok(Address {
      address_id:    decode_uuid(&self.address_id)?,
      building_name: self.building_name,
      street_number: self.street_number,
      street_name:   self.street_name,
      place_name:    self.place_name,
    })
  }
}
