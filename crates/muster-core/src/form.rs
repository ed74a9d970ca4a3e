//! Form validation: raw edit-screen values in, typed inputs out.
//!
//! Each entity declares a table of its date fields. A single routine,
//! [`clean_dates`], walks that table and validates every raw value according
//! to the field's anchor and precision. Errors are collected per field so the
//! whole form can be redisplayed at once; nothing is produced unless every
//! field is valid.

use std::{collections::BTreeMap, fmt};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{
  fuzzy_date::{
    Anchor, NO_DATE, PrecisionDate, display_exact, display_fuzzy, parse_exact,
  },
  organisation::{NewOrganisation, Organisation},
  person::{NewPerson, Person},
  record::{Links, NewRecord, Record, RecordKind, RecordValue},
};

pub const INVALID_DATE: &str = "Invalid date.";
pub const REQUIRED: &str = "This field is required.";

// ─── Field errors ────────────────────────────────────────────────────────────

/// Validation messages keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
  pub fn add(&mut self, field: &str, message: impl Into<String>) {
    self.0.entry(field.to_owned()).or_default().push(message.into());
  }

  pub fn extend(&mut self, other: FieldErrors) {
    for (field, messages) in other.0 {
      self.0.entry(field).or_default().extend(messages);
    }
  }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn get(&self, field: &str) -> Option<&[String]> {
    self.0.get(field).map(Vec::as_slice)
  }

  pub fn fields(&self) -> impl Iterator<Item = &str> { self.0.keys().map(String::as_str) }

  /// `Ok(value)` when no errors were recorded.
  pub fn into_result<T>(self, value: T) -> Result<T, FieldErrors> {
    if self.is_empty() { Ok(value) } else { Err(self) }
  }
}

impl fmt::Display for FieldErrors {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let fields: Vec<&str> = self.fields().collect();
    write!(f, "invalid fields: {}", fields.join(", "))
  }
}

impl std::error::Error for FieldErrors {}

// ─── Date field tables ───────────────────────────────────────────────────────

/// How much of a date the field accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePrecision {
  /// Month and day may be zero; stored with precision flags.
  Fuzzy,
  /// Complete date or the `"0-0-0"` sentinel.
  Exact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateField {
  pub name:      &'static str,
  pub anchor:    Anchor,
  pub precision: DatePrecision,
}

impl DateField {
  pub const fn fuzzy(name: &'static str, anchor: Anchor) -> Self {
    Self { name, anchor, precision: DatePrecision::Fuzzy }
  }

  pub const fn exact(name: &'static str, anchor: Anchor) -> Self {
    Self { name, anchor, precision: DatePrecision::Exact }
  }
}

pub const PERSON_DATES: &[DateField] = &[
  DateField::fuzzy("birth_earliest_date", Anchor::Start),
  DateField::fuzzy("birth_latest_date", Anchor::End),
  DateField::fuzzy("death_earliest_date", Anchor::Start),
  DateField::fuzzy("death_latest_date", Anchor::End),
];

pub const ORGANISATION_DATES: &[DateField] = &[
  DateField::exact("start_earliest_date", Anchor::Start),
  DateField::exact("end_earliest_date", Anchor::Start),
];

pub const LIFE_EVENT_DATES: &[DateField] = &[
  DateField::fuzzy("start_earliest_date", Anchor::Start),
  DateField::fuzzy("start_latest_date", Anchor::End),
  DateField::fuzzy("end_earliest_date", Anchor::Start),
  DateField::fuzzy("end_latest_date", Anchor::End),
];

pub const VITAL_DATES: &[DateField] = &[
  DateField::exact("start_earliest_date", Anchor::Start),
  DateField::exact("start_latest_date", Anchor::End),
  DateField::exact("end_earliest_date", Anchor::Start),
  DateField::exact("end_latest_date", Anchor::End),
];

pub const SHORT_DATES: &[DateField] = &[
  DateField::exact("start_earliest_date", Anchor::Start),
  DateField::exact("end_earliest_date", Anchor::Start),
];

/// Both ends of a membership are "earliest" bounds, so both anchor at the start.
pub const ASSOCIATED_ORGANISATION_DATES: &[DateField] = &[
  DateField::fuzzy("start_earliest_date", Anchor::Start),
  DateField::fuzzy("end_earliest_date", Anchor::Start),
];

// ─── Cleaning ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanedDate {
  Fuzzy(Option<PrecisionDate>),
  Exact(Option<NaiveDate>),
}

impl CleanedDate {
  fn to_json(self) -> Value {
    let value = match self {
      Self::Fuzzy(d) => serde_json::to_value(d),
      Self::Exact(d) => serde_json::to_value(d),
    };
    value.unwrap_or(Value::Null)
  }
}

/// Validated dates keyed by field name.
#[derive(Debug, Clone, Default)]
pub struct CleanedDates(BTreeMap<&'static str, CleanedDate>);

impl CleanedDates {
  pub fn fuzzy(&self, name: &str) -> Option<PrecisionDate> {
    match self.0.get(name) {
      Some(CleanedDate::Fuzzy(d)) => *d,
      _ => None,
    }
  }

  pub fn exact(&self, name: &str) -> Option<NaiveDate> {
    match self.0.get(name) {
      Some(CleanedDate::Exact(d)) => *d,
      _ => None,
    }
  }

  pub fn iter(&self) -> impl Iterator<Item = (&'static str, CleanedDate)> + '_ {
    self.0.iter().map(|(name, date)| (*name, *date))
  }
}

/// Validate one raw value. Missing and empty values mean "no date".
pub fn clean_date(field: &DateField, raw: Option<&str>) -> crate::Result<CleanedDate> {
  let raw = raw.map(str::trim).filter(|s| !s.is_empty()).unwrap_or(NO_DATE);
  match field.precision {
    DatePrecision::Fuzzy => {
      PrecisionDate::encode(raw, field.anchor).map(CleanedDate::Fuzzy)
    }
    DatePrecision::Exact => parse_exact(raw).map(CleanedDate::Exact),
  }
}

/// Validate every field in `fields` against the raw values in `raw`.
pub fn clean_dates(
  fields: &'static [DateField],
  raw: &BTreeMap<String, String>,
) -> Result<CleanedDates, FieldErrors> {
  let mut cleaned = CleanedDates::default();
  let mut errors = FieldErrors::default();
  for field in fields {
    match clean_date(field, raw.get(field.name).map(String::as_str)) {
      Ok(date) => {
        cleaned.0.insert(field.name, date);
      }
      Err(_) => errors.add(field.name, INVALID_DATE),
    }
  }
  errors.into_result(cleaned)
}

/// Split the date fields out of a flattened request body. `null` means no
/// date; any other non-string value is reported against its field.
fn take_raw_dates(
  fields: &[DateField],
  values: &mut Map<String, Value>,
  errors: &mut FieldErrors,
) -> BTreeMap<String, String> {
  let mut raw = BTreeMap::new();
  for field in fields {
    match values.remove(field.name) {
      Some(Value::String(s)) => {
        raw.insert(field.name.to_owned(), s);
      }
      Some(Value::Null) | None => {}
      Some(_) => errors.add(field.name, INVALID_DATE),
    }
  }
  raw
}

fn blank(value: &Option<String>) -> Option<String> {
  value
    .as_deref()
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(str::to_owned)
}

fn required(errors: &mut FieldErrors, field: &str, value: &str) -> String {
  let value = value.trim();
  if value.is_empty() {
    errors.add(field, REQUIRED);
  }
  value.to_owned()
}

// ─── Person ──────────────────────────────────────────────────────────────────

/// Request body for creating or editing a person.
///
/// Date fields arrive as raw `"y-m-d"` strings under their own names
/// (`birth_earliest_date`, …). They are kept as JSON so a wrongly typed value
/// is reported on its field instead of failing the whole body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonForm {
  #[serde(default)]
  pub family_name:  String,
  pub other_names:  Option<String>,
  pub name_suffix:  Option<String>,
  pub display_name: Option<String>,
  pub biography:    Option<String>,
  pub notes:        Option<String>,
  pub connection:   Option<String>,
  #[serde(flatten)]
  pub dates:        Map<String, Value>,
}

impl PersonForm {
  pub fn clean(&self) -> Result<NewPerson, FieldErrors> {
    let mut errors = FieldErrors::default();
    let family_name = required(&mut errors, "family_name", &self.family_name);
    let raw = take_raw_dates(PERSON_DATES, &mut self.dates.clone(), &mut errors);
    let dates = clean_dates(PERSON_DATES, &raw).unwrap_or_else(|e| {
      errors.extend(e);
      CleanedDates::default()
    });

    errors.into_result(NewPerson {
      family_name,
      other_names: blank(&self.other_names),
      name_suffix: blank(&self.name_suffix),
      display_name: blank(&self.display_name),
      biography: blank(&self.biography),
      notes: blank(&self.notes),
      connection: blank(&self.connection),
      birth_earliest_date: dates.fuzzy("birth_earliest_date"),
      birth_latest_date: dates.fuzzy("birth_latest_date"),
      death_earliest_date: dates.fuzzy("death_earliest_date"),
      death_latest_date: dates.fuzzy("death_latest_date"),
    })
  }
}

impl From<&Person> for PersonForm {
  fn from(p: &Person) -> Self {
    let dates = [
      ("birth_earliest_date", &p.birth_earliest_date),
      ("birth_latest_date", &p.birth_latest_date),
      ("death_earliest_date", &p.death_earliest_date),
      ("death_latest_date", &p.death_latest_date),
    ]
    .into_iter()
    .map(|(name, date)| (name.to_owned(), Value::String(display_fuzzy(date.as_ref()))))
    .collect();

    Self {
      family_name: p.family_name.clone(),
      other_names: p.other_names.clone(),
      name_suffix: p.name_suffix.clone(),
      display_name: p.display_name.clone(),
      biography: p.biography.clone(),
      notes: p.notes.clone(),
      connection: p.connection.clone(),
      dates,
    }
  }
}

// ─── Organisation ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrganisationForm {
  #[serde(default)]
  pub name:         String,
  pub display_name: Option<String>,
  #[serde(flatten)]
  pub dates:        Map<String, Value>,
}

impl OrganisationForm {
  pub fn clean(&self) -> Result<NewOrganisation, FieldErrors> {
    let mut errors = FieldErrors::default();
    let name = required(&mut errors, "name", &self.name);
    let raw = take_raw_dates(ORGANISATION_DATES, &mut self.dates.clone(), &mut errors);
    let dates = clean_dates(ORGANISATION_DATES, &raw).unwrap_or_else(|e| {
      errors.extend(e);
      CleanedDates::default()
    });

    errors.into_result(NewOrganisation {
      name,
      display_name: blank(&self.display_name),
      start_earliest_date: dates.exact("start_earliest_date"),
      end_earliest_date: dates.exact("end_earliest_date"),
    })
  }
}

impl From<&Organisation> for OrganisationForm {
  fn from(o: &Organisation) -> Self {
    let dates = [
      ("start_earliest_date", o.start_earliest_date),
      ("end_earliest_date", o.end_earliest_date),
    ]
    .into_iter()
    .map(|(name, date)| (name.to_owned(), Value::String(display_exact(date))))
    .collect();

    Self { name: o.name.clone(), display_name: o.display_name.clone(), dates }
  }
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// Request body for creating or editing a record of any kind.
///
/// The kind comes from the route; the remaining fields are the kind's value
/// fields, with its date fields given as raw strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordForm {
  #[serde(flatten)]
  pub links:  Links,
  #[serde(flatten)]
  pub fields: Map<String, Value>,
}

impl RecordForm {
  pub fn clean(&self, kind: RecordKind) -> Result<NewRecord, FieldErrors> {
    let mut errors = FieldErrors::default();
    let mut data = self.fields.clone();
    let raw = take_raw_dates(kind.date_fields(), &mut data, &mut errors);

    match clean_dates(kind.date_fields(), &raw) {
      Ok(dates) => {
        for (name, date) in dates.iter() {
          data.insert(name.to_owned(), date.to_json());
        }
      }
      Err(e) => errors.extend(e),
    }

    for (field, message) in self.links.problems(kind) {
      errors.add(field, message);
    }

    let catalogue_fields = [
      ("source_ids", kind.has_sources()),
      ("place_ids", kind.has_places()),
    ];
    for (field, allowed) in catalogue_fields {
      if data.get(field).is_some_and(Value::is_null) {
        data.remove(field);
      }
      let problem = match data.get(field) {
        None => None,
        Some(_) if !allowed => Some("Not used by this record type."),
        Some(ids) => serde_json::from_value::<Vec<Uuid>>(ids.clone())
          .err()
          .map(|_| "Enter a list of valid ids."),
      };
      if let Some(message) = problem {
        errors.add(field, message);
      }
    }

    if !errors.is_empty() {
      return Err(errors);
    }

    match RecordValue::from_parts(kind, Value::Object(data)) {
      Ok(value) => Ok(NewRecord { links: self.links, value }),
      Err(e) => {
        errors.add("value", e.to_string());
        Err(errors)
      }
    }
  }

  /// The form that re-populates an edit screen for `record`.
  pub fn from_record(record: &Record) -> crate::Result<Self> {
    let mut fields = match record.value.to_json()? {
      Value::Object(map) => map,
      _ => Map::new(),
    };

    for field in record.kind.date_fields() {
      let stored = fields.remove(field.name).unwrap_or(Value::Null);
      let raw = match field.precision {
        DatePrecision::Fuzzy => {
          let date: Option<PrecisionDate> = serde_json::from_value(stored)?;
          display_fuzzy(date.as_ref())
        }
        DatePrecision::Exact => {
          let date: Option<NaiveDate> = serde_json::from_value(stored)?;
          display_exact(date)
        }
      };
      fields.insert(field.name.to_owned(), Value::String(raw));
    }

    Ok(Self { links: record.links, fields })
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use serde_json::json;

  use super::*;
  use crate::{person::PersonStatus, record::LifeEventValue};

  fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  fn raw(pairs: &[(&str, &str)]) -> Map<String, Value> {
    pairs
      .iter()
      .map(|(k, v)| ((*k).to_owned(), Value::from(*v)))
      .collect()
  }

  #[test]
  fn person_dates_follow_their_anchors() {
    let form = PersonForm {
      family_name: "Anderson".into(),
      dates: raw(&[
        ("birth_earliest_date", "1890-3-0"),
        ("birth_latest_date", "1890-3-0"),
        ("death_earliest_date", "1917-0-0"),
        ("death_latest_date", "0-0-0"),
      ]),
      ..Default::default()
    };
    let person = form.clean().unwrap();

    let earliest = person.birth_earliest_date.unwrap();
    assert_eq!(earliest.date, ymd(1890, 3, 1));
    let latest = person.birth_latest_date.unwrap();
    assert_eq!(latest.date, ymd(1890, 3, 31));
    assert!(latest.month_known && !latest.day_known);

    let death = person.death_earliest_date.unwrap();
    assert_eq!(death.date, ymd(1917, 1, 1));
    assert!(!death.month_known && !death.day_known);
    assert_eq!(person.death_latest_date, None);
  }

  #[test]
  fn each_bad_date_is_reported_on_its_field() {
    let form = PersonForm {
      family_name: " ".into(),
      dates: raw(&[
        ("birth_earliest_date", "1890-13-0"),
        ("death_latest_date", "not-a-date"),
        ("birth_latest_date", "1890-2-0"),
      ]),
      ..Default::default()
    };
    let errors = form.clean().unwrap_err();
    assert_eq!(errors.get("birth_earliest_date").unwrap(), [INVALID_DATE]);
    assert_eq!(errors.get("death_latest_date").unwrap(), [INVALID_DATE]);
    assert_eq!(errors.get("family_name").unwrap(), [REQUIRED]);
    assert!(errors.get("birth_latest_date").is_none());
  }

  #[test]
  fn person_form_decodes_stored_precision() {
    let stored = PersonForm {
      family_name: "Baker".into(),
      dates: raw(&[("birth_earliest_date", "1895-7-0")]),
      ..Default::default()
    }
    .clean()
    .unwrap();

    let person = Person {
      person_id:           Uuid::new_v4(),
      family_name:         stored.family_name,
      other_names:         None,
      name_suffix:         None,
      display_name:        None,
      status:              PersonStatus::Pending,
      biography:           None,
      notes:               None,
      connection:          None,
      birth_earliest_date: stored.birth_earliest_date,
      birth_latest_date:   None,
      death_earliest_date: None,
      death_latest_date:   None,
      merged_into:         None,
      added_by:            None,
      created_at:          Utc::now(),
    };

    let form = PersonForm::from(&person);
    assert_eq!(form.dates["birth_earliest_date"], "1895-7-0");
    assert_eq!(form.dates["death_latest_date"], NO_DATE);
  }

  #[test]
  fn exact_fields_reject_partial_dates() {
    let form = OrganisationForm {
      name: "1st Battalion".into(),
      dates: raw(&[("start_earliest_date", "1914-8-0")]),
      ..Default::default()
    };
    let errors = form.clean().unwrap_err();
    assert_eq!(errors.get("start_earliest_date").unwrap(), [INVALID_DATE]);

    let ok = OrganisationForm {
      name: "1st Battalion".into(),
      dates: raw(&[("start_earliest_date", "1914-8-19"), ("end_earliest_date", "0-0-0")]),
      ..Default::default()
    }
    .clean()
    .unwrap();
    assert_eq!(ok.start_earliest_date, Some(ymd(1914, 8, 19)));
    assert_eq!(ok.end_earliest_date, None);
  }

  #[test]
  fn person_form_reads_flat_json() {
    let form: PersonForm = serde_json::from_value(json!({
      "family_name": "Cole",
      "other_names": "Arthur",
      "birth_earliest_date": "1899-0-0",
    }))
    .unwrap();
    assert_eq!(form.dates.len(), 1);
    assert_eq!(form.other_names.as_deref(), Some("Arthur"));
  }

  #[test]
  fn wrongly_typed_dates_are_field_errors() {
    let form: PersonForm = serde_json::from_value(json!({
      "family_name": "Num",
      "birth_earliest_date": 1914,
      "birth_latest_date": null,
      "death_earliest_date": ["1916"],
    }))
    .unwrap();
    let errors = form.clean().unwrap_err();
    assert_eq!(errors.get("birth_earliest_date").unwrap(), [INVALID_DATE]);
    assert_eq!(errors.get("death_earliest_date").unwrap(), [INVALID_DATE]);
    assert!(errors.get("birth_latest_date").is_none());

    let form: OrganisationForm = serde_json::from_value(json!({
      "name": "Depot",
      "start_earliest_date": null,
      "end_earliest_date": false,
    }))
    .unwrap();
    let errors = form.clean().unwrap_err();
    assert_eq!(errors.fields().collect::<Vec<_>>(), ["end_earliest_date"]);

    let cleared: PersonForm =
      serde_json::from_value(json!({ "family_name": "Num", "birth_earliest_date": null }))
        .unwrap();
    assert_eq!(cleared.clean().unwrap().birth_earliest_date, None);
  }

  #[test]
  fn record_form_builds_a_life_event() {
    let person = Uuid::new_v4();
    let form: RecordForm = serde_json::from_value(json!({
      "person_id": person,
      "label": "Enlisted",
      "start_earliest_date": "1915-6-0",
      "start_latest_date": "1915-6-0",
    }))
    .unwrap();

    let record = form.clean(RecordKind::LifeEvent).unwrap();
    assert_eq!(record.links.person_id, Some(person));
    let RecordValue::LifeEvent(LifeEventValue {
      start_earliest_date,
      start_latest_date,
      end_latest_date,
      ..
    }) = record.value
    else {
      panic!("expected a life event");
    };
    assert_eq!(start_earliest_date.unwrap().date, ymd(1915, 6, 1));
    assert_eq!(start_latest_date.unwrap().date, ymd(1915, 6, 30));
    assert_eq!(end_latest_date, None);
  }

  #[test]
  fn record_form_carries_sources_and_places() {
    let person = Uuid::new_v4();
    let (source, place) = (Uuid::new_v4(), Uuid::new_v4());
    let form: RecordForm = serde_json::from_value(json!({
      "person_id": person,
      "label": "Wounded",
      "source_ids": [source],
      "place_ids": [place],
    }))
    .unwrap();
    let record = form.clean(RecordKind::LifeEvent).unwrap();
    assert_eq!(record.value.source_ids(), [source]);
    assert_eq!(record.value.place_ids(), [place]);

    let stored = Record {
      record_id:  Uuid::new_v4(),
      kind:       RecordKind::LifeEvent,
      links:      record.links,
      sort_date:  None,
      value:      record.value,
      added_by:   None,
      created_at: Utc::now(),
    };
    let edit = RecordForm::from_record(&stored).unwrap();
    assert_eq!(edit.fields["source_ids"], json!([source]));
    assert_eq!(edit.fields["place_ids"], json!([place]));

    let form: RecordForm = serde_json::from_value(json!({
      "person_id": person,
      "rank": "Private",
      "source_ids": ["not-an-id"],
      "place_ids": [place],
    }))
    .unwrap();
    let errors = form.clean(RecordKind::Rank).unwrap_err();
    assert_eq!(errors.get("source_ids").unwrap(), ["Enter a list of valid ids."]);
    assert_eq!(errors.get("place_ids").unwrap(), ["Not used by this record type."]);

    let cleared: RecordForm = serde_json::from_value(json!({
      "person_id": person,
      "rank": "Private",
      "source_ids": null,
    }))
    .unwrap();
    assert!(cleared.clean(RecordKind::Rank).unwrap().value.source_ids().is_empty());
  }

  #[test]
  fn record_form_reports_dates_links_and_payload() {
    let form: RecordForm = serde_json::from_value(json!({
      "rank": "Private",
      "start_earliest_date": 1916,
      "end_earliest_date": "1916-0-0",
    }))
    .unwrap();

    let errors = form.clean(RecordKind::Rank).unwrap_err();
    assert_eq!(errors.get("start_earliest_date").unwrap(), [INVALID_DATE]);
    assert_eq!(errors.get("end_earliest_date").unwrap(), [INVALID_DATE]);
    assert_eq!(errors.get("person_id").unwrap(), [REQUIRED]);

    let missing_rank: RecordForm =
      serde_json::from_value(json!({ "person_id": Uuid::new_v4() })).unwrap();
    let errors = missing_rank.clean(RecordKind::Rank).unwrap_err();
    assert!(errors.get("value").is_some());
  }
}
