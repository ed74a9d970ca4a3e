//! Records: the rows a person or organisation owns.
//!
//! Every record kind lives in its own table and points at its owner(s)
//! through typed link columns. The descriptive payload is a [`RecordValue`]
//! whose variant name is the kind discriminant, mirroring how the payload is
//! stored (`kind` + JSON body).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  form::{
    ASSOCIATED_ORGANISATION_DATES, DateField, LIFE_EVENT_DATES, SHORT_DATES,
    VITAL_DATES,
  },
  fuzzy_date::PrecisionDate,
  merge::MergeKind,
};

// ─── Kinds ───────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
  strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RecordKind {
  AlternativeName,
  LifeEvent,
  Birth,
  Death,
  Rank,
  ServiceNumber,
  PersonAddress,
  AssociatedPerson,
  AssociatedOrganisation,
  AssociatedSource,
  AssociatedPlace,
  AssociatedEvent,
  AssociatedObject,
  MemorialName,
  MemorialPerson,
  SourceCreator,
  OrganisationSource,
  MemorialOrganisation,
}

/// The column a record uses to point at a person or organisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkRole {
  Person,
  /// The other side of a person-to-person association.
  AssociatedPerson,
  Organisation,
}

impl LinkRole {
  /// Which entity the link refers to.
  pub fn target(self) -> MergeKind {
    match self {
      Self::Person | Self::AssociatedPerson => MergeKind::Person,
      Self::Organisation => MergeKind::Organisation,
    }
  }

  /// Field name in forms and JSON bodies.
  pub fn field(self) -> &'static str {
    match self {
      Self::Person => "person_id",
      Self::AssociatedPerson => "associated_person_id",
      Self::Organisation => "organisation_id",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkSpec {
  pub role:     LinkRole,
  pub required: bool,
}

const PERSON_LINK: &[LinkSpec] =
  &[LinkSpec { role: LinkRole::Person, required: true }];
const ORGANISATION_LINK: &[LinkSpec] =
  &[LinkSpec { role: LinkRole::Organisation, required: true }];
const PERSON_PERSON_LINKS: &[LinkSpec] = &[
  LinkSpec { role: LinkRole::Person, required: true },
  LinkSpec { role: LinkRole::AssociatedPerson, required: false },
];
const PERSON_ORGANISATION_LINKS: &[LinkSpec] = &[
  LinkSpec { role: LinkRole::Person, required: true },
  LinkSpec { role: LinkRole::Organisation, required: true },
];

impl RecordKind {
  pub const ALL: [RecordKind; 18] = [
    Self::AlternativeName,
    Self::LifeEvent,
    Self::Birth,
    Self::Death,
    Self::Rank,
    Self::ServiceNumber,
    Self::PersonAddress,
    Self::AssociatedPerson,
    Self::AssociatedOrganisation,
    Self::AssociatedSource,
    Self::AssociatedPlace,
    Self::AssociatedEvent,
    Self::AssociatedObject,
    Self::MemorialName,
    Self::MemorialPerson,
    Self::SourceCreator,
    Self::OrganisationSource,
    Self::MemorialOrganisation,
  ];

  /// The links a record of this kind carries.
  pub fn links(self) -> &'static [LinkSpec] {
    match self {
      Self::AssociatedPerson => PERSON_PERSON_LINKS,
      Self::AssociatedOrganisation => PERSON_ORGANISATION_LINKS,
      Self::OrganisationSource | Self::MemorialOrganisation => ORGANISATION_LINK,
      _ => PERSON_LINK,
    }
  }

  /// Date fields edited through the partial-date widgets.
  pub fn date_fields(self) -> &'static [DateField] {
    match self {
      Self::LifeEvent => LIFE_EVENT_DATES,
      Self::Birth | Self::Death => VITAL_DATES,
      Self::Rank | Self::PersonAddress | Self::AssociatedPerson => SHORT_DATES,
      Self::AssociatedOrganisation => ASSOCIATED_ORGANISATION_DATES,
      _ => &[],
    }
  }

  /// Whether records of this kind can cite sources.
  pub fn has_sources(self) -> bool {
    matches!(
      self,
      Self::AlternativeName
        | Self::LifeEvent
        | Self::Birth
        | Self::Death
        | Self::Rank
        | Self::ServiceNumber
        | Self::PersonAddress
        | Self::AssociatedOrganisation
    )
  }

  /// Whether records of this kind can name places.
  pub fn has_places(self) -> bool { self == Self::LifeEvent }

  pub fn parse(s: &str) -> Result<Self> {
    s.parse().map_err(|_| Error::UnknownRecordKind(s.to_owned()))
  }
}

// ─── Links ───────────────────────────────────────────────────────────────────

/// The owner columns of a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Links {
  pub person_id:            Option<Uuid>,
  pub associated_person_id: Option<Uuid>,
  pub organisation_id:      Option<Uuid>,
}

impl Links {
  pub fn person(id: Uuid) -> Self { Self { person_id: Some(id), ..Self::default() } }

  pub fn organisation(id: Uuid) -> Self {
    Self { organisation_id: Some(id), ..Self::default() }
  }

  pub fn get(&self, role: LinkRole) -> Option<Uuid> {
    match role {
      LinkRole::Person => self.person_id,
      LinkRole::AssociatedPerson => self.associated_person_id,
      LinkRole::Organisation => self.organisation_id,
    }
  }

  /// Every link that is set, with its role.
  pub fn iter(&self) -> impl Iterator<Item = (LinkRole, Uuid)> + '_ {
    [LinkRole::Person, LinkRole::AssociatedPerson, LinkRole::Organisation]
      .into_iter()
      .filter_map(|role| self.get(role).map(|id| (role, id)))
  }

  /// Field-level problems with these links for `kind`.
  pub fn problems(&self, kind: RecordKind) -> Vec<(&'static str, &'static str)> {
    let specs = kind.links();
    let mut problems = Vec::new();
    for spec in specs {
      if spec.required && self.get(spec.role).is_none() {
        problems.push((spec.role.field(), "This field is required."));
      }
    }
    for (role, _) in self.iter() {
      if !specs.iter().any(|s| s.role == role) {
        problems.push((role.field(), "Not used by this record type."));
      }
    }
    problems
  }

  pub fn validate(&self, kind: RecordKind) -> Result<()> {
    match self.problems(kind).first() {
      None => Ok(()),
      Some((field, message)) => Err(Error::InvalidLinks {
        kind,
        reason: format!("{field}: {message}"),
      }),
    }
  }
}

// ─── Value payloads ──────────────────────────────────────────────────────────
//
// Kinds that can be cited carry `source_ids`: opaque ids in the neighbouring
// sources catalogue, like `LinkValue::target_id`.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeNameValue {
  pub family_name:  Option<String>,
  pub other_names:  Option<String>,
  pub display_name: Option<String>,
  /// Context such as "maiden name" or "known as".
  pub note:         Option<String>,
  #[serde(default)]
  pub source_ids:   Vec<Uuid>,
}

/// Anything that happened in a person's life with a (possibly vague) range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifeEventValue {
  pub label:               String,
  pub event_type:          Option<String>,
  pub description:         Option<String>,
  pub start_earliest_date: Option<PrecisionDate>,
  pub start_latest_date:   Option<PrecisionDate>,
  pub end_earliest_date:   Option<PrecisionDate>,
  pub end_latest_date:     Option<PrecisionDate>,
  #[serde(default)]
  pub source_ids:          Vec<Uuid>,
  /// Where it happened, as ids in the places catalogue.
  #[serde(default)]
  pub place_ids:           Vec<Uuid>,
}

/// A birth or a death.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalValue {
  /// Free-text place, as recorded in the source.
  pub location:            Option<String>,
  pub description:         Option<String>,
  pub start_earliest_date: Option<NaiveDate>,
  pub start_latest_date:   Option<NaiveDate>,
  pub end_earliest_date:   Option<NaiveDate>,
  pub end_latest_date:     Option<NaiveDate>,
  #[serde(default)]
  pub source_ids:          Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankValue {
  pub rank:                String,
  pub start_earliest_date: Option<NaiveDate>,
  pub end_earliest_date:   Option<NaiveDate>,
  #[serde(default)]
  pub source_ids:          Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceNumberValue {
  pub service_number: String,
  #[serde(default)]
  pub source_ids:     Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonAddressValue {
  pub address_id:          Uuid,
  pub start_earliest_date: Option<NaiveDate>,
  pub end_earliest_date:   Option<NaiveDate>,
  #[serde(default)]
  pub source_ids:          Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociatedPersonValue {
  /// e.g. "brother", "next of kin".
  pub association:         String,
  /// Name of the other party when they have no record of their own.
  pub associated_name:     Option<String>,
  pub start_earliest_date: Option<NaiveDate>,
  pub end_earliest_date:   Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociatedOrganisationValue {
  pub association:         Option<String>,
  pub position:            Option<String>,
  pub start_earliest_date: Option<PrecisionDate>,
  pub end_earliest_date:   Option<PrecisionDate>,
  #[serde(default)]
  pub source_ids:          Vec<Uuid>,
}

/// A link to an entity kept by a neighbouring catalogue (sources, places,
/// events, objects, memorials).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkValue {
  pub target_id:   Uuid,
  pub association: Option<String>,
  pub label:       Option<String>,
}

// ─── RecordValue ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum RecordValue {
  AlternativeName(AlternativeNameValue),
  LifeEvent(LifeEventValue),
  Birth(VitalValue),
  Death(VitalValue),
  Rank(RankValue),
  ServiceNumber(ServiceNumberValue),
  PersonAddress(PersonAddressValue),
  AssociatedPerson(AssociatedPersonValue),
  AssociatedOrganisation(AssociatedOrganisationValue),
  AssociatedSource(LinkValue),
  AssociatedPlace(LinkValue),
  AssociatedEvent(LinkValue),
  AssociatedObject(LinkValue),
  MemorialName(LinkValue),
  MemorialPerson(LinkValue),
  SourceCreator(LinkValue),
  OrganisationSource(LinkValue),
  MemorialOrganisation(LinkValue),
}

impl RecordValue {
  pub fn kind(&self) -> RecordKind {
    match self {
      Self::AlternativeName(_) => RecordKind::AlternativeName,
      Self::LifeEvent(_) => RecordKind::LifeEvent,
      Self::Birth(_) => RecordKind::Birth,
      Self::Death(_) => RecordKind::Death,
      Self::Rank(_) => RecordKind::Rank,
      Self::ServiceNumber(_) => RecordKind::ServiceNumber,
      Self::PersonAddress(_) => RecordKind::PersonAddress,
      Self::AssociatedPerson(_) => RecordKind::AssociatedPerson,
      Self::AssociatedOrganisation(_) => RecordKind::AssociatedOrganisation,
      Self::AssociatedSource(_) => RecordKind::AssociatedSource,
      Self::AssociatedPlace(_) => RecordKind::AssociatedPlace,
      Self::AssociatedEvent(_) => RecordKind::AssociatedEvent,
      Self::AssociatedObject(_) => RecordKind::AssociatedObject,
      Self::MemorialName(_) => RecordKind::MemorialName,
      Self::MemorialPerson(_) => RecordKind::MemorialPerson,
      Self::SourceCreator(_) => RecordKind::SourceCreator,
      Self::OrganisationSource(_) => RecordKind::OrganisationSource,
      Self::MemorialOrganisation(_) => RecordKind::MemorialOrganisation,
    }
  }

  /// Serialise the inner payload (without the type tag).
  pub fn to_json(&self) -> Result<serde_json::Value> {
    let full = serde_json::to_value(self)?;
    Ok(full.get("data").cloned().unwrap_or(serde_json::Value::Null))
  }

  /// Deserialise from a kind and the JSON payload stored for it.
  pub fn from_parts(kind: RecordKind, data: serde_json::Value) -> Result<Self> {
    let wrapped = serde_json::json!({ "type": kind.as_ref(), "data": data });
    Ok(serde_json::from_value(wrapped)?)
  }

  /// The date the record sorts by: its earliest start, if any.
  pub fn sort_date(&self) -> Option<NaiveDate> {
    match self {
      Self::LifeEvent(v) => v
        .start_earliest_date
        .or(v.start_latest_date)
        .map(|d| d.date),
      Self::Birth(v) | Self::Death(v) => {
        v.start_earliest_date.or(v.start_latest_date)
      }
      Self::Rank(v) => v.start_earliest_date,
      Self::PersonAddress(v) => v.start_earliest_date,
      Self::AssociatedPerson(v) => v.start_earliest_date,
      Self::AssociatedOrganisation(v) => v.start_earliest_date.map(|d| d.date),
      _ => None,
    }
  }

  /// Cited sources; empty for kinds that cannot cite any.
  pub fn source_ids(&self) -> &[Uuid] {
    match self {
      Self::AlternativeName(v) => &v.source_ids,
      Self::LifeEvent(v) => &v.source_ids,
      Self::Birth(v) | Self::Death(v) => &v.source_ids,
      Self::Rank(v) => &v.source_ids,
      Self::ServiceNumber(v) => &v.source_ids,
      Self::PersonAddress(v) => &v.source_ids,
      Self::AssociatedOrganisation(v) => &v.source_ids,
      _ => &[],
    }
  }

  pub fn place_ids(&self) -> &[Uuid] {
    match self {
      Self::LifeEvent(v) => &v.place_ids,
      _ => &[],
    }
  }

  /// Short human-readable label.
  pub fn label(&self) -> String {
    match self {
      Self::AlternativeName(v) => [&v.family_name, &v.other_names]
        .into_iter()
        .flatten()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", "),
      Self::LifeEvent(v) => v.label.clone(),
      Self::Birth(_) => "Birth".to_owned(),
      Self::Death(_) => "Death".to_owned(),
      Self::Rank(v) => v.rank.clone(),
      Self::ServiceNumber(v) => v.service_number.clone(),
      Self::PersonAddress(_) => "Address".to_owned(),
      Self::AssociatedPerson(v) => v.association.clone(),
      Self::AssociatedOrganisation(v) => {
        v.association.clone().unwrap_or_else(|| "Member".to_owned())
      }
      Self::AssociatedSource(v)
      | Self::AssociatedPlace(v)
      | Self::AssociatedEvent(v)
      | Self::AssociatedObject(v)
      | Self::MemorialName(v)
      | Self::MemorialPerson(v)
      | Self::SourceCreator(v)
      | Self::OrganisationSource(v)
      | Self::MemorialOrganisation(v) => v
        .label
        .clone()
        .or_else(|| v.association.clone())
        .unwrap_or_else(|| self.kind().to_string()),
    }
  }
}

// ─── Record ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
  pub record_id:  Uuid,
  pub kind:       RecordKind,
  #[serde(flatten)]
  pub links:      Links,
  pub value:      RecordValue,
  pub sort_date:  Option<NaiveDate>,
  pub added_by:   Option<String>,
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::MusterStore::add_record`] and
/// [`crate::store::MusterStore::update_record`].
#[derive(Debug, Clone)]
pub struct NewRecord {
  pub links: Links,
  pub value: RecordValue,
}

impl NewRecord {
  pub fn new(links: Links, value: RecordValue) -> Self { Self { links, value } }

  pub fn kind(&self) -> RecordKind { self.value.kind() }

  pub fn validate(&self) -> Result<()> { self.links.validate(self.kind()) }
}
