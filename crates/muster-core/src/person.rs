//! People: the central entity of the register.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fuzzy_date::PrecisionDate;

/// Editorial state of a person record.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PersonStatus {
  /// Suggested by a member of the public, awaiting review.
  Pending,
  /// Reviewed and confirmed as a service person.
  Confirmed,
  /// Entered directly by an editor; not a service person.
  #[default]
  NonService,
}

/// A stored person.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
  pub person_id:           Uuid,
  pub family_name:         String,
  pub other_names:         Option<String>,
  pub name_suffix:         Option<String>,
  pub display_name:        Option<String>,
  pub status:              PersonStatus,
  pub biography:           Option<String>,
  pub notes:               Option<String>,
  /// How the person is connected to the local area.
  pub connection:          Option<String>,
  pub birth_earliest_date: Option<PrecisionDate>,
  pub birth_latest_date:   Option<PrecisionDate>,
  pub death_earliest_date: Option<PrecisionDate>,
  pub death_latest_date:   Option<PrecisionDate>,
  /// Set once, when this record is merged into a canonical one.
  pub merged_into:         Option<Uuid>,
  pub added_by:            Option<String>,
  pub created_at:          DateTime<Utc>,
}

impl Person {
  pub fn is_active(&self) -> bool { self.merged_into.is_none() }

  /// The label used in listings and linked data.
  pub fn label(&self) -> String {
    if let Some(display) = self.display_name.as_deref().filter(|s| !s.is_empty())
    {
      return display.to_owned();
    }
    let mut label = self.family_name.clone();
    if let Some(other) = self.other_names.as_deref().filter(|s| !s.is_empty()) {
      label.push_str(", ");
      label.push_str(other);
    }
    if let Some(suffix) = self.name_suffix.as_deref().filter(|s| !s.is_empty()) {
      label.push(' ');
      label.push_str(suffix);
    }
    label
  }
}

/// Input for creating or replacing a person's editable fields.
///
/// Status, `merged_into` and provenance are managed by dedicated operations.
#[derive(Debug, Clone, Default)]
pub struct NewPerson {
  pub family_name:         String,
  pub other_names:         Option<String>,
  pub name_suffix:         Option<String>,
  pub display_name:        Option<String>,
  pub biography:           Option<String>,
  pub notes:               Option<String>,
  pub connection:          Option<String>,
  pub birth_earliest_date: Option<PrecisionDate>,
  pub birth_latest_date:   Option<PrecisionDate>,
  pub death_earliest_date: Option<PrecisionDate>,
  pub death_latest_date:   Option<PrecisionDate>,
}

impl NewPerson {
  pub fn new(family_name: impl Into<String>) -> Self {
    Self { family_name: family_name.into(), ..Default::default() }
  }
}

#[cfg(test)]
mod tests {
  use std::str::FromStr as _;

  use super::*;

  fn person(family: &str, other: Option<&str>) -> Person {
    Person {
      person_id:           Uuid::new_v4(),
      family_name:         family.into(),
      other_names:         other.map(Into::into),
      name_suffix:         None,
      display_name:        None,
      status:              PersonStatus::Confirmed,
      biography:           None,
      notes:               None,
      connection:          None,
      birth_earliest_date: None,
      birth_latest_date:   None,
      death_earliest_date: None,
      death_latest_date:   None,
      merged_into:         None,
      added_by:            None,
      created_at:          Utc::now(),
    }
  }

  #[test]
  fn label_prefers_display_name() {
    let mut p = person("Smith", Some("John Henry"));
    assert_eq!(p.label(), "Smith, John Henry");
    p.display_name = Some("Jack Smith".into());
    assert_eq!(p.label(), "Jack Smith");
  }

  #[test]
  fn status_strings() {
    assert_eq!(PersonStatus::NonService.to_string(), "non_service");
    assert_eq!(
      PersonStatus::from_str("pending").unwrap(),
      PersonStatus::Pending
    );
    assert_eq!(PersonStatus::default(), PersonStatus::NonService);
  }
}
