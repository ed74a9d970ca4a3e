//! Organisations: units, clubs, employers and other bodies people belonged to.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organisation {
  pub organisation_id:     Uuid,
  pub name:                String,
  pub display_name:        Option<String>,
  pub start_earliest_date: Option<NaiveDate>,
  pub end_earliest_date:   Option<NaiveDate>,
  pub merged_into:         Option<Uuid>,
  pub added_by:            Option<String>,
  pub created_at:          DateTime<Utc>,
}

impl Organisation {
  pub fn is_active(&self) -> bool { self.merged_into.is_none() }

  pub fn label(&self) -> &str {
    self
      .display_name
      .as_deref()
      .filter(|s| !s.is_empty())
      .unwrap_or(&self.name)
  }
}

#[derive(Debug, Clone, Default)]
pub struct NewOrganisation {
  pub name:                String,
  pub display_name:        Option<String>,
  pub start_earliest_date: Option<NaiveDate>,
  pub end_earliest_date:   Option<NaiveDate>,
}

impl NewOrganisation {
  pub fn new(name: impl Into<String>) -> Self {
    Self { name: name.into(), ..Default::default() }
  }
}
