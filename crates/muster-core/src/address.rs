//! Street addresses referenced by `person_address` records.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
  pub address_id:    Uuid,
  pub building_name: Option<String>,
  pub street_number: Option<String>,
  pub street_name:   Option<String>,
  pub place_name:    Option<String>,
}

impl Address {
  /// Single-line form, e.g. `"Rose Cottage, 12 High Street, Ashby"`.
  pub fn label(&self) -> String {
    let street = match (&self.street_number, &self.street_name) {
      (Some(n), Some(s)) => Some(format!("{n} {s}")),
      (None, Some(s)) => Some(s.clone()),
      (Some(n), None) => Some(n.clone()),
      (None, None) => None,
    };
    [self.building_name.clone(), street, self.place_name.clone()]
      .into_iter()
      .flatten()
      .filter(|s| !s.is_empty())
      .collect::<Vec<_>>()
      .join(", ")
  }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewAddress {
  pub building_name: Option<String>,
  pub street_number: Option<String>,
  pub street_name:   Option<String>,
  pub place_name:    Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn label_skips_missing_parts() {
    let address = Address {
      address_id:    Uuid::new_v4(),
      building_name: None,
      street_number: Some("12".into()),
      street_name:   Some("High Street".into()),
      place_name:    Some("Ashby".into()),
    };
    assert_eq!(address.label(), "12 High Street, Ashby");
  }
}
