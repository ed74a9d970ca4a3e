//! Linked-data namespace prefixes.

use serde::{Deserialize, Serialize};

/// A `prefix → URI` binding used when publishing linked data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
  pub prefix: String,
  pub uri:    String,
}

impl Namespace {
  pub fn new(prefix: impl Into<String>, uri: impl Into<String>) -> Self {
    Self { prefix: prefix.into(), uri: uri.into() }
  }
}
