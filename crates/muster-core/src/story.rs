//! Stories: free-text narratives linked to people and organisations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Story {
  pub story_id:   Uuid,
  pub title:      String,
  pub text:       String,
  pub created_by: Option<String>,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewStory {
  pub title: String,
  #[serde(default)]
  pub text:  String,
}
