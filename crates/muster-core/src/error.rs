//! Error types for `muster-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::{merge::EntityKind, record::RecordKind};

#[derive(Debug, Error)]
pub enum Error {
  /// The raw date string is not three integer components, or the `0-0-0`
  /// sentinel was used where a concrete date is required.
  #[error("malformed date: {0:?}")]
  MalformedDate(String),

  /// Three integers, but not a date that exists (or a zero where zero is not
  /// accepted).
  #[error("invalid date: {0:?}")]
  InvalidDate(String),

  #[error("cannot merge {0} into itself")]
  SameRecord(Uuid),

  #[error("{entity} not found: {id}")]
  NotFound { entity: EntityKind, id: Uuid },

  #[error("{id} has already been merged into {into}")]
  AlreadyMerged { id: Uuid, into: Uuid },

  #[error("rewriting {table} failed: {reason}")]
  RelationRewrite { table: String, reason: String },

  #[error("invalid links for {kind} record: {reason}")]
  InvalidLinks { kind: RecordKind, reason: String },

  #[error("expected a {expected} record, got {found}")]
  KindMismatch { expected: RecordKind, found: RecordKind },

  #[error("{0} still has records merged into it")]
  HasMergedRecords(Uuid),

  #[error("unknown record kind: {0:?}")]
  UnknownRecordKind(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// ─── Classification ──────────────────────────────────────────────────────────

/// Coarse error category used by outer layers to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
  NotFound,
  Invalid,
  Conflict,
  Internal,
}

/// Implemented by every error a [`crate::store::MusterStore`] can return.
pub trait Classify {
  fn class(&self) -> ErrorClass;
}

impl Classify for Error {
  fn class(&self) -> ErrorClass {
    match self {
      Self::NotFound { .. } | Self::AlreadyMerged { .. } => ErrorClass::NotFound,
      Self::MalformedDate(_)
      | Self::InvalidDate(_)
      | Self::SameRecord(_)
      | Self::InvalidLinks { .. }
      | Self::KindMismatch { .. }
      | Self::UnknownRecordKind(_) => ErrorClass::Invalid,
      Self::RelationRewrite { .. } | Self::HasMergedRecords(_) => {
        ErrorClass::Conflict
      }
      Self::Serialization(_) => ErrorClass::Internal,
    }
  }
}

impl Classify for std::convert::Infallible {
  fn class(&self) -> ErrorClass { match *self {} }
}
