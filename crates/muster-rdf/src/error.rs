//! Error types for the linked-data writers.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown namespace prefix: {0:?}")]
  UnknownPrefix(String),

  #[error("unknown RDF format: {0:?}")]
  UnknownFormat(String),

  #[error("invalid IRI {iri:?}: {reason}")]
  InvalidIri { iri: String, reason: String },

  #[error(transparent)]
  Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
