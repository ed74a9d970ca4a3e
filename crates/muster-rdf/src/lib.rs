//! Linked-data export for Muster.
//!
//! Builds small RDF graphs describing people, organisations, stories and
//! records, and writes them as Turtle or N-Triples. Predicates are written as
//! CURIEs (`foaf:name`) and expanded through the store's prefix table, so an
//! edited namespace URI changes every published document. Every IRI is
//! checked when it enters a [`Graph`]; the writers come from `oxttl`. Pure
//! synchronous; no HTTP or database dependencies.

mod describe;
pub mod error;
mod graph;
mod serialize;

pub use describe::{
  Iris, describe_organisation, describe_organisations, describe_people,
  describe_person, describe_record, describe_story,
};
pub use error::{Error, Result};
pub use graph::{Format, Graph, Namespaces, Term, Triple, is_absolute_iri};
