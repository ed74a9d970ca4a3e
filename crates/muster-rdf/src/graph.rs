//! The graph model: IRIs, literals and the prefix table.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use muster_core::namespace::Namespace;
use oxrdf::{Literal, NamedNode};
pub use oxrdf::Triple;

use crate::{Error, Result};

const XSD_DATE: &str = "http://www.w3.org/2001/XMLSchema#date";

/// Whether `iri` is an absolute IRI that can appear in published output.
pub fn is_absolute_iri(iri: &str) -> bool { NamedNode::new(iri).is_ok() }

pub(crate) fn named_node(iri: &str) -> Result<NamedNode> {
  NamedNode::new(iri).map_err(|e| Error::InvalidIri {
    iri:    iri.to_owned(),
    reason: e.to_string(),
  })
}

// ─── Terms ───────────────────────────────────────────────────────────────────

/// An object as the describe functions build it, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
  Iri(String),
  Literal {
    value:    String,
    datatype: Option<String>,
  },
}

impl Term {
  pub fn literal(value: impl Into<String>) -> Self {
    Self::Literal { value: value.into(), datatype: None }
  }

  pub fn date(date: NaiveDate) -> Self {
    Self::Literal {
      value:    date.format("%Y-%m-%d").to_string(),
      datatype: Some(XSD_DATE.to_owned()),
    }
  }

  fn into_rdf(self) -> Result<oxrdf::Term> {
    Ok(match self {
      Self::Iri(iri) => named_node(&iri)?.into(),
      Self::Literal { value, datatype: None } => Literal::new_simple_literal(value).into(),
      Self::Literal { value, datatype: Some(dt) } => {
        Literal::new_typed_literal(value, named_node(&dt)?).into()
      }
    })
  }
}

// ─── Namespaces ──────────────────────────────────────────────────────────────

/// Prefix → namespace URI bindings.
#[derive(Debug, Clone, Default)]
pub struct Namespaces {
  map: BTreeMap<String, String>,
}

impl Namespaces {
  pub fn new(namespaces: impl IntoIterator<Item = Namespace>) -> Self {
    Self {
      map: namespaces.into_iter().map(|n| (n.prefix, n.uri)).collect(),
    }
  }

  /// Expand `prefix:local` to a full IRI.
  pub fn expand(&self, curie: &str) -> Result<String> {
    let (prefix, local) = curie
      .split_once(':')
      .ok_or_else(|| Error::UnknownPrefix(curie.to_owned()))?;
    let uri = self
      .map
      .get(prefix)
      .ok_or_else(|| Error::UnknownPrefix(prefix.to_owned()))?;
    Ok(format!("{uri}{local}"))
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.map.iter().map(|(p, u)| (p.as_str(), u.as_str()))
  }
}

// ─── Graph ───────────────────────────────────────────────────────────────────

/// An ordered set of triples bound to a prefix table.
#[derive(Debug, Clone)]
pub struct Graph {
  namespaces: Namespaces,
  triples:    Vec<Triple>,
  seen:       HashSet<Triple>,
}

impl Graph {
  pub fn new(namespaces: Namespaces) -> Self {
    Self { namespaces, triples: Vec::new(), seen: HashSet::new() }
  }

  pub fn namespaces(&self) -> &Namespaces { &self.namespaces }

  /// Triples in insertion order.
  pub fn triples(&self) -> &[Triple] { &self.triples }

  pub fn is_empty(&self) -> bool { self.triples.is_empty() }

  /// Add a triple whose predicate is given as a CURIE. Repeated triples are
  /// kept once; an invalid subject, predicate or object IRI is an error.
  pub fn add(&mut self, subject: &str, predicate: &str, object: Term) -> Result<()> {
    let predicate = self.namespaces.expand(predicate)?;
    let triple = Triple::new(named_node(subject)?, named_node(&predicate)?, object.into_rdf()?);
    if self.seen.insert(triple.clone()) {
      self.triples.push(triple);
    }
    Ok(())
  }

  /// `subject rdf:type class`, with `class` given as a CURIE.
  pub fn add_type(&mut self, subject: &str, class: &str) -> Result<()> {
    let class = self.namespaces.expand(class)?;
    self.add(subject, "rdf:type", Term::Iri(class))
  }

  pub fn add_literal(
    &mut self,
    subject: &str,
    predicate: &str,
    value: impl Into<String>,
  ) -> Result<()> {
    self.add(subject, predicate, Term::literal(value))
  }

  pub fn add_link(&mut self, subject: &str, predicate: &str, object: &str) -> Result<()> {
    self.add(subject, predicate, Term::Iri(object.to_owned()))
  }
}

// ─── Formats ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, strum::EnumString)]
pub enum Format {
  #[default]
  #[strum(serialize = "turtle", serialize = "ttl")]
  Turtle,
  #[strum(serialize = "ntriples", serialize = "nt")]
  NTriples,
}

impl Format {
  pub fn parse(s: &str) -> Result<Self> {
    s.to_ascii_lowercase()
      .parse()
      .map_err(|_| Error::UnknownFormat(s.to_owned()))
  }

  pub fn content_type(self) -> &'static str {
    match self {
      Self::Turtle => "text/turtle; charset=utf-8",
      Self::NTriples => "application/n-triples",
    }
  }

  pub fn write(self, graph: &Graph) -> Result<String> {
    match self {
      Self::Turtle => crate::serialize::to_turtle(graph),
      Self::NTriples => crate::serialize::to_ntriples(graph),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn namespaces() -> Namespaces {
    Namespaces::new([
      Namespace::new("foaf", "http://xmlns.com/foaf/0.1/"),
      Namespace::new("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
    ])
  }

  #[test]
  fn expand() {
    let ns = namespaces();
    assert_eq!(ns.expand("foaf:name").unwrap(), "http://xmlns.com/foaf/0.1/name");
    assert!(matches!(ns.expand("dc:title"), Err(Error::UnknownPrefix(p)) if p == "dc"));
    assert!(matches!(ns.expand("name"), Err(Error::UnknownPrefix(_))));
  }

  #[test]
  fn malformed_iris_never_enter_the_graph() {
    let mut g = Graph::new(Namespaces::new([
      Namespace::new("foaf", "http://xmlns.com/foaf/0.1/"),
      Namespace::new("ex", "http://ex.org/a> . <x> <y> \"z"),
    ]));
    let err = g.add_literal("http://example.org/p 1>", "foaf:name", "Ann").unwrap_err();
    assert!(matches!(err, Error::InvalidIri { .. }), "{err}");
    let err = g.add_literal("http://example.org/p/1", "ex:name", "Ann").unwrap_err();
    assert!(matches!(err, Error::InvalidIri { .. }), "{err}");
    let err = g.add_link("http://example.org/p/1", "foaf:page", "not an iri").unwrap_err();
    assert!(matches!(err, Error::InvalidIri { .. }), "{err}");
    assert!(g.is_empty());

    assert!(is_absolute_iri("http://purl.org/dc/terms/"));
    assert!(!is_absolute_iri("/relative/path"));
    assert!(!is_absolute_iri("http://ex.org/a> . <x>"));
  }

  #[test]
  fn duplicate_triples_are_dropped() {
    let mut g = Graph::new(namespaces());
    g.add_literal("http://example.org/p/1", "foaf:name", "Ann").unwrap();
    g.add_literal("http://example.org/p/1", "foaf:name", "Ann").unwrap();
    g.add_literal("http://example.org/p/2", "foaf:name", "Ann").unwrap();
    assert_eq!(g.triples().len(), 2);
  }

  #[test]
  fn formats() {
    assert_eq!(Format::parse("Turtle").unwrap(), Format::Turtle);
    assert_eq!(Format::parse("nt").unwrap(), Format::NTriples);
    assert!(matches!(Format::parse("rdfxml"), Err(Error::UnknownFormat(_))));
  }
}
