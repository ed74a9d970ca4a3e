//! Turtle and N-Triples output through `oxttl`.

use std::collections::HashMap;

use oxrdf::Subject;
use oxttl::{NTriplesSerializer, TurtleSerializer};

use crate::{
  Error, Result,
  graph::{Graph, Triple},
};

pub(crate) fn to_ntriples(graph: &Graph) -> Result<String> {
  let mut writer = NTriplesSerializer::new().for_writer(Vec::new());
  for t in graph.triples() {
    writer.serialize_triple(t)?;
  }
  Ok(String::from_utf8_lossy(&writer.finish()).into_owned())
}

/// Triples regrouped so each subject's triples are adjacent, subjects in
/// first-seen order.
fn by_subject(triples: &[Triple]) -> impl Iterator<Item = &Triple> {
  let mut index: HashMap<&Subject, usize> = HashMap::new();
  let mut groups: Vec<Vec<&Triple>> = Vec::new();
  for t in triples {
    let i = *index.entry(&t.subject).or_insert_with(|| {
      groups.push(Vec::new());
      groups.len() - 1
    });
    groups[i].push(t);
  }
  groups.into_iter().flatten()
}

/// Turtle with one `@prefix` line per binding.
pub(crate) fn to_turtle(graph: &Graph) -> Result<String> {
  let mut serializer = TurtleSerializer::new();
  for (prefix, uri) in graph.namespaces().iter() {
    serializer = serializer.with_prefix(prefix, uri).map_err(|e| Error::InvalidIri {
      iri:    uri.to_owned(),
      reason: e.to_string(),
    })?;
  }
  let mut writer = serializer.for_writer(Vec::new());
  for t in by_subject(graph.triples()) {
    writer.serialize_triple(t)?;
  }
  Ok(String::from_utf8_lossy(&writer.finish()?).into_owned())
}
