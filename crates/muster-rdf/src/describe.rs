//! Per-entity descriptions.
//!
//! Each `describe_*` function appends the triples for one kind of page to a
//! [`Graph`]. Callers load the related rows (records, stories, owners) and
//! pass them in; nothing here touches storage.

use muster_core::{
  merge::MergeKind,
  organisation::Organisation,
  person::Person,
  record::{Record, RecordValue},
  store::Owner,
  story::Story,
};
use uuid::Uuid;

use crate::{Graph, Result, Term};

/// Builds the IRIs entities are published under.
#[derive(Debug, Clone)]
pub struct Iris {
  base: String,
}

impl Iris {
  pub fn new(base_url: &str) -> Self {
    Self { base: base_url.trim_end_matches('/').to_owned() }
  }

  pub fn person(&self, id: Uuid) -> String { format!("{}/people/{id}", self.base) }

  pub fn organisation(&self, id: Uuid) -> String {
    format!("{}/organisations/{id}", self.base)
  }

  pub fn owner(&self, owner: Owner) -> String {
    match owner.kind {
      MergeKind::Person => self.person(owner.id),
      MergeKind::Organisation => self.organisation(owner.id),
    }
  }

  pub fn story(&self, id: Uuid) -> String { format!("{}/stories/{id}", self.base) }

  pub fn record(&self, record: &Record) -> String {
    format!("{}/records/{}/{}", self.base, record.kind, record.record_id)
  }

  /// Memorials, sources and places are catalogued elsewhere; they share the
  /// base URL.
  pub fn memorial(&self, id: Uuid) -> String { format!("{}/memorials/{id}", self.base) }

  pub fn source(&self, id: Uuid) -> String { format!("{}/sources/{id}", self.base) }

  pub fn place(&self, id: Uuid) -> String { format!("{}/places/{id}", self.base) }
}

fn person_summary(graph: &mut Graph, iris: &Iris, person: &Person) -> Result<String> {
  let iri = iris.person(person.person_id);
  graph.add_type(&iri, "foaf:Person")?;
  graph.add_literal(&iri, "rdfs:label", person.label())?;
  Ok(iri)
}

/// A person's page: names, memorials, service numbers and stories.
pub fn describe_person(
  graph: &mut Graph,
  iris: &Iris,
  person: &Person,
  records: &[Record],
  stories: &[Story],
) -> Result<()> {
  let iri = person_summary(graph, iris, person)?;
  graph.add_literal(&iri, "foaf:name", person.label())?;
  graph.add_literal(&iri, "foaf:familyName", person.family_name.as_str())?;
  if let Some(given) = person.other_names.as_deref().filter(|s| !s.is_empty()) {
    graph.add_literal(&iri, "foaf:givenName", given)?;
  }

  for record in records {
    match &record.value {
      RecordValue::MemorialName(link) => {
        graph.add_link(&iri, "graves:commemorated_by", &iris.memorial(link.target_id))?;
      }
      RecordValue::ServiceNumber(v) => {
        graph.add_literal(&iri, "dc:identifier", v.service_number.as_str())?;
      }
      _ => {}
    }
  }

  for story in stories {
    graph.add_link(&iri, "foaf:page", &iris.story(story.story_id))?;
  }
  Ok(())
}

pub fn describe_people(graph: &mut Graph, iris: &Iris, people: &[Person]) -> Result<()> {
  for person in people {
    person_summary(graph, iris, person)?;
  }
  Ok(())
}

fn organisation_summary(
  graph: &mut Graph,
  iris: &Iris,
  organisation: &Organisation,
) -> Result<String> {
  let iri = iris.organisation(organisation.organisation_id);
  graph.add_type(&iri, "foaf:Organization")?;
  graph.add_literal(&iri, "rdfs:label", organisation.label())?;
  Ok(iri)
}

pub fn describe_organisation(
  graph: &mut Graph,
  iris: &Iris,
  organisation: &Organisation,
  stories: &[Story],
) -> Result<()> {
  let iri = organisation_summary(graph, iris, organisation)?;
  graph.add_literal(&iri, "foaf:name", organisation.name.as_str())?;
  for story in stories {
    graph.add_link(&iri, "foaf:page", &iris.story(story.story_id))?;
  }
  Ok(())
}

pub fn describe_organisations(
  graph: &mut Graph,
  iris: &Iris,
  organisations: &[Organisation],
) -> Result<()> {
  for organisation in organisations {
    organisation_summary(graph, iris, organisation)?;
  }
  Ok(())
}

/// A story as a `bibo:Note` about each person or organisation it is linked to.
pub fn describe_story(
  graph: &mut Graph,
  iris: &Iris,
  story: &Story,
  owners: &[Owner],
) -> Result<()> {
  let iri = iris.story(story.story_id);
  graph.add_type(&iri, "bibo:Note")?;
  graph.add_literal(&iri, "dc:title", story.title.as_str())?;
  graph.add_literal(&iri, "rdf:value", story.text.as_str())?;
  if let Some(creator) = story.created_by.as_deref() {
    graph.add_literal(&iri, "dc:creator", creator)?;
  }
  for owner in owners {
    graph.add_link(&iri, "foaf:topic", &iris.owner(*owner))?;
  }
  Ok(())
}

/// A single record: its label, date, cited sources and places, plus the
/// identifier triple on the person for service numbers.
pub fn describe_record(graph: &mut Graph, iris: &Iris, record: &Record) -> Result<()> {
  let iri = iris.record(record);
  graph.add_literal(&iri, "rdfs:label", record.value.label())?;
  if let Some(date) = record.sort_date {
    graph.add(&iri, "dc:date", Term::date(date))?;
  }
  for source in record.value.source_ids() {
    graph.add_link(&iri, "dc:source", &iris.source(*source))?;
  }
  for place in record.value.place_ids() {
    graph.add_link(&iri, "dc:coverage", &iris.place(*place))?;
  }
  if let (RecordValue::ServiceNumber(v), Some(person)) =
    (&record.value, record.links.person_id)
  {
    graph.add_literal(&iris.person(person), "dc:identifier", v.service_number.as_str())?;
  }
  Ok(())
}
