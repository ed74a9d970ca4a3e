//! Integration tests for `SqliteStore` against an in-memory database.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use muster_core::{
  address::NewAddress,
  fuzzy_date::{Anchor, PrecisionDate},
  merge::{EntityKind, MergeKind},
  namespace::Namespace,
  organisation::NewOrganisation,
  person::{NewPerson, PersonStatus},
  record::{
    AlternativeNameValue, AssociatedOrganisationValue, AssociatedPersonValue,
    LifeEventValue, LinkRole, LinkValue, Links, NewRecord, PersonAddressValue,
    RankValue, RecordKind, RecordValue, ServiceNumberValue, VitalValue,
  },
  store::{MusterStore, OrganisationQuery, Owner, PersonQuery},
  story::NewStory,
};
use uuid::Uuid;

use crate::{Error, SqliteStore, encode::entity_table, merge::MergePlan};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, d).unwrap() }

async fn person(s: &SqliteStore, family: &str) -> Uuid {
  s.add_person(NewPerson::new(family), PersonStatus::Confirmed, None)
    .await
    .unwrap()
    .person_id
}

async fn organisation(s: &SqliteStore, name: &str) -> Uuid {
  s.add_organisation(NewOrganisation::new(name), None)
    .await
    .unwrap()
    .organisation_id
}

async fn address(s: &SqliteStore, street: &str) -> Uuid {
  s.add_address(NewAddress { street_name: Some(street.into()), ..Default::default() })
    .await
    .unwrap()
    .address_id
}

fn life_event(label: &str, start: &str) -> RecordValue {
  RecordValue::LifeEvent(LifeEventValue {
    label:               label.into(),
    event_type:          None,
    description:         None,
    start_earliest_date: PrecisionDate::encode(start, Anchor::Start).unwrap(),
    start_latest_date:   None,
    end_earliest_date:   None,
    end_latest_date:     None,
    source_ids:          Vec::new(),
    place_ids:           Vec::new(),
  })
}

fn rank(name: &str, start: Option<NaiveDate>) -> RecordValue {
  RecordValue::Rank(RankValue {
    rank:                name.into(),
    start_earliest_date: start,
    end_earliest_date:   None,
    source_ids:          Vec::new(),
  })
}

fn person_address(address_id: Uuid) -> RecordValue {
  RecordValue::PersonAddress(PersonAddressValue {
    address_id,
    start_earliest_date: None,
    end_earliest_date: None,
    source_ids: Vec::new(),
  })
}

fn association(label: &str) -> RecordValue {
  RecordValue::AssociatedPerson(AssociatedPersonValue {
    association:         label.into(),
    associated_name:     None,
    start_earliest_date: None,
    end_earliest_date:   None,
  })
}

fn link(label: &str) -> LinkValue {
  LinkValue {
    target_id:   Uuid::new_v4(),
    association: None,
    label:       Some(label.into()),
  }
}

/// One plausible value for every record kind.
fn sample_value(kind: RecordKind, address_id: Uuid) -> RecordValue {
  let vital = VitalValue {
    location:            Some("Leeds".into()),
    description:         None,
    start_earliest_date: Some(ymd(1890, 3, 2)),
    start_latest_date:   None,
    end_earliest_date:   None,
    end_latest_date:     None,
    source_ids:          Vec::new(),
  };
  match kind {
    RecordKind::AlternativeName => RecordValue::AlternativeName(AlternativeNameValue {
      family_name:  Some("Smyth".into()),
      other_names:  None,
      display_name: None,
      note:         None,
      source_ids:   Vec::new(),
    }),
    RecordKind::LifeEvent => life_event("Enlisted", "1915-6-0"),
    RecordKind::Birth => RecordValue::Birth(vital),
    RecordKind::Death => RecordValue::Death(vital),
    RecordKind::Rank => rank("Private", None),
    RecordKind::ServiceNumber => {
      RecordValue::ServiceNumber(ServiceNumberValue {
        service_number: "1066".into(),
        source_ids:     vec![Uuid::new_v4()],
      })
    }
    RecordKind::PersonAddress => person_address(address_id),
    RecordKind::AssociatedPerson => association("brother"),
    RecordKind::AssociatedOrganisation => {
      RecordValue::AssociatedOrganisation(AssociatedOrganisationValue {
        association:         Some("member".into()),
        position:            None,
        start_earliest_date: None,
        end_earliest_date:   None,
        source_ids:          Vec::new(),
      })
    }
    RecordKind::AssociatedSource => RecordValue::AssociatedSource(link("source")),
    RecordKind::AssociatedPlace => RecordValue::AssociatedPlace(link("place")),
    RecordKind::AssociatedEvent => RecordValue::AssociatedEvent(link("event")),
    RecordKind::AssociatedObject => RecordValue::AssociatedObject(link("object")),
    RecordKind::MemorialName => RecordValue::MemorialName(link("memorial")),
    RecordKind::MemorialPerson => RecordValue::MemorialPerson(link("memorial")),
    RecordKind::SourceCreator => RecordValue::SourceCreator(link("creator")),
    RecordKind::OrganisationSource => RecordValue::OrganisationSource(link("source")),
    RecordKind::MemorialOrganisation => {
      RecordValue::MemorialOrganisation(link("memorial"))
    }
  }
}

/// Required links for `kind`, pointing at `person` and `org`.
fn links_for(kind: RecordKind, person: Uuid, org: Uuid) -> Links {
  let mut links = Links::default();
  for spec in kind.links().iter().filter(|s| s.required) {
    match spec.role {
      LinkRole::Person => links.person_id = Some(person),
      LinkRole::AssociatedPerson => links.associated_person_id = Some(person),
      LinkRole::Organisation => links.organisation_id = Some(org),
    }
  }
  links
}

async fn add(s: &SqliteStore, links: Links, value: RecordValue) -> Uuid {
  s.add_record(NewRecord::new(links, value), None)
    .await
    .unwrap()
    .record_id
}

async fn count(s: &SqliteStore, owner: Owner, kind: RecordKind) -> usize {
  s.list_records(owner, Some(kind)).await.unwrap().len()
}

// ─── People ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_get_person_keeps_date_precision() {
  let s = store().await;
  let input = NewPerson {
    other_names: Some("Walter".into()),
    birth_earliest_date: PrecisionDate::encode("1914-4-0", Anchor::Start).unwrap(),
    death_latest_date: PrecisionDate::encode("1918-0-0", Anchor::End).unwrap(),
    ..NewPerson::new("Anderson")
  };
  let added = s
    .add_person(input, PersonStatus::Pending, Some("alice".into()))
    .await
    .unwrap();
  assert_eq!(added.status, PersonStatus::Pending);
  assert_eq!(added.added_by.as_deref(), Some("alice"));

  let fetched = s.get_person(added.person_id).await.unwrap().unwrap();
  let birth = fetched.birth_earliest_date.unwrap();
  assert_eq!(birth.date, ymd(1914, 4, 1));
  assert!(birth.month_known);
  assert!(!birth.day_known);
  assert_eq!(birth.to_raw(), "1914-4-0");

  let death = fetched.death_latest_date.unwrap();
  assert_eq!(death.date, ymd(1918, 12, 31));
  assert!(!death.month_known);
  assert_eq!(fetched.birth_latest_date, None);
  assert_eq!(fetched.created_at, added.created_at);
}

#[tokio::test]
async fn get_person_missing_returns_none() {
  let s = store().await;
  assert!(s.get_person(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn list_people_filters_and_pages() {
  let s = store().await;
  for family in ["Baker", "Barnes", "Cole", "ba_ker"] {
    person(&s, family).await;
  }
  s.add_person(NewPerson::new("Bates"), PersonStatus::Pending, None)
    .await
    .unwrap();

  let reviewed = s.list_people(&PersonQuery::default()).await.unwrap();
  assert_eq!(reviewed.len(), 4, "suggestions are hidden by default");

  let all = s
    .list_people(&PersonQuery { include_pending: true, ..Default::default() })
    .await
    .unwrap();
  assert_eq!(all.len(), 5);

  let pending = s
    .list_people(&PersonQuery { status: Some(PersonStatus::Pending), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(pending.len(), 1);
  assert_eq!(pending[0].family_name, "Bates");

  let ba = s
    .list_people(&PersonQuery { family_name: Some("ba".into()), ..Default::default() })
    .await
    .unwrap();
  let names: Vec<_> = ba.iter().map(|p| p.family_name.as_str()).collect();
  assert_eq!(names, ["ba_ker", "Baker", "Barnes"]);

  // `_` is matched literally, not as a wildcard.
  let underscore = s
    .list_people(&PersonQuery { family_name: Some("ba_".into()), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(underscore.len(), 1);

  let page = s
    .list_people(&PersonQuery { limit: Some(2), offset: Some(1), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(page.len(), 2);
  assert_eq!(page[0].family_name, "Baker");
}

#[tokio::test]
async fn update_and_approve_person() {
  let s = store().await;
  let id = s
    .add_person(NewPerson::new("Dunn"), PersonStatus::Pending, None)
    .await
    .unwrap()
    .person_id;

  let updated = s
    .update_person(id, NewPerson {
      biography: Some("Born in Leeds.".into()),
      ..NewPerson::new("Dunne")
    })
    .await
    .unwrap();
  assert_eq!(updated.family_name, "Dunne");
  assert_eq!(updated.status, PersonStatus::Pending);

  let approved = s.set_person_status(id, PersonStatus::Confirmed).await.unwrap();
  assert_eq!(approved.status, PersonStatus::Confirmed);
  assert_eq!(approved.biography.as_deref(), Some("Born in Leeds."));
}

#[tokio::test]
async fn update_missing_person_is_not_found() {
  let s = store().await;
  let err = s.update_person(Uuid::new_v4(), NewPerson::new("X")).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Core(muster_core::Error::NotFound { entity: EntityKind::Person, .. })
  ));
}

#[tokio::test]
async fn delete_person_cascades_and_clears_associations() {
  let s = store().await;
  let a = person(&s, "Able").await;
  let b = person(&s, "Baker").await;
  add(&s, Links::person(a), rank("Private", None)).await;
  let link = add(
    &s,
    Links { associated_person_id: Some(a), ..Links::person(b) },
    association("brother"),
  )
  .await;

  s.delete_person(a).await.unwrap();
  assert!(s.get_person(a).await.unwrap().is_none());
  assert_eq!(count(&s, Owner::person(a), RecordKind::Rank).await, 0);

  let kept = s.get_record(RecordKind::AssociatedPerson, link).await.unwrap().unwrap();
  assert_eq!(kept.links.person_id, Some(b));
  assert_eq!(kept.links.associated_person_id, None);

  let err = s.delete_person(a).await.unwrap_err();
  assert!(matches!(err, Error::Core(muster_core::Error::NotFound { .. })));
}

#[tokio::test]
async fn deleting_an_owner_drops_grants_on_its_records() {
  let s = store().await;
  let a = person(&s, "Able").await;
  let b = person(&s, "Baker").await;
  let owned = add(&s, Links::person(a), rank("Private", None)).await;
  let kept = add(
    &s,
    Links { associated_person_id: Some(a), ..Links::person(b) },
    association("brother"),
  )
  .await;
  for (perm, id) in [
    ("people.change_person", a),
    ("people.change_rank", owned),
    ("people.change_associated_person", kept),
  ] {
    s.grant_permission("alice".into(), perm.into(), id).await.unwrap();
  }

  s.delete_person(a).await.unwrap();
  assert!(
    !s.has_object_permission("alice".into(), "people.change_person".into(), a)
      .await
      .unwrap()
  );
  assert!(
    !s.has_object_permission("alice".into(), "people.change_rank".into(), owned)
      .await
      .unwrap()
  );
  assert!(
    s.has_object_permission("alice".into(), "people.change_associated_person".into(), kept)
      .await
      .unwrap(),
    "records that only refer to the person keep their grants"
  );
}

// ─── Organisations ───────────────────────────────────────────────────────────

#[tokio::test]
async fn organisation_crud() {
  let s = store().await;
  let input = NewOrganisation {
    start_earliest_date: Some(ymd(1914, 8, 4)),
    ..NewOrganisation::new("7th Battalion")
  };
  let org = s.add_organisation(input, Some("bob".into())).await.unwrap();
  assert_eq!(org.start_earliest_date, Some(ymd(1914, 8, 4)));

  let renamed = s
    .update_organisation(org.organisation_id, NewOrganisation::new("7th (Service) Battalion"))
    .await
    .unwrap();
  assert_eq!(renamed.name, "7th (Service) Battalion");
  assert_eq!(renamed.start_earliest_date, None);

  organisation(&s, "Rotary Club").await;
  let sevens = s
    .list_organisations(&OrganisationQuery { name: Some("7th".into()), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(sevens.len(), 1);

  s.delete_organisation(org.organisation_id).await.unwrap();
  assert!(s.get_organisation(org.organisation_id).await.unwrap().is_none());
}

// ─── Records ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn every_record_kind_round_trips() {
  let s = store().await;
  let p = person(&s, "Cole").await;
  let o = organisation(&s, "Leeds Pals").await;
  let addr = address(&s, "High Street").await;

  for kind in RecordKind::ALL {
    let value = sample_value(kind, addr);
    let added = s
      .add_record(NewRecord::new(links_for(kind, p, o), value.clone()), None)
      .await
      .unwrap();
    assert_eq!(added.kind, kind);

    let fetched = s.get_record(kind, added.record_id).await.unwrap().unwrap();
    assert_eq!(fetched.value, value, "{kind}");
    assert_eq!(fetched.links, links_for(kind, p, o), "{kind}");
  }
}

#[tokio::test]
async fn records_list_in_date_order() {
  let s = store().await;
  let p = person(&s, "Dunn").await;
  add(&s, Links::person(p), rank("Sergeant", Some(ymd(1917, 2, 1)))).await;
  add(&s, Links::person(p), rank("Private", Some(ymd(1915, 6, 12)))).await;
  add(&s, Links::person(p), life_event("Enlisted", "1915-6-0")).await;
  add(&s, Links::person(p), rank("Unknown", None)).await;

  let records = s.list_records(Owner::person(p), None).await.unwrap();
  let labels: Vec<_> = records.iter().map(|r| r.value.label()).collect();
  assert_eq!(labels, ["Enlisted", "Private", "Sergeant", "Unknown"]);

  let ranks = s.list_records(Owner::person(p), Some(RecordKind::Rank)).await.unwrap();
  assert_eq!(ranks.len(), 3);
}

#[tokio::test]
async fn record_links_are_validated() {
  let s = store().await;
  let p = person(&s, "Evans").await;

  let wrong_role = s
    .add_record(NewRecord::new(Links::organisation(p), rank("Private", None)), None)
    .await
    .unwrap_err();
  assert!(matches!(wrong_role, Error::Core(muster_core::Error::InvalidLinks { .. })));

  let missing = s
    .add_record(NewRecord::new(Links::person(Uuid::new_v4()), rank("Private", None)), None)
    .await
    .unwrap_err();
  assert!(matches!(
    missing,
    Error::Core(muster_core::Error::NotFound { entity: EntityKind::Person, .. })
  ));

  let no_address = s
    .add_record(NewRecord::new(Links::person(p), person_address(Uuid::new_v4())), None)
    .await
    .unwrap_err();
  assert!(matches!(
    no_address,
    Error::Core(muster_core::Error::NotFound { entity: EntityKind::Address, .. })
  ));
}

#[tokio::test]
async fn update_and_delete_record() {
  let s = store().await;
  let p = person(&s, "Fox").await;
  let id = add(&s, Links::person(p), rank("Private", None)).await;

  let updated = s
    .update_record(
      RecordKind::Rank,
      id,
      NewRecord::new(Links::person(p), rank("Corporal", Some(ymd(1916, 1, 3)))),
    )
    .await
    .unwrap();
  assert_eq!(updated.value.label(), "Corporal");
  assert_eq!(updated.sort_date, Some(ymd(1916, 1, 3)));

  let mismatch = s
    .update_record(
      RecordKind::Rank,
      id,
      NewRecord::new(Links::person(p), life_event("x", "1916-0-0")),
    )
    .await
    .unwrap_err();
  assert!(matches!(mismatch, Error::Core(muster_core::Error::KindMismatch { .. })));

  s.delete_record(RecordKind::Rank, id).await.unwrap();
  assert!(s.get_record(RecordKind::Rank, id).await.unwrap().is_none());
  assert!(s.delete_record(RecordKind::Rank, id).await.is_err());
}

#[tokio::test]
async fn record_sources_and_places_are_kept() {
  let s = store().await;
  let p = person(&s, "Fenwick").await;
  let (source, place) = (Uuid::new_v4(), Uuid::new_v4());
  let RecordValue::LifeEvent(mut event) = life_event("Wounded", "1917-4-9") else {
    unreachable!()
  };
  event.source_ids = vec![source];
  event.place_ids = vec![place];
  let id = add(&s, Links::person(p), RecordValue::LifeEvent(event.clone())).await;

  let fetched = s.get_record(RecordKind::LifeEvent, id).await.unwrap().unwrap();
  assert_eq!(fetched.value.source_ids(), [source]);
  assert_eq!(fetched.value.place_ids(), [place]);

  event.source_ids.clear();
  let updated = s
    .update_record(
      RecordKind::LifeEvent,
      id,
      NewRecord::new(Links::person(p), RecordValue::LifeEvent(event)),
    )
    .await
    .unwrap();
  assert!(updated.value.source_ids().is_empty());
  assert_eq!(updated.value.place_ids(), [place]);
}

// ─── Stories, images, namespaces, permissions ────────────────────────────────

#[tokio::test]
async fn stories_link_to_people_and_organisations() {
  let s = store().await;
  let p = person(&s, "Gray").await;
  let o = organisation(&s, "Home Guard").await;
  let story = s
    .add_story(NewStory { title: "Letters home".into(), text: "…".into() }, None)
    .await
    .unwrap();

  s.link_story(Owner::person(p), story.story_id).await.unwrap();
  s.link_story(Owner::person(p), story.story_id).await.unwrap();
  s.link_story(Owner::organisation(o), story.story_id).await.unwrap();

  assert_eq!(s.stories_for(Owner::person(p)).await.unwrap().len(), 1);
  assert_eq!(
    s.story_owners(story.story_id).await.unwrap(),
    [Owner::person(p), Owner::organisation(o)]
  );
  assert_eq!(s.list_stories().await.unwrap().len(), 1);

  let missing = s.link_story(Owner::person(p), Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(
    missing,
    Error::Core(muster_core::Error::NotFound { entity: EntityKind::Story, .. })
  ));
}

#[tokio::test]
async fn namespaces_are_seeded_and_replaceable() {
  let s = store().await;
  let prefixes: Vec<_> = s
    .list_namespaces()
    .await
    .unwrap()
    .into_iter()
    .map(|n| n.prefix)
    .collect();
  assert_eq!(prefixes, ["bibo", "dc", "foaf", "graves", "rdf", "rdfs"]);

  s.put_namespace(Namespace::new("dc", "http://purl.org/dc/elements/1.1/"))
    .await
    .unwrap();
  let dc = s
    .list_namespaces()
    .await
    .unwrap()
    .into_iter()
    .find(|n| n.prefix == "dc")
    .unwrap();
  assert_eq!(dc.uri, "http://purl.org/dc/elements/1.1/");
}

#[tokio::test]
async fn object_permissions() {
  let s = store().await;
  let id = Uuid::new_v4();
  let perm = "people.change_person".to_owned();
  assert!(!s.has_object_permission("alice".into(), perm.clone(), id).await.unwrap());
  s.grant_permission("alice".into(), perm.clone(), id).await.unwrap();
  s.grant_permission("alice".into(), perm.clone(), id).await.unwrap();
  assert!(s.has_object_permission("alice".into(), perm.clone(), id).await.unwrap());
  assert!(!s.has_object_permission("bob".into(), perm, id).await.unwrap());
}

// ─── Merge ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn merge_scenario_addresses_events_and_associations() {
  let s = store().await;
  let a = person(&s, "Smith").await;
  let b = person(&s, "Smith").await;
  let c = person(&s, "Jones").await;

  add(&s, Links::person(a), person_address(address(&s, "Mill Lane").await)).await;
  add(&s, Links::person(a), person_address(address(&s, "Church Road").await)).await;
  add(&s, Links::person(a), life_event("Enlisted", "1914-9-0")).await;
  add(
    &s,
    Links { associated_person_id: Some(c), ..Links::person(a) },
    association("cousin"),
  )
  .await;
  add(&s, Links::person(b), person_address(address(&s, "Station Road").await)).await;

  let report = s.merge(MergeKind::Person, a, b).await.unwrap();
  assert_eq!(report.duplicate, a);
  assert_eq!(report.canonical, b);
  assert_eq!(report.rows_moved(), 4);

  let canon = Owner::person(b);
  assert_eq!(count(&s, canon, RecordKind::PersonAddress).await, 3);
  assert_eq!(count(&s, canon, RecordKind::LifeEvent).await, 1);
  let links = s
    .list_records(canon, Some(RecordKind::AssociatedPerson))
    .await
    .unwrap();
  assert_eq!(links.len(), 1);
  assert_eq!(links[0].links.associated_person_id, Some(c));

  assert!(s.list_records(Owner::person(a), None).await.unwrap().is_empty());
  let dup = s.get_person(a).await.unwrap().unwrap();
  assert_eq!(dup.merged_into, Some(b));
  assert!(!dup.is_active());
}

#[tokio::test]
async fn merge_moves_every_person_relation() {
  let s = store().await;
  let a = person(&s, "Hall").await;
  let b = person(&s, "Hall").await;
  let d = person(&s, "Hill").await;
  let o = organisation(&s, "Leeds Pals").await;
  let addr = address(&s, "Kirkgate").await;

  let person_kinds: Vec<_> = RecordKind::ALL
    .into_iter()
    .filter(|k| k.links().iter().any(|l| l.role == LinkRole::Person))
    .collect();
  for &kind in &person_kinds {
    add(&s, links_for(kind, a, o), sample_value(kind, addr)).await;
  }
  // `a` on the associated side of someone else's record.
  let other_side = add(
    &s,
    Links { associated_person_id: Some(a), ..Links::person(d) },
    association("neighbour"),
  )
  .await;

  let story = s
    .add_story(NewStory { title: "Obituary".into(), text: String::new() }, None)
    .await
    .unwrap();
  s.link_story(Owner::person(a), story.story_id).await.unwrap();
  let image = Uuid::new_v4();
  s.link_image(a, image).await.unwrap();

  let report = s.merge(MergeKind::Person, a, b).await.unwrap();
  assert_eq!(report.rows_moved(), person_kinds.len() + 1);

  for &kind in &person_kinds {
    assert_eq!(count(&s, Owner::person(a), kind).await, 0, "{kind}");
    assert_eq!(count(&s, Owner::person(b), kind).await, 1, "{kind}");
  }
  let moved = s
    .get_record(RecordKind::AssociatedPerson, other_side)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(moved.links.person_id, Some(d));
  assert_eq!(moved.links.associated_person_id, Some(b));

  // The organisation side of a membership is untouched.
  let memberships = s
    .list_records(Owner::organisation(o), Some(RecordKind::AssociatedOrganisation))
    .await
    .unwrap();
  assert_eq!(memberships[0].links.person_id, Some(b));

  assert_eq!(s.stories_for(Owner::person(b)).await.unwrap().len(), 1);
  assert!(s.stories_for(Owner::person(a)).await.unwrap().is_empty());
  assert_eq!(s.images_for(b).await.unwrap(), [image]);
  assert!(s.images_for(a).await.unwrap().is_empty());
}

#[tokio::test]
async fn merge_unions_collections_without_duplicates() {
  let s = store().await;
  let a = person(&s, "Ibbotson").await;
  let b = person(&s, "Ibbotson").await;
  let shared = s
    .add_story(NewStory { title: "Shared".into(), text: String::new() }, None)
    .await
    .unwrap();
  let only_a = s
    .add_story(NewStory { title: "Only A".into(), text: String::new() }, None)
    .await
    .unwrap();
  s.link_story(Owner::person(a), shared.story_id).await.unwrap();
  s.link_story(Owner::person(a), only_a.story_id).await.unwrap();
  s.link_story(Owner::person(b), shared.story_id).await.unwrap();

  let report = s.merge(MergeKind::Person, a, b).await.unwrap();
  let stories = report.unions.iter().find(|u| u.table == "person_stories").unwrap();
  assert_eq!(stories.added, 1);
  assert_eq!(stories.cleared, 2);
  assert_eq!(s.stories_for(Owner::person(b)).await.unwrap().len(), 2);
}

#[tokio::test]
async fn merge_keeps_identical_rows() {
  let s = store().await;
  let a = person(&s, "Jackson").await;
  let b = person(&s, "Jackson").await;
  let addr = address(&s, "Park Row").await;
  add(&s, Links::person(a), person_address(addr)).await;
  add(&s, Links::person(b), person_address(addr)).await;

  s.merge(MergeKind::Person, a, b).await.unwrap();
  assert_eq!(count(&s, Owner::person(b), RecordKind::PersonAddress).await, 2);
}

#[tokio::test]
async fn merge_plan_covers_every_foreign_key() {
  let s = store().await;
  let fks: Vec<(String, String, String)> = s
    .connection()
    .call(|conn| {
      let mut stmt = conn.prepare(
        "SELECT m.name, p.\"table\", p.\"from\"
         FROM sqlite_master m JOIN pragma_foreign_key_list(m.name) p
         WHERE m.type = 'table'",
      )?;
      let rows = stmt
        .query_map([], |r| {
          Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
          ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
      Ok(rows)
    })
    .await
    .unwrap();

  for kind in [MergeKind::Person, MergeKind::Organisation] {
    let (entity, _) = entity_table(kind);
    let plan = MergePlan::for_kind(kind);

    let mut covered: BTreeSet<(&str, &str)> = plan.rewrites.iter().copied().collect();
    covered.extend(plan.collections.iter().map(|c| (c.table, c.owner)));
    covered.insert((entity, "merged_into"));

    let referencing: BTreeSet<(&str, &str)> = fks
      .iter()
      .filter(|(_, target, _)| target == entity)
      .map(|(table, _, column)| (table.as_str(), column.as_str()))
      .collect();

    assert_eq!(referencing, covered, "{kind}");
  }
}

#[tokio::test]
async fn failed_rewrite_rolls_back_everything() {
  let s = store().await;
  let a = person(&s, "Kemp").await;
  let b = person(&s, "Kemp").await;
  add(&s, Links::person(a), life_event("Enlisted", "1915-0-0")).await;
  add(&s, Links::person(a), rank("Private", None)).await;

  s.connection()
    .call(|conn| {
      conn.execute_batch(
        "CREATE TRIGGER freeze_ranks BEFORE UPDATE ON ranks
         BEGIN SELECT RAISE(ABORT, 'ranks are frozen'); END;",
      )?;
      Ok(())
    })
    .await
    .unwrap();

  let err = s.merge(MergeKind::Person, a, b).await.unwrap_err();
  match err {
    Error::Core(muster_core::Error::RelationRewrite { table, .. }) => {
      assert_eq!(table, "ranks");
    }
    other => panic!("unexpected error: {other}"),
  }

  // life_events was rewritten before ranks failed; it must be back on `a`.
  assert_eq!(count(&s, Owner::person(a), RecordKind::LifeEvent).await, 1);
  assert_eq!(count(&s, Owner::person(b), RecordKind::LifeEvent).await, 0);
  assert!(s.get_person(a).await.unwrap().unwrap().is_active());
}

#[tokio::test]
async fn second_merge_is_rejected_without_changes() {
  let s = store().await;
  let a = person(&s, "Lamb").await;
  let b = person(&s, "Lamb").await;
  add(&s, Links::person(a), rank("Private", None)).await;
  s.merge(MergeKind::Person, a, b).await.unwrap();

  let err = s.merge(MergeKind::Person, a, b).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Core(muster_core::Error::AlreadyMerged { id, into }) if id == a && into == b
  ));
  assert_eq!(count(&s, Owner::person(b), RecordKind::Rank).await, 1);

  // A merged record cannot be the canonical side either.
  let c = person(&s, "Lamb").await;
  let err = s.merge(MergeKind::Person, c, a).await.unwrap_err();
  assert!(matches!(err, Error::Core(muster_core::Error::AlreadyMerged { .. })));
}

#[tokio::test]
async fn merge_rejects_same_and_missing_records() {
  let s = store().await;
  let a = person(&s, "Moss").await;

  let same = s.merge(MergeKind::Person, a, a).await.unwrap_err();
  assert!(matches!(same, Error::Core(muster_core::Error::SameRecord(_))));

  let missing = s.merge(MergeKind::Person, a, Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(missing, Error::Core(muster_core::Error::NotFound { .. })));
}

#[tokio::test]
async fn merge_chains_are_repointed() {
  let s = store().await;
  let a = person(&s, "Nash").await;
  let b = person(&s, "Nash").await;
  let c = person(&s, "Nash").await;

  s.merge(MergeKind::Person, a, b).await.unwrap();
  let report = s.merge(MergeKind::Person, b, c).await.unwrap();
  assert_eq!(report.repointed, 1);

  assert_eq!(s.get_person(a).await.unwrap().unwrap().merged_into, Some(c));
  assert_eq!(s.get_person(b).await.unwrap().unwrap().merged_into, Some(c));

  let active = s.list_people(&PersonQuery::default()).await.unwrap();
  assert_eq!(active.len(), 1);
  let everyone = s
    .list_people(&PersonQuery { include_merged: true, ..Default::default() })
    .await
    .unwrap();
  assert_eq!(everyone.len(), 3);

  let err = s.delete_person(c).await.unwrap_err();
  assert!(matches!(err, Error::Core(muster_core::Error::HasMergedRecords(_))));
}

#[tokio::test]
async fn merged_people_cannot_be_edited_or_linked() {
  let s = store().await;
  let a = person(&s, "Oakes").await;
  let b = person(&s, "Oakes").await;
  s.merge(MergeKind::Person, a, b).await.unwrap();

  let edit = s.update_person(a, NewPerson::new("Oaks")).await.unwrap_err();
  assert!(matches!(edit, Error::Core(muster_core::Error::AlreadyMerged { .. })));

  let link = s
    .add_record(NewRecord::new(Links::person(a), rank("Private", None)), None)
    .await
    .unwrap_err();
  assert!(matches!(link, Error::Core(muster_core::Error::AlreadyMerged { .. })));
}

#[tokio::test]
async fn organisation_merge() {
  let s = store().await;
  let x = organisation(&s, "Leeds Rifles").await;
  let y = organisation(&s, "Leeds Rifles").await;
  let p = person(&s, "Pratt").await;

  add(&s, Links::organisation(x), RecordValue::OrganisationSource(link("roll"))).await;
  add(&s, Links::organisation(x), RecordValue::MemorialOrganisation(link("plaque"))).await;
  let membership = add(
    &s,
    Links { organisation_id: Some(x), ..Links::person(p) },
    sample_value(RecordKind::AssociatedOrganisation, Uuid::nil()),
  )
  .await;
  let story = s
    .add_story(NewStory { title: "History".into(), text: String::new() }, None)
    .await
    .unwrap();
  s.link_story(Owner::organisation(x), story.story_id).await.unwrap();

  let report = s.merge(MergeKind::Organisation, x, y).await.unwrap();
  assert_eq!(report.rows_moved(), 3);

  assert_eq!(s.list_records(Owner::organisation(y), None).await.unwrap().len(), 3);
  assert!(s.list_records(Owner::organisation(x), None).await.unwrap().is_empty());
  let moved = s
    .get_record(RecordKind::AssociatedOrganisation, membership)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(moved.links.organisation_id, Some(y));
  assert_eq!(moved.links.person_id, Some(p));
  assert_eq!(s.stories_for(Owner::organisation(y)).await.unwrap().len(), 1);

  let active = s.list_organisations(&OrganisationQuery::default()).await.unwrap();
  assert_eq!(active.len(), 1);
  assert_eq!(active[0].organisation_id, y);
}
