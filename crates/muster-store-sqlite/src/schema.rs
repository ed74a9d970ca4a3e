//! SQL schema for the Muster SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.
//!
//! Every record table is named by [`crate::encode::record_table`] and carries
//! exactly the link columns its kind declares. A record's payload lives in
//! `body_json`; `sort_date` is derived from it on write.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS people (
    person_id    TEXT PRIMARY KEY,
    family_name  TEXT NOT NULL,
    other_names  TEXT,
    name_suffix  TEXT,
    display_name TEXT,
    status       TEXT NOT NULL,   -- 'pending' | 'confirmed' | 'non_service'
    biography    TEXT,
    notes        TEXT,
    connection   TEXT,
    birth_earliest_date             TEXT,
    birth_earliest_date_month_known INTEGER NOT NULL DEFAULT 0,
    birth_earliest_date_day_known   INTEGER NOT NULL DEFAULT 0,
    birth_latest_date               TEXT,
    birth_latest_date_month_known   INTEGER NOT NULL DEFAULT 0,
    birth_latest_date_day_known     INTEGER NOT NULL DEFAULT 0,
    death_earliest_date             TEXT,
    death_earliest_date_month_known INTEGER NOT NULL DEFAULT 0,
    death_earliest_date_day_known   INTEGER NOT NULL DEFAULT 0,
    death_latest_date               TEXT,
    death_latest_date_month_known   INTEGER NOT NULL DEFAULT 0,
    death_latest_date_day_known     INTEGER NOT NULL DEFAULT 0,
    merged_into  TEXT REFERENCES people(person_id),
    added_by     TEXT,
    created_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS organisations (
    organisation_id     TEXT PRIMARY KEY,
    name                TEXT NOT NULL,
    display_name        TEXT,
    start_earliest_date TEXT,
    end_earliest_date   TEXT,
    merged_into         TEXT REFERENCES organisations(organisation_id),
    added_by            TEXT,
    created_at          TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS stories (
    story_id   TEXT PRIMARY KEY,
    title      TEXT NOT NULL,
    text       TEXT NOT NULL,
    created_by TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS addresses (
    address_id    TEXT PRIMARY KEY,
    building_name TEXT,
    street_number TEXT,
    street_name   TEXT,
    place_name    TEXT
);

-- ── Person records ─────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS alternative_names (
    record_id  TEXT PRIMARY KEY,
    person_id  TEXT NOT NULL REFERENCES people(person_id) ON DELETE CASCADE,
    body_json  TEXT NOT NULL,
    sort_date  TEXT,
    added_by   TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS life_events (
    record_id  TEXT PRIMARY KEY,
    person_id  TEXT NOT NULL REFERENCES people(person_id) ON DELETE CASCADE,
    body_json  TEXT NOT NULL,
    sort_date  TEXT,
    added_by   TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS births (
    record_id  TEXT PRIMARY KEY,
    person_id  TEXT NOT NULL REFERENCES people(person_id) ON DELETE CASCADE,
    body_json  TEXT NOT NULL,
    sort_date  TEXT,
    added_by   TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS deaths (
    record_id  TEXT PRIMARY KEY,
    person_id  TEXT NOT NULL REFERENCES people(person_id) ON DELETE CASCADE,
    body_json  TEXT NOT NULL,
    sort_date  TEXT,
    added_by   TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS ranks (
    record_id  TEXT PRIMARY KEY,
    person_id  TEXT NOT NULL REFERENCES people(person_id) ON DELETE CASCADE,
    body_json  TEXT NOT NULL,
    sort_date  TEXT,
    added_by   TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS service_numbers (
    record_id  TEXT PRIMARY KEY,
    person_id  TEXT NOT NULL REFERENCES people(person_id) ON DELETE CASCADE,
    body_json  TEXT NOT NULL,
    sort_date  TEXT,
    added_by   TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS person_addresses (
    record_id  TEXT PRIMARY KEY,
    person_id  TEXT NOT NULL REFERENCES people(person_id) ON DELETE CASCADE,
    body_json  TEXT NOT NULL,   -- carries address_id
    sort_date  TEXT,
    added_by   TEXT,
    created_at TEXT NOT NULL
);

-- Both sides point at people; the associated side is optional.
CREATE TABLE IF NOT EXISTS person_people (
    record_id            TEXT PRIMARY KEY,
    person_id            TEXT NOT NULL REFERENCES people(person_id) ON DELETE CASCADE,
    associated_person_id TEXT REFERENCES people(person_id) ON DELETE SET NULL,
    body_json            TEXT NOT NULL,
    sort_date            TEXT,
    added_by             TEXT,
    created_at           TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS person_organisations (
    record_id       TEXT PRIMARY KEY,
    person_id       TEXT NOT NULL REFERENCES people(person_id) ON DELETE CASCADE,
    organisation_id TEXT NOT NULL REFERENCES organisations(organisation_id) ON DELETE CASCADE,
    body_json       TEXT NOT NULL,
    sort_date       TEXT,
    added_by        TEXT,
    created_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS person_sources (
    record_id  TEXT PRIMARY KEY,
    person_id  TEXT NOT NULL REFERENCES people(person_id) ON DELETE CASCADE,
    body_json  TEXT NOT NULL,
    sort_date  TEXT,
    added_by   TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS person_places (
    record_id  TEXT PRIMARY KEY,
    person_id  TEXT NOT NULL REFERENCES people(person_id) ON DELETE CASCADE,
    body_json  TEXT NOT NULL,
    sort_date  TEXT,
    added_by   TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS person_events (
    record_id  TEXT PRIMARY KEY,
    person_id  TEXT NOT NULL REFERENCES people(person_id) ON DELETE CASCADE,
    body_json  TEXT NOT NULL,
    sort_date  TEXT,
    added_by   TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS person_objects (
    record_id  TEXT PRIMARY KEY,
    person_id  TEXT NOT NULL REFERENCES people(person_id) ON DELETE CASCADE,
    body_json  TEXT NOT NULL,
    sort_date  TEXT,
    added_by   TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS memorial_names (
    record_id  TEXT PRIMARY KEY,
    person_id  TEXT NOT NULL REFERENCES people(person_id) ON DELETE CASCADE,
    body_json  TEXT NOT NULL,
    sort_date  TEXT,
    added_by   TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS memorial_people (
    record_id  TEXT PRIMARY KEY,
    person_id  TEXT NOT NULL REFERENCES people(person_id) ON DELETE CASCADE,
    body_json  TEXT NOT NULL,
    sort_date  TEXT,
    added_by   TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS source_people (
    record_id  TEXT PRIMARY KEY,
    person_id  TEXT NOT NULL REFERENCES people(person_id) ON DELETE CASCADE,
    body_json  TEXT NOT NULL,
    sort_date  TEXT,
    added_by   TEXT,
    created_at TEXT NOT NULL
);

-- ── Organisation records ───────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS organisation_sources (
    record_id       TEXT PRIMARY KEY,
    organisation_id TEXT NOT NULL REFERENCES organisations(organisation_id) ON DELETE CASCADE,
    body_json       TEXT NOT NULL,
    sort_date       TEXT,
    added_by        TEXT,
    created_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS memorial_organisations (
    record_id       TEXT PRIMARY KEY,
    organisation_id TEXT NOT NULL REFERENCES organisations(organisation_id) ON DELETE CASCADE,
    body_json       TEXT NOT NULL,
    sort_date       TEXT,
    added_by        TEXT,
    created_at      TEXT NOT NULL
);

-- ── Collections ────────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS person_stories (
    person_id TEXT NOT NULL REFERENCES people(person_id) ON DELETE CASCADE,
    story_id  TEXT NOT NULL REFERENCES stories(story_id) ON DELETE CASCADE,
    PRIMARY KEY (person_id, story_id)
);

CREATE TABLE IF NOT EXISTS organisation_stories (
    organisation_id TEXT NOT NULL REFERENCES organisations(organisation_id) ON DELETE CASCADE,
    story_id        TEXT NOT NULL REFERENCES stories(story_id) ON DELETE CASCADE,
    PRIMARY KEY (organisation_id, story_id)
);

-- image_id belongs to the image catalogue and is not a foreign key here.
CREATE TABLE IF NOT EXISTS person_images (
    person_id TEXT NOT NULL REFERENCES people(person_id) ON DELETE CASCADE,
    image_id  TEXT NOT NULL,
    PRIMARY KEY (person_id, image_id)
);

-- ── Linked data and permissions ────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS namespaces (
    prefix TEXT PRIMARY KEY,
    uri    TEXT NOT NULL
);

INSERT OR IGNORE INTO namespaces (prefix, uri) VALUES
    ('rdf',    'http://www.w3.org/1999/02/22-rdf-syntax-ns#'),
    ('rdfs',   'http://www.w3.org/2000/01/rdf-schema#'),
    ('foaf',   'http://xmlns.com/foaf/0.1/'),
    ('dc',     'http://purl.org/dc/terms/'),
    ('bibo',   'http://purl.org/ontology/bibo/'),
    ('graves', 'http://rdf.muninn-project.org/ontologies/graves#');

CREATE TABLE IF NOT EXISTS object_permissions (
    username   TEXT NOT NULL,
    permission TEXT NOT NULL,
    object_id  TEXT NOT NULL,
    PRIMARY KEY (username, permission, object_id)
);

CREATE INDEX IF NOT EXISTS people_family_idx   ON people(family_name);
CREATE INDEX IF NOT EXISTS people_merged_idx   ON people(merged_into);
CREATE INDEX IF NOT EXISTS orgs_merged_idx     ON organisations(merged_into);
CREATE INDEX IF NOT EXISTS life_events_person  ON life_events(person_id);
CREATE INDEX IF NOT EXISTS addresses_person    ON person_addresses(person_id);
CREATE INDEX IF NOT EXISTS person_people_other ON person_people(associated_person_id);
CREATE INDEX IF NOT EXISTS person_orgs_org     ON person_organisations(organisation_id);

PRAGMA user_version = 1;
";
