//! SQL schema for the SQLite catalog.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS restaurants (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    name          TEXT    NOT NULL,
    facility_type TEXT,
    address       TEXT    NOT NULL,
    city          TEXT,
    state         TEXT,
    zip           TEXT,
    latitude      REAL,
    longitude     REAL,
    clean         INTEGER NOT NULL DEFAULT 0 CHECK (clean IN (0, 1))
);

-- Inspection ids come from the upstream feed. Rows are never deleted; only
-- restaurant_id is rewritten, when a cluster is relinked.
CREATE TABLE IF NOT EXISTS inspections (
    id              TEXT PRIMARY KEY,
    risk            TEXT,
    inspection_date TEXT,            -- ISO 8601 date or NULL
    inspection_type TEXT,
    results         TEXT,
    violations      TEXT,
    restaurant_id   INTEGER NOT NULL REFERENCES restaurants(id)
);

-- Append-only. Each original is absorbed into exactly one primary.
CREATE TABLE IF NOT EXISTS linked (
    primary_rest_id  INTEGER NOT NULL REFERENCES restaurants(id),
    original_rest_id INTEGER NOT NULL REFERENCES restaurants(id),
    UNIQUE (original_rest_id),
    CHECK  (primary_rest_id != original_rest_id)
);

CREATE TABLE IF NOT EXISTS mention_matches (
    restaurant_id INTEGER NOT NULL REFERENCES restaurants(id),
    mention_key   TEXT    NOT NULL,
    kind          TEXT    NOT NULL CHECK (kind IN ('name', 'geo', 'both')),
    UNIQUE (restaurant_id, mention_key)
);

CREATE INDEX IF NOT EXISTS restaurants_zip_idx     ON restaurants(zip);
CREATE INDEX IF NOT EXISTS restaurants_clean_idx   ON restaurants(clean);
CREATE INDEX IF NOT EXISTS restaurants_ident_idx   ON restaurants(name, address);
CREATE INDEX IF NOT EXISTS restaurants_geo_idx     ON restaurants(latitude, longitude);
CREATE INDEX IF NOT EXISTS inspections_rest_idx    ON inspections(restaurant_id);
CREATE INDEX IF NOT EXISTS linked_primary_idx      ON linked(primary_rest_id);

PRAGMA user_version = 1;
";
