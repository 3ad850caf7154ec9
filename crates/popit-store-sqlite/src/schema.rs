//! SQL schema for the Popolo SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per entity of any kind. Attribute sets differ per kind, so the
-- language-invariant attributes are kept as a JSON object.
CREATE TABLE IF NOT EXISTS entities (
    kind        TEXT NOT NULL,   -- 'person' | 'area' | 'post' | 'link' | 'contact' | 'identifier' | 'other_name'
    id          TEXT NOT NULL,
    owner_kind  TEXT,            -- polymorphic owner; NULL for aggregate roots
    owner_id    TEXT,
    attributes  TEXT NOT NULL DEFAULT '{}',
    created_at  TEXT NOT NULL,   -- RFC 3339 UTC, fixed width
    updated_at  TEXT NOT NULL,
    PRIMARY KEY (kind, id),
    CHECK ((owner_kind IS NULL) = (owner_id IS NULL))
);

-- At most one attribute record per entity per language.
CREATE TABLE IF NOT EXISTS translations (
    kind        TEXT NOT NULL,
    entity_id   TEXT NOT NULL,
    language    TEXT NOT NULL,
    attributes  TEXT NOT NULL DEFAULT '{}',
    PRIMARY KEY (kind, entity_id, language),
    FOREIGN KEY (kind, entity_id) REFERENCES entities(kind, id) ON DELETE CASCADE
);

-- No foreign key on the owner: it may point at an entity of any kind, and deleting
-- an owner does not cascade to the records it owns.
CREATE INDEX IF NOT EXISTS entities_owner_idx   ON entities(owner_kind, owner_id, kind);
CREATE INDEX IF NOT EXISTS entities_created_idx ON entities(kind, created_at);

PRAGMA user_version = 1;
";
