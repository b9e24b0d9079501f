//! SQL schema for the club calendar store.
//!
//! Executed once at connection startup. `majors` and `club_memberships` are
//! owned by other parts of the platform; they are created here so the store
//! is self-contained and so foreign keys have something to point at.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS majors (
    major_id    TEXT PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS club_memberships (
    club_id     TEXT NOT NULL,
    user_id     TEXT NOT NULL,
    role        TEXT NOT NULL,   -- 'member' | 'officer' | 'admin'
    created_at  TEXT NOT NULL,
    PRIMARY KEY (club_id, user_id)
);

-- Timestamps are RFC 3339 UTC with fixed microsecond precision, so text
-- order is time order.
CREATE TABLE IF NOT EXISTS events (
    event_id          TEXT PRIMARY KEY,
    organization_id   TEXT NOT NULL,
    title             TEXT NOT NULL,
    description       TEXT NOT NULL DEFAULT '',
    starts_at         TEXT NOT NULL,
    ends_at           TEXT,
    timezone          TEXT,
    location_type     TEXT NOT NULL,
    location_name     TEXT,
    location_address  TEXT,
    online_url        TEXT,
    visibility        TEXT NOT NULL,
    status            TEXT NOT NULL,
    banner_url        TEXT,
    thumbnail_url     TEXT,
    is_all_majors     INTEGER NOT NULL,
    capacity          INTEGER,
    requires_rsvp     INTEGER NOT NULL DEFAULT 0,
    rsvp_url          TEXT,
    is_featured       INTEGER NOT NULL DEFAULT 0,
    contact_email     TEXT,
    created_by        TEXT,
    updated_by        TEXT,
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL,
    version           INTEGER NOT NULL DEFAULT 1,
    CHECK (ends_at IS NULL OR ends_at >= starts_at)
);

CREATE TABLE IF NOT EXISTS event_majors (
    event_id    TEXT NOT NULL REFERENCES events(event_id) ON DELETE CASCADE,
    major_id    TEXT NOT NULL REFERENCES majors(major_id),
    PRIMARY KEY (event_id, major_id)
);

CREATE TABLE IF NOT EXISTS event_tags (
    event_id    TEXT NOT NULL REFERENCES events(event_id) ON DELETE CASCADE,
    tag         TEXT NOT NULL,
    PRIMARY KEY (event_id, tag)
);

CREATE INDEX IF NOT EXISTS events_org_starts_idx ON events(organization_id, starts_at);
CREATE INDEX IF NOT EXISTS events_starts_idx     ON events(starts_at);
CREATE INDEX IF NOT EXISTS event_tags_tag_idx    ON event_tags(tag);

PRAGMA user_version = 1;
";
