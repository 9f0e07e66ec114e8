//! SQL schema for the emulated contacts provider.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA foreign_keys = ON;

-- One row per per-account record. contact_id names the aggregate the raw
-- contact belongs to; unlinked raw contacts are their own aggregate.
CREATE TABLE IF NOT EXISTS raw_contacts (
    raw_contact_id INTEGER PRIMARY KEY AUTOINCREMENT,
    contact_id     INTEGER,
    lookup_key     TEXT NOT NULL,
    display_name   TEXT,               -- computed after every write
    starred        INTEGER NOT NULL DEFAULT 0,
    account_type   TEXT,
    account_name   TEXT,
    last_updated   INTEGER NOT NULL    -- epoch millis
);

-- One row per field, interpreted by mimetype.
CREATE TABLE IF NOT EXISTS data (
    data_id        INTEGER PRIMARY KEY AUTOINCREMENT,
    raw_contact_id INTEGER NOT NULL
                   REFERENCES raw_contacts(raw_contact_id) ON DELETE CASCADE,
    mimetype       TEXT NOT NULL,
    data1 TEXT, data2 TEXT, data3 TEXT, data4 TEXT, data5 TEXT,
    data6 TEXT, data7 TEXT, data8 TEXT, data9 TEXT, data10 TEXT,
    data15 BLOB
);

CREATE TABLE IF NOT EXISTS groups (
    group_id  INTEGER PRIMARY KEY AUTOINCREMENT,
    source_id TEXT NOT NULL UNIQUE,
    title     TEXT,
    notes     TEXT,
    favorites INTEGER NOT NULL DEFAULT 0,
    deleted   INTEGER NOT NULL DEFAULT 0
);

-- Full-size photos; data15 of the photo row holds the thumbnail.
CREATE TABLE IF NOT EXISTS display_photos (
    raw_contact_id INTEGER PRIMARY KEY
                   REFERENCES raw_contacts(raw_contact_id) ON DELETE CASCADE,
    photo          BLOB NOT NULL
);

-- Data rows joined with their raw contact. contact_display_name and the
-- sort_* columns are taken from the aggregate so all rows of one contact
-- sort and filter together.
DROP VIEW IF EXISTS data_view;
CREATE VIEW data_view AS
SELECT
    d.data_id,
    d.raw_contact_id,
    r.contact_id,
    r.lookup_key,
    r.display_name,
    r.last_updated,
    r.starred,
    d.mimetype,
    d.data1, d.data2, d.data3, d.data4, d.data5,
    d.data6, d.data7, d.data8, d.data9, d.data10,
    d.data15,
    (SELECT n.data2 FROM data n JOIN raw_contacts a USING (raw_contact_id)
      WHERE a.contact_id = r.contact_id
        AND n.mimetype = 'vnd.android.cursor.item/name'
      ORDER BY a.raw_contact_id, n.data_id LIMIT 1) AS sort_given,
    (SELECT n.data3 FROM data n JOIN raw_contacts a USING (raw_contact_id)
      WHERE a.contact_id = r.contact_id
        AND n.mimetype = 'vnd.android.cursor.item/name'
      ORDER BY a.raw_contact_id, n.data_id LIMIT 1) AS sort_family,
    (SELECT a.display_name FROM raw_contacts a
      WHERE a.contact_id = r.contact_id
      ORDER BY a.raw_contact_id LIMIT 1) AS contact_display_name
FROM data d
JOIN raw_contacts r ON r.raw_contact_id = d.raw_contact_id;

CREATE INDEX IF NOT EXISTS data_raw_contact_idx ON data(raw_contact_id);
CREATE INDEX IF NOT EXISTS data_mimetype_idx    ON data(mimetype);
CREATE INDEX IF NOT EXISTS raw_contacts_contact ON raw_contacts(contact_id);
CREATE INDEX IF NOT EXISTS raw_contacts_lookup  ON raw_contacts(lookup_key);

PRAGMA user_version = 2;
";
