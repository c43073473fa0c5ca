//! SQL schema for the roster SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS persons (
    external_id TEXT PRIMARY KEY,
    first_name  TEXT NOT NULL,
    last_name   TEXT NOT NULL,
    active      INTEGER NOT NULL DEFAULT 1
);

-- No foreign key to persons: the Reference sheet may list people the
-- Ledger does not.
CREATE TABLE IF NOT EXISTS reference_info (
    external_id       TEXT PRIMARY KEY,
    company           TEXT,
    nationality       TEXT,
    title             TEXT,
    function          TEXT,
    discipline        TEXT,
    projects          TEXT,
    reporting_manager TEXT
);

CREATE TABLE IF NOT EXISTS rates (
    external_id   TEXT NOT NULL,
    period        TEXT NOT NULL,
    rate_value    REAL NOT NULL CHECK (rate_value > 0),
    currency      TEXT NOT NULL,
    contract_type TEXT,
    company       TEXT,
    PRIMARY KEY (external_id, period)
);

-- Replaced wholesale on every import; seq preserves insertion order.
CREATE TABLE IF NOT EXISTS ledger_rows (
    seq          INTEGER PRIMARY KEY AUTOINCREMENT,
    row_id       TEXT NOT NULL UNIQUE,
    person_label TEXT NOT NULL,
    payload_json TEXT NOT NULL,   -- column label -> normalised value
    recorded_at  TEXT NOT NULL    -- ISO 8601 UTC; server-assigned
);

CREATE INDEX IF NOT EXISTS ledger_person_idx ON ledger_rows(person_label);

PRAGMA user_version = 1;
";
