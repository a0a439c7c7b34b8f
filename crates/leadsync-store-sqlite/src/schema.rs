//! SQL schema for the leadsync SQLite store.
//!
//! Executed once at connection startup. `PRAGMA user_version` records the
//! layout so later migrations can be gated on it.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS companies (
    company_id          TEXT PRIMARY KEY,
    name                TEXT NOT NULL,
    name_key            TEXT NOT NULL UNIQUE,   -- lower-cased, whitespace-collapsed name
    domain              TEXT,
    classification_tag  TEXT,
    priority_tier       TEXT,                   -- 'Tier1' .. 'Tier4' | 'Customer'
    signal_strength     TEXT,                   -- 'High' | 'Medium' | 'Low'
    status              TEXT,
    source              TEXT,
    created_at          TEXT NOT NULL,          -- RFC 3339 UTC
    updated_at          TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS contacts (
    contact_id     TEXT PRIMARY KEY,
    company_id     TEXT NOT NULL REFERENCES companies(company_id),
    name           TEXT NOT NULL,
    name_key       TEXT NOT NULL,
    title          TEXT,
    job_function   TEXT NOT NULL,
    job_level      TEXT NOT NULL,
    role_type      TEXT NOT NULL,
    persona_score  INTEGER NOT NULL CHECK (persona_score BETWEEN 0 AND 100),
    linkedin_url   TEXT,
    email          TEXT,
    location       TEXT,
    source         TEXT,
    created_at     TEXT NOT NULL,
    updated_at     TEXT NOT NULL,
    UNIQUE (name_key, company_id)
);

CREATE INDEX IF NOT EXISTS contacts_company_idx  ON contacts(company_id);
CREATE INDEX IF NOT EXISTS contacts_linkedin_idx ON contacts(linkedin_url);

PRAGMA user_version = 1;
";
