//! SQL schema for the Attendly SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Identity provider side. Deliberately no foreign keys into or out of this
-- table: identities and profiles live in separate systems in production.
CREATE TABLE IF NOT EXISTS identities (
    id              TEXT PRIMARY KEY,
    email           TEXT NOT NULL UNIQUE COLLATE NOCASE,
    password_hash   TEXT NOT NULL,   -- argon2 PHC string
    email_verified  INTEGER NOT NULL DEFAULT 0,
    user_type       TEXT NOT NULL,   -- 'admin' | 'professor' | 'student'
    display_name    TEXT NOT NULL,
    created_at      TEXT NOT NULL
);

-- Profile rows share their primary key with the owning identity.
CREATE TABLE IF NOT EXISTS admins (
    id          TEXT PRIMARY KEY,
    admin_name  TEXT NOT NULL,
    username    TEXT NOT NULL UNIQUE COLLATE NOCASE,
    role        TEXT NOT NULL DEFAULT 'Admin',
    status      TEXT NOT NULL DEFAULT 'Active'
);

CREATE TABLE IF NOT EXISTS professors (
    id              TEXT PRIMARY KEY,
    professor_name  TEXT NOT NULL,
    email           TEXT NOT NULL UNIQUE COLLATE NOCASE,
    department      TEXT NOT NULL,
    status          TEXT NOT NULL DEFAULT 'Active',
    archived        INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS students (
    id              TEXT PRIMARY KEY,
    first_name      TEXT NOT NULL,
    middle_name     TEXT,
    last_name       TEXT NOT NULL,
    student_number  TEXT NOT NULL UNIQUE,
    email           TEXT NOT NULL,   -- contact address, not the login email
    department      TEXT NOT NULL,
    program         TEXT NOT NULL,
    year_level      TEXT NOT NULL,
    section         TEXT NOT NULL,
    status          TEXT NOT NULL DEFAULT 'Active',
    archived        INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS invites (
    id          TEXT PRIMARY KEY,
    token       TEXT NOT NULL UNIQUE,
    email       TEXT NOT NULL,
    user_type   TEXT NOT NULL,
    expires_at  TEXT NOT NULL,   -- RFC 3339 UTC
    used_at     TEXT,
    is_active   INTEGER NOT NULL DEFAULT 1
);

-- Older admin-only invitations; no user_type column.
CREATE TABLE IF NOT EXISTS admin_invites (
    id          TEXT PRIMARY KEY,
    token       TEXT NOT NULL UNIQUE,
    email       TEXT NOT NULL,
    expires_at  TEXT NOT NULL,
    used_at     TEXT,
    is_active   INTEGER NOT NULL DEFAULT 1
);

PRAGMA user_version = 1;
";
