//! SQL schema for the boxoffice SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- ── Catalog (owned elsewhere; read-only for the ledger) ─────────────────────

CREATE TABLE IF NOT EXISTS movies (
    movie_id    INTEGER PRIMARY KEY,
    title       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS halls (
    hall_id     INTEGER PRIMARY KEY,
    name        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS seats (
    seat_id     INTEGER PRIMARY KEY,
    hall_id     INTEGER NOT NULL REFERENCES halls(hall_id),
    row_number  INTEGER NOT NULL CHECK (row_number >= 1),
    seat_number INTEGER NOT NULL CHECK (seat_number >= 1),
    UNIQUE (hall_id, row_number, seat_number)
);

CREATE TABLE IF NOT EXISTS sessions (
    session_id  INTEGER PRIMARY KEY,
    movie_id    INTEGER NOT NULL REFERENCES movies(movie_id),
    hall_id     INTEGER NOT NULL REFERENCES halls(hall_id),
    starts_at   TEXT    NOT NULL,  -- RFC 3339 UTC
    price_minor INTEGER NOT NULL CHECK (price_minor > 0)
);

-- ── Ledger ──────────────────────────────────────────────────────────────────

-- Expired bookings are deleted outright, so every row here is either
-- pending or paid.
CREATE TABLE IF NOT EXISTS bookings (
    booking_id  TEXT PRIMARY KEY,
    session_id  INTEGER NOT NULL REFERENCES sessions(session_id),
    name        TEXT    NOT NULL,
    email       TEXT    NOT NULL,
    phone       TEXT    NOT NULL,
    total_minor INTEGER NOT NULL,
    status      TEXT    NOT NULL CHECK (status IN ('pending', 'paid')),
    created_at  TEXT    NOT NULL,  -- fixed-width RFC 3339 UTC; compared as text
    paid_at     TEXT
);

-- Only pending and paid bookings own tickets, so UNIQUE (session_id, seat_id)
-- is exactly the one-hold-per-seat-per-session constraint.
CREATE TABLE IF NOT EXISTS tickets (
    ticket_id   TEXT PRIMARY KEY,
    booking_id  TEXT    NOT NULL REFERENCES bookings(booking_id) ON DELETE CASCADE,
    session_id  INTEGER NOT NULL REFERENCES sessions(session_id),
    seat_id     INTEGER NOT NULL REFERENCES seats(seat_id),
    used        INTEGER NOT NULL DEFAULT 0 CHECK (used IN (0, 1)),
    used_at     TEXT,
    UNIQUE (session_id, seat_id)
);

-- Provider events already processed; no FK because the booking may be gone.
CREATE TABLE IF NOT EXISTS payment_events (
    event_id    TEXT PRIMARY KEY,
    event_type  TEXT NOT NULL,
    booking_id  TEXT,
    outcome     TEXT NOT NULL,
    received_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS bookings_status_created_idx ON bookings(status, created_at);
CREATE INDEX IF NOT EXISTS tickets_booking_idx         ON tickets(booking_id);
CREATE INDEX IF NOT EXISTS seats_hall_idx              ON seats(hall_id);

-- ── Terminal states ─────────────────────────────────────────────────────────

CREATE TRIGGER IF NOT EXISTS paid_bookings_stay_paid
BEFORE UPDATE OF status ON bookings
WHEN OLD.status = 'paid' AND NEW.status <> 'paid'
BEGIN
    SELECT RAISE(ABORT, 'paid booking cannot change status');
END;

CREATE TRIGGER IF NOT EXISTS paid_bookings_are_kept
BEFORE DELETE ON bookings
WHEN OLD.status = 'paid'
BEGIN
    SELECT RAISE(ABORT, 'paid booking cannot be deleted');
END;

CREATE TRIGGER IF NOT EXISTS used_tickets_stay_used
BEFORE UPDATE OF used ON tickets
WHEN OLD.used = 1 AND NEW.used = 0
BEGIN
    SELECT RAISE(ABORT, 'used ticket cannot be reset');
END;

PRAGMA user_version = 1;
";
