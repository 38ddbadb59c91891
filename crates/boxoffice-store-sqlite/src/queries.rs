//! Synchronous query helpers shared by the store's transaction closures.
//!
//! Every function takes a plain `&Connection`; a `Transaction` derefs to one,
//! so the same helper serves both standalone reads and reads inside a write
//! transaction.

use std::collections::HashSet;

use boxoffice_core::{
  Error as CoreError,
  booking::BookingStatus,
  catalog::{Seat, SeatId, SessionId},
};
use rusqlite::{Connection, OptionalExtension as _, Row};

use crate::encode::{RawBooking, RawSession, RawTicket, encode_status};

/// `?{start}, ?{start+1}, ...` for an `IN (...)` list of `n` values.
pub fn placeholders(start: usize, n: usize) -> String {
  (start..start + n)
    .map(|i| format!("?{i}"))
    .collect::<Vec<_>>()
    .join(", ")
}

pub fn is_constraint_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(f, _)
      if f.code == rusqlite::ErrorCode::ConstraintViolation
  )
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

pub fn select_session(
  conn: &Connection,
  session_id: SessionId,
) -> rusqlite::Result<Option<RawSession>> {
  conn
    .query_row(
      "SELECT s.session_id, s.movie_id, m.title, s.hall_id, h.name,
              s.starts_at, s.price_minor
       FROM sessions s
       JOIN movies m ON m.movie_id = s.movie_id
       JOIN halls  h ON h.hall_id  = s.hall_id
       WHERE s.session_id = ?1",
      rusqlite::params![session_id],
      |row| {
        Ok(RawSession {
          session_id:  row.get(0)?,
          movie_id:    row.get(1)?,
          movie_title: row.get(2)?,
          hall_id:     row.get(3)?,
          hall_name:   row.get(4)?,
          starts_at:   row.get(5)?,
          price_minor: row.get(6)?,
        })
      },
    )
    .optional()
}

pub fn seat_from_row(row: &Row<'_>) -> rusqlite::Result<Seat> {
  Ok(Seat {
    seat_id: row.get(0)?,
    hall_id: row.get(1)?,
    row:     row.get(2)?,
    number:  row.get(3)?,
  })
}

pub fn select_seats(
  conn: &Connection,
  ids: &[SeatId],
) -> rusqlite::Result<Vec<Seat>> {
  if ids.is_empty() {
    return Ok(Vec::new());
  }
  let sql = format!(
    "SELECT seat_id, hall_id, row_number, seat_number
     FROM seats
     WHERE seat_id IN ({})
     ORDER BY row_number, seat_number",
    placeholders(1, ids.len())
  );
  let mut stmt = conn.prepare(&sql)?;
  stmt
    .query_map(rusqlite::params_from_iter(ids.iter()), seat_from_row)?
    .collect()
}

// ─── Availability ────────────────────────────────────────────────────────────

/// Seats among `ids` that a pending or paid booking already holds for the
/// session.
pub fn select_held(
  conn: &Connection,
  session_id: SessionId,
  ids: &[SeatId],
) -> rusqlite::Result<Vec<SeatId>> {
  if ids.is_empty() {
    return Ok(Vec::new());
  }
  let sql = format!(
    "SELECT t.seat_id
     FROM tickets t
     JOIN bookings b ON b.booking_id = t.booking_id
     WHERE t.session_id = ?1
       AND b.status IN ('{}', '{}')
       AND t.seat_id IN ({})
     ORDER BY t.seat_id",
    encode_status(BookingStatus::Pending),
    encode_status(BookingStatus::Paid),
    placeholders(2, ids.len())
  );
  let params = std::iter::once(session_id).chain(ids.iter().copied());
  let mut stmt = conn.prepare(&sql)?;
  stmt
    .query_map(rusqlite::params_from_iter(params), |row| row.get(0))?
    .collect()
}

/// The seat availability check: the session must exist, every seat must
/// exist and belong to the session's hall, and none may be held.
///
/// The outer `rusqlite::Result` carries database failures; the inner one
/// carries the domain verdict.
pub fn resolve_seats(
  conn: &Connection,
  session_id: SessionId,
  seat_ids: &[SeatId],
) -> rusqlite::Result<Result<(RawSession, Vec<Seat>), CoreError>> {
  let Some(session) = select_session(conn, session_id)? else {
    return Ok(Err(CoreError::SessionNotFound(session_id)));
  };

  let seats = select_seats(conn, seat_ids)?;
  if seats.len() != seat_ids.len() {
    let found: HashSet<SeatId> = seats.iter().map(|s| s.seat_id).collect();
    let missing = seat_ids
      .iter()
      .copied()
      .filter(|id| !found.contains(id))
      .collect();
    return Ok(Err(CoreError::SeatNotFound(missing)));
  }

  let foreign: Vec<SeatId> = seats
    .iter()
    .filter(|s| s.hall_id != session.hall_id)
    .map(|s| s.seat_id)
    .collect();
  if !foreign.is_empty() {
    return Ok(Err(CoreError::SeatHallMismatch {
      session_id,
      hall_id: session.hall_id,
      seat_ids: foreign,
    }));
  }

  let held = select_held(conn, session_id, seat_ids)?;
  if !held.is_empty() {
    return Ok(Err(CoreError::SeatUnavailable(held)));
  }

  Ok(Ok((session, seats)))
}

// ─── Bookings ────────────────────────────────────────────────────────────────

pub fn select_booking(
  conn: &Connection,
  booking_id: &str,
) -> rusqlite::Result<Option<RawBooking>> {
  conn
    .query_row(
      "SELECT booking_id, session_id, name, email, phone, total_minor,
              status, created_at, paid_at
       FROM bookings
       WHERE booking_id = ?1",
      rusqlite::params![booking_id],
      |row| {
        Ok(RawBooking {
          booking_id:  row.get(0)?,
          session_id:  row.get(1)?,
          name:        row.get(2)?,
          email:       row.get(3)?,
          phone:       row.get(4)?,
          total_minor: row.get(5)?,
          status:      row.get(6)?,
          created_at:  row.get(7)?,
          paid_at:     row.get(8)?,
        })
      },
    )
    .optional()
}

const TICKET_COLUMNS: &str = "t.ticket_id, t.booking_id, t.session_id,
  t.seat_id, s.row_number, s.seat_number, t.used, t.used_at";

fn ticket_from_row(row: &Row<'_>) -> rusqlite::Result<RawTicket> {
  Ok(RawTicket {
    ticket_id:  row.get(0)?,
    booking_id: row.get(1)?,
    session_id: row.get(2)?,
    seat_id:    row.get(3)?,
    row:        row.get(4)?,
    number:     row.get(5)?,
    used:       row.get(6)?,
    used_at:    row.get(7)?,
  })
}

pub fn select_tickets(
  conn: &Connection,
  booking_id: &str,
) -> rusqlite::Result<Vec<RawTicket>> {
  let sql = format!(
    "SELECT {TICKET_COLUMNS}
     FROM tickets t
     JOIN seats s ON s.seat_id = t.seat_id
     WHERE t.booking_id = ?1
     ORDER BY s.row_number, s.seat_number"
  );
  let mut stmt = conn.prepare(&sql)?;
  stmt
    .query_map(rusqlite::params![booking_id], ticket_from_row)?
    .collect()
}

pub fn select_ticket(
  conn: &Connection,
  ticket_id: &str,
) -> rusqlite::Result<Option<RawTicket>> {
  let sql = format!(
    "SELECT {TICKET_COLUMNS}
     FROM tickets t
     JOIN seats s ON s.seat_id = t.seat_id
     WHERE t.ticket_id = ?1"
  );
  conn
    .query_row(&sql, rusqlite::params![ticket_id], ticket_from_row)
    .optional()
}

/// Booking plus tickets, read in one go.
pub fn select_booking_with_tickets(
  conn: &Connection,
  booking_id: &str,
) -> rusqlite::Result<Option<(RawBooking, Vec<RawTicket>)>> {
  let Some(booking) = select_booking(conn, booking_id)? else {
    return Ok(None);
  };
  let tickets = select_tickets(conn, booking_id)?;
  Ok(Some((booking, tickets)))
}
