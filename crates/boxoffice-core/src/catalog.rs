//! Catalog types: seats, halls and sessions.
//!
//! The catalog is owned by an external service and is read-only from the
//! booking engine's perspective. A seat carries no booking state of its own;
//! occupancy is always derived from the ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

pub type MovieId = i64;
pub type HallId = i64;
pub type SeatId = i64;
pub type SessionId = i64;

/// A physical seat. Immutable once created; belongs to exactly one hall.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
  pub seat_id: SeatId,
  pub hall_id: HallId,
  pub row:     u32,
  pub number:  u32,
}

/// A screening: one movie in one hall at one time, at a fixed seat price.
///
/// The hall fixes the set of seats valid for every booking against the
/// session. Movie title and hall name are denormalised for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
  pub session_id:  SessionId,
  pub movie_id:    MovieId,
  pub movie_title: String,
  pub hall_id:     HallId,
  pub hall_name:   String,
  pub starts_at:   DateTime<Utc>,
  pub price:       Money,
}

/// Derived availability of a seat for a given session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatState {
  Free,
  /// Held by a pending or paid booking.
  Reserved,
}

/// One row of a session's occupancy map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatStatus {
  pub seat_id: SeatId,
  pub row:     u32,
  pub number:  u32,
  pub state:   SeatState,
}
