//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microseconds, `Z`)
//! so that text comparison in SQL agrees with chronological order. UUIDs are
//! stored as hyphenated lowercase strings.

use std::str::FromStr as _;

use boxoffice_core::{
  booking::{Booking, BookingStatus, Contact, Ticket, TicketHolder},
  catalog::Session,
  money::Money,
};
use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── BookingStatus ───────────────────────────────────────────────────────────

pub fn encode_status(status: BookingStatus) -> &'static str {
  match status {
    BookingStatus::Pending => "pending",
    BookingStatus::Paid => "paid",
  }
}

pub fn decode_status(s: &str) -> Result<BookingStatus> {
  BookingStatus::from_str(s)
    .map_err(|_| Error::Decode(format!("unknown booking status: {s:?}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// A `sessions` row joined with its movie and hall.
pub struct RawSession {
  pub session_id:  i64,
  pub movie_id:    i64,
  pub movie_title: String,
  pub hall_id:     i64,
  pub hall_name:   String,
  pub starts_at:   String,
  pub price_minor: i64,
}

impl RawSession {
  pub fn into_session(self) -> Result<Session> {
    Ok(Session {
      session_id:  self.session_id,
      movie_id:    self.movie_id,
      movie_title: self.movie_title,
      hall_id:     self.hall_id,
      hall_name:   self.hall_name,
      starts_at:   decode_dt(&self.starts_at)?,
      price:       Money::from_minor(self.price_minor),
    })
  }
}

/// Raw strings read directly from a `bookings` row.
pub struct RawBooking {
  pub booking_id:  String,
  pub session_id:  i64,
  pub name:        String,
  pub email:       String,
  pub phone:       String,
  pub total_minor: i64,
  pub status:      String,
  pub created_at:  String,
  pub paid_at:     Option<String>,
}

impl RawBooking {
  pub fn into_booking(self, tickets: Vec<RawTicket>) -> Result<Booking> {
    Ok(Booking {
      booking_id: decode_uuid(&self.booking_id)?,
      session_id: self.session_id,
      contact:    Contact {
        name:  self.name,
        email: self.email,
        phone: self.phone,
      },
      total:      Money::from_minor(self.total_minor),
      status:     decode_status(&self.status)?,
      created_at: decode_dt(&self.created_at)?,
      paid_at:    self.paid_at.as_deref().map(decode_dt).transpose()?,
      tickets:    tickets
        .into_iter()
        .map(RawTicket::into_ticket)
        .collect::<Result<_>>()?,
    })
  }
}

/// A `tickets` row joined with its seat's row and number.
pub struct RawTicket {
  pub ticket_id:  String,
  pub booking_id: String,
  pub session_id: i64,
  pub seat_id:    i64,
  pub row:        u32,
  pub number:     u32,
  pub used:       bool,
  pub used_at:    Option<String>,
}

impl RawTicket {
  pub fn into_ticket(self) -> Result<Ticket> {
    Ok(Ticket {
      ticket_id:  decode_uuid(&self.ticket_id)?,
      booking_id: decode_uuid(&self.booking_id)?,
      session_id: self.session_id,
      seat_id:    self.seat_id,
      row:        self.row,
      number:     self.number,
      used:       self.used,
      used_at:    self.used_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

/// A paid ticket joined with its booking's contact details.
pub struct RawTicketHolder {
  pub ticket_id:  String,
  pub booking_id: String,
  pub name:       String,
  pub email:      String,
  pub phone:      String,
  pub row:        u32,
  pub number:     u32,
  pub used:       bool,
  pub booked_at:  String,
}

impl RawTicketHolder {
  pub fn into_holder(self) -> Result<TicketHolder> {
    Ok(TicketHolder {
      ticket_id:  decode_uuid(&self.ticket_id)?,
      booking_id: decode_uuid(&self.booking_id)?,
      name:       self.name,
      email:      self.email,
      phone:      self.phone,
      row:        self.row,
      number:     self.number,
      used:       self.used,
      booked_at:  decode_dt(&self.booked_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone as _;

  use super::*;

  #[test]
  fn timestamps_sort_as_text() {
    let a = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
    let b = a + chrono::Duration::microseconds(1);
    let c = a + chrono::Duration::nanoseconds(1_500_000);
    assert!(encode_dt(a) < encode_dt(b));
    assert!(encode_dt(b) < encode_dt(c));
    assert_eq!(encode_dt(a).len(), encode_dt(c).len());
    assert_eq!(decode_dt(&encode_dt(b)).unwrap(), b);
  }

  #[test]
  fn status_column_values() {
    for status in [BookingStatus::Pending, BookingStatus::Paid] {
      assert_eq!(decode_status(encode_status(status)).unwrap(), status);
    }
    assert!(decode_status("expired").is_err());
  }
}
