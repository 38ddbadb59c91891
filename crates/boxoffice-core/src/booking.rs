//! Bookings and tickets, the aggregate at the centre of the lifecycle.
//!
//! A [`Booking`] owns its [`Ticket`]s by value. Tickets refer to their seat
//! and session by id only, so there is no ownership cycle between the
//! booking and the catalog.
//!
//! ```text
//!          reserve()                 mark_paid()
//!   [ ]  --------------->  PENDING --------------->  PAID (terminal)
//!                            |
//!                            | reclaim_expired() (age > window)
//!                            v
//!                         deleted (terminal)
//! ```

use std::{collections::HashSet, sync::LazyLock};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};
use uuid::Uuid;

use crate::{
  Error, Result,
  catalog::{SeatId, SessionId},
  money::Money,
};

// ─── Status ──────────────────────────────────────────────────────────────────

/// The stored status of a booking. A reclaimed booking is deleted, so there
/// is no stored value for it.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "lowercase")]
pub enum BookingStatus {
  Pending,
  Paid,
}

// ─── Contact ─────────────────────────────────────────────────────────────────

/// Who the booking is for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
  pub name:  String,
  pub email: String,
  pub phone: String,
}

impl Contact {
  pub fn validate(&self) -> Result<()> {
    if self.name.trim().is_empty() {
      return Err(Error::Validation("name is required".into()));
    }
    if !is_match(&EMAIL, &self.email)? {
      return Err(Error::Validation("invalid email format".into()));
    }
    if self.phone.trim().is_empty() {
      return Err(Error::Validation("phone number is required".into()));
    }
    if !is_match(&PHONE, &self.phone)? {
      return Err(Error::Validation("invalid phone number format".into()));
    }
    Ok(())
  }
}

static EMAIL: LazyLock<Result<Regex, regex::Error>> =
  LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s.]+(\.[^@\s.]+)+$"));

static PHONE: LazyLock<Result<Regex, regex::Error>> =
  LazyLock::new(|| Regex::new(r"^\+?[0-9 ()-]{7,20}$"));

fn is_match(
  pattern: &LazyLock<Result<Regex, regex::Error>>,
  value: &str,
) -> Result<bool> {
  pattern
    .as_ref()
    .map(|re| re.is_match(value))
    .map_err(|e| Error::Validation(format!("invalid pattern: {e}")))
}

// ─── Ticket ──────────────────────────────────────────────────────────────────

/// Admission for exactly one seat in one session.
///
/// `used` starts `false` and flips to `true` at most once, and only while the
/// owning booking is paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
  pub ticket_id:  Uuid,
  pub booking_id: Uuid,
  pub session_id: SessionId,
  pub seat_id:    SeatId,
  /// Denormalised from the seat for rendering.
  pub row:        u32,
  pub number:     u32,
  pub used:       bool,
  pub used_at:    Option<DateTime<Utc>>,
}

// ─── Booking ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
  pub booking_id: Uuid,
  pub session_id: SessionId,
  pub contact:    Contact,
  /// `tickets.len() * session.price`, fixed at reservation time.
  pub total:      Money,
  pub status:     BookingStatus,
  /// Server-assigned; the expiry window is measured from here.
  pub created_at: DateTime<Utc>,
  pub paid_at:    Option<DateTime<Utc>>,
  pub tickets:    Vec<Ticket>,
}

impl Booking {
  pub fn is_paid(&self) -> bool { self.status == BookingStatus::Paid }
}

// ─── NewBooking ──────────────────────────────────────────────────────────────

/// Input to [`crate::store::BookingLedger::reserve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBooking {
  pub session_id: SessionId,
  pub contact:    Contact,
  pub seat_ids:   Vec<SeatId>,
}

impl NewBooking {
  /// Shape checks that need no store access.
  pub fn validate(&self) -> Result<()> {
    self.contact.validate()?;
    if self.seat_ids.is_empty() {
      return Err(Error::EmptySeatSelection);
    }
    let mut seen = HashSet::with_capacity(self.seat_ids.len());
    for id in &self.seat_ids {
      if !seen.insert(*id) {
        return Err(Error::DuplicateSeat(*id));
      }
    }
    Ok(())
  }
}

// ─── Door list ───────────────────────────────────────────────────────────────

/// A paid ticket together with the holder's contact details, as shown to
/// door staff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketHolder {
  pub ticket_id:  Uuid,
  pub booking_id: Uuid,
  pub name:       String,
  pub email:      String,
  pub phone:      String,
  pub row:        u32,
  pub number:     u32,
  pub used:       bool,
  pub booked_at:  DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use super::*;

  fn contact() -> Contact {
    Contact {
      name:  "Ada Lovelace".into(),
      email: "ada@example.com".into(),
      phone: "+44 20 7946 0958".into(),
    }
  }

  #[test]
  fn status_round_trips_through_column_text() {
    assert_eq!(BookingStatus::Pending.as_ref(), "pending");
    assert_eq!(BookingStatus::from_str("paid").unwrap(), BookingStatus::Paid);
    assert!(BookingStatus::from_str("deleted").is_err());
  }

  #[test]
  fn rejects_empty_and_duplicate_seats() {
    let mut input =
      NewBooking { session_id: 1, contact: contact(), seat_ids: vec![] };
    assert!(matches!(input.validate(), Err(Error::EmptySeatSelection)));

    input.seat_ids = vec![4, 5, 4];
    assert!(matches!(input.validate(), Err(Error::DuplicateSeat(4))));

    input.seat_ids = vec![4, 5];
    assert!(input.validate().is_ok());
  }

  #[test]
  fn contact_validation() {
    assert!(contact().validate().is_ok());

    let mut c = contact();
    c.name = "  ".into();
    assert!(matches!(c.validate(), Err(Error::Validation(_))));

    let mut c = contact();
    c.email = "not-an-email".into();
    assert!(matches!(c.validate(), Err(Error::Validation(_))));

    let mut c = contact();
    c.phone = "12ab".into();
    assert!(matches!(c.validate(), Err(Error::Validation(_))));
  }

  #[test]
  fn phone_follows_pattern_bounds() {
    let with_phone = |phone: &str| Contact { phone: phone.into(), ..contact() };

    // Seven characters from the allowed set is the shortest accepted form.
    assert!(with_phone("123 456").validate().is_ok());
    assert!(with_phone("(((-)))").validate().is_ok());
    assert!(with_phone("+1234567").validate().is_ok());
    assert!(with_phone(&"9".repeat(20)).validate().is_ok());

    assert!(matches!(with_phone("12 345").validate(), Err(Error::Validation(_))));
    assert!(matches!(
      with_phone(&"9".repeat(21)).validate(),
      Err(Error::Validation(_))
    ));
    assert!(matches!(with_phone("++1234567").validate(), Err(Error::Validation(_))));
    assert!(matches!(with_phone("        ").validate(), Err(Error::Validation(_))));
  }

  #[test]
  fn email_needs_local_part_and_dotted_domain() {
    let with_email = |email: &str| Contact { email: email.into(), ..contact() };

    assert!(with_email("a@b.co").validate().is_ok());
    assert!(with_email("first.last@mail.example.org").validate().is_ok());

    for bad in ["@example.com", "ada@example", "ada@@example.com", "ada @example.com", "ada@example."] {
      assert!(matches!(with_email(bad).validate(), Err(Error::Validation(_))), "{bad}");
    }
  }
}
