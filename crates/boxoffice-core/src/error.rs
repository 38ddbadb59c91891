//! Error types for `boxoffice-core`.
//!
//! The variants double as the taxonomy surfaced at the HTTP boundary; see
//! [`Error::kind`].

use thiserror::Error;
use uuid::Uuid;

use crate::catalog::{HallId, SeatId, SessionId};

#[derive(Debug, Error)]
pub enum Error {
  #[error("session not found: {0}")]
  SessionNotFound(SessionId),

  #[error("seats not found: {0:?}")]
  SeatNotFound(Vec<SeatId>),

  #[error("seats {seat_ids:?} do not belong to hall {hall_id} of session {session_id}")]
  SeatHallMismatch {
    session_id: SessionId,
    hall_id:    HallId,
    seat_ids:   Vec<SeatId>,
  },

  #[error("seats already booked: {0:?}")]
  SeatUnavailable(Vec<SeatId>),

  #[error("at least one seat must be selected")]
  EmptySeatSelection,

  #[error("seat {0} selected more than once")]
  DuplicateSeat(SeatId),

  #[error("booking not found: {0}")]
  BookingNotFound(Uuid),

  #[error("booking {0} is already paid")]
  BookingAlreadyPaid(Uuid),

  #[error("booking {0} is not paid")]
  BookingNotPaid(Uuid),

  #[error("paid bookings are final and cannot be reclaimed")]
  PaidBookingsAreFinal,

  #[error("ticket not found: {0}")]
  TicketNotFound(Uuid),

  #[error("ticket {0} is already used")]
  TicketAlreadyUsed(Uuid),

  #[error("ticket file not found for booking {0}")]
  TicketFileNotFound(Uuid),

  #[error("validation failed: {0}")]
  Validation(String),

  #[error("store call timed out after {0:?}")]
  Timeout(std::time::Duration),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("collaborator error: {0}")]
  Collaborator(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Coarse classification of an [`Error`], one per HTTP status family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  /// Session, seat, booking, ticket or ticket file absent.
  NotFound,
  /// Seat already held, booking already paid, ticket already used.
  Conflict,
  /// Admission or download attempted on an unpaid booking.
  PaymentRequired,
  /// Malformed request.
  Validation,
  /// Store unavailable, timeout, collaborator failure. Nothing partial was
  /// committed, so callers may retry.
  Infrastructure,
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::SessionNotFound(_)
      | Self::SeatNotFound(_)
      | Self::BookingNotFound(_)
      | Self::TicketNotFound(_)
      | Self::TicketFileNotFound(_) => ErrorKind::NotFound,
      Self::SeatUnavailable(_)
      | Self::BookingAlreadyPaid(_)
      | Self::TicketAlreadyUsed(_)
      | Self::PaidBookingsAreFinal => ErrorKind::Conflict,
      Self::BookingNotPaid(_) => ErrorKind::PaymentRequired,
      Self::SeatHallMismatch { .. }
      | Self::EmptySeatSelection
      | Self::DuplicateSeat(_)
      | Self::Validation(_) => ErrorKind::Validation,
      Self::Timeout(_)
      | Self::Store(_)
      | Self::Collaborator(_)
      | Self::Serialization(_) => ErrorKind::Infrastructure,
    }
  }
}
