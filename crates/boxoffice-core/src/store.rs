//! The `CatalogStore` and `BookingLedger` traits.
//!
//! Both are implemented by storage backends (e.g. `boxoffice-store-sqlite`).
//! The payment gateway and the HTTP layer depend on these abstractions, not
//! on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  booking::{Booking, BookingStatus, NewBooking, Ticket, TicketHolder},
  catalog::{HallId, Seat, SeatId, SeatStatus, Session, SessionId},
  payment::PaymentRecord,
};

// ─── Catalog ─────────────────────────────────────────────────────────────────

/// Read-only view of the movie/hall/session catalog.
pub trait CatalogStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Retrieve a session by id. Returns `None` if not found.
  fn get_session(
    &self,
    id: SessionId,
  ) -> impl Future<Output = Result<Option<Session>, Self::Error>> + Send + '_;

  /// Retrieve every seat whose id is in `ids`. Unknown ids are skipped, so
  /// the result may be shorter than the input.
  fn get_seats_by_ids(
    &self,
    ids: Vec<SeatId>,
  ) -> impl Future<Output = Result<Vec<Seat>, Self::Error>> + Send + '_;

  /// The hall a session is screened in. Returns `None` if the session does
  /// not exist.
  fn get_hall_id_for_session(
    &self,
    id: SessionId,
  ) -> impl Future<Output = Result<Option<HallId>, Self::Error>> + Send + '_;
}

// ─── Ledger ──────────────────────────────────────────────────────────────────

/// The system of record for who holds which seat.
///
/// Domain failures (`SeatUnavailable`, `BookingAlreadyPaid`, ...) are carried
/// inside `Self::Error` and recovered with `Into<crate::Error>`, so generic
/// callers can match on them without knowing the backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait BookingLedger: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static + Into<crate::Error>;

  // ── Availability ──────────────────────────────────────────────────────

  /// Validate `seat_ids` against the session's hall and current holds.
  ///
  /// Fails with `SessionNotFound`, `SeatNotFound`, `SeatHallMismatch` or
  /// `SeatUnavailable`. Advisory only: [`BookingLedger::reserve`] repeats
  /// the same check inside its own transaction.
  fn check_availability(
    &self,
    session_id: SessionId,
    seat_ids: Vec<SeatId>,
  ) -> impl Future<Output = Result<Vec<Seat>, Self::Error>> + Send + '_;

  /// Every seat of the session's hall with its derived state.
  fn session_occupancy(
    &self,
    session_id: SessionId,
  ) -> impl Future<Output = Result<Vec<SeatStatus>, Self::Error>> + Send + '_;

  // ── Lifecycle ─────────────────────────────────────────────────────────

  /// Atomically check availability and create a `Pending` booking with one
  /// ticket per seat. Nothing is persisted on failure.
  fn reserve(
    &self,
    input: NewBooking,
  ) -> impl Future<Output = Result<Booking, Self::Error>> + Send + '_;

  /// Transition `Pending → Paid`. Fails with `BookingNotFound` if the row is
  /// gone and `BookingAlreadyPaid` if another caller won the transition.
  fn mark_paid(
    &self,
    booking_id: Uuid,
  ) -> impl Future<Output = Result<Booking, Self::Error>> + Send + '_;

  /// Delete every booking in `status` created before `older_than`, with its
  /// tickets. Returns the number of bookings removed. Refuses `Paid`.
  fn reclaim_expired(
    &self,
    older_than: DateTime<Utc>,
    status: BookingStatus,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Atomically mark a ticket used. Fails with `TicketNotFound`,
  /// `BookingNotPaid` or `TicketAlreadyUsed`.
  fn validate_ticket(
    &self,
    ticket_id: Uuid,
  ) -> impl Future<Output = Result<Ticket, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Retrieve a booking with its tickets. Returns `None` if not found.
  fn get_booking(
    &self,
    booking_id: Uuid,
  ) -> impl Future<Output = Result<Option<Booking>, Self::Error>> + Send + '_;

  /// `true` only if the booking exists and is paid.
  fn is_paid(
    &self,
    booking_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Tickets of paid bookings for a session. Fails with `SessionNotFound`.
  fn paid_tickets(
    &self,
    session_id: SessionId,
  ) -> impl Future<Output = Result<Vec<TicketHolder>, Self::Error>> + Send + '_;

  // ── Payment journal ───────────────────────────────────────────────────

  /// Whether a provider event id has already been journaled.
  fn payment_event_seen(
    &self,
    event_id: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Journal a processed event. Returns `false` if the event id was already
  /// present (the existing row is kept).
  fn record_payment_event(
    &self,
    record: PaymentRecord,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
