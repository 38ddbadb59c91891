//! [`SqliteStore`]: the SQLite implementation of [`CatalogStore`] and
//! [`BookingLedger`].

use std::{
  path::Path,
  pin::pin,
  sync::{
    Arc,
    atomic::{AtomicU8, Ordering},
  },
  time::Duration,
};

use boxoffice_core::{
  Error as CoreError,
  booking::{Booking, BookingStatus, NewBooking, Ticket, TicketHolder},
  catalog::{HallId, Seat, SeatId, SeatState, SeatStatus, Session, SessionId},
  money::Money,
  payment::PaymentRecord,
  store::{BookingLedger, CatalogStore},
};
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    RawTicket, RawTicketHolder, decode_uuid, encode_dt, encode_status,
    encode_uuid,
  },
  queries::{
    is_constraint_violation, resolve_seats, select_booking_with_tickets,
    select_seats, select_session, select_ticket,
  },
  schema::SCHEMA,
};

/// Upper bound on any single store call unless overridden.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

// ─── Store ───────────────────────────────────────────────────────────────────

/// A booking ledger backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn:    tokio_rusqlite::Connection,
  timeout: Duration,
}

/// Decides, once, whether a write commits or its caller has given up.
///
/// The connection thread claims the gate right before `COMMIT`; the caller
/// claims it when its timeout fires or its future is dropped. Whoever loses
/// defers to the winner: an abandoned closure rolls back, and a caller whose
/// closure is already committing waits for the result instead of reporting a
/// timeout.
#[derive(Clone, Default)]
pub(crate) struct CommitGate(Arc<AtomicU8>);

const GATE_OPEN: u8 = 0;
const GATE_COMMITTING: u8 = 1;
const GATE_ABANDONED: u8 = 2;

impl CommitGate {
  pub(crate) fn is_abandoned(&self) -> bool {
    self.0.load(Ordering::Acquire) == GATE_ABANDONED
  }

  /// `false` if the caller already gave up; the transaction must roll back.
  pub(crate) fn begin_commit(&self) -> bool {
    self
      .0
      .compare_exchange(GATE_OPEN, GATE_COMMITTING, Ordering::AcqRel, Ordering::Acquire)
      .is_ok()
  }

  /// `false` if the closure is already committing.
  fn abandon(&self) -> bool {
    self
      .0
      .compare_exchange(GATE_OPEN, GATE_ABANDONED, Ordering::AcqRel, Ordering::Acquire)
      .is_ok()
  }
}

/// Abandons the gate when the calling future is dropped mid-flight.
struct AbandonOnDrop(CommitGate);

impl Drop for AbandonOnDrop {
  fn drop(&mut self) { self.0.abandon(); }
}

/// Result of the ticket check-and-set, decoded outside the connection thread.
enum TicketCheck {
  Missing,
  Unpaid(String),
  AlreadyUsed,
  Marked(RawTicket),
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, timeout: DEFAULT_TIMEOUT };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, timeout: DEFAULT_TIMEOUT };
    store.init_schema().await?;
    Ok(store)
  }

  /// Bound every subsequent store call (and SQLite's lock wait) by `timeout`.
  pub async fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
    self.timeout = timeout;
    self
      .call(move |conn| {
        conn.busy_timeout(timeout)?;
        Ok(())
      })
      .await?;
    Ok(self)
  }

  async fn init_schema(&self) -> Result<()> {
    let timeout = self.timeout;
    self
      .call(move |conn| {
        conn.busy_timeout(timeout)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await
  }

  /// Run `f` on the connection thread, giving up after `self.timeout`.
  ///
  /// Giving up only abandons the wait; `f` still runs. Reads go through here.
  /// Writes whose outcome the caller must be able to trust go through
  /// [`SqliteStore::call_gated`].
  pub(crate) async fn call<F, R>(&self, f: F) -> Result<R>
  where
    F: FnOnce(&mut rusqlite::Connection) -> tokio_rusqlite::Result<R>
      + Send
      + 'static,
    R: Send + 'static,
  {
    match tokio::time::timeout(self.timeout, self.conn.call(f)).await {
      Ok(res) => Ok(res?),
      Err(_) => Err(Error::Timeout(self.timeout)),
    }
  }

  /// Run a write transaction that commits only while its caller is waiting.
  ///
  /// `f` returns `None` when it found the gate abandoned and rolled back. A
  /// [`Error::Timeout`] from here means nothing was committed, so the caller
  /// may retry. The same holds when the returned future is dropped, unless
  /// the closure had already begun its commit.
  pub(crate) async fn call_gated<F, R>(&self, f: F) -> Result<R>
  where
    F: FnOnce(&mut rusqlite::Connection, &CommitGate) -> tokio_rusqlite::Result<Option<R>>
      + Send
      + 'static,
    R: Send + 'static,
  {
    let gate = CommitGate::default();
    let guard = AbandonOnDrop(gate.clone());
    let worker = gate.clone();
    let mut pending = pin!(self.conn.call(move |conn| f(conn, &worker)));

    let outcome = match tokio::time::timeout(self.timeout, pending.as_mut()).await {
      Ok(res) => res?,
      Err(_) if gate.abandon() => {
        tracing::warn!(timeout = ?self.timeout, "store write abandoned before commit");
        return Err(Error::Timeout(self.timeout));
      }
      // Already committing: report what actually happened.
      Err(_) => pending.await?,
    };
    drop(guard);
    outcome.ok_or(Error::Timeout(self.timeout))
  }

  async fn load_booking(&self, booking_id: Uuid) -> Result<Option<Booking>> {
    let id_str = encode_uuid(booking_id);
    let raw = self
      .call(move |conn| Ok(select_booking_with_tickets(conn, &id_str)?))
      .await?;
    raw
      .map(|(booking, tickets)| booking.into_booking(tickets))
      .transpose()
  }

  async fn require_session(&self, session_id: SessionId) -> Result<()> {
    let exists = self
      .call(move |conn| Ok(select_session(conn, session_id)?.is_some()))
      .await?;
    if exists {
      Ok(())
    } else {
      Err(CoreError::SessionNotFound(session_id).into())
    }
  }
}

// ─── CatalogStore impl ───────────────────────────────────────────────────────

impl CatalogStore for SqliteStore {
  type Error = Error;

  async fn get_session(&self, id: SessionId) -> Result<Option<Session>> {
    let raw = self.call(move |conn| Ok(select_session(conn, id)?)).await?;
    raw.map(|r| r.into_session()).transpose()
  }

  async fn get_seats_by_ids(&self, ids: Vec<SeatId>) -> Result<Vec<Seat>> {
    self.call(move |conn| Ok(select_seats(conn, &ids)?)).await
  }

  async fn get_hall_id_for_session(&self, id: SessionId) -> Result<Option<HallId>> {
    self
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT hall_id FROM sessions WHERE session_id = ?1",
              rusqlite::params![id],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await
  }
}

// ─── BookingLedger impl ──────────────────────────────────────────────────────

impl BookingLedger for SqliteStore {
  type Error = Error;

  // ── Availability ──────────────────────────────────────────────────────────

  async fn check_availability(
    &self,
    session_id: SessionId,
    seat_ids: Vec<SeatId>,
  ) -> Result<Vec<Seat>> {
    let verdict = self
      .call(move |conn| Ok(resolve_seats(conn, session_id, &seat_ids)?))
      .await?;
    let (_, seats) = verdict?;
    Ok(seats)
  }

  async fn session_occupancy(&self, session_id: SessionId) -> Result<Vec<SeatStatus>> {
    self.require_session(session_id).await?;

    let rows: Vec<(SeatId, u32, u32, bool)> = self
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT s.seat_id, s.row_number, s.seat_number,
                  EXISTS (
                    SELECT 1 FROM tickets t
                    JOIN bookings b ON b.booking_id = t.booking_id
                    WHERE t.session_id = ?1
                      AND t.seat_id = s.seat_id
                      AND b.status IN ('pending', 'paid')
                  ) AS held
           FROM seats s
           WHERE s.hall_id = (SELECT hall_id FROM sessions WHERE session_id = ?1)
           ORDER BY s.row_number, s.seat_number",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![session_id], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(
      rows
        .into_iter()
        .map(|(seat_id, row, number, held)| SeatStatus {
          seat_id,
          row,
          number,
          state: if held { SeatState::Reserved } else { SeatState::Free },
        })
        .collect(),
    )
  }

  // ── Lifecycle ─────────────────────────────────────────────────────────────

  async fn reserve(&self, input: NewBooking) -> Result<Booking> {
    input.validate()?;

    let booking_id = Uuid::new_v4();
    let created_at = Utc::now();

    let verdict = self
      .call_gated(move |conn, gate| {
        if gate.is_abandoned() {
          return Ok(None);
        }
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let (session, seats) =
          match resolve_seats(&tx, input.session_id, &input.seat_ids)? {
            Ok(found) => found,
            Err(e) => return Ok(Some(Err(e))),
          };

        let price = Money::from_minor(session.price_minor);
        let Some(total) = price.times(seats.len()) else {
          return Ok(Some(Err(CoreError::Validation(
            "booking total overflows".into(),
          ))));
        };

        let booking_id_str = encode_uuid(booking_id);
        tx.execute(
          "INSERT INTO bookings (
             booking_id, session_id, name, email, phone, total_minor,
             status, created_at, paid_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL)",
          rusqlite::params![
            booking_id_str,
            session.session_id,
            input.contact.name,
            input.contact.email,
            input.contact.phone,
            total.minor(),
            encode_status(BookingStatus::Pending),
            encode_dt(created_at),
          ],
        )?;

        let mut tickets = Vec::with_capacity(seats.len());
        for seat in &seats {
          let ticket_id = Uuid::new_v4();
          let inserted = tx.execute(
            "INSERT INTO tickets (ticket_id, booking_id, session_id, seat_id, used)
             VALUES (?1, ?2, ?3, ?4, 0)",
            rusqlite::params![
              encode_uuid(ticket_id),
              booking_id_str,
              session.session_id,
              seat.seat_id,
            ],
          );
          match inserted {
            Ok(_) => {}
            // Dropping `tx` rolls back the booking row and earlier tickets.
            Err(e) if is_constraint_violation(&e) => {
              return Ok(Some(Err(CoreError::SeatUnavailable(vec![seat.seat_id]))));
            }
            Err(e) => return Err(e.into()),
          }
          tickets.push(Ticket {
            ticket_id,
            booking_id,
            session_id: session.session_id,
            seat_id: seat.seat_id,
            row: seat.row,
            number: seat.number,
            used: false,
            used_at: None,
          });
        }

        if !gate.begin_commit() {
          return Ok(None);
        }
        tx.commit()?;

        Ok(Some(Ok(Booking {
          booking_id,
          session_id: session.session_id,
          contact: input.contact,
          total,
          status: BookingStatus::Pending,
          created_at,
          paid_at: None,
          tickets,
        })))
      })
      .await?;

    match verdict {
      Ok(booking) => {
        tracing::info!(
          booking_id = %booking.booking_id,
          session_id = booking.session_id,
          seats = booking.tickets.len(),
          total = %booking.total,
          "booking reserved"
        );
        Ok(booking)
      }
      Err(e) => {
        tracing::debug!(error = %e, "reservation rejected");
        Err(e.into())
      }
    }
  }

  async fn mark_paid(&self, booking_id: Uuid) -> Result<Booking> {
    let id_str = encode_uuid(booking_id);
    let paid_at = encode_dt(Utc::now());

    let verdict = self
      .call_gated(move |conn, gate| {
        if gate.is_abandoned() {
          return Ok(None);
        }
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        // Conditional on still being pending: a concurrent payment or a
        // sweep that got here first leaves nothing to update.
        let changed = tx.execute(
          "UPDATE bookings SET status = ?2, paid_at = ?3
           WHERE booking_id = ?1 AND status = ?4",
          rusqlite::params![
            id_str,
            encode_status(BookingStatus::Paid),
            paid_at,
            encode_status(BookingStatus::Pending),
          ],
        )?;

        if changed == 0 {
          let exists = tx
            .query_row(
              "SELECT 1 FROM bookings WHERE booking_id = ?1",
              rusqlite::params![id_str],
              |_| Ok(()),
            )
            .optional()?
            .is_some();
          return Ok(Some(Err(if exists {
            CoreError::BookingAlreadyPaid(booking_id)
          } else {
            CoreError::BookingNotFound(booking_id)
          })));
        }

        let loaded = select_booking_with_tickets(&tx, &id_str)?
          .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
        if !gate.begin_commit() {
          return Ok(None);
        }
        tx.commit()?;
        Ok(Some(Ok(loaded)))
      })
      .await?;

    let (raw, tickets) = verdict?;
    let booking = raw.into_booking(tickets)?;
    tracing::info!(booking_id = %booking_id, "booking marked paid");
    Ok(booking)
  }

  async fn reclaim_expired(
    &self,
    older_than: DateTime<Utc>,
    status: BookingStatus,
  ) -> Result<u64> {
    if status == BookingStatus::Paid {
      return Err(CoreError::PaidBookingsAreFinal.into());
    }

    let cutoff = encode_dt(older_than);
    let deleted = self
      .call(move |conn| {
        // Tickets go with their booking via ON DELETE CASCADE.
        Ok(conn.execute(
          "DELETE FROM bookings WHERE status = ?1 AND created_at < ?2",
          rusqlite::params![encode_status(status), cutoff],
        )?)
      })
      .await?;

    Ok(deleted as u64)
  }

  async fn validate_ticket(&self, ticket_id: Uuid) -> Result<Ticket> {
    let id_str = encode_uuid(ticket_id);
    let used_at = encode_dt(Utc::now());

    let check = self
      .call_gated(move |conn, gate| {
        if gate.is_abandoned() {
          return Ok(None);
        }
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let found: Option<(String, String)> = tx
          .query_row(
            "SELECT b.booking_id, b.status
             FROM tickets t
             JOIN bookings b ON b.booking_id = t.booking_id
             WHERE t.ticket_id = ?1",
            rusqlite::params![id_str],
            |row| Ok((row.get(0)?, row.get(1)?)),
          )
          .optional()?;

        let Some((booking_id, status)) = found else {
          return Ok(Some(TicketCheck::Missing));
        };
        if status != encode_status(BookingStatus::Paid) {
          return Ok(Some(TicketCheck::Unpaid(booking_id)));
        }

        let changed = tx.execute(
          "UPDATE tickets SET used = 1, used_at = ?2
           WHERE ticket_id = ?1 AND used = 0",
          rusqlite::params![id_str, used_at],
        )?;
        if changed == 0 {
          return Ok(Some(TicketCheck::AlreadyUsed));
        }

        let ticket = select_ticket(&tx, &id_str)?
          .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
        if !gate.begin_commit() {
          return Ok(None);
        }
        tx.commit()?;
        Ok(Some(TicketCheck::Marked(ticket)))
      })
      .await?;

    match check {
      TicketCheck::Missing => Err(CoreError::TicketNotFound(ticket_id).into()),
      TicketCheck::Unpaid(booking_id) => {
        Err(CoreError::BookingNotPaid(decode_uuid(&booking_id)?).into())
      }
      TicketCheck::AlreadyUsed => Err(CoreError::TicketAlreadyUsed(ticket_id).into()),
      TicketCheck::Marked(raw) => raw.into_ticket(),
    }
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn get_booking(&self, booking_id: Uuid) -> Result<Option<Booking>> {
    self.load_booking(booking_id).await
  }

  async fn is_paid(&self, booking_id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(booking_id);
    self
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM bookings WHERE booking_id = ?1 AND status = ?2",
              rusqlite::params![id_str, encode_status(BookingStatus::Paid)],
              |_| Ok(()),
            )
            .optional()?
            .is_some(),
        )
      })
      .await
  }

  async fn paid_tickets(&self, session_id: SessionId) -> Result<Vec<TicketHolder>> {
    self.require_session(session_id).await?;

    let raws: Vec<RawTicketHolder> = self
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT t.ticket_id, b.booking_id, b.name, b.email, b.phone,
                  s.row_number, s.seat_number, t.used, b.created_at
           FROM tickets t
           JOIN bookings b ON b.booking_id = t.booking_id
           JOIN seats    s ON s.seat_id    = t.seat_id
           WHERE t.session_id = ?1 AND b.status = ?2
           ORDER BY s.row_number, s.seat_number",
        )?;
        let rows = stmt
          .query_map(
            rusqlite::params![session_id, encode_status(BookingStatus::Paid)],
            |row| {
              Ok(RawTicketHolder {
                ticket_id:  row.get(0)?,
                booking_id: row.get(1)?,
                name:       row.get(2)?,
                email:      row.get(3)?,
                phone:      row.get(4)?,
                row:        row.get(5)?,
                number:     row.get(6)?,
                used:       row.get(7)?,
                booked_at:  row.get(8)?,
              })
            },
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTicketHolder::into_holder).collect()
  }

  // ── Payment journal ───────────────────────────────────────────────────────

  async fn payment_event_seen(&self, event_id: String) -> Result<bool> {
    self
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM payment_events WHERE event_id = ?1",
              rusqlite::params![event_id],
              |_| Ok(()),
            )
            .optional()?
            .is_some(),
        )
      })
      .await
  }

  async fn record_payment_event(&self, record: PaymentRecord) -> Result<bool> {
    let booking_id = record.event.booking_id.map(encode_uuid);
    let received_at = encode_dt(record.received_at);
    let outcome = record.outcome.as_ref().to_owned();

    let inserted = self
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT OR IGNORE INTO payment_events
             (event_id, event_type, booking_id, outcome, received_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![
            record.event.event_id,
            record.event.event_type,
            booking_id,
            outcome,
            received_at,
          ],
        )?)
      })
      .await?;

    Ok(inserted == 1)
  }
}
