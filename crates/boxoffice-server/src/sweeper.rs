//! Reservation expiry sweeper.
//!
//! Each pass deletes pending bookings older than the expiration window,
//! releasing their seats. Passes are idempotent: overlapping or repeated
//! runs simply find nothing left to delete.

use std::{sync::Arc, time::Duration};

use boxoffice_core::{
  booking::BookingStatus,
  clock::{Clock, SystemClock},
  store::BookingLedger,
};
use tokio::{sync::watch, time::MissedTickBehavior};
use tracing::{debug, error, info};

pub struct Sweeper<S> {
  store:    Arc<S>,
  clock:    Arc<dyn Clock>,
  window:   chrono::Duration,
  interval: Duration,
}

impl<S: BookingLedger + 'static> Sweeper<S> {
  pub fn new(store: Arc<S>, window: chrono::Duration, interval: Duration) -> Self {
    Self { store, clock: Arc::new(SystemClock), window, interval }
  }

  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  /// Run one pass. Returns how many bookings were reclaimed.
  pub async fn sweep_once(&self) -> boxoffice_core::Result<u64> {
    let cutoff = self.clock.now() - self.window;
    let reclaimed = self
      .store
      .reclaim_expired(cutoff, BookingStatus::Pending)
      .await
      .map_err(Into::<boxoffice_core::Error>::into)?;
    if reclaimed > 0 {
      info!(reclaimed, cutoff = %cutoff, "expired reservations reclaimed");
    } else {
      debug!(cutoff = %cutoff, "no expired reservations");
    }
    Ok(reclaimed)
  }

  /// Sweep every `interval` until `shutdown` flips to `true`.
  pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
    info!(
      interval_secs = self.interval.as_secs(),
      window_minutes = self.window.num_minutes(),
      "sweeper started"
    );

    let mut ticker = tokio::time::interval(self.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
      tokio::select! {
        changed = shutdown.changed() => {
          if changed.is_err() || *shutdown.borrow() {
            info!("sweeper stopped");
            return;
          }
        }
        _ = ticker.tick() => {
          if let Err(e) = self.sweep_once().await {
            error!(error = %e, "sweep failed");
          }
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use boxoffice_core::{
    booking::{Contact, NewBooking},
    clock::ManualClock,
    money::Money,
  };
  use boxoffice_store_sqlite::SqliteStore;
  use chrono::Utc;

  use super::*;

  async fn setup() -> (Arc<SqliteStore>, Vec<i64>, i64) {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let movie = store.add_movie("Mirror").await.unwrap();
    let (hall, seats) = store.add_hall("Hall A", 1, 4).await.unwrap();
    let session = store
      .add_session(movie, hall, Utc::now(), Money::from_minor(800))
      .await
      .unwrap();
    let ids = seats.iter().map(|s| s.seat_id).collect();
    (Arc::new(store), ids, session.session_id)
  }

  fn booking(session_id: i64, seat_ids: Vec<i64>) -> NewBooking {
    NewBooking {
      session_id,
      contact: Contact {
        name:  "Ignat".into(),
        email: "ignat@example.com".into(),
        phone: "+7 812 555 0101".into(),
      },
      seat_ids,
    }
  }

  #[tokio::test]
  async fn abandoned_reservation_is_reclaimed_after_window() {
    let (store, seats, session_id) = setup().await;
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let sweeper = Sweeper::new(
      store.clone(),
      chrono::Duration::minutes(10),
      Duration::from_secs(60),
    )
    .with_clock(clock.clone());

    let abandoned = store
      .reserve(booking(session_id, vec![seats[0], seats[1]]))
      .await
      .unwrap();

    // Inside the window nothing happens.
    clock.advance(chrono::Duration::minutes(5));
    assert_eq!(sweeper.sweep_once().await.unwrap(), 0);
    assert!(store.get_booking(abandoned.booking_id).await.unwrap().is_some());

    clock.advance(chrono::Duration::minutes(6));
    assert_eq!(sweeper.sweep_once().await.unwrap(), 1);
    assert!(store.get_booking(abandoned.booking_id).await.unwrap().is_none());

    // Overlapping pass finds nothing; seats are free again.
    assert_eq!(sweeper.sweep_once().await.unwrap(), 0);
    store
      .reserve(booking(session_id, vec![seats[0], seats[1]]))
      .await
      .unwrap();
  }

  #[tokio::test]
  async fn paid_bookings_survive_sweeps() {
    let (store, seats, session_id) = setup().await;
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let sweeper = Sweeper::new(
      store.clone(),
      chrono::Duration::minutes(10),
      Duration::from_secs(60),
    )
    .with_clock(clock.clone());

    let paid = store.reserve(booking(session_id, vec![seats[2]])).await.unwrap();
    store.mark_paid(paid.booking_id).await.unwrap();

    clock.advance(chrono::Duration::hours(2));
    assert_eq!(sweeper.sweep_once().await.unwrap(), 0);
    assert!(store.is_paid(paid.booking_id).await.unwrap());
  }

  #[tokio::test]
  async fn run_stops_on_shutdown() {
    let (store, _, _) = setup().await;
    let sweeper = Sweeper::new(
      store,
      chrono::Duration::minutes(10),
      Duration::from_millis(10),
    );
    let (tx, rx) = watch::channel(false);
    let handle = tokio::spawn(sweeper.run(rx));
    tokio::time::sleep(Duration::from_millis(30)).await;
    tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(2), handle)
      .await
      .unwrap()
      .unwrap();
  }
}
