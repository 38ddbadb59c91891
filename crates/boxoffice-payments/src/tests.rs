//! Gateway tests against an in-memory SQLite ledger and fake collaborators.

use std::{
  collections::HashMap,
  sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
  },
};

use async_trait::async_trait;
use boxoffice_core::{
  Error as CoreError,
  booking::{Booking, BookingStatus, Contact, NewBooking},
  catalog::{Seat, Session},
  fulfilment::{Notifier, TicketArchive, TicketRenderer},
  money::Money,
  store::BookingLedger,
};
use boxoffice_store_sqlite::SqliteStore;
use chrono::{Duration, Utc};
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::{
  CheckoutProvider, CheckoutRequest, CheckoutSession, Error, Fulfilment,
  GatewayConfig, PaymentGateway, Reconciliation, SignatureVerifier,
  signature::DEFAULT_TOLERANCE,
};

const SECRET: &str = "whsec_test_secret";

// ─── Fakes ───────────────────────────────────────────────────────────────────

#[derive(Default)]
struct FakeProvider {
  requests: Mutex<Vec<CheckoutRequest>>,
}

#[async_trait]
impl CheckoutProvider for FakeProvider {
  async fn create_session(
    &self,
    request: &CheckoutRequest,
  ) -> crate::Result<CheckoutSession> {
    let mut requests = self.requests.lock().unwrap();
    requests.push(request.clone());
    let id = format!("cs_test_{}", requests.len());
    Ok(CheckoutSession { url: format!("https://checkout.test/{id}"), id })
  }
}

struct FakeRenderer {
  fail: bool,
}

impl TicketRenderer for FakeRenderer {
  fn render(&self, booking: &Booking, _: &Session) -> boxoffice_core::Result<Vec<u8>> {
    if self.fail {
      return Err(CoreError::Collaborator("renderer offline".into()));
    }
    Ok(format!("%PDF tickets={}", booking.tickets.len()).into_bytes())
  }
}

#[derive(Default)]
struct MemoryArchive {
  files: Mutex<HashMap<Uuid, Vec<u8>>>,
}

#[async_trait]
impl TicketArchive for MemoryArchive {
  async fn save(&self, booking_id: Uuid, document: Vec<u8>) -> boxoffice_core::Result<()> {
    self.files.lock().unwrap().insert(booking_id, document);
    Ok(())
  }

  async fn load(&self, booking_id: Uuid) -> boxoffice_core::Result<Vec<u8>> {
    self
      .files
      .lock()
      .unwrap()
      .get(&booking_id)
      .cloned()
      .ok_or(CoreError::TicketFileNotFound(booking_id))
  }
}

#[derive(Default)]
struct RecordingNotifier {
  sent: AtomicUsize,
  fail: bool,
}

#[async_trait]
impl Notifier for RecordingNotifier {
  async fn send_booking_confirmation(
    &self,
    _email: &str,
    _booking: &Booking,
    _session: &Session,
  ) -> boxoffice_core::Result<()> {
    if self.fail {
      return Err(CoreError::Collaborator("smtp down".into()));
    }
    self.sent.fetch_add(1, Ordering::SeqCst);
    Ok(())
  }
}

// ─── Harness ─────────────────────────────────────────────────────────────────

struct Harness {
  store:    Arc<SqliteStore>,
  gateway:  Arc<PaymentGateway<SqliteStore>>,
  provider: Arc<FakeProvider>,
  archive:  Arc<MemoryArchive>,
  notifier: Arc<RecordingNotifier>,
  session:  Session,
  seats:    Vec<Seat>,
}

async fn harness_with(render_fails: bool, notify_fails: bool) -> Harness {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let movie = store.add_movie("Stalker").await.unwrap();
  let (hall, seats) = store.add_hall("Red Hall", 2, 5).await.unwrap();
  let session = store
    .add_session(movie, hall, Utc::now() + Duration::hours(3), Money::from_minor(1250))
    .await
    .unwrap();
  let store = Arc::new(store);

  let provider = Arc::new(FakeProvider::default());
  let archive = Arc::new(MemoryArchive::default());
  let notifier =
    Arc::new(RecordingNotifier { sent: AtomicUsize::new(0), fail: notify_fails });
  let fulfilment = Fulfilment {
    renderer: Arc::new(FakeRenderer { fail: render_fails }),
    archive:  archive.clone(),
    notifier: notifier.clone(),
  };

  let gateway = PaymentGateway::new(
    store.clone(),
    provider.clone(),
    fulfilment,
    GatewayConfig::new(SECRET),
  )
  .unwrap();

  Harness {
    store,
    gateway: Arc::new(gateway),
    provider,
    archive,
    notifier,
    session,
    seats,
  }
}

async fn harness() -> Harness { harness_with(false, false).await }

impl Harness {
  async fn reserve(&self, seat_idx: &[usize]) -> Booking {
    self
      .store
      .reserve(NewBooking {
        session_id: self.session.session_id,
        contact:    Contact {
          name:  "Andrei Rublev".into(),
          email: "andrei@example.com".into(),
          phone: "+7 495 123 4567".into(),
        },
        seat_ids:   seat_idx.iter().map(|&i| self.seats[i].seat_id).collect(),
      })
      .await
      .unwrap()
  }

  fn sent(&self) -> usize { self.notifier.sent.load(Ordering::SeqCst) }
}

fn completed(event_id: &str, booking_id: Uuid) -> Vec<u8> {
  event(event_id, "checkout.session.completed", booking_id)
}

fn event(event_id: &str, event_type: &str, booking_id: Uuid) -> Vec<u8> {
  serde_json::json!({
    "id": event_id,
    "type": event_type,
    "data": { "object": { "id": "cs_test_1", "metadata": { "bookingId": booking_id.to_string() } } }
  })
  .to_string()
  .into_bytes()
}

fn sign(payload: &[u8]) -> String {
  SignatureVerifier::new(SECRET, DEFAULT_TOLERANCE)
    .unwrap()
    .sign(payload, Utc::now().timestamp())
}

// ─── Checkout ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn checkout_has_one_line_item_per_ticket() {
  let h = harness().await;
  let booking = h.reserve(&[0, 6]).await;

  let url = h
    .gateway
    .create_checkout(booking.booking_id, "https://cinema.test/paid", "https://cinema.test/cancel")
    .await
    .unwrap();
  assert_eq!(url, "https://checkout.test/cs_test_1");

  let requests = h.provider.requests.lock().unwrap();
  let request = &requests[0];
  assert_eq!(request.booking_id, booking.booking_id);
  assert_eq!(request.customer_email, "andrei@example.com");
  assert_eq!(
    request.success_url,
    "https://cinema.test/paid?session_id={CHECKOUT_SESSION_ID}"
  );
  assert_eq!(request.currency, "usd");
  assert_eq!(request.line_items.len(), 2);
  assert_eq!(request.line_items[0].name, "Movie Ticket (Row 1, Seat 1)");
  assert_eq!(request.line_items[1].name, "Movie Ticket (Row 2, Seat 2)");
  assert!(request.line_items[0].description.contains("Stalker"));
  assert!(request.line_items[0].description.contains("Red Hall"));
  assert!(
    request
      .line_items
      .iter()
      .all(|i| i.unit_amount == Money::from_minor(1250) && i.quantity == 1)
  );
}

#[tokio::test]
async fn checkout_rejects_paid_missing_and_blank() {
  let h = harness().await;
  let booking = h.reserve(&[1]).await;
  h.store.mark_paid(booking.booking_id).await.unwrap();

  let err = h
    .gateway
    .create_checkout(booking.booking_id, "https://a.test", "https://b.test")
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::BookingAlreadyPaid(_))));

  let err = h
    .gateway
    .create_checkout(Uuid::new_v4(), "https://a.test", "https://b.test")
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::BookingNotFound(_))));

  let err = h
    .gateway
    .create_checkout(booking.booking_id, " ", "https://b.test")
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(CoreError::Validation(_))));
  assert!(h.provider.requests.lock().unwrap().is_empty());
}

// ─── Webhook ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn completed_checkout_pays_and_fulfils_once() {
  let h = harness().await;
  let booking = h.reserve(&[2, 3]).await;

  let payload = completed("evt_1", booking.booking_id);
  let signature = sign(&payload);
  let result = h
    .gateway
    .handle_provider_callback(&payload, Some(&signature))
    .await
    .unwrap();
  assert_eq!(result, Reconciliation::Paid {
    booking_id: booking.booking_id,
    fulfilled:  true,
  });
  assert!(h.store.is_paid(booking.booking_id).await.unwrap());
  assert_eq!(
    h.archive.load(booking.booking_id).await.unwrap(),
    b"%PDF tickets=2".to_vec()
  );
  assert_eq!(h.sent(), 1);

  // Same event redelivered.
  let result = h
    .gateway
    .handle_provider_callback(&payload, Some(&signature))
    .await
    .unwrap();
  assert_eq!(result, Reconciliation::Replayed);
  assert!(result.verified());

  // A second, distinct confirmation for the same booking.
  let payload = completed("evt_2", booking.booking_id);
  let result = h
    .gateway
    .handle_provider_callback(&payload, Some(&sign(&payload)))
    .await
    .unwrap();
  assert_eq!(result, Reconciliation::AlreadyPaid { booking_id: booking.booking_id });
  assert_eq!(h.sent(), 1);

  let paid = h.store.get_booking(booking.booking_id).await.unwrap().unwrap();
  assert_eq!(paid.status, BookingStatus::Paid);
}

#[tokio::test]
async fn concurrent_deliveries_notify_exactly_once() {
  let h = harness().await;
  let booking = h.reserve(&[4]).await;

  let mut set = JoinSet::new();
  for i in 0..6 {
    let gateway = h.gateway.clone();
    // Half the deliveries reuse one event id, half carry fresh ids.
    let event_id = if i % 2 == 0 { "evt_dup".to_owned() } else { format!("evt_{i}") };
    let payload = completed(&event_id, booking.booking_id);
    let signature = sign(&payload);
    set.spawn(async move {
      gateway
        .handle_provider_callback(&payload, Some(&signature))
        .await
    });
  }

  let mut paid = 0;
  while let Some(joined) = set.join_next().await {
    let result = joined.unwrap().unwrap();
    assert!(result.verified());
    if matches!(result, Reconciliation::Paid { .. }) {
      paid += 1;
    }
  }
  assert_eq!(paid, 1);
  assert_eq!(h.sent(), 1);
}

#[tokio::test]
async fn other_event_types_are_accepted_and_ignored() {
  let h = harness().await;
  let booking = h.reserve(&[5]).await;

  let payload = event("evt_9", "payment_intent.created", booking.booking_id);
  let result = h
    .gateway
    .handle_provider_callback(&payload, Some(&sign(&payload)))
    .await
    .unwrap();
  assert_eq!(result, Reconciliation::Ignored);
  assert!(result.verified());
  assert!(!h.store.is_paid(booking.booking_id).await.unwrap());
  assert_eq!(h.sent(), 0);
}

#[tokio::test]
async fn late_payment_for_reclaimed_booking_is_orphaned() {
  let h = harness().await;
  let booking = h.reserve(&[7]).await;
  h.store
    .reclaim_expired(Utc::now() + Duration::seconds(1), BookingStatus::Pending)
    .await
    .unwrap();

  let payload = completed("evt_late", booking.booking_id);
  let result = h
    .gateway
    .handle_provider_callback(&payload, Some(&sign(&payload)))
    .await
    .unwrap();
  assert_eq!(result, Reconciliation::Orphaned {
    booking_id: Some(booking.booking_id),
  });
  assert!(h.store.get_booking(booking.booking_id).await.unwrap().is_none());
  assert_eq!(h.sent(), 0);
}

#[tokio::test]
async fn bad_signature_is_unverified_and_changes_nothing() {
  let h = harness().await;
  let booking = h.reserve(&[8]).await;
  let payload = completed("evt_forged", booking.booking_id);

  let forged = SignatureVerifier::new("whsec_attacker", DEFAULT_TOLERANCE)
    .unwrap()
    .sign(&payload, Utc::now().timestamp());
  for header in [Some(forged.as_str()), None] {
    let result = h
      .gateway
      .handle_provider_callback(&payload, header)
      .await
      .unwrap();
    assert_eq!(result, Reconciliation::Unverified);
    assert!(!result.verified());
  }
  assert!(!h.store.is_paid(booking.booking_id).await.unwrap());
  assert!(!h.store.payment_event_seen("evt_forged".into()).await.unwrap());
}

#[tokio::test]
async fn fulfilment_failure_keeps_booking_paid() {
  let h = harness_with(true, true).await;
  let booking = h.reserve(&[9]).await;

  let payload = completed("evt_f", booking.booking_id);
  let result = h
    .gateway
    .handle_provider_callback(&payload, Some(&sign(&payload)))
    .await
    .unwrap();
  assert_eq!(result, Reconciliation::Paid {
    booking_id: booking.booking_id,
    fulfilled:  false,
  });
  assert!(h.store.is_paid(booking.booking_id).await.unwrap());
  assert!(matches!(
    h.archive.load(booking.booking_id).await,
    Err(CoreError::TicketFileNotFound(_))
  ));
}

#[tokio::test]
async fn signed_non_event_body_is_acknowledged_and_ignored() {
  let h = harness().await;
  let payload = b"{\"not\": \"an event\"}";
  let result = h
    .gateway
    .handle_provider_callback(payload, Some(&sign(payload)))
    .await
    .unwrap();
  assert_eq!(result, Reconciliation::Ignored);
  assert!(result.verified());
}
