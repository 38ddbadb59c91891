//! [`PaymentGateway`]: checkout creation and webhook reconciliation.
//!
//! Reconciliation is idempotent at two levels: a replayed provider event id
//! is short-circuited by the payment journal, and a second delivery that
//! slips past the journal (two concurrent deliveries) loses the conditional
//! `PENDING → PAID` update in the ledger and is reported as already paid.
//! Only the delivery that wins the transition runs fulfilment.

use std::{sync::Arc, time::Duration};

use boxoffice_core::{
  Error as CoreError,
  booking::Booking,
  clock::{Clock, SystemClock},
  fulfilment::{Notifier, TicketArchive, TicketRenderer},
  payment::{EventOutcome, PaymentEvent, PaymentRecord},
  store::{BookingLedger, CatalogStore},
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
  Result,
  checkout::{CheckoutProvider, CheckoutRequest, LineItem},
  event::parse_event,
  signature::{DEFAULT_TOLERANCE, SignatureVerifier},
};

/// Placeholder the provider substitutes with its checkout session id.
const SESSION_ID_TEMPLATE: &str = "session_id={CHECKOUT_SESSION_ID}";

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct GatewayConfig {
  pub webhook_secret:      String,
  pub currency:            String,
  pub signature_tolerance: Duration,
}

impl GatewayConfig {
  pub fn new(webhook_secret: impl Into<String>) -> Self {
    Self {
      webhook_secret:      webhook_secret.into(),
      currency:            "usd".into(),
      signature_tolerance: DEFAULT_TOLERANCE,
    }
  }
}

/// The post-payment collaborators, run in order after a first-time payment.
#[derive(Clone)]
pub struct Fulfilment {
  pub renderer: Arc<dyn TicketRenderer>,
  pub archive:  Arc<dyn TicketArchive>,
  pub notifier: Arc<dyn Notifier>,
}

// ─── Outcome ─────────────────────────────────────────────────────────────────

/// What a webhook delivery amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
  /// Signature missing, malformed, stale or wrong. Nothing was read.
  Unverified,
  /// This event id was already processed.
  Replayed,
  /// Verified, but not a checkout-completed event or not an event at all.
  Ignored,
  /// First-time payment. `fulfilled` is false if rendering, archiving or
  /// notifying failed; the booking is paid either way.
  Paid { booking_id: Uuid, fulfilled: bool },
  /// The booking was already paid by an earlier delivery.
  AlreadyPaid { booking_id: Uuid },
  /// The booking is gone (reclaimed before payment landed) or the event
  /// carried no usable booking id.
  Orphaned { booking_id: Option<Uuid> },
}

impl Reconciliation {
  /// Whether the provider should see the delivery as accepted.
  pub fn verified(&self) -> bool { !matches!(self, Self::Unverified) }

  fn outcome(&self) -> Option<EventOutcome> {
    match self {
      Self::Unverified | Self::Replayed => None,
      Self::Ignored => Some(EventOutcome::Ignored),
      Self::Paid { .. } => Some(EventOutcome::Applied),
      Self::AlreadyPaid { .. } => Some(EventOutcome::Duplicate),
      Self::Orphaned { .. } => Some(EventOutcome::Orphaned),
    }
  }
}

// ─── Gateway ─────────────────────────────────────────────────────────────────

pub struct PaymentGateway<S> {
  store:      Arc<S>,
  provider:   Arc<dyn CheckoutProvider>,
  fulfilment: Fulfilment,
  verifier:   SignatureVerifier,
  currency:   String,
  clock:      Arc<dyn Clock>,
}

fn into_core<E: Into<CoreError>>(e: E) -> CoreError { e.into() }

impl<S> PaymentGateway<S>
where
  S: BookingLedger + CatalogStore + 'static,
  <S as CatalogStore>::Error: Into<CoreError>,
{
  pub fn new(
    store: Arc<S>,
    provider: Arc<dyn CheckoutProvider>,
    fulfilment: Fulfilment,
    config: GatewayConfig,
  ) -> Result<Self> {
    let verifier =
      SignatureVerifier::new(&config.webhook_secret, config.signature_tolerance)
        .map_err(|e| CoreError::Validation(format!("webhook secret: {e}")))?;
    Ok(Self {
      store,
      provider,
      fulfilment,
      verifier,
      currency: config.currency,
      clock: Arc::new(SystemClock),
    })
  }

  /// Replace the time source used for signature tolerance checks.
  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  pub fn fulfilment(&self) -> &Fulfilment { &self.fulfilment }

  // ── Checkout ──────────────────────────────────────────────────────────────

  /// Open a hosted checkout for a pending booking and return its URL.
  pub async fn create_checkout(
    &self,
    booking_id: Uuid,
    success_url: &str,
    cancel_url: &str,
  ) -> Result<String> {
    if success_url.trim().is_empty() || cancel_url.trim().is_empty() {
      return Err(
        CoreError::Validation("success and cancel URLs are required".into())
          .into(),
      );
    }

    let booking = self
      .store
      .get_booking(booking_id)
      .await
      .map_err(into_core)?
      .ok_or(CoreError::BookingNotFound(booking_id))?;
    if booking.is_paid() {
      return Err(CoreError::BookingAlreadyPaid(booking_id).into());
    }

    let session = self
      .store
      .get_session(booking.session_id)
      .await
      .map_err(into_core)?
      .ok_or(CoreError::SessionNotFound(booking.session_id))?;

    let line_items = booking
      .tickets
      .iter()
      .map(|ticket| LineItem {
        name:        format!(
          "Movie Ticket (Row {}, Seat {})",
          ticket.row, ticket.number
        ),
        description: format!(
          "Movie: {}, Hall: {}, Start Time: {}",
          session.movie_title,
          session.hall_name,
          session.starts_at.format("%Y-%m-%d %H:%M UTC"),
        ),
        unit_amount: session.price,
        quantity:    1,
      })
      .collect();

    let separator = if success_url.contains('?') { '&' } else { '?' };
    let request = CheckoutRequest {
      booking_id,
      customer_email: booking.contact.email.clone(),
      success_url: format!("{success_url}{separator}{SESSION_ID_TEMPLATE}"),
      cancel_url: cancel_url.to_owned(),
      currency: self.currency.clone(),
      line_items,
    };

    let checkout = self.provider.create_session(&request).await?;
    info!(
      booking_id = %booking_id,
      checkout_id = %checkout.id,
      tickets = booking.tickets.len(),
      "checkout session created"
    );
    Ok(checkout.url)
  }

  // ── Webhook ───────────────────────────────────────────────────────────────

  /// Verify and reconcile one provider callback.
  ///
  /// Returns `Ok` for everything the provider should stop retrying,
  /// including bad signatures ([`Reconciliation::Unverified`]). Store and
  /// timeout failures are returned as errors so the provider redelivers.
  pub async fn handle_provider_callback(
    &self,
    payload: &[u8],
    signature: Option<&str>,
  ) -> Result<Reconciliation> {
    if let Err(e) = self.verifier.verify(payload, signature, self.clock.now()) {
      warn!(error = %e, "webhook signature rejected");
      return Ok(Reconciliation::Unverified);
    }

    // Redelivering an unparseable body cannot help, so it is acknowledged.
    let event = match parse_event(payload) {
      Ok(event) => event,
      Err(e) => {
        warn!(error = %e, "signed webhook body is not a provider event");
        return Ok(Reconciliation::Ignored);
      }
    };

    if self
      .store
      .payment_event_seen(event.event_id.clone())
      .await
      .map_err(into_core)?
    {
      debug!(event_id = %event.event_id, "provider event replayed");
      return Ok(Reconciliation::Replayed);
    }

    let result = self.reconcile(&event).await?;
    self.journal(event, &result).await?;
    Ok(result)
  }

  async fn reconcile(&self, event: &PaymentEvent) -> Result<Reconciliation> {
    if !event.is_checkout_completed() {
      debug!(
        event_id = %event.event_id,
        event_type = %event.event_type,
        "ignoring provider event"
      );
      return Ok(Reconciliation::Ignored);
    }

    let Some(booking_id) = event.booking_id else {
      warn!(event_id = %event.event_id, "checkout completed without a booking id");
      return Ok(Reconciliation::Orphaned { booking_id: None });
    };

    match self.store.mark_paid(booking_id).await.map_err(into_core) {
      Ok(booking) => {
        let fulfilled = self.fulfil(&booking).await;
        Ok(Reconciliation::Paid { booking_id, fulfilled })
      }
      Err(CoreError::BookingAlreadyPaid(_)) => {
        info!(booking_id = %booking_id, event_id = %event.event_id, "duplicate payment confirmation");
        Ok(Reconciliation::AlreadyPaid { booking_id })
      }
      Err(CoreError::BookingNotFound(_)) => {
        warn!(
          booking_id = %booking_id,
          event_id = %event.event_id,
          "payment arrived for a booking that no longer exists"
        );
        Ok(Reconciliation::Orphaned { booking_id: Some(booking_id) })
      }
      Err(e) => Err(e.into()),
    }
  }

  async fn journal(
    &self,
    event: PaymentEvent,
    result: &Reconciliation,
  ) -> Result<()> {
    let Some(outcome) = result.outcome() else {
      return Ok(());
    };
    let event_id = event.event_id.clone();
    let record = PaymentRecord { event, outcome, received_at: self.clock.now() };
    let fresh = self.store.record_payment_event(record).await.map_err(into_core)?;
    if !fresh {
      debug!(event_id = %event_id, "provider event journaled concurrently");
    }
    Ok(())
  }

  /// Render, archive, then notify. Failures are logged and never undo the
  /// payment.
  async fn fulfil(&self, booking: &Booking) -> bool {
    let booking_id = booking.booking_id;

    let session = match self.store.get_session(booking.session_id).await {
      Ok(Some(session)) => session,
      Ok(None) => {
        error!(booking_id = %booking_id, "fulfilment skipped: session missing");
        return false;
      }
      Err(e) => {
        error!(booking_id = %booking_id, error = %into_core(e), "fulfilment skipped: session lookup failed");
        return false;
      }
    };

    let mut fulfilled = true;

    match self.fulfilment.renderer.render(booking, &session) {
      Ok(document) => {
        if let Err(e) = self.fulfilment.archive.save(booking_id, document).await {
          error!(booking_id = %booking_id, error = %e, "failed to archive tickets");
          fulfilled = false;
        }
      }
      Err(e) => {
        error!(booking_id = %booking_id, error = %e, "failed to render tickets");
        fulfilled = false;
      }
    }

    if let Err(e) = self
      .fulfilment
      .notifier
      .send_booking_confirmation(&booking.contact.email, booking, &session)
      .await
    {
      error!(booking_id = %booking_id, error = %e, "failed to send booking confirmation");
      fulfilled = false;
    }

    if fulfilled {
      info!(booking_id = %booking_id, "booking fulfilled");
    }
    fulfilled
  }
}
