//! Provider-neutral payment notifications and their journal entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};
use uuid::Uuid;

/// The only event type that moves a booking to paid.
pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

/// A verified notification from the payment provider.
///
/// `event_id` is the provider's idempotency key; a replay carries the same
/// id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentEvent {
  pub event_id:   String,
  pub event_type: String,
  /// Correlation id taken from the checkout metadata, when present.
  pub booking_id: Option<Uuid>,
}

impl PaymentEvent {
  pub fn is_checkout_completed(&self) -> bool {
    self.event_type == CHECKOUT_COMPLETED
  }
}

/// What reconciliation did with an event.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventOutcome {
  /// First delivery; the booking moved PENDING → PAID.
  Applied,
  /// The booking was already paid.
  Duplicate,
  /// The booking no longer exists (reclaimed before the payment landed) or
  /// the event carried no usable correlation id.
  Orphaned,
  /// Not a checkout-completed event.
  Ignored,
}

/// A row of the payment event journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
  pub event:       PaymentEvent,
  pub outcome:     EventOutcome,
  pub received_at: DateTime<Utc>,
}
