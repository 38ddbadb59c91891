//! Decoding provider webhook payloads into [`PaymentEvent`]s.

use std::collections::HashMap;

use boxoffice_core::payment::PaymentEvent;
use serde::Deserialize;
use uuid::Uuid;

use crate::{Error, Result};

/// Checkout metadata key that carries the booking id.
pub const BOOKING_ID_KEY: &str = "bookingId";

#[derive(Deserialize)]
struct Envelope {
  id:         String,
  #[serde(rename = "type")]
  event_type: String,
  #[serde(default)]
  data:       Option<EventData>,
}

#[derive(Deserialize)]
struct EventData {
  #[serde(default)]
  object: Option<EventObject>,
}

#[derive(Deserialize)]
struct EventObject {
  #[serde(default)]
  metadata: Option<HashMap<String, String>>,
}

/// Parse a verified webhook body.
///
/// A missing or unparseable `booking_id` leaves the correlation id empty
/// rather than failing, so the event can still be journaled.
pub fn parse_event(payload: &[u8]) -> Result<PaymentEvent> {
  let envelope: Envelope = serde_json::from_slice(payload)
    .map_err(|e| Error::InvalidPayload(e.to_string()))?;

  let booking_id = envelope
    .data
    .and_then(|d| d.object)
    .and_then(|o| o.metadata)
    .and_then(|mut m| m.remove(BOOKING_ID_KEY))
    .and_then(|raw| Uuid::parse_str(raw.trim()).ok());

  Ok(PaymentEvent {
    event_id: envelope.id,
    event_type: envelope.event_type,
    booking_id,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn extracts_booking_id_from_checkout_metadata() {
    let id = Uuid::new_v4();
    let body = format!(
      r#"{{
        "id": "evt_1",
        "type": "checkout.session.completed",
        "data": {{ "object": {{ "id": "cs_1", "metadata": {{ "bookingId": "{id}" }} }} }}
      }}"#
    );
    let event = parse_event(body.as_bytes()).unwrap();
    assert_eq!(event.event_id, "evt_1");
    assert!(event.is_checkout_completed());
    assert_eq!(event.booking_id, Some(id));
  }

  #[test]
  fn tolerates_missing_or_bad_correlation() {
    let event =
      parse_event(br#"{"id":"evt_2","type":"charge.refunded","data":{"object":{}}}"#)
        .unwrap();
    assert_eq!(event.booking_id, None);
    assert!(!event.is_checkout_completed());

    let event = parse_event(
      br#"{"id":"evt_3","type":"checkout.session.completed",
           "data":{"object":{"metadata":{"bookingId":"42"}}}}"#,
    )
    .unwrap();
    assert_eq!(event.booking_id, None);
  }

  #[test]
  fn rejects_non_event_json() {
    assert!(matches!(parse_event(b"[]"), Err(Error::InvalidPayload(_))));
    assert!(matches!(parse_event(b"not json"), Err(Error::InvalidPayload(_))));
  }
}
