//! Handlers for `/payments` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/payments/checkout-session` | Body: `{"bookingId":..,"successUrl":..,"cancelUrl":..}`; returns the redirect URL |
//! | `POST` | `/payments/webhook` | Raw provider body + `Stripe-Signature`; `200 verified` or `401 verification failed` |

use axum::{
  Json,
  extract::State,
  http::{HeaderMap, StatusCode},
  response::IntoResponse,
};
use boxoffice_core::{
  Error as CoreError,
  store::{BookingLedger, CatalogStore},
};
use boxoffice_payments::signature::SIGNATURE_HEADER;
use bytes::Bytes;
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

// ─── Checkout ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutBody {
  pub booking_id:  Uuid,
  pub success_url: String,
  pub cancel_url:  String,
}

/// `POST /payments/checkout-session`
pub async fn checkout<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<CheckoutBody>,
) -> Result<String, ApiError>
where
  S: BookingLedger + CatalogStore + 'static,
  <S as CatalogStore>::Error: Into<CoreError>,
{
  let url = state
    .gateway
    .create_checkout(body.booking_id, &body.success_url, &body.cancel_url)
    .await?;
  Ok(url)
}

// ─── Webhook ──────────────────────────────────────────────────────────────────

/// `POST /payments/webhook`
///
/// The body is taken raw: the signature covers the exact bytes sent.
pub async fn webhook<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
  body: Bytes,
) -> Result<impl IntoResponse, ApiError>
where
  S: BookingLedger + CatalogStore + 'static,
  <S as CatalogStore>::Error: Into<CoreError>,
{
  let signature = headers
    .get(SIGNATURE_HEADER)
    .and_then(|v| v.to_str().ok());

  let result = state
    .gateway
    .handle_provider_callback(&body, signature)
    .await?;

  Ok(if result.verified() {
    (StatusCode::OK, "verified")
  } else {
    (StatusCode::UNAUTHORIZED, "verification failed")
  })
}
