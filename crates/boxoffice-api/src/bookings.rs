//! Handlers for `/bookings` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/bookings` | Body: `{"sessionId":1,"name":..,"email":..,"phone":..,"seatIds":[..]}` |
//! | `GET`  | `/bookings/{id}` | 404 if not found |
//! | `GET`  | `/bookings/{id}/tickets/download` | `application/pdf`; 402 until paid |

use axum::{
  Json,
  extract::{Path, State},
  http::header,
  response::IntoResponse,
};
use boxoffice_core::{
  Error as CoreError,
  booking::{Booking, Contact, NewBooking},
  catalog::{SeatId, SessionId},
  store::{BookingLedger, CatalogStore},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBody {
  pub session_id: SessionId,
  pub name:       String,
  pub email:      String,
  pub phone:      String,
  pub seat_ids:   Vec<SeatId>,
}

/// `POST /bookings`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<CreateBody>,
) -> Result<Json<Booking>, ApiError>
where
  S: BookingLedger + CatalogStore + 'static,
  <S as CatalogStore>::Error: Into<CoreError>,
{
  let input = NewBooking {
    session_id: body.session_id,
    contact:    Contact { name: body.name, email: body.email, phone: body.phone },
    seat_ids:   body.seat_ids,
  };
  let booking = state
    .store
    .reserve(input)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(booking))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /bookings/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Booking>, ApiError>
where
  S: BookingLedger + CatalogStore + 'static,
  <S as CatalogStore>::Error: Into<CoreError>,
{
  let booking = state
    .store
    .get_booking(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or(CoreError::BookingNotFound(id))?;
  Ok(Json(booking))
}

// ─── Download ─────────────────────────────────────────────────────────────────

/// `GET /bookings/{id}/tickets/download`
pub async fn download<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError>
where
  S: BookingLedger + CatalogStore + 'static,
  <S as CatalogStore>::Error: Into<CoreError>,
{
  let booking = state
    .store
    .get_booking(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or(CoreError::BookingNotFound(id))?;
  if !booking.is_paid() {
    return Err(CoreError::BookingNotPaid(id).into());
  }

  let document = state.gateway.fulfilment().archive.load(id).await?;
  Ok((
    [
      (header::CONTENT_TYPE, "application/pdf".to_owned()),
      (
        header::CONTENT_DISPOSITION,
        format!("attachment; filename=\"ticket-{id}.pdf\""),
      ),
    ],
    document,
  ))
}
