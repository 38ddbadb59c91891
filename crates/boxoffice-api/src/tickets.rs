//! `GET /tickets/validate/{ticket_id}`: admission at the door.

use axum::{
  Json,
  extract::{Path, State},
};
use boxoffice_core::{
  Error as CoreError,
  booking::Ticket,
  store::{BookingLedger, CatalogStore},
};
use uuid::Uuid;

use crate::{AppState, error::ApiError};

/// Marks the ticket used. 402 if the booking is unpaid, 409 on a second scan.
pub async fn validate<S>(
  State(state): State<AppState<S>>,
  Path(ticket_id): Path<Uuid>,
) -> Result<Json<Ticket>, ApiError>
where
  S: BookingLedger + CatalogStore + 'static,
  <S as CatalogStore>::Error: Into<CoreError>,
{
  match state.store.validate_ticket(ticket_id).await {
    Ok(ticket) => {
      tracing::info!(ticket_id = %ticket_id, booking_id = %ticket.booking_id, "ticket admitted");
      Ok(Json(ticket))
    }
    Err(e) => {
      let e: CoreError = e.into();
      tracing::info!(ticket_id = %ticket_id, reason = %e, "ticket rejected");
      Err(e.into())
    }
  }
}
