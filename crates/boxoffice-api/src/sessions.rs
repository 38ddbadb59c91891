//! Per-session reads: seat map and door list.

use axum::{
  Json,
  extract::{Path, State},
};
use boxoffice_core::{
  Error as CoreError,
  booking::TicketHolder,
  catalog::{SeatStatus, SessionId},
  store::{BookingLedger, CatalogStore},
};

use crate::{AppState, error::ApiError};

/// `GET /sessions/{id}/occupancy`
pub async fn occupancy<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<SessionId>,
) -> Result<Json<Vec<SeatStatus>>, ApiError>
where
  S: BookingLedger + CatalogStore + 'static,
  <S as CatalogStore>::Error: Into<CoreError>,
{
  let seats = state
    .store
    .session_occupancy(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(seats))
}

/// `GET /sessions/{id}/tickets`: paid tickets only.
pub async fn paid_tickets<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<SessionId>,
) -> Result<Json<Vec<TicketHolder>>, ApiError>
where
  S: BookingLedger + CatalogStore + 'static,
  <S as CatalogStore>::Error: Into<CoreError>,
{
  let holders = state
    .store
    .paid_tickets(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(holders))
}
