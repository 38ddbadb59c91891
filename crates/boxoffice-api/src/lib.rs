//! JSON HTTP API for the boxoffice booking engine.
//!
//! Exposes an axum [`Router`] backed by any store implementing both
//! [`CatalogStore`] and [`BookingLedger`], plus a [`PaymentGateway`] over
//! the same store. Tracing, TLS and transport concerns are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", boxoffice_api::api_router(state))
//! ```

pub mod bookings;
pub mod error;
pub mod payments;
pub mod sessions;
pub mod tickets;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use boxoffice_core::store::{BookingLedger, CatalogStore};
use boxoffice_payments::PaymentGateway;

pub use error::ApiError;

/// Shared state threaded through all handlers.
pub struct AppState<S> {
  pub store:   Arc<S>,
  pub gateway: Arc<PaymentGateway<S>>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), gateway: self.gateway.clone() }
  }
}

/// Build the API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: BookingLedger + CatalogStore + 'static,
  <S as CatalogStore>::Error: Into<boxoffice_core::Error>,
{
  Router::new()
    // Bookings
    .route("/bookings", post(bookings::create::<S>))
    .route("/bookings/{id}", get(bookings::get_one::<S>))
    .route("/bookings/{id}/tickets/download", get(bookings::download::<S>))
    // Payments
    .route("/payments/checkout-session", post(payments::checkout::<S>))
    .route("/payments/webhook", post(payments::webhook::<S>))
    // Door
    .route("/tickets/validate/{ticket_id}", get(tickets::validate::<S>))
    // Sessions
    .route("/sessions/{id}/occupancy", get(sessions::occupancy::<S>))
    .route("/sessions/{id}/tickets", get(sessions::paid_tickets::<S>))
    .with_state(state)
}
