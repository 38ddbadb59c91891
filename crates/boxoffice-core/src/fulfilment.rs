//! Contracts for the external collaborators invoked after a booking is paid.
//!
//! These are object-safe so the gateway and HTTP layer can hold them as
//! `Arc<dyn ...>` without threading more type parameters through every
//! handler.

use async_trait::async_trait;
use uuid::Uuid;

use crate::{Result, booking::Booking, catalog::Session};

/// Turns a paid booking into a printable ticket document.
pub trait TicketRenderer: Send + Sync {
  fn render(&self, booking: &Booking, session: &Session) -> Result<Vec<u8>>;
}

/// Durable storage for rendered ticket documents, keyed by booking.
#[async_trait]
pub trait TicketArchive: Send + Sync {
  async fn save(&self, booking_id: Uuid, document: Vec<u8>) -> Result<()>;

  /// Fails with [`crate::Error::TicketFileNotFound`] when nothing was saved
  /// for `booking_id`.
  async fn load(&self, booking_id: Uuid) -> Result<Vec<u8>>;
}

/// Outbound customer notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
  async fn send_booking_confirmation(
    &self,
    email: &str,
    booking: &Booking,
    session: &Session,
  ) -> Result<()>;
}
