//! [`LogNotifier`]: booking confirmations written to the log.
//!
//! Mail delivery lives outside this service; the message is composed in full
//! so a relay can pick it up from the structured log.

use async_trait::async_trait;
use boxoffice_core::{
  Result,
  booking::Booking,
  catalog::Session,
  fulfilment::Notifier,
};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct LogNotifier {
  base_url: String,
}

impl LogNotifier {
  pub fn new(base_url: impl Into<String>) -> Self {
    Self { base_url: base_url.into() }
  }

  /// `<base_url>/api/bookings/<id>/tickets/download`
  pub fn download_url(&self, booking_id: Uuid) -> String {
    format!(
      "{}/api/bookings/{booking_id}/tickets/download",
      self.base_url.trim_end_matches('/')
    )
  }

  pub fn compose(&self, booking: &Booking, session: &Session) -> String {
    let seats = booking
      .tickets
      .iter()
      .map(|t| format!("row {} seat {}", t.row, t.number))
      .collect::<Vec<_>>()
      .join(", ");
    format!(
      "Dear {name},\n\n\
       Your booking for {movie} is confirmed.\n\
       Hall: {hall}\n\
       Starts: {starts}\n\
       Seats: {seats}\n\
       Total: {total}\n\n\
       Download your tickets: {link}\n",
      name = booking.contact.name,
      movie = session.movie_title,
      hall = session.hall_name,
      starts = session.starts_at.format("%Y-%m-%d %H:%M UTC"),
      total = booking.total,
      link = self.download_url(booking.booking_id),
    )
  }
}

#[async_trait]
impl Notifier for LogNotifier {
  async fn send_booking_confirmation(
    &self,
    email: &str,
    booking: &Booking,
    session: &Session,
  ) -> Result<()> {
    let body = self.compose(booking, session);
    tracing::info!(
      to = %email,
      booking_id = %booking.booking_id,
      subject = "Your movie tickets",
      %body,
      "booking confirmation"
    );
    Ok(())
  }
}
