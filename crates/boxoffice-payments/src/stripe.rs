//! [`StripeProvider`]: hosted checkout over the Stripe REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{
  Error, Result,
  checkout::{CheckoutProvider, CheckoutRequest, CheckoutSession},
  event::BOOKING_ID_KEY,
};

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct StripeProvider {
  client:     Client,
  api_base:   String,
  secret_key: String,
}

#[derive(Deserialize)]
struct SessionResponse {
  id:  String,
  url: Option<String>,
}

impl StripeProvider {
  pub fn new(
    api_base: impl Into<String>,
    secret_key: impl Into<String>,
  ) -> Result<Self> {
    let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
    Ok(Self {
      client,
      api_base: api_base.into(),
      secret_key: secret_key.into(),
    })
  }

  fn url(&self, path: &str) -> String {
    format!("{}/v1{}", self.api_base.trim_end_matches('/'), path)
  }
}

/// Flatten a request into Stripe's bracketed form encoding.
fn form_fields(request: &CheckoutRequest) -> Vec<(String, String)> {
  let mut fields = vec![
    ("mode".to_owned(), "payment".to_owned()),
    ("customer_email".to_owned(), request.customer_email.clone()),
    ("success_url".to_owned(), request.success_url.clone()),
    ("cancel_url".to_owned(), request.cancel_url.clone()),
    (format!("metadata[{BOOKING_ID_KEY}]"), request.booking_id.to_string()),
  ];

  for (i, item) in request.line_items.iter().enumerate() {
    let prefix = format!("line_items[{i}]");
    fields.extend([
      (format!("{prefix}[quantity]"), item.quantity.to_string()),
      (
        format!("{prefix}[price_data][currency]"),
        request.currency.clone(),
      ),
      (
        format!("{prefix}[price_data][unit_amount]"),
        item.unit_amount.minor().to_string(),
      ),
      (
        format!("{prefix}[price_data][product_data][name]"),
        item.name.clone(),
      ),
      (
        format!("{prefix}[price_data][product_data][description]"),
        item.description.clone(),
      ),
    ]);
  }
  fields
}

#[async_trait]
impl CheckoutProvider for StripeProvider {
  async fn create_session(
    &self,
    request: &CheckoutRequest,
  ) -> Result<CheckoutSession> {
    let resp = self
      .client
      .post(self.url("/checkout/sessions"))
      .bearer_auth(&self.secret_key)
      .form(&form_fields(request))
      .send()
      .await?;

    let status = resp.status();
    if !status.is_success() {
      let body = resp.text().await.unwrap_or_default();
      tracing::error!(%status, booking_id = %request.booking_id, "checkout creation failed");
      return Err(Error::Provider(format!("{status}: {body}")));
    }

    let session: SessionResponse = resp.json().await?;
    let url = session
      .url
      .ok_or_else(|| Error::Provider("checkout session has no url".into()))?;
    Ok(CheckoutSession { id: session.id, url })
  }
}

#[cfg(test)]
mod tests {
  use boxoffice_core::money::Money;
  use uuid::Uuid;

  use super::*;
  use crate::checkout::LineItem;

  #[test]
  fn form_encodes_line_items_and_metadata() {
    let booking_id = Uuid::new_v4();
    let request = CheckoutRequest {
      booking_id,
      customer_email: "ada@example.com".into(),
      success_url: "https://cinema.test/ok?session_id={CHECKOUT_SESSION_ID}".into(),
      cancel_url: "https://cinema.test/cancel".into(),
      currency: "usd".into(),
      line_items: vec![
        LineItem {
          name:        "Movie Ticket (Row 1, Seat 1)".into(),
          description: "Metropolis".into(),
          unit_amount: Money::from_minor(1500),
          quantity:    1,
        },
        LineItem {
          name:        "Movie Ticket (Row 1, Seat 2)".into(),
          description: "Metropolis".into(),
          unit_amount: Money::from_minor(1500),
          quantity:    1,
        },
      ],
    };

    let fields = form_fields(&request);
    let get = |k: &str| {
      fields
        .iter()
        .find(|(key, _)| key == k)
        .map(|(_, v)| v.as_str())
    };
    assert_eq!(get("mode"), Some("payment"));
    assert_eq!(get("metadata[bookingId]"), Some(booking_id.to_string().as_str()));
    assert_eq!(get("line_items[1][price_data][unit_amount]"), Some("1500"));
    assert_eq!(
      get("line_items[0][price_data][product_data][name]"),
      Some("Movie Ticket (Row 1, Seat 1)")
    );
    assert_eq!(get("line_items[2][quantity]"), None);
  }

  #[test]
  fn url_joins_api_base() {
    let p = StripeProvider::new("http://localhost:12111/", "sk_test").unwrap();
    assert_eq!(
      p.url("/checkout/sessions"),
      "http://localhost:12111/v1/checkout/sessions"
    );
  }
}
