//! The hosted-checkout contract.

use async_trait::async_trait;
use boxoffice_core::money::Money;
use uuid::Uuid;

use crate::Result;

/// One purchasable line; the gateway emits one per ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
  pub name:        String,
  pub description: String,
  pub unit_amount: Money,
  pub quantity:    u32,
}

/// Everything the provider needs to open a checkout for one booking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
  /// Attached as correlation metadata and echoed back in the webhook.
  pub booking_id:     Uuid,
  pub customer_email: String,
  pub success_url:    String,
  pub cancel_url:     String,
  pub currency:       String,
  pub line_items:     Vec<LineItem>,
}

/// A checkout opened at the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
  pub id:  String,
  /// Provider-hosted page the customer is redirected to.
  pub url: String,
}

#[async_trait]
pub trait CheckoutProvider: Send + Sync {
  async fn create_session(
    &self,
    request: &CheckoutRequest,
  ) -> Result<CheckoutSession>;
}
